use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither flags nor configuration provide one
const DEFAULT_FILTER: &str = "warn";

/// Install a stderr `fmt` subscriber
///
/// Stdout is reserved for the neuron's result. An unparseable directive falls
/// back to [`DEFAULT_FILTER`].
pub fn init(log_filter: Option<&str>) {
    let filter =
        EnvFilter::try_new(log_filter.unwrap_or(DEFAULT_FILTER)).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
