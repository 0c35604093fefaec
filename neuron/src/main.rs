#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;
mod telemetry;

use std::process::ExitCode;

use args::Args;
use clap::Parser;
use neuron_client::{InvokeOptions, NeuronClient, NeuronError, NeuronOutput};
use neuron_config::Config;
use tokio::io::AsyncReadExt;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let mut args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    telemetry::init(args.log_filter.as_deref().or(config.log.filter.as_deref()));

    let mut client_config = config.client;
    if let Some(base_url) = args.base_url.take() {
        client_config.base_url = Some(base_url);
    }
    if let Some(api_key) = args.api_key.take() {
        client_config.credential = Some(api_key.into());
    }

    let client = NeuronClient::new(client_config)?;
    tracing::debug!(base_url = %client.base_url(), "client ready");

    let options = build_options(args).await?;

    match client
        .invoke_neuron(&options.organization, &options.neuron, &options.invoke)
        .await
    {
        Ok(NeuronOutput::Raw(body)) => println!("{body}"),
        Ok(NeuronOutput::Structured(response)) => println!("{}", serde_json::to_string_pretty(&response)?),
        Err(err) => return report(err),
    }

    Ok(ExitCode::SUCCESS)
}

/// Target neuron and per-call options assembled from arguments
struct Invocation {
    organization: String,
    neuron: String,
    invoke: InvokeOptions,
}

async fn build_options(args: Args) -> anyhow::Result<Invocation> {
    let input = if args.input == "-" {
        let mut buffer = String::new();
        tokio::io::stdin().read_to_string(&mut buffer).await?;
        buffer
    } else {
        args.input
    };

    let invoke = args.headers.into_iter().fold(
        InvokeOptions::new()
            .input(input)
            .bypass_cache(args.bypass_cache)
            .raw_output(args.raw),
        |options, (name, value)| options.header(name, value),
    );

    Ok(Invocation {
        organization: args.organization,
        neuron: args.neuron,
        invoke,
    })
}

/// Print a structured failure on stderr, or hand other errors to `anyhow`
fn report(err: NeuronError) -> anyhow::Result<ExitCode> {
    let Some(response) = err.to_error_response() else {
        return Err(err.into());
    };

    eprintln!("{}", serde_json::to_string_pretty(&response)?);
    Ok(ExitCode::FAILURE)
}
