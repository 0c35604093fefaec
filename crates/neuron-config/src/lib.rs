#![allow(clippy::must_use_candidate)]

//! Configuration file for tools built on `neuron-client`
//!
//! ```toml
//! [client]
//! base_url = "https://run.prompteus.com"
//! credential = "{{ env.NEURON_API_KEY }}"
//!
//! [log]
//! filter = "neuron_client=debug"
//! ```

mod env;
mod loader;

pub use neuron_client::ClientConfig;
use serde::Deserialize;

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Connection defaults for the neuron client
    #[serde(default)]
    pub client: ClientConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging configuration
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `"info,neuron_client=debug"`
    #[serde(default)]
    pub filter: Option<String>,
}
