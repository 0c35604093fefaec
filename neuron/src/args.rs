use std::path::PathBuf;

use clap::Parser;

/// Invoke a hosted neuron
#[derive(Debug, Parser)]
#[command(name = "neuron", about = "Invoke a hosted neuron and print its result")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "NEURON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the platform base URL
    #[arg(long, env = "NEURON_BASE_URL")]
    pub base_url: Option<String>,

    /// JWT or API key to authenticate with
    #[arg(long, env = "NEURON_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Log filter directive, e.g. `debug` or `neuron_client=debug`
    #[arg(long, env = "NEURON_LOG")]
    pub log_filter: Option<String>,

    /// Organization slug
    pub organization: String,

    /// Neuron slug
    pub neuron: String,

    /// Input sent to the neuron; `-` reads it from stdin
    #[arg(short, long, default_value = "")]
    pub input: String,

    /// Skip cached results and force a fresh execution
    #[arg(long)]
    pub bypass_cache: bool,

    /// Print the response body as-is instead of parsing it
    #[arg(long)]
    pub raw: bool,

    /// Extra request header as `Name: value`; may be repeated
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got `{raw}`"))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in `{raw}`"));
    }

    Ok((name.to_owned(), value.trim().to_owned()))
}
