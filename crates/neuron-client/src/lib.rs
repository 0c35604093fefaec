#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Typed Rust HTTP client for hosted neurons
//!
//! A neuron is addressed by an organization slug and a neuron slug and is
//! invoked with a single `POST`. The client resolves which bearer credential
//! to attach, optionally asks the platform to skip its cache, and returns
//! either the raw response body or a structured result

mod client;
pub mod error;
pub mod types;

pub use client::{NeuronClient, neuron_url, resolve_credential};
pub use error::{NeuronError, Result};
pub use types::*;
