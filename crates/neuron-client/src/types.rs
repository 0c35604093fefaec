use indexmap::IndexMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Platform endpoint used when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "https://run.prompteus.com";

// -- Client configuration --

/// Connection defaults held by a [`NeuronClient`](crate::NeuronClient)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Platform base URL, [`DEFAULT_BASE_URL`] when unset or empty
    #[serde(default)]
    pub base_url: Option<String>,
    /// JWT or API key attached to calls that do not bring their own
    #[serde(default)]
    pub credential: Option<SecretString>,
}

impl ClientConfig {
    /// Use a non-default platform URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Authenticate every call with the given JWT or API key
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<SecretString>) -> Self {
        self.credential = Some(credential.into());
        self
    }
}

// -- Per-call options --

/// Options for a single neuron invocation
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Ask the platform to skip exact and semantic caching
    pub bypass_cache: bool,
    /// Input string sent to the neuron
    pub input: String,
    /// Return the response body as text instead of a parsed result
    pub raw_output: bool,
    /// Extra request headers; an `Authorization` entry here wins over any credential
    pub headers: IndexMap<String, String>,
    /// Credential for this call only, overriding the client's stored one
    pub credential: Option<SecretString>,
}

impl InvokeOptions {
    /// Options with every flag off and an empty input
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input string
    #[must_use]
    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    /// Force a fresh execution
    #[must_use]
    pub const fn bypass_cache(mut self, bypass_cache: bool) -> Self {
        self.bypass_cache = bypass_cache;
        self
    }

    /// Request the unparsed response body
    #[must_use]
    pub const fn raw_output(mut self, raw_output: bool) -> Self {
        self.raw_output = raw_output;
        self
    }

    /// Add a request header, replacing an earlier one with the same name
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    /// Authenticate this call with a specific JWT or API key
    #[must_use]
    pub fn credential(mut self, credential: impl Into<SecretString>) -> Self {
        self.credential = Some(credential.into());
        self
    }
}

// -- Wire types --

/// Request body posted to a neuron
#[derive(Debug, Serialize)]
pub(crate) struct InvokeBody<'a> {
    pub input: &'a str,
}

/// Structured result of a neuron execution
///
/// Every field is server-defined and optional; fields this client does not
/// know about are kept in `extra`. A known field with an unexpected type (an
/// object `output`, say) fails decoding with `NeuronError::Parse`; use raw
/// output to receive such bodies unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeuronResponse {
    /// Output generated by the neuron
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Whether the result was served from cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_cache: Option<bool>,
    /// Whether the execution was stopped before completing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_stopped: Option<bool>,
    /// Any other fields returned by the platform
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Failed neuron execution as reported to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// What went wrong
    pub error: String,
    /// HTTP status of the failure
    pub status_code: u16,
    /// Any other fields of the platform's error body
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorResponse {
    /// Error with no extra fields
    pub fn new(error: impl Into<String>, status_code: u16) -> Self {
        Self {
            error: error.into(),
            status_code,
            extra: Map::new(),
        }
    }
}

/// Result of [`NeuronClient::invoke_neuron`](crate::NeuronClient::invoke_neuron)
#[derive(Debug, Clone, PartialEq)]
pub enum NeuronOutput {
    /// Response body verbatim, returned when `raw_output` is set
    Raw(String),
    /// Parsed JSON result
    Structured(NeuronResponse),
}

impl NeuronOutput {
    /// Text of the result: the raw body, or the structured `output` field
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Raw(text) => Some(text),
            Self::Structured(response) => response.output.as_deref(),
        }
    }
}
