use std::fmt;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use crate::error::{NeuronError, Result};
use crate::types::{ClientConfig, ErrorResponse, InvokeBody, InvokeOptions, NeuronOutput, NeuronResponse};

const USER_AGENT: &str = concat!("neuron-client/", env!("CARGO_PKG_VERSION"));

const MISSING_ORGANIZATION: &str = "Organization slug is required, not calling neuron.";
const MISSING_NEURON: &str = "Neuron slug is required, not calling neuron.";

/// Typed client for invoking hosted neurons
///
/// Clones share the stored credential: [`set_credential`](Self::set_credential)
/// on one clone is seen by every other
#[derive(Clone)]
pub struct NeuronClient {
    base_url: Url,
    http: reqwest::Client,
    credential: Arc<RwLock<Option<SecretString>>>,
}

impl fmt::Debug for NeuronClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeuronClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_credential", &self.has_credential())
            .finish_non_exhaustive()
    }
}

impl NeuronClient {
    /// Create a client from connection defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.resolved_base_url()?;
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            base_url,
            http,
            credential: Arc::new(RwLock::new(config.credential.filter(is_present))),
        })
    }

    /// Send requests through a caller-provided HTTP client
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Base URL every neuron path is appended to
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a non-empty credential is currently stored
    pub fn has_credential(&self) -> bool {
        self.stored_credential().is_some_and(|c| is_present(&c))
    }

    /// Replace the stored credential used by calls without their own
    ///
    /// Calls already in flight keep the credential they started with
    pub fn set_credential(&self, credential: impl Into<SecretString>) {
        let mut slot = self.credential.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(credential.into());
    }

    /// Drop the stored credential so later calls go out unauthenticated
    pub fn clear_credential(&self) {
        let mut slot = self.credential.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    fn stored_credential(&self) -> Option<SecretString> {
        self.credential.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    // -- Invocation --

    /// Invoke a neuron
    ///
    /// Returns [`NeuronOutput::Raw`] when `options.raw_output` is set and
    /// [`NeuronOutput::Structured`] otherwise. The stored credential is read
    /// once, when the returned future is first polled
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` without sending anything if a slug is empty or a
    /// header is malformed, `Remote` if the platform answers with a non-success
    /// status, and `Http`/`Parse` for transport or decoding failures
    pub async fn invoke_neuron(
        &self,
        organization_slug: &str,
        neuron_slug: &str,
        options: &InvokeOptions,
    ) -> Result<NeuronOutput> {
        let response = self
            .send(organization_slug, neuron_slug, options, options.raw_output)
            .await?;

        if options.raw_output {
            Ok(NeuronOutput::Raw(response.text().await?))
        } else {
            decode_response(response).await.map(NeuronOutput::Structured)
        }
    }

    /// Invoke a neuron and parse its JSON result, ignoring `options.raw_output`
    ///
    /// # Errors
    ///
    /// Same as [`invoke_neuron`](Self::invoke_neuron)
    pub async fn invoke_neuron_json(
        &self,
        organization_slug: &str,
        neuron_slug: &str,
        options: &InvokeOptions,
    ) -> Result<NeuronResponse> {
        let response = self.send(organization_slug, neuron_slug, options, false).await?;
        decode_response(response).await
    }

    /// Invoke a neuron and return its body as text, ignoring `options.raw_output`
    ///
    /// # Errors
    ///
    /// Same as [`invoke_neuron`](Self::invoke_neuron)
    pub async fn invoke_neuron_text(
        &self,
        organization_slug: &str,
        neuron_slug: &str,
        options: &InvokeOptions,
    ) -> Result<String> {
        let response = self.send(organization_slug, neuron_slug, options, true).await?;
        Ok(response.text().await?)
    }

    /// Validate, build and send the request, returning only success responses
    async fn send(
        &self,
        organization_slug: &str,
        neuron_slug: &str,
        options: &InvokeOptions,
        raw_output: bool,
    ) -> Result<reqwest::Response> {
        if organization_slug.is_empty() {
            return Err(NeuronError::invalid_argument(MISSING_ORGANIZATION));
        }
        if neuron_slug.is_empty() {
            return Err(NeuronError::invalid_argument(MISSING_NEURON));
        }

        // Snapshot before the first await
        let stored = self.stored_credential();
        let credential = select_credential(&options.headers, options.credential.as_ref(), stored.as_ref());
        let headers = build_headers(&options.headers, credential.bearer())?;
        let url = neuron_url(
            &self.base_url,
            organization_slug,
            neuron_slug,
            options.bypass_cache,
            raw_output,
        )?;

        tracing::debug!(
            organization = organization_slug,
            neuron = neuron_slug,
            bypass_cache = options.bypass_cache,
            raw_output,
            credential = credential.source(),
            "invoking neuron"
        );

        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(&InvokeBody {
                input: &options.input,
            })
            .send()
            .await?;

        let response = handle_error(response).await?;
        tracing::debug!(status = response.status().as_u16(), "neuron responded");

        Ok(response)
    }
}

impl ClientConfig {
    /// Parse the configured base URL, falling back to the platform default
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse, is not http(s), or cannot
    /// carry path segments
    pub fn resolved_base_url(&self) -> Result<Url> {
        let raw = self
            .base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(crate::types::DEFAULT_BASE_URL);

        let url = Url::parse(raw).map_err(|e| NeuronError::Config(format!("invalid base URL `{raw}`: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(NeuronError::Config(format!(
                "base URL must be an absolute http(s) URL: `{raw}`"
            )));
        }

        Ok(url)
    }
}

// -- Credential resolution --

/// Where the credential for a call comes from
enum Credential<'a> {
    /// Caller supplied an `Authorization` header; nothing is injected
    Header,
    PerCall(&'a SecretString),
    Client(&'a SecretString),
    Anonymous,
}

impl<'a> Credential<'a> {
    const fn bearer(&self) -> Option<&'a SecretString> {
        match *self {
            Self::PerCall(credential) | Self::Client(credential) => Some(credential),
            Self::Header | Self::Anonymous => None,
        }
    }

    const fn source(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::PerCall(_) => "per_call",
            Self::Client(_) => "client",
            Self::Anonymous => "none",
        }
    }
}

fn select_credential<'a>(
    headers: &IndexMap<String, String>,
    per_call: Option<&'a SecretString>,
    stored: Option<&'a SecretString>,
) -> Credential<'a> {
    if headers.keys().any(|name| name.eq_ignore_ascii_case(AUTHORIZATION.as_str())) {
        return Credential::Header;
    }

    if let Some(credential) = per_call.filter(|c| is_present(c)) {
        return Credential::PerCall(credential);
    }

    stored
        .filter(|c| is_present(c))
        .map_or(Credential::Anonymous, Credential::Client)
}

/// Pick the credential to send as `Authorization: Bearer …`
///
/// Precedence, highest first: an explicit `Authorization` header (in which
/// case nothing is injected and `None` is returned), the per-call credential,
/// then the client's stored credential. Empty credentials count as absent
pub fn resolve_credential<'a>(
    headers: &IndexMap<String, String>,
    per_call: Option<&'a SecretString>,
    stored: Option<&'a SecretString>,
) -> Option<&'a SecretString> {
    select_credential(headers, per_call, stored).bearer()
}

fn is_present(credential: &SecretString) -> bool {
    !credential.expose_secret().is_empty()
}

// -- Helper functions --

/// Build the endpoint URL for a neuron
///
/// Slugs are appended as percent-encoded path segments after any path the base
/// URL already has. Query flags are only present when set
///
/// # Errors
///
/// Returns `InvalidArgument` for a `.` or `..` slug, which would address a
/// different endpoint, and `Config` if the base URL cannot carry a path
pub fn neuron_url(
    base_url: &Url,
    organization_slug: &str,
    neuron_slug: &str,
    bypass_cache: bool,
    raw_output: bool,
) -> Result<Url> {
    for slug in [organization_slug, neuron_slug] {
        if matches!(slug, "." | "..") {
            return Err(NeuronError::invalid_argument(format!(
                "slug `{slug}` is not a valid path segment, not calling neuron."
            )));
        }
    }

    let mut url = base_url.clone();

    url.path_segments_mut()
        .map_err(|()| NeuronError::Config(format!("base URL cannot carry a path: `{base_url}`")))?
        .pop_if_empty()
        .push(organization_slug)
        .push(neuron_slug);

    if bypass_cache || raw_output {
        let mut query = url.query_pairs_mut();
        if bypass_cache {
            query.append_pair("bypassCache", "true");
        }
        if raw_output {
            query.append_pair("rawOutput", "true");
        }
    }

    Ok(url)
}

/// Assemble request headers; caller headers override the defaults
fn build_headers(extra: &IndexMap<String, String>, bearer: Option<&SecretString>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(credential) = bearer {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", credential.expose_secret()))
            .map_err(|_| NeuronError::invalid_argument("credential is not a valid header value"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    for (name, value) in extra {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| NeuronError::invalid_argument(format!("invalid header name `{name}`: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| NeuronError::invalid_argument(format!("invalid value for header `{name}`: {e}")))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

/// Check an HTTP response for errors
async fn handle_error(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "neuron call failed");

    Err(NeuronError::Remote(parse_error_body(status, &body)))
}

/// Merge an error body with the real HTTP status
///
/// JSON object fields are kept and any `statusCode` in the body is replaced.
/// Bodies that are not JSON objects become the error message
fn parse_error_body(status: StatusCode, body: &str) -> ErrorResponse {
    let fallback = || {
        if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_owned()
        } else {
            body.to_owned()
        }
    };

    let Ok(Value::Object(mut fields)) = serde_json::from_str::<Value>(body) else {
        return ErrorResponse::new(fallback(), status.as_u16());
    };

    fields.remove("statusCode");

    let error = match fields.remove("error") {
        Some(Value::String(message)) => message,
        Some(Value::Object(details)) => details
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| Value::Object(details.clone()).to_string(), str::to_owned),
        Some(_) | None => fallback(),
    };

    ErrorResponse {
        error,
        status_code: status.as_u16(),
        extra: fields,
    }
}

/// Parse a success body into a structured result
async fn decode_response(response: reqwest::Response) -> Result<NeuronResponse> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| NeuronError::Parse(e.to_string()))
}
