//! Mock neuron platform for integration tests
//!
//! Records every invocation and answers with a configurable reply. By default
//! it echoes the input back as `{"output": <input>, "fromCache": false}`

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::{Router, routing};
use tokio_util::sync::CancellationToken;

/// How long `wait_for_requests` waits before giving up
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// A request received by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub organization: String,
    pub neuron: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    /// Value of the `Authorization` header, if any
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }

    /// Value of any header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Request body parsed as JSON
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

/// Canned reply returned for every request
#[derive(Debug, Clone)]
struct Reply {
    status: StatusCode,
    content_type: &'static str,
    body: String,
}

/// Builder for a [`MockNeuron`]
pub struct MockNeuronBuilder {
    reply: Option<Reply>,
    delayed_requests: u32,
    delay: Duration,
}

impl MockNeuronBuilder {
    /// Reply with a JSON body
    pub fn json(mut self, status: u16, body: serde_json::Value) -> Self {
        self.reply = Some(Reply {
            status: StatusCode::from_u16(status).expect("valid status"),
            content_type: "application/json",
            body: body.to_string(),
        });
        self
    }

    /// Reply with a plain-text body
    pub fn text(mut self, status: u16, body: &str) -> Self {
        self.reply = Some(Reply {
            status: StatusCode::from_u16(status).expect("valid status"),
            content_type: "text/plain; charset=utf-8",
            body: body.to_owned(),
        });
        self
    }

    /// Hold the first `n` replies for `delay`
    pub const fn delay_first(mut self, n: u32, delay: Duration) -> Self {
        self.delayed_requests = n;
        self.delay = delay;
        self
    }

    /// Start the mock server, returning immediately
    pub async fn start(self) -> anyhow::Result<MockNeuron> {
        let state = Arc::new(MockState {
            requests: Mutex::new(Vec::new()),
            reply: self.reply,
            delayed_requests: AtomicU32::new(self.delayed_requests),
            delay: self.delay,
        });

        let app = Router::new()
            .route("/{organization}/{neuron}", routing::post(handle_invoke))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(MockNeuron { addr, shutdown, state })
    }
}

/// Mock neuron platform bound to a random local port
pub struct MockNeuron {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    requests: Mutex<Vec<RecordedRequest>>,
    /// Echo the input when unset
    reply: Option<Reply>,
    delayed_requests: AtomicU32,
    delay: Duration,
}

impl MockNeuron {
    /// Configure a mock before starting it
    pub fn builder() -> MockNeuronBuilder {
        MockNeuronBuilder {
            reply: None,
            delayed_requests: 0,
            delay: Duration::ZERO,
        }
    }

    /// Start an echoing mock
    pub async fn start() -> anyhow::Result<Self> {
        Self::builder().start().await
    }

    /// Base URL for configuring the client
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    /// The only request received; panics otherwise
    pub fn single_request(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.into_iter().next().unwrap()
    }

    /// Wait until at least `n` requests have arrived
    pub async fn wait_for_requests(&self, n: usize) {
        tokio::time::timeout(WAIT_TIMEOUT, async {
            while self.request_count() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("mock did not receive enough requests in time");
    }
}

impl Drop for MockNeuron {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_invoke(
    State(state): State<Arc<MockState>>,
    Path((organization, neuron)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push(RecordedRequest {
        organization,
        neuron,
        query,
        headers,
        body: body.clone(),
    });

    let delayed = state
        .delayed_requests
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if delayed {
        tokio::time::sleep(state.delay).await;
    }

    let reply = state.reply.clone().unwrap_or_else(|| echo(&body));

    (reply.status, [(header::CONTENT_TYPE, reply.content_type)], reply.body)
}

fn echo(body: &str) -> Reply {
    let input = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["input"].as_str().map(str::to_owned))
        .unwrap_or_default();

    Reply {
        status: StatusCode::OK,
        content_type: "application/json",
        body: serde_json::json!({ "output": input, "fromCache": false }).to_string(),
    }
}
