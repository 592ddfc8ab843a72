/// Client and display state for the remote compile endpoint.
///
/// `POST {endpoint}` with `{"code": ...}`; a 2xx reply carries `{"output", "error"}`,
/// a failure reply may carry `{"error"}`. Every submission ends in exactly one of:
/// completed (output and/or program error), timed out, or failed.
///
/// Requests are never retried. Concurrent submissions are not queued or cancelled;
/// which response ends up displayed is decided by [`ResponseOrdering`].
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

pub const NO_OUTPUT_MESSAGE: &str = "Program ran successfully but produced no output.";
pub const TIMEOUT_MESSAGE: &str =
    "Compilation timed out. Please check your code for infinite loops or excessive resource usage.";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

const MAX_ERROR_BODY_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct CompileRequest<'a> {
    pub code: &'a str,
}

/// Successful reply. Missing fields read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CompileResponse {
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Deserialize)]
struct CompileErrorBody {
    error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("compile request timed out after {0:?}")]
    Timeout(Duration),

    #[error("compile request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("compile endpoint returned status={status}")]
    Upstream {
        status: StatusCode,
        /// `error` field of the JSON body, when the body had one.
        message: Option<String>,
    },
}

impl CompileError {
    fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Request(e)
        }
    }
}

#[derive(Clone, Debug)]
pub struct CompileClient {
    endpoint: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl CompileClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CompileError> {
        let http = reqwest::Client::builder()
            .user_agent("catpp-site/compile")
            .build()
            .map_err(CompileError::Request)?;
        Ok(Self {
            endpoint: endpoint.into(),
            timeout,
            http,
        })
    }

    /// Send one compile request. The timeout covers connect, send and body read.
    pub async fn compile(&self, code: &str) -> Result<CompileResponse, CompileError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&CompileRequest { code })
            .send()
            .await
            .map_err(|e| CompileError::from_reqwest(e, self.timeout))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<CompileResponse>()
                .await
                .map_err(|e| CompileError::from_reqwest(e, self.timeout));
        }

        let body = read_limited_text(resp, MAX_ERROR_BODY_BYTES).await;
        let message = serde_json::from_str::<CompileErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.is_empty());
        Err(CompileError::Upstream { status, message })
    }
}

/// Read at most `max_bytes` of the body, chunk by chunk.
async fn read_limited_text(mut resp: reqwest::Response, max_bytes: usize) -> String {
    let mut buf = Vec::new();
    while buf.len() < max_bytes {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(max_bytes - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read compile error body");
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

// --- Display state ---

/// What the result region shows. Exactly one variant applies at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultView<'a> {
    Idle,
    Loading,
    /// Program ran; either side may be empty but not both.
    Completed { output: &'a str, error: &'a str },
    /// Request failed; `timed_out` distinguishes the infinite-loop case.
    Failed { message: &'a str, timed_out: bool },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileState {
    pub source_code: String,
    pub output: String,
    pub error_message: String,
    pub is_loading: bool,
    pub did_timeout: bool,
    settled: bool,
    failed: bool,
}

impl CompileState {
    pub fn view(&self) -> ResultView<'_> {
        if self.is_loading {
            ResultView::Loading
        } else if !self.settled {
            ResultView::Idle
        } else if self.failed {
            ResultView::Failed {
                message: &self.error_message,
                timed_out: self.did_timeout,
            }
        } else {
            ResultView::Completed {
                output: &self.output,
                error: &self.error_message,
            }
        }
    }

    fn begin(&mut self, code: &str) {
        self.source_code = code.to_string();
        self.is_loading = true;
        self.did_timeout = false;
    }

    /// Overwrite the visible result with `outcome` and end loading.
    fn settle(&mut self, outcome: Result<CompileResponse, CompileError>) {
        self.settled = true;
        self.is_loading = false;
        self.did_timeout = matches!(outcome, Err(CompileError::Timeout(_)));
        match outcome {
            Ok(CompileResponse { output, error }) => {
                self.failed = false;
                self.output = if output.is_empty() && error.is_empty() {
                    NO_OUTPUT_MESSAGE.to_string()
                } else {
                    output
                };
                self.error_message = error;
            }
            Err(CompileError::Timeout(_)) => {
                self.failed = true;
                self.output.clear();
                self.error_message = TIMEOUT_MESSAGE.to_string();
            }
            Err(CompileError::Upstream {
                message: Some(message),
                ..
            }) => {
                self.failed = true;
                self.output.clear();
                self.error_message = message;
            }
            Err(_) => {
                self.failed = true;
                self.output.clear();
                self.error_message = UNKNOWN_ERROR_MESSAGE.to_string();
            }
        }
    }
}

/// How to reconcile overlapping submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseOrdering {
    /// Every response is applied as it settles; the last one to arrive wins.
    #[default]
    LastSettled,
    /// Responses to superseded submissions are dropped (sequence numbers).
    LatestRequest,
}

/// Drives submissions and owns the shared display state.
#[derive(Clone)]
pub struct CompileController {
    client: Arc<CompileClient>,
    ordering: ResponseOrdering,
    state: Arc<Mutex<CompileState>>,
    seq: Arc<AtomicU64>,
}

impl CompileController {
    pub fn new(client: Arc<CompileClient>, ordering: ResponseOrdering) -> Self {
        Self {
            client,
            ordering,
            state: Arc::new(Mutex::new(CompileState::default())),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn snapshot(&self) -> CompileState {
        self.state.lock().await.clone()
    }

    /// Submit `code` and wait for it to settle. Empty code is sent as-is.
    ///
    /// The lock is not held across the request, so other submissions and
    /// snapshots proceed while this one is in flight.
    pub async fn submit(&self, code: &str) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.lock().await.begin(code);
        debug!(seq, bytes = code.len(), "compile submitted");

        let outcome = self.client.compile(code).await;
        match &outcome {
            Ok(resp) => info!(
                seq,
                output_bytes = resp.output.len(),
                program_error = !resp.error.is_empty(),
                "compile completed"
            ),
            Err(e) => warn!(seq, error = %e, "compile failed"),
        }

        if self.ordering == ResponseOrdering::LatestRequest
            && self.seq.load(Ordering::SeqCst) != seq
        {
            debug!(seq, "dropping response to superseded submission");
            return;
        }
        self.state.lock().await.settle(outcome);
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{http::StatusCode as AxumStatus, routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;

    /// Mock compile backend. The code selects the behaviour:
    /// `sleep:<ms>:<text>` delays then echoes `<text>` as output.
    async fn spawn_backend() -> SocketAddr {
        async fn handler(Json(body): Json<Value>) -> (AxumStatus, Json<Value>) {
            let code = body["code"].as_str().unwrap_or_default().to_string();
            if let Some(rest) = code.strip_prefix("sleep:") {
                let (ms, text) = rest.split_once(':').unwrap();
                tokio::time::sleep(Duration::from_millis(ms.parse().unwrap())).await;
                return (AxumStatus::OK, Json(json!({"output": text, "error": ""})));
            }
            match code.as_str() {
                "silent" => (AxumStatus::OK, Json(json!({"output": "", "error": ""}))),
                "partial" => (
                    AxumStatus::OK,
                    Json(json!({"output": "1\n2\n", "error": "segmentation fault"})),
                ),
                "missing-fields" => (AxumStatus::OK, Json(json!({}))),
                "server-error" => (
                    AxumStatus::BAD_REQUEST,
                    Json(json!({"error": "g++: error: expected ';'"})),
                ),
                "bare-500" => (AxumStatus::INTERNAL_SERVER_ERROR, Json(json!({"detail": "x"}))),
                other => (AxumStatus::OK, Json(json!({"output": other, "error": ""}))),
            }
        }

        let app = Router::new()
            .route("/api/compile", post(handler))
            .route("/bad-json", post(|| async { "not json" }))
            .route(
                "/big-error",
                post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "x".repeat(64 * 1024)) }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    fn controller(addr: SocketAddr, timeout: Duration, ordering: ResponseOrdering) -> CompileController {
        let client = CompileClient::new(format!("http://{addr}/api/compile"), timeout).unwrap();
        CompileController::new(Arc::new(client), ordering)
    }

    #[tokio::test]
    async fn test_initial_state_is_idle() {
        let addr = spawn_backend().await;
        let c = controller(addr, DEFAULT_TIMEOUT, ResponseOrdering::default());
        assert_eq!(c.snapshot().await.view(), ResultView::Idle);
    }

    #[tokio::test]
    async fn test_output_is_displayed() {
        let addr = spawn_backend().await;
        let c = controller(addr, DEFAULT_TIMEOUT, ResponseOrdering::default());
        c.submit("Meow, world!").await;
        let state = c.snapshot().await;
        assert_eq!(
            state.view(),
            ResultView::Completed {
                output: "Meow, world!",
                error: ""
            }
        );
        assert_eq!(state.source_code, "Meow, world!");
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_empty_result_shows_no_output_message() {
        let addr = spawn_backend().await;
        let c = controller(addr, DEFAULT_TIMEOUT, ResponseOrdering::default());
        c.submit("silent").await;
        let state = c.snapshot().await;
        assert_eq!(state.output, NO_OUTPUT_MESSAGE);
        assert_eq!(state.error_message, "");
        assert!(!state.did_timeout);
    }

    #[tokio::test]
    async fn test_missing_fields_read_as_empty() {
        let addr = spawn_backend().await;
        let c = controller(addr, DEFAULT_TIMEOUT, ResponseOrdering::default());
        c.submit("missing-fields").await;
        assert_eq!(c.snapshot().await.output, NO_OUTPUT_MESSAGE);
    }

    #[tokio::test]
    async fn test_partial_output_and_program_error_both_shown() {
        let addr = spawn_backend().await;
        let c = controller(addr, DEFAULT_TIMEOUT, ResponseOrdering::default());
        c.submit("partial").await;
        assert_eq!(
            c.snapshot().await.view(),
            ResultView::Completed {
                output: "1\n2\n",
                error: "segmentation fault"
            }
        );
    }

    #[tokio::test]
    async fn test_timeout_sets_flag_and_clears_output() {
        let addr = spawn_backend().await;
        let c = controller(addr, Duration::from_millis(100), ResponseOrdering::default());
        c.submit("hello").await;
        assert_eq!(c.snapshot().await.output, "hello");

        c.submit("sleep:1000:late").await;
        let state = c.snapshot().await;
        assert!(state.did_timeout);
        assert!(!state.is_loading);
        assert_eq!(state.output, "");
        assert!(state.error_message.contains("timed out"));
        assert!(state.error_message.contains("infinite loops"));

        c.submit("hello again").await;
        let state = c.snapshot().await;
        assert!(!state.did_timeout);
        assert_eq!(state.output, "hello again");
    }

    #[tokio::test]
    async fn test_server_supplied_error_message() {
        let addr = spawn_backend().await;
        let c = controller(addr, DEFAULT_TIMEOUT, ResponseOrdering::default());
        c.submit("hello").await;
        c.submit("server-error").await;
        let state = c.snapshot().await;
        assert_eq!(
            state.view(),
            ResultView::Failed {
                message: "g++: error: expected ';'",
                timed_out: false
            }
        );
        assert_eq!(state.output, "");
    }

    #[tokio::test]
    async fn test_unknown_error_without_message() {
        let addr = spawn_backend().await;
        let c = controller(addr, DEFAULT_TIMEOUT, ResponseOrdering::default());
        c.submit("bare-500").await;
        assert_eq!(c.snapshot().await.error_message, UNKNOWN_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unknown_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let c = controller(addr, DEFAULT_TIMEOUT, ResponseOrdering::default());
        c.submit("int main() {}").await;
        let state = c.snapshot().await;
        assert_eq!(state.error_message, UNKNOWN_ERROR_MESSAGE);
        assert!(!state.did_timeout);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_unknown_error() {
        let addr = spawn_backend().await;
        let client = CompileClient::new(format!("http://{addr}/bad-json"), DEFAULT_TIMEOUT).unwrap();
        let c = CompileController::new(Arc::new(client), ResponseOrdering::default());
        c.submit("x").await;
        assert_eq!(c.snapshot().await.error_message, UNKNOWN_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_loading_while_in_flight() {
        let addr = spawn_backend().await;
        let c = controller(addr, DEFAULT_TIMEOUT, ResponseOrdering::default());
        let in_flight = {
            let c = c.clone();
            tokio::spawn(async move { c.submit("sleep:300:done").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(c.snapshot().await.view(), ResultView::Loading);
        in_flight.await.unwrap();
        assert_eq!(c.snapshot().await.output, "done");
    }

    #[tokio::test]
    async fn test_last_settled_response_wins() {
        let addr = spawn_backend().await;
        let c = controller(addr, DEFAULT_TIMEOUT, ResponseOrdering::LastSettled);
        let first = c.submit("sleep:400:first");
        let second = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            c.submit("sleep:10:second").await
        };
        tokio::join!(first, second);
        let state = c.snapshot().await;
        assert_eq!(state.output, "first");
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_success_settling_after_timeout_clears_flag() {
        let addr = spawn_backend().await;
        let c = controller(addr, Duration::from_millis(200), ResponseOrdering::LastSettled);
        let first = c.submit("sleep:1000:never");
        let second = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            c.submit("sleep:150:second").await
        };
        tokio::join!(first, second);
        let state = c.snapshot().await;
        assert!(!state.did_timeout);
        assert_eq!(
            state.view(),
            ResultView::Completed {
                output: "second",
                error: ""
            }
        );
    }

    #[tokio::test]
    async fn test_error_body_read_is_capped() {
        let addr = spawn_backend().await;
        let resp = reqwest::Client::new()
            .post(format!("http://{addr}/big-error"))
            .send()
            .await
            .unwrap();
        let body = read_limited_text(resp, 1024).await;
        assert_eq!(body.len(), 1024);
        assert!(body.bytes().all(|b| b == b'x'));
    }

    #[tokio::test]
    async fn test_latest_request_drops_stale_response() {
        let addr = spawn_backend().await;
        let c = controller(addr, DEFAULT_TIMEOUT, ResponseOrdering::LatestRequest);
        let first = c.submit("sleep:400:first");
        let second = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            c.submit("sleep:10:second").await
        };
        tokio::join!(first, second);
        assert_eq!(c.snapshot().await.output, "second");
    }
}
