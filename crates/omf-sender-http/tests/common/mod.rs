// crates/omf-sender-http/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: In-process HTTP mocks for OMF, discovery, and token endpoints.
// Purpose: Record requests and script responses for transport tests.
// Dependencies: omf-sender-core, flate2, serde_json, tiny_http
// ============================================================================

//! ## Overview
//! [`MockServer`] runs a `tiny_http` server on `127.0.0.1:0`, records every
//! request, and answers through a handler closure. [`OmfEndpoint`] is a
//! stateful handler that behaves like an OMF ingress (409 on re-create, 404
//! for unknown references, `GET .../streams/{id}` lookups).

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]
#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::io::Read;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use flate2::read::GzDecoder;
use omf_sender_core::ClientCredentials;
use omf_sender_core::Destination;
use omf_sender_core::DestinationFamily;
use omf_sender_core::DestinationSettings;
use omf_sender_core::Secret;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Requests and Responses
// ============================================================================

/// Request captured by the mock server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Request path and query.
    pub url: String,
    /// Headers with lowercased names.
    pub headers: Vec<(String, String)>,
    /// Raw request body.
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Returns the first header value with `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the body as text, gunzipped when `compression: gzip` is set.
    pub fn body_text(&self) -> String {
        let mut text = String::new();
        if self.header("compression") == Some("gzip") {
            GzDecoder::new(self.body.as_slice()).read_to_string(&mut text).unwrap();
        } else {
            text = String::from_utf8(self.body.clone()).unwrap();
        }
        text
    }

    /// Parses the (possibly gzipped) body as JSON.
    pub fn json_body(&self) -> Value {
        serde_json::from_str(&self.body_text()).unwrap()
    }

    /// Returns the request path without query.
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }
}

/// Scripted response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Delay before responding.
    pub delay: Duration,
}

impl MockResponse {
    /// Empty response with `status`.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    /// JSON response with `status`.
    pub fn json(status: u16, value: &Value) -> Self {
        Self {
            status,
            body: value.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Text response with `status`.
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Delays the response.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

// ============================================================================
// SECTION: Mock Server
// ============================================================================

/// In-process HTTP server that records requests.
pub struct MockServer {
    /// Base URL (`http://127.0.0.1:<port>`).
    url: String,
    /// Requests in arrival order.
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Stop signal for the accept loop.
    stop: Arc<AtomicBool>,
    /// Accept loop thread.
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    /// Starts a server; `handler` receives the base URL and each request.
    pub fn start<F>(mut handler: F) -> Self
    where
        F: FnMut(&str, &RecordedRequest) -> MockResponse + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let url = format!("http://{addr}");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let thread_url = url.clone();
        let thread_requests = Arc::clone(&requests);
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                let mut request = match server.recv_timeout(Duration::from_millis(20)) {
                    Ok(Some(request)) => request,
                    Ok(None) => continue,
                    Err(_) => break,
                };
                let mut body = Vec::new();
                let _ = request.as_reader().read_to_end(&mut body);
                let recorded = RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|header| {
                            let field = header.field.to_string().to_ascii_lowercase();
                            (field, header.value.to_string())
                        })
                        .collect(),
                    body,
                };
                let reply = handler(&thread_url, &recorded);
                thread_requests.lock().unwrap().push(recorded);
                if !reply.delay.is_zero() {
                    thread::sleep(reply.delay);
                }
                let response = Response::from_string(reply.body)
                    .with_status_code(reply.status)
                    .with_header(Header::from_bytes("Content-Type", "application/json").unwrap());
                let _ = request.respond(response);
            }
        });
        Self {
            url,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    /// Returns the base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Counts requests with `method` whose path ends with `suffix`.
    pub fn count(&self, method: &str, suffix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == method && request.path().ends_with(suffix))
            .count()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ============================================================================
// SECTION: OAuth Routes
// ============================================================================

/// Token endpoint path used by [`oauth_response`].
pub const TOKEN_PATH: &str = "/identity/connect/token";

/// Answers discovery and token requests; returns `None` for other paths.
pub fn oauth_response(
    base: &str,
    request: &RecordedRequest,
    expires_in: u64,
) -> Option<MockResponse> {
    match (request.method.as_str(), request.path()) {
        ("GET", "/identity/.well-known/openid-configuration") => Some(MockResponse::json(
            200,
            &json!({"token_endpoint": format!("{base}{TOKEN_PATH}")}),
        )),
        ("POST", TOKEN_PATH) => Some(MockResponse::json(
            200,
            &json!({"access_token": "token-abc", "expires_in": expires_in, "token_type": "Bearer"}),
        )),
        _ => None,
    }
}

/// Builds a cloud destination rooted at `root`.
pub fn cloud_destination(name: &str, root: &str) -> Destination {
    let family = DestinationFamily::Cloud {
        tenant_id: "tenant".to_string(),
        namespace_id: "space".to_string(),
        credentials: ClientCredentials {
            client_id: "client-1".to_string(),
            client_secret: Secret::new("secret-1"),
        },
    };
    Destination::resolve(DestinationSettings::new(name, family, root)).unwrap()
}

/// Builds an edge destination rooted at `root`.
pub fn edge_destination(name: &str, root: &str) -> Destination {
    Destination::resolve(DestinationSettings::new(name, DestinationFamily::Edge, root)).unwrap()
}

// ============================================================================
// SECTION: Stateful OMF Endpoint
// ============================================================================

/// Entities held by a simulated OMF ingress.
#[derive(Debug, Default)]
pub struct OmfEndpoint {
    /// Created type ids.
    pub types: BTreeSet<String>,
    /// Created container ids mapped to their type id.
    pub containers: BTreeMap<String, String>,
    /// Accepted data records per container.
    pub data: BTreeMap<String, Vec<Value>>,
}

impl OmfEndpoint {
    /// Handles one request against the simulated state.
    pub fn handle(&mut self, request: &RecordedRequest) -> MockResponse {
        if request.method == "GET" {
            return self.lookup(request.path());
        }
        if !request.path().ends_with("/omf") {
            return MockResponse::status(404);
        }
        let kind = request.header("messagetype").unwrap_or_default().to_string();
        let action = request.header("action").unwrap_or_default().to_string();
        let body = request.json_body();
        let Some(message) = body.as_array().and_then(|items| items.first()) else {
            return MockResponse::text(400, "body must be a json array");
        };
        let id = message.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
        match (kind.as_str(), action.as_str()) {
            ("type", "create") => Self::created(self.types.insert(id)),
            ("type", "delete") => Self::deleted(self.types.remove(&id)),
            ("container", "create") => {
                let type_id =
                    message.get("typeid").and_then(Value::as_str).unwrap_or_default().to_string();
                if !self.types.contains(&type_id) {
                    return MockResponse::text(400, "container references unknown type");
                }
                Self::created(self.containers.insert(id, type_id).is_none())
            }
            ("container", "delete") => {
                self.data.remove(&id);
                Self::deleted(self.containers.remove(&id).is_some())
            }
            ("data", "create") => {
                let container =
                    message.get("containerid").and_then(Value::as_str).unwrap_or_default();
                if !self.containers.contains_key(container) {
                    return MockResponse::text(404, "data references unknown container");
                }
                self.data.entry(container.to_string()).or_default().push(message.clone());
                MockResponse::status(204)
            }
            _ => MockResponse::text(400, "unsupported message"),
        }
    }

    /// Answers `GET .../streams/{id}`.
    fn lookup(&self, path: &str) -> MockResponse {
        let Some((_, id)) = path.rsplit_once("/streams/") else {
            return MockResponse::status(404);
        };
        if self.containers.contains_key(id) {
            MockResponse::json(200, &json!({"Id": id}))
        } else {
            MockResponse::status(404)
        }
    }

    /// 201 for new entities, 409 for existing ones.
    fn created(new: bool) -> MockResponse {
        MockResponse::status(if new { 201 } else { 409 })
    }

    /// 204 when deleted, 404 when absent.
    fn deleted(existed: bool) -> MockResponse {
        MockResponse::status(if existed { 204 } else { 404 })
    }
}

/// Starts a server backed by a shared [`OmfEndpoint`].
pub fn start_omf_endpoint() -> (MockServer, Arc<Mutex<OmfEndpoint>>) {
    let state = Arc::new(Mutex::new(OmfEndpoint::default()));
    let handler_state = Arc::clone(&state);
    let server =
        MockServer::start(move |_, request| handler_state.lock().unwrap().handle(request));
    (server, state)
}
