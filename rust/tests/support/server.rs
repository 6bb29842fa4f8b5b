use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub at: Instant,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Default)]
struct ServerState {
    requests: Mutex<Vec<RecordedRequest>>,
    // Consumed in order before falling back to the sticky default.
    scripted: Mutex<HashMap<String, VecDeque<(u16, Vec<u8>)>>>,
    defaults: Mutex<HashMap<String, (u16, Vec<u8>)>>,
}

impl ServerState {
    fn next_response(&self, path: &str) -> (u16, Vec<u8>) {
        if let Some(queue) = self.scripted.lock().unwrap().get_mut(path) {
            if let Some(response) = queue.pop_front() {
                return response;
            }
        }
        self.defaults
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or((404, Vec::new()))
    }
}

/// Local HTTP server that answers from a script and records every request.
/// Unscripted paths answer 404.
pub struct MockServer {
    pub url: String,
    state: Arc<ServerState>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockServer {
    pub fn start() -> Self {
        let state = Arc::new(ServerState::default());
        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state_for_server = state.clone();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                addr_tx.send(listener.local_addr().unwrap()).unwrap();
                let app = Router::new()
                    .fallback(record)
                    .with_state(state_for_server);
                let _ = axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await;
            });
        });

        let addr = addr_rx.recv().unwrap();
        Self {
            url: format!("http://{addr}"),
            state,
            shutdown: Some(shutdown_tx),
        }
    }

    /// Queue a one-shot response for `path`.
    pub fn script(&self, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.state
            .scripted
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back((status, body.into()));
    }

    /// Answer every otherwise unscripted request to `path` with this response.
    pub fn set_default(&self, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.state
            .defaults
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.into()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn record(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Vec<u8>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: header("authorization"),
        content_type: header("content-type"),
        body: body.to_vec(),
        at: Instant::now(),
    });
    let (status, body) = state.next_response(&path);
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        body,
    )
}
