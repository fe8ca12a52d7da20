#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};

/// One request as seen by the fake server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

type Responder = Arc<dyn Fn(&Recorded) -> (StatusCode, String) + Send + Sync>;

#[derive(Clone)]
struct FakeState {
    calls: Arc<Mutex<Vec<Recorded>>>,
    respond: Responder,
}

pub struct FakeServer {
    pub base: String,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeServer {
    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }
}

/// Start a catch-all HTTP server on an ephemeral port that records every
/// request and answers with `respond`.
pub async fn spawn_fake<F>(respond: F) -> FakeServer
where
    F: Fn(&Recorded) -> (StatusCode, String) + Send + Sync + 'static,
{
    let calls = Arc::new(Mutex::new(Vec::new()));
    let state = FakeState {
        calls: calls.clone(),
        respond: Arc::new(respond),
    };
    let app = Router::new().fallback(record).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeServer {
        base: format!("http://{addr}"),
        calls,
    }
}

async fn record(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let recorded = Recorded {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header("authorization"),
        content_type: header("content-type"),
        body,
    };
    let reply = (state.respond)(&recorded);
    state.calls.lock().unwrap().push(recorded);
    reply
}
