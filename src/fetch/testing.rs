//! Local axum server for exercising the client in tests.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const STATUS_PATH: &str = "/datasets/data-status";

/// A response served for every request.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub body: String,
}

impl CannedResponse {
    pub fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

impl IntoResponse for CannedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, "application/json")], self.body).into_response()
    }
}

#[derive(Clone)]
struct ServerState {
    hits: Arc<AtomicUsize>,
    /// `None` makes the handler hang instead of answering.
    response: Arc<Mutex<Option<CannedResponse>>>,
}

async fn data_status(State(state): State<ServerState>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let canned = state.response.lock().unwrap().clone();
    match canned {
        Some(canned) => canned.into_response(),
        None => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}

/// Serves canned responses on 127.0.0.1 and counts requests.
pub struct TestServer {
    addr: std::net::SocketAddr,
    state: ServerState,
}

impl TestServer {
    pub async fn start(response: CannedResponse) -> Self {
        Self::spawn(Some(response)).await
    }

    /// Accepts requests but never answers in time.
    pub async fn start_silent() -> Self {
        Self::spawn(None).await
    }

    async fn spawn(response: Option<CannedResponse>) -> Self {
        let state = ServerState {
            hits: Arc::new(AtomicUsize::new(0)),
            response: Arc::new(Mutex::new(response)),
        };

        let app = Router::new()
            .route(STATUS_PATH, get(data_status))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, STATUS_PATH)
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// Change what later requests receive.
    pub fn respond_with(&self, response: CannedResponse) {
        *self.state.response.lock().unwrap() = Some(response);
    }
}
