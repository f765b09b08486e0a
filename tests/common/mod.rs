//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
    Router,
};
use request_validator::{AppConfig, ValidatedRequest, ValidationError, ValidationServer};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceExt;

/// What an enclosing error-handling layer observed on a rejected response.
#[derive(Clone, Default)]
pub struct Captured {
    pub error: Arc<Mutex<Option<ValidationError>>>,
    pub partial: Arc<Mutex<Option<ValidatedRequest>>>,
}

#[allow(dead_code)]
impl Captured {
    pub fn error(&self) -> Option<ValidationError> {
        self.error.lock().unwrap().clone()
    }

    pub fn partial(&self) -> Option<ValidatedRequest> {
        self.partial.lock().unwrap().clone()
    }
}

/// Outer middleware recording the rejection carried by the response.
#[allow(dead_code)]
pub async fn capture_errors(State(captured): State<Captured>, request: Request<Body>, next: Next) -> Response {
    let response = next.run(request).await;
    if let Some(err) = response.extensions().get::<ValidationError>() {
        *captured.error.lock().unwrap() = Some(err.clone());
    }
    if let Some(partial) = response.extensions().get::<ValidatedRequest>() {
        *captured.partial.lock().unwrap() = Some(partial.clone());
    }
    response
}

/// Send a request through the router in-process.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Start the config-built server on an ephemeral port.
#[allow(dead_code)]
pub async fn start_server(config: AppConfig) -> (SocketAddr, oneshot::Sender<()>) {
    let server = ValidationServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let _ = server
            .run_until(listener, async {
                let _ = rx.await;
            })
            .await;
    });

    (addr, tx)
}
