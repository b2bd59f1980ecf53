//! Mock stock service lifecycle management
//!
//! Each test gets its own service on a random port with its own item table.

#![allow(dead_code)]

use super::constants::*;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// How the mock answers for one identifier.
#[derive(Debug, Clone)]
pub struct MockItem {
    pub quantity: i64,
    /// Identifier to put in the response instead of the requested one
    pub echo: Option<String>,
    /// Status for `GET /item/{id}` instead of 200
    pub get_status: Option<u16>,
    /// Status for `POST /low-stock-alert/{id}` instead of 201
    pub alert_status: Option<u16>,
    pub content_type: &'static str,
    /// Adds a field the client does not know about
    pub extra_field: bool,
}

impl MockItem {
    pub fn stock(quantity: i64) -> Self {
        Self {
            quantity,
            echo: None,
            get_status: None,
            alert_status: None,
            content_type: "application/json",
            extra_field: false,
        }
    }

    pub fn echo(mut self, uuid: &str) -> Self {
        self.echo = Some(uuid.to_string());
        self
    }

    pub fn get_status(mut self, status: u16) -> Self {
        self.get_status = Some(status);
        self
    }

    pub fn alert_status(mut self, status: u16) -> Self {
        self.alert_status = Some(status);
        self
    }

    pub fn content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn extra_field(mut self) -> Self {
        self.extra_field = true;
        self
    }
}

#[derive(Default)]
struct MockState {
    items: HashMap<String, MockItem>,
    files: HashMap<String, String>,
    gets: AtomicUsize,
    alerts: Mutex<Vec<String>>,
}

/// Mock stock service instance.
///
/// When dropped, the server is shut down.
pub struct MockStockService {
    /// Base URL for the client (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    state: Arc<MockState>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockStockService {
    /// Spawns a mock service knowing `items`. Any other identifier answers 400.
    pub async fn spawn(items: Vec<(&str, MockItem)>) -> Self {
        Self::spawn_with_files(items, Vec::new()).await
    }

    /// Like [`MockStockService::spawn`], also serving `GET /files/{name}`.
    pub async fn spawn_with_files(items: Vec<(&str, MockItem)>, files: Vec<(&str, &str)>) -> Self {
        let state = Arc::new(MockState {
            items: items
                .into_iter()
                .map(|(id, item)| (id.to_string(), item))
                .collect(),
            files: files
                .into_iter()
                .map(|(name, body)| (name.to_string(), body.to_string()))
                .collect(),
            ..Default::default()
        });

        let app = Router::new()
            .route("/item/{uuid}", get(get_item))
            .route("/low-stock-alert/{uuid}", post(post_alert))
            .route("/files/{name}", get(get_file))
            .route("/health", get(|| async { "ok" }))
            .with_state(Arc::clone(&state));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let service = Self {
            base_url,
            state,
            _shutdown_tx: Some(shutdown_tx),
        };
        service.wait_for_ready().await;
        service
    }

    /// Number of `GET /item/{id}` requests received.
    pub fn gets(&self) -> usize {
        self.state.gets.load(Ordering::SeqCst)
    }

    /// Identifiers of every alert received, in arrival order.
    pub fn alerts(&self) -> Vec<String> {
        self.state.alerts.lock().unwrap().clone()
    }

    pub fn file_url(&self, name: &str) -> String {
        format!("{}/files/{}", self.base_url, name)
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Mock service did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/health", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for MockStockService {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).expect("Invalid status code in test setup")
}

async fn get_item(State(state): State<Arc<MockState>>, Path(uuid): Path<String>) -> Response {
    state.gets.fetch_add(1, Ordering::SeqCst);

    let Some(item) = state.items.get(&uuid) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if let Some(code) = item.get_status {
        return status(code).into_response();
    }

    let mut body = json!({
        "uuid": item.echo.clone().unwrap_or(uuid),
        "name": "Widget",
        "quantity": item.quantity,
    });
    if item.extra_field {
        body["price"] = json!(10);
    }
    ([(header::CONTENT_TYPE, item.content_type)], body.to_string()).into_response()
}

async fn post_alert(State(state): State<Arc<MockState>>, Path(uuid): Path<String>) -> Response {
    state.alerts.lock().unwrap().push(uuid.clone());

    match state.items.get(&uuid) {
        None => StatusCode::BAD_REQUEST.into_response(),
        Some(item) => status(item.alert_status.unwrap_or(201)).into_response(),
    }
}

async fn get_file(State(state): State<Arc<MockState>>, Path(name): Path<String>) -> Response {
    match state.files.get(&name) {
        Some(body) => ([(header::CONTENT_TYPE, "text/plain")], body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
