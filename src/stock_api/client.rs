//! HTTP client for the remote stock service.
//!
//! Endpoints:
//! - `GET {base}/item/{id}` returns the item as JSON
//! - `POST {base}/low-stock-alert/{id}` records a low-stock alert

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use super::{ApiError, Item, StockApi};

const ITEM_PATH: &str = "/item/";
const ALERT_PATH: &str = "/low-stock-alert/";

/// Client for communicating with the stock service.
#[derive(Clone)]
pub struct HttpStockClient {
    client: Client,
    base_url: String,
}

impl HttpStockClient {
    /// Create a new HttpStockClient.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the stock service (e.g., "http://localhost:8080")
    /// * `timeout_secs` - Request timeout in seconds
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Get the base URL of the stock service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}{}{}", self.base_url, ITEM_PATH, id)
    }

    fn alert_url(&self, id: &str) -> String {
        format!("{}{}{}", self.base_url, ALERT_PATH, id)
    }

    async fn decode_item(response: Response) -> Result<Item, ApiError> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_json(&content_type) {
            return Err(ApiError::InvalidResponse(format!(
                "invalid content type '{}'",
                content_type
            )));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

/// Compare the media type only, parameters such as charset are ignored.
fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|media| media.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

fn error_for_status(status: StatusCode) -> ApiError {
    match status {
        StatusCode::BAD_REQUEST => ApiError::NotFound,
        StatusCode::INTERNAL_SERVER_ERROR => ApiError::ServerFault,
        other => ApiError::UnexpectedStatus(other.as_u16()),
    }
}

#[async_trait]
impl StockApi for HttpStockClient {
    async fn fetch_item(&self, id: &str) -> Result<Item, ApiError> {
        let url = self.item_url(id);
        let response = self.client.get(&url).send().await?;
        debug!("GET {} -> {}", url, response.status());

        match response.status() {
            StatusCode::OK => Self::decode_item(response).await,
            status => Err(error_for_status(status)),
        }
    }

    async fn post_alert(&self, id: &str) -> Result<(), ApiError> {
        let url = self.alert_url(id);
        let response = self.client.post(&url).send().await?;
        debug!("POST {} -> {}", url, response.status());

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => Ok(()),
            status => Err(error_for_status(status)),
        }
    }
}
