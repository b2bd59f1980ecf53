//! Client side of the remote stock service.
//!
//! The worker only sees the [`StockApi`] trait; [`HttpStockClient`] is the
//! production implementation talking HTTP/JSON.

mod client;
mod error;
mod models;

pub use client::HttpStockClient;
pub use error::ApiError;
pub use models::Item;

use async_trait::async_trait;

/// Operations the worker needs from the stock service.
#[async_trait]
pub trait StockApi: Send + Sync {
    /// Fetch the current stock record for an identifier.
    async fn fetch_item(&self, id: &str) -> Result<Item, ApiError>;

    /// Report that an item is running low.
    async fn post_alert(&self, id: &str) -> Result<(), ApiError>;
}
