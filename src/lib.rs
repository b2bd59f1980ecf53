//! Stock Watcher Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod source;
pub mod stock_api;
pub mod worker;

// Re-export commonly used types for convenience
pub use stock_api::{ApiError, HttpStockClient, Item, StockApi};
pub use worker::{Worker, WorkerError, WorkerSettings, WorkerState};
