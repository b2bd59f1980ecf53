//! Common test infrastructure
//!
//! Provides a mock stock service that end-to-end tests point the real
//! client and worker at. Tests should only import from this module.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{MockItem, MockStockService, ITEM_A};
//!
//! #[tokio::test]
//! async fn test_fetch() {
//!     let service = MockStockService::spawn(vec![(ITEM_A, MockItem::stock(10))]).await;
//!     assert_eq!(service.gets(), 0);
//! }
//! ```

mod server;

pub use constants::*;
pub use server::{MockItem, MockStockService};
