//! Resilience primitives: failure classification lives on
//! [`crate::errors::CatalogError`]; retry orchestration lives here.

mod retry;

pub use retry::{RetryConfig, RetryExecutor};
