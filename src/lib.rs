//! Resilient async client for a catalog REST API.
//!
//! This crate provides the plumbing for talking to a remote catalog
//! service reliably:
//!
//! - **Retries** — every request is wrapped in a [`RetryExecutor`]
//!   that classifies failures and backs off exponentially on the
//!   transient ones (429, 500/502/503/504, network faults).
//! - **Pagination** — [`Paginator`] walks offset- or cursor-addressed
//!   listing endpoints lazily, one page in memory at a time.
//! - **Bulk operations** — [`BatchProcessor`] runs an async operation
//!   over a large input set in chunks, sequentially or with bounded
//!   concurrency, with configurable error policies, progress callbacks
//!   and cooperative cancellation.
//! - **Caching** — [`MetadataCache`] memoizes (category, name) to
//!   identifier lookups with a TTL; [`TimedMemo`] does the same for
//!   arbitrary keys.
//!
//! # Example
//!
//! ```rust,no_run
//! use integrations_catalog::{CatalogClient, CatalogConfig};
//! use secrecy::SecretString;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CatalogConfig::builder()
//!     .base_url("https://catalog.example.com")
//!     .username("svc-user")
//!     .password(SecretString::new("hunter2".to_string()))
//!     .build()?;
//!
//! let client = CatalogClient::new(config)?;
//!
//! let assets = client.paginate("/assets", 100).collect().await?;
//! println!("fetched {} assets", assets.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod batch;
pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod observability;
pub mod pagination;
pub mod resilience;
pub mod transport;

#[cfg(test)]
pub(crate) mod mocks;

pub use batch::{BatchFailure, BatchOptions, BatchProcessor, BatchResult, OnError};
pub use cache::{MetadataCache, TimedMemo};
pub use client::{fetch_concurrent, validate_uuid, CatalogClient};
pub use config::{CatalogConfig, CatalogConfigBuilder};
pub use errors::{CatalogError, CatalogResult};
pub use pagination::{Page, PageRequest, Paginator};
pub use resilience::{RetryConfig, RetryExecutor};
pub use transport::{HttpTransport, ReqwestTransport, TransportResponse};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retries after the initial attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base backoff delay in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Default time-to-live for cached metadata lookups in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
