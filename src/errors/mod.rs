//! Error taxonomy for the catalog client.

mod error;

pub use error::{CatalogError, CatalogResult};
