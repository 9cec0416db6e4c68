//! HTTP transport layer.

mod http_transport;

pub use http_transport::{HttpTransport, ReqwestTransport, TransportResponse};
