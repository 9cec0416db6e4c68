//! HTTP transport implementations.

use crate::errors::{CatalogError, CatalogResult};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Response produced by a single transport attempt.
///
/// Only success (2xx) responses are represented; the transport maps
/// every other outcome to a [`CatalogError`] variant so the retry layer
/// can classify it.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code (always 2xx)
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw response body
    pub body: Bytes,
}

/// HTTP transport trait for making requests to the catalog API.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a single HTTP request and return the response or a
    /// classified error. One call means exactly one attempt; retrying
    /// is the caller's concern.
    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> CatalogResult<TransportResponse>;
}

/// Reqwest-based HTTP transport implementation
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a new reqwest transport with the given per-request timeout
    pub fn new(timeout: Duration) -> CatalogResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            CatalogError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            }
        })?;

        Ok(Self { client })
    }

    fn to_reqwest_method(&self, method: Method) -> reqwest::Method {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::DELETE => reqwest::Method::DELETE,
            Method::PATCH => reqwest::Method::PATCH,
            _ => reqwest::Method::GET,
        }
    }

    fn to_reqwest_headers(&self, headers: HeaderMap) -> reqwest::header::HeaderMap {
        let mut reqwest_headers = reqwest::header::HeaderMap::new();
        for (name, value) in headers.iter() {
            if let Ok(header_name) =
                reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes())
            {
                if let Ok(header_value) = reqwest::header::HeaderValue::from_bytes(value.as_bytes())
                {
                    reqwest_headers.insert(header_name, header_value);
                }
            }
        }
        reqwest_headers
    }

    fn from_reqwest_headers(&self, headers: &reqwest::header::HeaderMap) -> HeaderMap {
        let mut out = HeaderMap::new();
        for (name, value) in headers.iter() {
            if let Ok(header_name) = http::header::HeaderName::from_bytes(name.as_str().as_bytes())
            {
                if let Ok(header_value) = http::header::HeaderValue::from_bytes(value.as_bytes()) {
                    out.insert(header_name, header_value);
                }
            }
        }
        out
    }
}

/// Parse a Retry-After header value given in whole seconds.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> CatalogResult<TransportResponse> {
        let reqwest_method = self.to_reqwest_method(method);
        let reqwest_headers = self.to_reqwest_headers(headers);

        let mut request = self
            .client
            .request(reqwest_method, url.as_str())
            .headers(reqwest_headers);

        if let Some(body_data) = body {
            request = request.body(body_data.to_vec());
        }

        let response = request.send().await?;

        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let retry_after = parse_retry_after(&response_headers);
        let body_bytes = response.bytes().await?;

        if !(200..300).contains(&status) {
            let body_str = String::from_utf8_lossy(&body_bytes);
            return Err(CatalogError::from_status(status, &body_str, retry_after));
        }

        Ok(TransportResponse {
            status,
            headers: self.from_reqwest_headers(&response_headers),
            body: body_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reqwest_transport_creation() {
        let transport = ReqwestTransport::new(Duration::from_secs(30));
        assert!(transport.is_ok());
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("retry-after", "17".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(17)));
    }

    #[test]
    fn test_parse_retry_after_absent_or_malformed() {
        let headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("retry-after", "Wed, 21 Oct 2026 07:28:00 GMT".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), None);
    }
}
