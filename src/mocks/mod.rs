//! Test doubles shared across unit tests.

use crate::errors::{CatalogError, CatalogResult};
use crate::transport::{HttpTransport, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use parking_lot::Mutex;
use std::collections::VecDeque;
use url::Url;

/// One request as the transport saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Transport stub that replays a scripted queue of responses and
/// records every request it receives. Running off the end of the
/// script fails the request with an internal error.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<CatalogResult<TransportResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a successful response with the given status and body
    pub fn push_ok(&self, status: u16, body: &str) {
        self.responses.lock().push_back(Ok(TransportResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from(body.to_string()),
        }));
    }

    /// Enqueue a failed attempt
    pub fn push_err(&self, err: CatalogError) {
        self.responses.lock().push_back(Err(err));
    }

    /// Every request received so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> CatalogResult<TransportResponse> {
        self.calls.lock().push(RecordedCall {
            method,
            url,
            headers,
            body,
        });

        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                Err(CatalogError::Internal {
                    message: "scripted transport ran out of responses".to_string(),
                })
            })
    }
}

mockall::mock! {
    /// Mockall-generated transport for expectation-style tests.
    pub Transport {}

    #[async_trait]
    impl HttpTransport for Transport {
        async fn send(
            &self,
            method: Method,
            url: Url,
            headers: HeaderMap,
            body: Option<Bytes>,
        ) -> CatalogResult<TransportResponse>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_transport_replays_in_order() {
        let transport = ScriptedTransport::new();
        transport.push_ok(200, "first");
        transport.push_err(CatalogError::NotFound {
            message: "gone".to_string(),
        });

        let url = Url::parse("https://example.com/a").unwrap();

        let first = transport
            .send(Method::GET, url.clone(), HeaderMap::new(), None)
            .await
            .unwrap();
        assert_eq!(first.body, Bytes::from("first"));

        let second = transport
            .send(Method::GET, url.clone(), HeaderMap::new(), None)
            .await;
        assert!(matches!(second, Err(CatalogError::NotFound { .. })));

        // Exhausted script fails rather than hanging.
        let third = transport.send(Method::GET, url, HeaderMap::new(), None).await;
        assert!(matches!(third, Err(CatalogError::Internal { .. })));

        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mockall_transport_expectations() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|_, _, _, _| {
                Ok(TransportResponse {
                    status: 200,
                    headers: HeaderMap::new(),
                    body: Bytes::from_static(b"{}"),
                })
            });

        let url = Url::parse("https://example.com/a").unwrap();
        let response = mock
            .send(Method::GET, url, HeaderMap::new(), None)
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }
}
