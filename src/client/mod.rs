//! High-level client for the catalog REST API.
//!
//! [`CatalogClient`] ties the layers together: authentication headers
//! from the [`auth`](crate::auth) module, a pluggable
//! [`HttpTransport`], and a [`RetryExecutor`] that wraps every request
//! with failure classification and exponential backoff. Listing
//! endpoints are consumed through [`paginate`](CatalogClient::paginate)
//! and point reads can be fanned out with bounded concurrency via
//! [`get_many`](CatalogClient::get_many).

use crate::auth::{AuthManager, BasicAuthManager};
use crate::cache::MetadataCache;
use crate::config::CatalogConfig;
use crate::errors::{CatalogError, CatalogResult};
use crate::pagination::{Page, PageRequest, Paginator};
use crate::resilience::{RetryConfig, RetryExecutor};
use crate::transport::{HttpTransport, ReqwestTransport};
use bytes::Bytes;
use futures::future::BoxFuture;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Path prefix of the REST API, appended to the configured base URL.
const API_PATH: &str = "/rest/2.0";

/// Upper bound on any single backoff delay between retries.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Jitter fraction applied to backoff delays.
const BACKOFF_JITTER: f64 = 0.1;

/// Client for the catalog REST API.
pub struct CatalogClient {
    config: CatalogConfig,
    transport: Arc<dyn HttpTransport>,
    auth: Arc<dyn AuthManager>,
    retry: RetryExecutor,
    cache: MetadataCache,
    api_base: String,
}

impl CatalogClient {
    /// Create a client from the given configuration, using the default
    /// reqwest-backed transport.
    pub fn new(config: CatalogConfig) -> CatalogResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.timeout)?);
        Self::with_transport(config, transport)
    }

    /// Create a client with a custom transport implementation.
    pub fn with_transport(
        config: CatalogConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> CatalogResult<Self> {
        let auth = Arc::new(BasicAuthManager::new(
            config.username.clone(),
            config.password.clone(),
        ));

        auth.validate_credentials()
            .map_err(|message| CatalogError::Configuration { message })?;

        // Reject an unparseable base URL up front rather than on the
        // first request.
        Url::parse(&config.base_url)?;
        let api_base = format!("{}{}", config.base_url.trim_end_matches('/'), API_PATH);

        let retry = RetryExecutor::new(RetryConfig {
            max_retries: config.max_retries,
            base_delay: config.retry_delay,
            max_delay: MAX_BACKOFF,
            jitter: BACKOFF_JITTER,
        });

        let cache = MetadataCache::new(config.cache_ttl);

        Ok(Self {
            config,
            transport,
            auth,
            retry,
            cache,
            api_base,
        })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Root URL of the REST API, base URL plus the REST path prefix
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// TTL cache for (category, name) -> identifier lookups
    pub fn metadata_cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Send a request to the API and decode the JSON response.
    ///
    /// The call is wrapped in the retry executor: transient failures
    /// (429, 500/502/503/504, network faults) are retried with
    /// exponential backoff, fatal ones surface immediately. An empty
    /// response body (e.g. a 204 from a delete) decodes to `{}`.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> CatalogResult<Value> {
        let url = self.endpoint_url(endpoint, query)?;
        let body_bytes = body
            .map(serde_json::to_vec)
            .transpose()?
            .map(Bytes::from);
        let headers = self.auth.get_headers();
        let operation = format!("{} {}", method, endpoint);

        let response = self
            .retry
            .execute(&operation, || {
                let method = method.clone();
                let url = url.clone();
                let headers = headers.clone();
                let body = body_bytes.clone();
                async move { self.transport.send(method, url, headers, body).await }
            })
            .await?;

        decode_body(&response.body)
    }

    /// GET an endpoint with optional query parameters
    pub async fn get(&self, endpoint: &str, query: &[(String, String)]) -> CatalogResult<Value> {
        self.request(Method::GET, endpoint, query, None).await
    }

    /// GET an endpoint and deserialize the response into `T`
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> CatalogResult<T> {
        let value = self.get(endpoint, query).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// GET a single resource by its UUID identifier.
    ///
    /// The identifier is validated locally first; a malformed UUID
    /// fails with [`CatalogError::Validation`] without touching the
    /// network.
    pub async fn get_by_id(&self, endpoint: &str, id: &str) -> CatalogResult<Value> {
        validate_uuid(id, "id")?;
        let path = format!("{}/{}", endpoint.trim_end_matches('/'), id);
        self.get(&path, &[]).await
    }

    /// POST a JSON payload to an endpoint
    pub async fn post(&self, endpoint: &str, body: &Value) -> CatalogResult<Value> {
        validate_payload(body)?;
        self.request(Method::POST, endpoint, &[], Some(body)).await
    }

    /// PUT a JSON payload to an endpoint
    pub async fn put(&self, endpoint: &str, body: &Value) -> CatalogResult<Value> {
        validate_payload(body)?;
        self.request(Method::PUT, endpoint, &[], Some(body)).await
    }

    /// PATCH an endpoint with a JSON payload
    pub async fn patch(&self, endpoint: &str, body: &Value) -> CatalogResult<Value> {
        validate_payload(body)?;
        self.request(Method::PATCH, endpoint, &[], Some(body)).await
    }

    /// DELETE an endpoint
    pub async fn delete(&self, endpoint: &str) -> CatalogResult<Value> {
        self.request(Method::DELETE, endpoint, &[], None).await
    }

    /// Lazily paginate a listing endpoint.
    ///
    /// The paginator requests `limit` items per page and follows
    /// whichever addressing scheme the endpoint uses: an opaque
    /// `cursor` when responses carry a continuation token, plain
    /// `offset` arithmetic otherwise.
    pub fn paginate<'a>(
        &'a self,
        endpoint: &'a str,
        limit: usize,
    ) -> Paginator<
        Value,
        impl Fn(PageRequest) -> BoxFuture<'a, CatalogResult<Page<Value>>> + 'a,
        BoxFuture<'a, CatalogResult<Page<Value>>>,
    > {
        let fetch = move |req: PageRequest| -> BoxFuture<'a, CatalogResult<Page<Value>>> {
            Box::pin(async move {
                let mut query = vec![("limit".to_string(), req.limit.to_string())];
                match &req.cursor {
                    Some(cursor) => query.push(("cursor".to_string(), cursor.clone())),
                    None => query.push(("offset".to_string(), req.offset.to_string())),
                }
                let value = self.request(Method::GET, endpoint, &query, None).await?;
                Ok(serde_json::from_value(value)?)
            })
        };

        Paginator::new(fetch, limit)
    }

    /// Fetch many resources by UUID with at most `concurrency` requests
    /// in flight. Results are returned in input order, one per
    /// identifier, so a failed read does not hide its neighbors.
    pub async fn get_many(
        &self,
        endpoint: &str,
        ids: Vec<String>,
        concurrency: usize,
    ) -> Vec<CatalogResult<Value>> {
        fetch_concurrent(ids, concurrency, |id| async move {
            self.get_by_id(endpoint, &id).await
        })
        .await
    }

    /// Probe connectivity and credentials against the current-session
    /// endpoint. Returns `false` on any failure; the error is logged,
    /// not surfaced.
    pub async fn test_connection(&self) -> bool {
        match self.get("/auth/sessions/current", &[]).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "connection test failed");
                false
            }
        }
    }

    fn endpoint_url(&self, endpoint: &str, query: &[(String, String)]) -> CatalogResult<Url> {
        let path = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{}", endpoint)
        };

        let mut url = Url::parse(&format!("{}{}", self.api_base, path))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

/// Run an async operation over every input with at most `concurrency`
/// in flight, preserving input order in the output.
pub async fn fetch_concurrent<I, T, F, Fut>(
    inputs: Vec<I>,
    concurrency: usize,
    fetch: F,
) -> Vec<CatalogResult<T>>
where
    F: Fn(I) -> Fut + Sync,
    Fut: Future<Output = CatalogResult<T>>,
{
    let gate = Arc::new(Semaphore::new(concurrency.max(1)));
    let fetch = &fetch;

    let tasks = inputs.into_iter().map(|input| {
        let gate = Arc::clone(&gate);
        async move {
            let _permit = gate.acquire().await.map_err(|_| CatalogError::Internal {
                message: "concurrency gate closed".to_string(),
            })?;
            fetch(input).await
        }
    });

    futures::future::join_all(tasks).await
}

/// Validate that a string is a well-formed UUID (8-4-4-4-12 hex).
pub fn validate_uuid(value: &str, field: &str) -> CatalogResult<()> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 36
        && bytes.iter().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => *b == b'-',
            _ => b.is_ascii_hexdigit(),
        });

    if well_formed {
        Ok(())
    } else {
        Err(CatalogError::Validation {
            message: format!("'{}' is not a valid UUID", value),
            field: Some(field.to_string()),
        })
    }
}

/// Mutating requests must carry a non-empty JSON object.
fn validate_payload(body: &Value) -> CatalogResult<()> {
    match body {
        Value::Object(map) if !map.is_empty() => Ok(()),
        Value::Object(_) => Err(CatalogError::Validation {
            message: "Request body cannot be empty".to_string(),
            field: None,
        }),
        _ => Err(CatalogError::Validation {
            message: "Request body must be a JSON object".to_string(),
            field: None,
        }),
    }
}

fn decode_body(body: &Bytes) -> CatalogResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    Ok(serde_json::from_slice(body)?)
}
