//! Lazy pagination over offset- and cursor-addressed listing endpoints.
//!
//! A [`Paginator`] wraps a listing operation (any async callable taking a
//! [`PageRequest`] and returning a [`Page`]) and walks the result set one
//! page at a time. It never buffers more than the current page, and it is
//! forward-only: iterating consumes the paginator, and re-reading a result
//! set means constructing a new one, since server-side state may have
//! changed between reads.

use crate::errors::{CatalogError, CatalogResult};
use futures::stream::{Stream, TryStreamExt};
use serde::Deserialize;
use std::future::Future;

/// Position parameters for one listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Number of items requested for this page
    pub limit: usize,
    /// Zero-based offset into the result set (offset addressing)
    pub offset: u64,
    /// Opaque continuation token (cursor addressing); `None` on the
    /// first call and whenever the endpoint paginates by offset
    pub cursor: Option<String>,
}

/// One page of a listing response, matching the service envelope
/// (`results` / `total` / `offset` / `limit` / `nextCursor`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items in this page, in server order
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    /// Total number of items available, when the endpoint reports it
    #[serde(default)]
    pub total: Option<u64>,
    /// Offset of this page in the result set
    #[serde(default)]
    pub offset: u64,
    /// Page size the server applied
    #[serde(default)]
    pub limit: u64,
    /// Continuation token for the next page, when the endpoint
    /// paginates by cursor
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Whether the server reports more items beyond this page.
    pub fn has_more(&self) -> bool {
        if self.next_cursor.is_some() {
            return true;
        }
        match self.total {
            Some(total) => self.offset + (self.results.len() as u64) < total,
            None => false,
        }
    }

    /// Number of items in this page
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether this page holds no items
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Addressing mode, decided by what the first page returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Offset,
    Cursor,
}

/// Lazy, forward-only iteration over a paginated listing operation.
///
/// Three consumption styles are built on the same lazy sequence:
/// page-at-a-time ([`next_page`](Self::next_page)), item-at-a-time
/// ([`into_stream`](Self::into_stream)) and eager materialization
/// ([`collect`](Self::collect)). Transient page-fetch failures are
/// retried inside the listing operation itself; a fatal failure
/// mid-iteration surfaces at the failing page and already-yielded
/// items remain valid.
pub struct Paginator<T, F, Fut>
where
    F: Fn(PageRequest) -> Fut,
    Fut: Future<Output = CatalogResult<Page<T>>>,
{
    fetch: F,
    limit: usize,
    max_items: Option<usize>,
    offset: u64,
    cursor: Option<String>,
    mode: Option<Mode>,
    total_fetched: usize,
    done: bool,
}

impl<T, F, Fut> Paginator<T, F, Fut>
where
    F: Fn(PageRequest) -> Fut,
    Fut: Future<Output = CatalogResult<Page<T>>>,
{
    /// Create a paginator over `fetch` requesting `limit` items per page.
    pub fn new(fetch: F, limit: usize) -> Self {
        Self {
            fetch,
            limit: limit.max(1),
            max_items: None,
            offset: 0,
            cursor: None,
            mode: None,
            total_fetched: 0,
            done: false,
        }
    }

    /// Truncate the sequence after `max_items` items, regardless of how
    /// many further pages exist.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Total number of items yielded so far.
    pub fn total_fetched(&self) -> usize {
        self.total_fetched
    }

    /// Fetch the next page, or `None` once the sequence is exhausted.
    ///
    /// An error terminates the sequence: subsequent calls return `None`.
    pub async fn next_page(&mut self) -> CatalogResult<Option<Page<T>>> {
        if self.done {
            return Ok(None);
        }

        let remaining = match self.max_items {
            Some(max) if self.total_fetched >= max => {
                self.done = true;
                return Ok(None);
            }
            Some(max) => Some(max - self.total_fetched),
            None => None,
        };

        let request_limit = remaining.map_or(self.limit, |r| self.limit.min(r));
        let request = PageRequest {
            limit: request_limit,
            offset: self.offset,
            cursor: self.cursor.clone(),
        };

        let mut page = match (self.fetch)(request).await {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };

        if page.results.is_empty() {
            self.done = true;
            return Ok(None);
        }

        // Defensive truncation if the server over-delivers past the cap.
        if let Some(remaining) = remaining {
            if page.results.len() > remaining {
                page.results.truncate(remaining);
                page.next_cursor = None;
            }
        }

        let fetched = page.results.len();
        self.total_fetched += fetched;

        let mode = *self.mode.get_or_insert(if page.next_cursor.is_some() {
            Mode::Cursor
        } else {
            Mode::Offset
        });

        match mode {
            Mode::Cursor => {
                self.cursor = page.next_cursor.clone();
                if self.cursor.is_none() {
                    self.done = true;
                }
            }
            Mode::Offset => {
                self.offset += fetched as u64;
                if fetched < request_limit || !page.has_more() {
                    self.done = true;
                }
            }
        }

        Ok(Some(page))
    }

    /// Consume the paginator as an async stream of individual items.
    pub fn into_stream(self) -> impl Stream<Item = CatalogResult<T>> {
        futures::stream::try_unfold(self, |mut paginator| async move {
            match paginator.next_page().await? {
                Some(page) => Ok::<_, CatalogError>(Some((page.results, paginator))),
                None => Ok(None),
            }
        })
        .map_ok(|items| futures::stream::iter(items.into_iter().map(Ok::<T, CatalogError>)))
        .try_flatten()
    }

    /// Eagerly fetch every remaining item into a `Vec`.
    ///
    /// This is memory-unbounded: the whole result set is materialized.
    /// Prefer [`into_stream`](Self::into_stream) for large result sets.
    pub async fn collect(mut self) -> CatalogResult<Vec<T>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page.results);
        }
        Ok(items)
    }
}
