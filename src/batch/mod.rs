//! Chunked batch execution of per-item write operations.
//!
//! [`BatchProcessor`] splits a collection of work items into consecutive
//! chunks, applies an operation to each item either strictly sequentially
//! or with bounded concurrency, pauses between chunks as a rate-limiting
//! courtesy, and aggregates the outcome into an index-preserving
//! [`BatchResult`].

use crate::errors::{CatalogError, CatalogResult};
use std::collections::VecDeque;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Error handling policy for a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnError {
    /// Record the error against the item's index and keep going.
    #[default]
    Continue,
    /// Abort on the first error. Already-completed results are preserved
    /// and returned; remaining items are left unprocessed and appear in
    /// neither `successes` nor `errors`. Under bounded concurrency the
    /// abort takes effect at the end of the failing item's chunk, after
    /// in-flight work has drained.
    Stop,
    /// Same executor behavior as [`OnError::Continue`]; the separate name
    /// exists for callers that gather errors for later reporting rather
    /// than handling them as they occur.
    Collect,
}

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Number of items per chunk
    pub batch_size: usize,
    /// Pause inserted between chunks (not after the final chunk)
    pub delay_between_batches: Duration,
    /// Maximum operations in flight at once; 1 means strictly sequential
    pub concurrency: usize,
    /// Error handling policy
    pub on_error: OnError,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            delay_between_batches: Duration::from_millis(100),
            concurrency: 1,
            on_error: OnError::Continue,
        }
    }
}

/// A failed item, kept with its original input and index so the caller
/// can correlate or replay it.
#[derive(Debug)]
pub struct BatchFailure<T> {
    /// Position of the item in the original input
    pub index: usize,
    /// The input item itself
    pub input: T,
    /// What went wrong
    pub error: CatalogError,
}

/// Aggregated outcome of a batch run.
///
/// Every input index appears in exactly one of `successes` or `errors`,
/// unless the run was aborted ([`OnError::Stop`]) or cancelled, in which
/// case unprocessed items appear in neither; `aborted` records the
/// triggering failure when the stop policy fired.
#[derive(Debug)]
pub struct BatchResult<T, R> {
    /// Successful outputs, ordered by original input index
    pub successes: Vec<(usize, R)>,
    /// Failures, ordered by original input index
    pub errors: Vec<BatchFailure<T>>,
    /// Set when the stop policy aborted the run
    pub aborted: Option<CatalogError>,
}

impl<T, R> Default for BatchResult<T, R> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            errors: Vec::new(),
            aborted: None,
        }
    }
}

impl<T, R> BatchResult<T, R> {
    /// Number of successful operations
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed operations
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of operations that produced an outcome
    pub fn total_count(&self) -> usize {
        self.successes.len() + self.errors.len()
    }

    /// Success rate as a percentage of processed items
    pub fn success_rate(&self) -> f64 {
        if self.total_count() == 0 {
            return 0.0;
        }
        self.success_count() as f64 / self.total_count() as f64 * 100.0
    }

    /// Whether the stop policy aborted the run early
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// Progress callback invoked after each item completes with
/// `(items_done_so_far, total_items)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Batch executor for bulk write (and read fan-out) operations.
pub struct BatchProcessor {
    options: BatchOptions,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl BatchProcessor {
    /// Create a processor with the given options
    pub fn new(options: BatchOptions) -> Self {
        Self {
            options,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Register a progress callback. A panic inside the callback is
    /// caught and logged; it never aborts the batch.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Tie this processor to an externally owned cancellation token.
    /// Cancelling the token stops new work from being admitted; items
    /// already in flight drain, and the partial result is returned.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The options this processor runs with
    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Process `items` in chunks, invoking `operation` once per item on
    /// the input produced by `item_mapper`.
    ///
    /// With `concurrency == 1` items run strictly sequentially and the
    /// stop policy aborts immediately at the failing item. With
    /// `concurrency > 1` up to that many operations are in flight at a
    /// time behind a semaphore, and the stop policy takes effect at the
    /// end of the failing chunk.
    pub async fn process<T, I, R, M, Op, Fut>(
        &self,
        items: Vec<T>,
        item_mapper: M,
        operation: Op,
    ) -> BatchResult<T, R>
    where
        T: Send,
        I: Send,
        R: Send,
        M: Fn(&T) -> I + Send + Sync,
        Op: Fn(I) -> Fut + Send + Sync,
        Fut: Future<Output = CatalogResult<R>> + Send,
    {
        let total = items.len();
        let batch_size = self.options.batch_size.max(1);
        let done = AtomicUsize::new(0);
        let mut result = BatchResult::default();

        let mut pending: VecDeque<(usize, T)> = items.into_iter().enumerate().collect();

        while !pending.is_empty() {
            if self.cancel.is_cancelled() {
                tracing::info!(processed = done.load(Ordering::SeqCst), total, "batch cancelled");
                break;
            }

            let take = batch_size.min(pending.len());
            let chunk: Vec<(usize, T)> = pending.drain(..take).collect();

            let stop = if self.options.concurrency > 1 {
                self.run_chunk_concurrent(chunk, &item_mapper, &operation, &done, total, &mut result)
                    .await
            } else {
                self.run_chunk_sequential(chunk, &item_mapper, &operation, &done, total, &mut result)
                    .await
            };

            if stop {
                break;
            }

            if !pending.is_empty() && !self.options.delay_between_batches.is_zero() {
                sleep(self.options.delay_between_batches).await;
            }
        }

        result.successes.sort_by_key(|(index, _)| *index);
        result.errors.sort_by_key(|failure| failure.index);
        result
    }

    /// Returns true when the stop policy requests an abort.
    async fn run_chunk_sequential<T, I, R, M, Op, Fut>(
        &self,
        chunk: Vec<(usize, T)>,
        item_mapper: &M,
        operation: &Op,
        done: &AtomicUsize,
        total: usize,
        result: &mut BatchResult<T, R>,
    ) -> bool
    where
        M: Fn(&T) -> I,
        Op: Fn(I) -> Fut,
        Fut: Future<Output = CatalogResult<R>>,
    {
        for (index, item) in chunk {
            if self.cancel.is_cancelled() {
                return true;
            }

            let input = item_mapper(&item);
            match operation(input).await {
                Ok(output) => result.successes.push((index, output)),
                Err(error) => {
                    let stop = matches!(self.options.on_error, OnError::Stop);
                    if stop {
                        result.aborted = Some(CatalogError::BatchAborted {
                            index,
                            source: Box::new(error.clone()),
                        });
                    }
                    result.errors.push(BatchFailure { index, input: item, error });
                    if stop {
                        self.report_progress(done.fetch_add(1, Ordering::SeqCst) + 1, total);
                        return true;
                    }
                }
            }

            self.report_progress(done.fetch_add(1, Ordering::SeqCst) + 1, total);
        }

        false
    }

    /// Bounded-concurrent variant: a semaphore admits at most
    /// `concurrency` operations at once; outcomes keep input order.
    async fn run_chunk_concurrent<T, I, R, M, Op, Fut>(
        &self,
        chunk: Vec<(usize, T)>,
        item_mapper: &M,
        operation: &Op,
        done: &AtomicUsize,
        total: usize,
        result: &mut BatchResult<T, R>,
    ) -> bool
    where
        T: Send,
        I: Send,
        R: Send,
        M: Fn(&T) -> I + Send + Sync,
        Op: Fn(I) -> Fut + Send + Sync,
        Fut: Future<Output = CatalogResult<R>> + Send,
    {
        let gate = Arc::new(Semaphore::new(self.options.concurrency));

        let chunk_futures = chunk.into_iter().map(|(index, item)| {
            let gate = gate.clone();
            let input = item_mapper(&item);
            async move {
                if self.cancel.is_cancelled() {
                    return (index, item, None);
                }
                let permit = gate.acquire().await;
                if permit.is_err() || self.cancel.is_cancelled() {
                    return (index, item, None);
                }
                let outcome = operation(input).await;
                self.report_progress(done.fetch_add(1, Ordering::SeqCst) + 1, total);
                (index, item, Some(outcome))
            }
        });

        let outcomes = futures::future::join_all(chunk_futures).await;

        let mut first_failure: Option<usize> = None;
        for (index, item, outcome) in outcomes {
            match outcome {
                Some(Ok(output)) => result.successes.push((index, output)),
                Some(Err(error)) => {
                    if first_failure.map_or(true, |first| index < first) {
                        first_failure = Some(index);
                        if matches!(self.options.on_error, OnError::Stop) {
                            result.aborted = Some(CatalogError::BatchAborted {
                                index,
                                source: Box::new(error.clone()),
                            });
                        }
                    }
                    result.errors.push(BatchFailure { index, input: item, error });
                }
                // Cancelled before admission: unprocessed, absent from both.
                None => {}
            }
        }

        matches!(self.options.on_error, OnError::Stop) && result.aborted.is_some()
    }

    fn report_progress(&self, processed: usize, total: usize) {
        if let Some(callback) = &self.progress {
            let callback = callback.clone();
            if catch_unwind(AssertUnwindSafe(|| callback(processed, total))).is_err() {
                tracing::warn!(processed, total, "progress callback panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn failing_at(fail_index: usize) -> impl Fn(usize) -> futures::future::Ready<CatalogResult<usize>> {
        move |input: usize| {
            futures::future::ready(if input == fail_index {
                Err(CatalogError::BadRequest {
                    message: format!("item {} is malformed", input),
                })
            } else {
                Ok(input * 10)
            })
        }
    }

    #[tokio::test]
    async fn test_continue_policy_records_error_and_completes() {
        let processor = BatchProcessor::new(BatchOptions {
            batch_size: 2,
            delay_between_batches: Duration::ZERO,
            concurrency: 1,
            on_error: OnError::Continue,
        });

        let result = processor
            .process(vec![0usize, 1, 2, 3, 4], |item| *item, failing_at(2))
            .await;

        assert_eq!(result.success_count(), 4);
        assert_eq!(result.error_count(), 1);
        assert!(!result.is_aborted());

        let success_indices: Vec<usize> = result.successes.iter().map(|(i, _)| *i).collect();
        assert_eq!(success_indices, vec![0, 1, 3, 4]);
        assert_eq!(result.successes[2], (3, 30));
        assert_eq!(result.errors[0].index, 2);
        assert_eq!(result.errors[0].input, 2);
    }

    #[tokio::test]
    async fn test_stop_policy_halts_and_leaves_rest_unprocessed() {
        let processor = BatchProcessor::new(BatchOptions {
            batch_size: 50,
            delay_between_batches: Duration::ZERO,
            concurrency: 1,
            on_error: OnError::Stop,
        });

        let result = processor
            .process(vec![0usize, 1, 2, 3, 4], |item| *item, failing_at(2))
            .await;

        assert_eq!(result.success_count(), 2);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors[0].index, 2);
        // Items 3 and 4 are in neither collection.
        assert!(result.successes.iter().all(|(i, _)| *i < 2));
        assert!(matches!(
            result.aborted,
            Some(CatalogError::BatchAborted { index: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_collect_policy_behaves_like_continue() {
        let processor = BatchProcessor::new(BatchOptions {
            batch_size: 50,
            delay_between_batches: Duration::ZERO,
            concurrency: 1,
            on_error: OnError::Collect,
        });

        let result = processor
            .process(vec![0usize, 1, 2, 3, 4], |item| *item, failing_at(2))
            .await;

        assert_eq!(result.success_count(), 4);
        assert_eq!(result.error_count(), 1);
        assert!(!result.is_aborted());
    }

    #[tokio::test]
    async fn test_concurrent_processing_preserves_input_order() {
        let processor = BatchProcessor::new(BatchOptions {
            batch_size: 20,
            delay_between_batches: Duration::ZERO,
            concurrency: 4,
            on_error: OnError::Continue,
        });

        let items: Vec<usize> = (0..20).collect();
        let result = processor
            .process(items, |item| *item, |input: usize| async move {
                // Vary completion order.
                sleep(Duration::from_millis((20 - input as u64) % 7)).await;
                Ok::<usize, CatalogError>(input * 10)
            })
            .await;

        assert_eq!(result.success_count(), 20);
        let indices: Vec<usize> = result.successes.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, (0..20).collect::<Vec<_>>());
        assert_eq!(result.successes[7], (7, 70));
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        let processor = BatchProcessor::new(BatchOptions {
            batch_size: 24,
            delay_between_batches: Duration::ZERO,
            concurrency: 3,
            on_error: OnError::Continue,
        });

        let in_flight = Arc::new(AtomicUsize::new(0));
        let observed_max = Arc::new(AtomicUsize::new(0));

        let in_flight_op = in_flight.clone();
        let observed_op = observed_max.clone();
        let result = processor
            .process(
                (0..24usize).collect(),
                |item| *item,
                move |_input: usize| {
                    let in_flight = in_flight_op.clone();
                    let observed = observed_op.clone();
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        observed.fetch_max(now, Ordering::SeqCst);
                        sleep(Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok::<(), CatalogError>(())
                    }
                },
            )
            .await;

        assert_eq!(result.success_count(), 24);
        assert!(observed_max.load(Ordering::SeqCst) <= 3);
        assert!(observed_max.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_stop_policy_under_concurrency_stops_after_failing_chunk() {
        let processor = BatchProcessor::new(BatchOptions {
            batch_size: 3,
            delay_between_batches: Duration::ZERO,
            concurrency: 3,
            on_error: OnError::Stop,
        });

        let result = processor
            .process((0..9usize).collect(), |item| *item, failing_at(1))
            .await;

        // The failing chunk (items 0..3) drains; chunks after it never start.
        assert!(result.is_aborted());
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors[0].index, 1);
        assert!(result.successes.iter().all(|(i, _)| *i < 3));
        assert_eq!(result.total_count(), 3);
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_item() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();

        let processor = BatchProcessor::new(BatchOptions {
            batch_size: 2,
            delay_between_batches: Duration::ZERO,
            concurrency: 1,
            on_error: OnError::Continue,
        })
        .with_progress(Arc::new(move |processed, total| {
            seen_cb.lock().unwrap().push((processed, total));
        }));

        let result = processor
            .process(vec![0usize, 1, 2, 3, 4], |item| *item, failing_at(99))
            .await;

        assert_eq!(result.success_count(), 5);
        let calls = seen.lock().unwrap();
        assert_eq!(*calls, vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);
    }

    #[tokio::test]
    async fn test_panicking_progress_callback_does_not_abort_batch() {
        let processor = BatchProcessor::new(BatchOptions {
            batch_size: 50,
            delay_between_batches: Duration::ZERO,
            concurrency: 1,
            on_error: OnError::Continue,
        })
        .with_progress(Arc::new(|_processed, _total| {
            panic!("misbehaving callback");
        }));

        let result = processor
            .process(vec![0usize, 1, 2], |item| *item, failing_at(99))
            .await;

        assert_eq!(result.success_count(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_admitting_work() {
        let token = CancellationToken::new();
        token.cancel();

        let processor = BatchProcessor::new(BatchOptions {
            batch_size: 2,
            delay_between_batches: Duration::ZERO,
            concurrency: 1,
            on_error: OnError::Continue,
        })
        .with_cancellation(token);

        let result = processor
            .process(vec![0usize, 1, 2, 3], |item| *item, failing_at(99))
            .await;

        assert_eq!(result.total_count(), 0);
        assert!(!result.is_aborted());
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_returns_partial_result() {
        let token = CancellationToken::new();
        let cancel_from_op = token.clone();

        let processor = BatchProcessor::new(BatchOptions {
            batch_size: 1,
            delay_between_batches: Duration::ZERO,
            concurrency: 1,
            on_error: OnError::Continue,
        })
        .with_cancellation(token);

        let result = processor
            .process(
                vec![0usize, 1, 2, 3],
                |item| *item,
                move |input: usize| {
                    let cancel = cancel_from_op.clone();
                    async move {
                        if input == 1 {
                            cancel.cancel();
                        }
                        Ok::<usize, CatalogError>(input)
                    }
                },
            )
            .await;

        // Items 0 and 1 completed before the cancellation was observed.
        assert_eq!(result.success_count(), 2);
        assert_eq!(result.error_count(), 0);
    }

    #[tokio::test]
    async fn test_delay_applies_between_chunks_but_not_after_last() {
        let processor = BatchProcessor::new(BatchOptions {
            batch_size: 2,
            delay_between_batches: Duration::from_millis(40),
            concurrency: 1,
            on_error: OnError::Continue,
        });

        let started = std::time::Instant::now();
        let result = processor
            .process(vec![0usize, 1, 2, 3], |item| *item, failing_at(99))
            .await;
        let elapsed = started.elapsed();

        assert_eq!(result.success_count(), 4);
        // One pause between the two chunks, none after the second.
        assert!(elapsed >= Duration::from_millis(40));
        assert!(elapsed < Duration::from_millis(120));
    }

    #[test]
    fn test_success_rate() {
        let mut result: BatchResult<usize, usize> = BatchResult::default();
        assert_eq!(result.success_rate(), 0.0);

        result.successes.push((0, 0));
        result.successes.push((1, 10));
        result.successes.push((2, 20));
        result.errors.push(BatchFailure {
            index: 3,
            input: 3,
            error: CatalogError::BadRequest {
                message: "nope".to_string(),
            },
        });

        assert_eq!(result.total_count(), 4);
        assert_eq!(result.success_rate(), 75.0);
    }
}
