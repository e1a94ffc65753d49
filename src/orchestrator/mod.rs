//! Bounded-concurrency fetch orchestration
//!
//! Every request runs in its own tokio task, gated by a semaphore sized once at
//! construction. A batch additionally keeps at most `workers` tasks in flight
//! through `buffer_unordered`, so a large batch never spawns more tasks than the
//! pool can serve. Results are tagged with their input index before dispatch and
//! re-sorted on collection, so completion order never leaks into the output.

mod stats;


pub use stats::SessionStats;

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::Semaphore;
use url::Url;

use crate::classifier::{RawOutcome, classify};
use crate::config::{OrchestratorConfig, RetryConfig, available_parallelism};
use crate::error::{Result, TransportError, TransportErrorKind};
use crate::identity::SessionIdentity;
use crate::request::{PreparedRequest, RequestDescriptor};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{BatchOutcome, FetchResult, Method, Outcome};

use stats::SessionCounters;

/// Fans request batches out to a bounded worker pool and reassembles the results
///
/// One orchestrator corresponds to one scraping session: it owns a single
/// [`SessionIdentity`] for its whole lifetime and can be invoked any number of
/// times.
pub struct FetchOrchestrator {
    identity: SessionIdentity,
    workers: usize,
    retry: RetryConfig,
    ctx: WorkerContext,
}

/// Everything a worker task needs, cheap to clone into `tokio::spawn`
#[derive(Clone)]
struct WorkerContext {
    transport: Arc<dyn Transport>,
    permits: Arc<Semaphore>,
    counters: Arc<SessionCounters>,
    verbose: bool,
}

/// One request, validated and tagged with its input position
struct Job {
    index: usize,
    method: Method,
    url: Url,
    prepared: PreparedRequest,
}

impl FetchOrchestrator {
    /// Create an orchestrator backed by a fresh `reqwest` client
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Self::with_transport(config, transport)
    }

    /// Create an orchestrator with a caller-supplied transport
    pub fn with_transport(config: OrchestratorConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let identity = SessionIdentity::from_config(&config)?;
        let workers = config.resolve_workers(available_parallelism());

        tracing::debug!(
            workers,
            timeout_ms = identity.default_timeout().as_millis() as u64,
            user_agent = identity.user_agent(),
            "Fetch orchestrator created"
        );

        Ok(Self {
            identity,
            workers,
            retry: config.retry,
            ctx: WorkerContext {
                transport,
                permits: Arc::new(Semaphore::new(workers)),
                counters: Arc::new(SessionCounters::default()),
                verbose: config.verbose,
            },
        })
    }

    /// Size of the worker pool
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Session identity (headers, User-Agent, default timeout)
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Retry policy from the configuration, for use with [`crate::retry`]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Snapshot of this session's request counters
    pub fn stats(&self) -> SessionStats {
        self.ctx.counters.snapshot()
    }

    /// Execute a single request
    ///
    /// Transport failures and error statuses come back as `Ok(Outcome)`; `Err` is
    /// only returned for invalid input, before anything is sent.
    pub async fn fetch_one(&self, request: &RequestDescriptor) -> Result<Outcome> {
        let job = self.prepare(0, request)?;
        let result = dispatch(self.ctx.clone(), job).await;
        if !result.outcome.is_success() {
            tracing::debug!(
                url = %result.url,
                method = %result.method,
                outcome = result.outcome.kind(),
                error = %result.outcome.describe(),
                "Request did not succeed"
            );
        }
        Ok(result.outcome)
    }

    /// Execute a batch and wait for all of it
    ///
    /// Successes come back in input order with their input index; everything
    /// else lands in `failures`, also in input order. A single failing request
    /// never affects the others.
    pub async fn fetch_many(&self, requests: &[RequestDescriptor]) -> Result<BatchOutcome> {
        if requests.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let start = Instant::now();
        let results: Vec<FetchResult> = self.fetch_stream(requests)?.collect().await;
        let batch = BatchOutcome::from_results(results);

        for failure in &batch.failures {
            tracing::warn!(
                index = failure.index,
                url = %failure.url,
                method = %failure.method,
                outcome = failure.outcome.kind(),
                status = ?failure.outcome.status(),
                error = %failure.outcome.describe(),
                "Request failed"
            );
        }
        tracing::info!(
            total = requests.len(),
            succeeded = batch.successes.len(),
            failed = batch.failures.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch complete"
        );

        Ok(batch)
    }

    /// Build descriptors for `urls` with `method` and run them as a batch
    ///
    /// URLs are trimmed of surrounding whitespace. Any invalid URL fails the
    /// whole call before dispatch.
    pub async fn fetch_urls<I, S>(&self, method: Method, urls: I) -> Result<BatchOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requests = urls
            .into_iter()
            .map(|u| RequestDescriptor::new(method, u.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.fetch_many(&requests).await
    }

    /// Execute a batch, yielding results as they complete
    ///
    /// Items arrive in completion order; use [`FetchResult::index`] to map them
    /// back. All requests are validated before the stream is returned.
    pub fn fetch_stream(
        &self,
        requests: &[RequestDescriptor],
    ) -> Result<impl Stream<Item = FetchResult> + '_> {
        let jobs = requests
            .iter()
            .enumerate()
            .map(|(index, request)| self.prepare(index, request))
            .collect::<Result<Vec<_>>>()?;

        Ok(stream::iter(jobs)
            .map(move |job| dispatch(self.ctx.clone(), job))
            .buffer_unordered(self.workers))
    }

    fn prepare(&self, index: usize, request: &RequestDescriptor) -> Result<Job> {
        Ok(Job {
            index,
            method: request.method(),
            url: request.url().clone(),
            prepared: request.prepare(&self.identity)?,
        })
    }
}

/// Run `job` on its own task so a panic inside the transport stays contained
async fn dispatch(ctx: WorkerContext, job: Job) -> FetchResult {
    let index = job.index;
    let method = job.method;
    let url = job.url.clone();

    match tokio::spawn(run_worker(ctx.clone(), job)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(index, url = %url, error = %e, "Worker task failed");
            let outcome = Outcome::TransportFailed {
                error: TransportError::new(
                    TransportErrorKind::Aborted,
                    format!("worker task failed: {e}"),
                ),
                elapsed: std::time::Duration::ZERO,
            };
            // The worker died before it could record itself
            ctx.counters.record(method, &outcome);
            FetchResult {
                index,
                method,
                url,
                outcome,
            }
        }
    }
}

async fn run_worker(ctx: WorkerContext, job: Job) -> FetchResult {
    let Job {
        index,
        method,
        url,
        prepared,
    } = job;

    // Semaphore is never closed while the orchestrator is alive
    let _permit = match ctx.permits.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            return FetchResult {
                index,
                method,
                url,
                outcome: Outcome::TransportFailed {
                    error: TransportError::new(TransportErrorKind::Aborted, e.to_string()),
                    elapsed: std::time::Duration::ZERO,
                },
            };
        }
    };

    // The deadline starts once a worker slot is held, not while queued
    let timeout = prepared.timeout;
    let start = Instant::now();
    let result = match tokio::time::timeout(timeout, ctx.transport.execute(prepared)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::timeout(timeout)),
    };
    let outcome = classify(RawOutcome {
        result,
        elapsed: start.elapsed(),
    });

    ctx.counters.record(method, &outcome);
    if ctx.verbose {
        log_report(&url, &outcome);
    }

    FetchResult {
        index,
        method,
        url,
        outcome,
    }
}

/// Per-response report for verbose sessions
fn log_report(url: &Url, outcome: &Outcome) {
    match outcome {
        Outcome::Success(response) => tracing::debug!(
            url = %response.url,
            elapsed_ms = response.elapsed.as_millis() as u64,
            encoding = response.encoding().unwrap_or("unknown"),
            reason = response.reason().unwrap_or("unknown"),
            status = response.status,
            "Response report"
        ),
        Outcome::RejectedByServer {
            url,
            status,
            elapsed,
            ..
        } => tracing::debug!(
            url = %url,
            elapsed_ms = elapsed.as_millis() as u64,
            reason = crate::types::reason_phrase(*status).unwrap_or("unknown"),
            status = *status,
            "Response report"
        ),
        Outcome::TransportFailed { error, elapsed } => tracing::debug!(
            url = %url,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error,
            "Response report"
        ),
    }
}
