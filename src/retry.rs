//! Retry with exponential backoff, layered above the orchestrator
//!
//! The orchestrator itself never retries: a failed request is reported once, as
//! data. Callers who want retries wrap single fetches with [`fetch_with_retry`],
//! which re-issues a request while its [`Outcome`] is transient.
//!
//! # Example
//!
//! ```no_run
//! use scrape_orchestrator::{FetchOrchestrator, OrchestratorConfig, RequestDescriptor};
//! use scrape_orchestrator::retry::fetch_with_retry;
//!
//! # async fn example() -> scrape_orchestrator::Result<()> {
//! let orchestrator = FetchOrchestrator::new(OrchestratorConfig::default())?;
//! let request = RequestDescriptor::get("https://example.com/")?;
//! let outcome = fetch_with_retry(&orchestrator, &request, orchestrator.retry_config()).await?;
//! println!("{}", outcome.describe());
//! # Ok(())
//! # }
//! ```

use crate::FetchOrchestrator;
use crate::config::RetryConfig;
use crate::error::{Result, TransportError};
use crate::request::RequestDescriptor;
use crate::types::Outcome;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for results that can be classified as retryable or not
///
/// Transient failures (timeouts, refused connections, overloaded servers) should
/// return `true`. Permanent ones (404, malformed responses) should return `false`.
pub trait IsRetryable {
    /// Returns true if the failure is transient and the request should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for TransportError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

impl IsRetryable for Outcome {
    fn is_retryable(&self) -> bool {
        match self {
            Outcome::Success(_) => false,
            Outcome::RejectedByServer { status, .. } => is_server_busy(*status),
            Outcome::TransportFailed { error, .. } => error.is_retryable(),
        }
    }
}

/// 429 Too Many Requests and the 502/503/504 gateway family
fn is_server_busy(status: u16) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
}

/// Fetch `request` through `orchestrator`, retrying transient outcomes
///
/// Returns the first non-retryable outcome, or the last outcome once
/// `config.max_attempts` retries are exhausted. Configuration errors from the
/// orchestrator are returned immediately.
pub async fn fetch_with_retry(
    orchestrator: &FetchOrchestrator,
    request: &RequestDescriptor,
    config: &RetryConfig,
) -> Result<Outcome> {
    retry_outcome(config, || orchestrator.fetch_one(request)).await
}

/// Execute an async fetch with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, delays, backoff multiplier, jitter)
/// * `operation` - Async closure producing one [`Outcome`] per call
pub async fn retry_outcome<F, Fut>(config: &RetryConfig, mut operation: F) -> Result<Outcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Outcome>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        let outcome = operation().await?;

        let retryable = match &outcome {
            Outcome::RejectedByServer { .. } if !config.retry_server_busy => false,
            other => other.is_retryable(),
        };

        if !retryable {
            if attempt > 0 && outcome.is_success() {
                tracing::info!(attempts = attempt + 1, "Request succeeded after retry");
            }
            return Ok(outcome);
        }

        if attempt >= config.max_attempts {
            tracing::error!(
                outcome = %outcome.describe(),
                attempts = attempt + 1,
                "Request failed after all retry attempts exhausted"
            );
            return Ok(outcome);
        }

        attempt += 1;

        tracing::warn!(
            outcome = %outcome.describe(),
            attempt = attempt,
            max_attempts = config.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Request failed, retrying"
        );

        let jittered_delay = if config.jitter {
            add_jitter(delay)
        } else {
            delay
        };
        tokio::time::sleep(jittered_delay).await;

        // Calculate next delay with exponential backoff
        let next_delay = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
        delay = next_delay.min(config.max_delay);
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
