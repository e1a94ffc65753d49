//! # scrape-orchestrator
//!
//! Bounded-concurrency HTTP fetching for scrapers.
//!
//! ## Design Philosophy
//!
//! - **Bounded** - a worker pool sized once per session, never unbounded fan-out
//! - **Isolated** - one slow, failing or panicking request never affects its siblings
//! - **Ordered** - batch results come back in input order, not completion order
//! - **Lossless** - every failure is returned as data, nothing is only logged
//!
//! HTML parsing is deliberately not part of this crate: successful responses hand
//! their body bytes and declared encoding to whatever parser the caller uses.
//!
//! ## Quick Start
//!
//! ```no_run
//! use scrape_orchestrator::{FetchOrchestrator, Method, OrchestratorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = FetchOrchestrator::new(OrchestratorConfig::default())?;
//!
//!     let batch = orchestrator
//!         .fetch_urls(Method::Get, ["https://example.com/", "https://example.org/"])
//!         .await?;
//!
//!     for (index, response) in &batch.successes {
//!         println!("#{index}: {} bytes, encoding {:?}", response.body().len(), response.encoding());
//!     }
//!     for failure in &batch.failures {
//!         println!("#{} failed: {}", failure.index, failure.outcome.describe());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Response classification
pub mod classifier;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Per-session request identity
pub mod identity;
/// Fetch orchestration over a bounded worker pool
pub mod orchestrator;
/// Request descriptors and preparation
pub mod request;
/// Retry with exponential backoff, layered above the orchestrator
pub mod retry;
/// HTTP transport abstraction
pub mod transport;
/// Core types
pub mod types;

// Re-export commonly used types
pub use classifier::{RawOutcome, RawResponse, classify};
pub use config::{OrchestratorConfig, RetryConfig};
pub use error::{Error, Result, TransportError, TransportErrorKind};
pub use identity::SessionIdentity;
pub use orchestrator::{FetchOrchestrator, SessionStats};
pub use request::{Auth, PreparedRequest, RequestBody, RequestDescriptor, RequestOptions};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    BatchOutcome, FailureSummary, FetchResult, Method, Outcome, Response, StatusClass,
};
