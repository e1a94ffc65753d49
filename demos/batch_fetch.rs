//! Batch fetch example
//!
//! This example demonstrates the core functionality of scrape-orchestrator:
//! - Configuring a session (timeout, User-Agent, worker pool)
//! - Fetching a batch of URLs and reading results in input order
//! - Inspecting failures without aborting the batch
//! - Streaming results as they complete
//! - Retrying a request that hit a busy server

use std::time::Duration;

use futures::StreamExt;
use scrape_orchestrator::retry::fetch_with_retry;
use scrape_orchestrator::{FetchOrchestrator, Method, OrchestratorConfig, RequestDescriptor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let config = OrchestratorConfig {
        timeout: Duration::from_secs(10),
        workers: Some(8),
        user_agent: Some("batch-fetch-demo/0.1".to_string()),
        verbose: true,
        ..Default::default()
    };
    let orchestrator = FetchOrchestrator::new(config)?;
    println!("Using {} workers", orchestrator.workers());

    let urls = [
        "https://example.com/",
        "https://example.org/",
        "https://httpbin.org/status/404",
        "https://does-not-resolve.invalid/",
        "  https://example.net/  ",
    ];

    // Whole batch, in input order
    let batch = orchestrator.fetch_urls(Method::Get, urls).await?;
    for (index, response) in &batch.successes {
        println!(
            "✓ #{index} {} -> {} ({} bytes, encoding {})",
            response.url,
            response.status,
            response.body().len(),
            response.encoding().unwrap_or("unknown"),
        );
    }
    for failure in &batch.failures {
        println!("✗ #{} {} -> {}", failure.index, failure.url, failure.outcome.describe());
    }
    println!("{}", serde_json::to_string_pretty(&batch.failure_summaries())?);

    // Same requests, reported as they finish
    let requests = urls
        .iter()
        .map(|u| RequestDescriptor::get(u))
        .collect::<Result<Vec<_>, _>>()?;
    let mut stream = std::pin::pin!(orchestrator.fetch_stream(&requests)?);
    while let Some(result) = stream.next().await {
        println!("finished #{} ({})", result.index, result.outcome.kind());
    }

    // Retry is layered on top: the orchestrator itself never resends
    let flaky = RequestDescriptor::get("https://httpbin.org/status/503")?;
    let outcome = fetch_with_retry(&orchestrator, &flaky, orchestrator.retry_config()).await?;
    println!("after retries: {}", outcome.describe());

    let stats = orchestrator.stats();
    println!(
        "{} requests: {} ok, {} rejected, {} transport failures",
        stats.requests, stats.successes, stats.rejected, stats.transport_failures
    );

    Ok(())
}
