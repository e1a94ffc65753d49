//! Common test utilities for scrape-orchestrator integration tests

#![allow(dead_code)]

use std::time::Duration;

use scrape_orchestrator::{FetchOrchestrator, OrchestratorConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// User-Agent every test orchestrator sends
pub const TEST_USER_AGENT: &str = "scrape-orchestrator-tests/1.0";

/// Orchestrator with a fixed User-Agent, four workers and the given timeout
pub fn test_orchestrator(timeout: Duration) -> FetchOrchestrator {
    let config = OrchestratorConfig {
        workers: Some(4),
        timeout,
        user_agent: Some(TEST_USER_AGENT.to_string()),
        ..Default::default()
    };
    FetchOrchestrator::new(config).expect("failed to build orchestrator")
}

/// Mock server serving `/page/{n}` as HTML for n in 0..count, plus
/// `/missing` (404) and `/broken` (500)
pub async fn page_server(count: usize) -> MockServer {
    let server = MockServer::start().await;

    for n in 0..count {
        Mock::given(method("GET"))
            .and(path(format!("/page/{n}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(format!("<html><body>page {n}</body></html>"))
                    // Later pages answer faster
                    .set_delay(Duration::from_millis(((count - n) * 5) as u64)),
            )
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    server
}

/// A local URL nothing is listening on
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/")
}
