//! HTTP transport abstraction
//!
//! The orchestrator only needs "send this prepared request, give me status,
//! headers and body or an error". [`ReqwestTransport`] is the production
//! implementation; tests plug in doubles through the same trait.

use crate::classifier::RawResponse;
use crate::error::{Result, TransportError};
use crate::request::PreparedRequest;

/// Abstraction over HTTP request execution, enabling testability.
///
/// Implementations are shared across all workers of an orchestrator and must
/// be safe for concurrent use.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request
    ///
    /// The orchestrator enforces `request.timeout` around this call as well, so
    /// an implementation that ignores it still cannot hold a worker forever.
    async fn execute(&self, request: PreparedRequest) -> std::result::Result<RawResponse, TransportError>;
}

/// Production [`Transport`] backed by a shared `reqwest::Client`
///
/// The client's connection pool is shared by every worker; reqwest makes it
/// safe to use concurrently.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with a fresh client
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client (custom TLS, proxies, redirect policy, ...)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: PreparedRequest) -> std::result::Result<RawResponse, TransportError> {
        let PreparedRequest {
            method,
            url,
            headers,
            body,
            basic_auth,
            timeout,
        } = request;

        let mut builder = self
            .client
            .request(method.into(), url)
            .headers(headers)
            .timeout(timeout);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        if let Some((username, password)) = basic_auth {
            builder = builder.basic_auth(username, password);
        }

        let response = builder.send().await?;

        let url = response.url().clone();
        let status = response.status().as_u16();
        let headers = response.headers().clone();

        // Note: fully buffered, no streaming
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            url,
            status,
            headers,
            body,
        })
    }
}
