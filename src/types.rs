//! Core types for scrape-orchestrator

use crate::error::{Error, TransportError, TransportErrorKind};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// HTTP method accepted by the orchestrator
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl Method {
    /// Every supported method, in declaration order
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Put,
        Method::Post,
        Method::Patch,
        Method::Delete,
        Method::Head,
        Method::Options,
    ];

    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }

    pub(crate) fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidMethod(s.to_string()))
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Broad class of an HTTP status code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    /// 1xx
    Informational,
    /// 2xx
    Success,
    /// 3xx
    Redirection,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// Anything outside 100..=599
    Unknown,
}

impl StatusClass {
    /// Class of `status`
    pub fn from_code(status: u16) -> Self {
        match status {
            100..=199 => StatusClass::Informational,
            200..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirection,
            400..=499 => StatusClass::ClientError,
            500..=599 => StatusClass::ServerError,
            _ => StatusClass::Unknown,
        }
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatusClass::Informational => "Informational Responses",
            StatusClass::Success => "Success",
            StatusClass::Redirection => "Redirection",
            StatusClass::ClientError => "Client Errors",
            StatusClass::ServerError => "Server Errors",
            StatusClass::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Canonical reason phrase for `status`, if it has one
pub fn reason_phrase(status: u16) -> Option<&'static str> {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
}

/// A successful (status in [200, 400)) response, fully buffered
///
/// `body` and `encoding` are what an HTML parser needs; this crate never looks
/// inside the body itself.
#[derive(Clone, Debug)]
pub struct Response {
    /// Final URL (after redirects, if the transport follows them)
    pub url: Url,
    /// HTTP status code
    pub status: u16,
    /// Wall time from dispatch to fully-read body
    pub elapsed: Duration,
    /// `charset` parameter of `Content-Type`, if present
    pub encoding: Option<String>,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl Response {
    /// Raw body bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Declared charset, if any
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Value of the `Content-Type` header
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Status class (always `Success` or `Redirection` for a `Response`)
    pub fn status_class(&self) -> StatusClass {
        StatusClass::from_code(self.status)
    }

    /// Canonical reason phrase
    pub fn reason(&self) -> Option<&'static str> {
        reason_phrase(self.status)
    }

    /// Body as text, replacing invalid UTF-8 sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Tagged result of one fetch attempt
#[derive(Clone, Debug)]
pub enum Outcome {
    /// Status in [200, 400)
    Success(Response),
    /// The server answered, but with a status outside [200, 400)
    RejectedByServer {
        /// Final URL
        url: Url,
        /// HTTP status code
        status: u16,
        /// Response headers
        headers: HeaderMap,
        /// Wall time until the response was read
        elapsed: Duration,
    },
    /// No response exists
    TransportFailed {
        /// What went wrong
        error: TransportError,
        /// Wall time until the failure
        elapsed: Duration,
    },
}

impl Outcome {
    /// True for [`Outcome::Success`]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Status code, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Success(r) => Some(r.status),
            Outcome::RejectedByServer { status, .. } => Some(*status),
            Outcome::TransportFailed { .. } => None,
        }
    }

    /// Elapsed wall time for the attempt
    pub fn elapsed(&self) -> Duration {
        match self {
            Outcome::Success(r) => r.elapsed,
            Outcome::RejectedByServer { elapsed, .. } | Outcome::TransportFailed { elapsed, .. } => {
                *elapsed
            }
        }
    }

    /// Short variant label: `success`, `rejected` or `transport_failed`
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::RejectedByServer { .. } => "rejected",
            Outcome::TransportFailed { .. } => "transport_failed",
        }
    }

    /// Transport error kind, for [`Outcome::TransportFailed`]
    pub fn transport_error_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Outcome::TransportFailed { error, .. } => Some(error.kind),
            _ => None,
        }
    }

    /// One-line description suitable for a log line
    pub fn describe(&self) -> String {
        match self {
            Outcome::Success(r) => format!("HTTP {}", r.status),
            Outcome::RejectedByServer { status, .. } => match reason_phrase(*status) {
                Some(reason) => format!("HTTP {status} {reason}"),
                None => format!("HTTP {status}"),
            },
            Outcome::TransportFailed { error, .. } => error.to_string(),
        }
    }

    /// The response, if this is a success
    pub fn into_success(self) -> Option<Response> {
        match self {
            Outcome::Success(r) => Some(r),
            _ => None,
        }
    }
}

/// One entry of a batch: the outcome for the request at `index`
#[derive(Clone, Debug)]
pub struct FetchResult {
    /// Position of the request in the caller's list
    pub index: usize,
    /// Method of the request
    pub method: Method,
    /// Requested URL (before query parameters and redirects)
    pub url: Url,
    /// What happened
    pub outcome: Outcome,
}

impl FetchResult {
    /// Flatten into a serializable summary
    pub fn summary(&self) -> FailureSummary {
        FailureSummary {
            index: self.index,
            method: self.method,
            url: self.url.to_string(),
            kind: self.outcome.kind(),
            status: self.outcome.status(),
            description: self.outcome.describe(),
        }
    }
}

/// Serializable view of a fetch result, for logs and reports
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    /// Position of the request in the caller's list
    pub index: usize,
    /// HTTP method
    pub method: Method,
    /// Requested URL
    pub url: String,
    /// `success`, `rejected` or `transport_failed`
    pub kind: &'static str,
    /// Status code, if a response was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Status line or error message
    pub description: String,
}

/// Partitioned results of a batch
///
/// Both vectors are ordered by input index, independent of completion order.
#[derive(Clone, Debug, Default)]
pub struct BatchOutcome {
    /// `(index, response)` for every request that succeeded
    pub successes: Vec<(usize, Response)>,
    /// Every request that did not succeed
    pub failures: Vec<FetchResult>,
}

impl BatchOutcome {
    /// Sort `results` by index and partition them into successes and failures
    pub fn from_results(mut results: Vec<FetchResult>) -> Self {
        results.sort_by_key(|r| r.index);

        let mut batch = BatchOutcome::default();
        for result in results {
            match result.outcome {
                Outcome::Success(response) => batch.successes.push((result.index, response)),
                _ => batch.failures.push(result),
            }
        }
        batch
    }

    /// Total number of results
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// True if the batch was empty
    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.failures.is_empty()
    }

    /// Input indices of the successful requests, ascending
    pub fn success_indices(&self) -> Vec<usize> {
        self.successes.iter().map(|(i, _)| *i).collect()
    }

    /// Successful responses without their indices
    pub fn into_responses(self) -> Vec<Response> {
        self.successes.into_iter().map(|(_, r)| r).collect()
    }

    /// Serializable summaries of the failures
    pub fn failure_summaries(&self) -> Vec<FailureSummary> {
        self.failures.iter().map(FetchResult::summary).collect()
    }
}
