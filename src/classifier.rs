//! Response classification
//!
//! [`classify`] reduces whatever the transport produced to exactly one
//! [`Outcome`] variant. It performs no I/O and never mutates its input's
//! source, so the same raw outcome always classifies the same way.
//!
//! | raw outcome                          | classified as      |
//! |--------------------------------------|--------------------|
//! | status 200..=399                     | `Success`          |
//! | status 100..=199 or 400..=999        | `RejectedByServer` |
//! | status outside 100..=999             | `TransportFailed`  |
//! | transport error (no status)          | `TransportFailed`  |
//!
//! Codes of 1000 and above are not treated as rejections: no HTTP status has
//! four digits, so such a value means the exchange itself was broken.

use crate::error::{TransportError, TransportErrorKind};
use crate::types::{Outcome, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use std::time::Duration;
use url::Url;

/// Response as delivered by a transport, before classification
#[derive(Clone, Debug)]
pub struct RawResponse {
    /// Final URL
    pub url: Url,
    /// Status code as received
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Body bytes
    pub body: Vec<u8>,
}

/// A transport result together with how long it took
#[derive(Clone, Debug)]
pub struct RawOutcome {
    /// Response or captured transport error
    pub result: Result<RawResponse, TransportError>,
    /// Wall time of the attempt
    pub elapsed: Duration,
}

/// Reduce a raw transport result to an [`Outcome`]
pub fn classify(raw: RawOutcome) -> Outcome {
    let RawOutcome { result, elapsed } = raw;

    let response = match result {
        Ok(response) => response,
        Err(error) => return Outcome::TransportFailed { error, elapsed },
    };

    match response.status {
        200..=399 => Outcome::Success(Response {
            encoding: extract_encoding(&response.headers),
            url: response.url,
            status: response.status,
            elapsed,
            headers: response.headers,
            body: response.body,
        }),
        100..=199 | 400..=999 => Outcome::RejectedByServer {
            url: response.url,
            status: response.status,
            headers: response.headers,
            elapsed,
        },
        other => Outcome::TransportFailed {
            error: TransportError::new(
                TransportErrorKind::Malformed,
                format!("invalid HTTP status code {other}"),
            ),
            elapsed,
        },
    }
}

/// `charset` parameter of the `Content-Type` header
///
/// Returns the value unquoted and lower-cased, e.g. `utf-8` for
/// `text/html; Charset="UTF-8"`.
pub fn extract_encoding(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"').trim();
        (!value.is_empty()).then(|| value.to_ascii_lowercase())
    })
}
