//! Request descriptors and their preparation against a session identity
//!
//! A [`RequestDescriptor`] is what the caller submits. Before dispatch the
//! orchestrator turns it into a [`PreparedRequest`]: query merged into the URL,
//! identity headers merged with request headers (request wins), body encoded,
//! timeout resolved. All validation happens here, so a bad header or body is an
//! `Err` at the call site and never a failed entry inside a batch.

use crate::error::{Error, Result};
use crate::identity::SessionIdentity;
use crate::types::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Request body
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// Raw bytes, sent as-is
    Bytes(Vec<u8>),
    /// JSON document, sent with `Content-Type: application/json`
    Json(serde_json::Value),
    /// Form fields, url-encoded with `Content-Type: application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

/// Credentials attached to a single request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Auth {
    /// HTTP basic auth
    Basic {
        /// User name
        username: String,
        /// Optional password
        password: Option<String>,
    },
    /// `Authorization: Bearer <token>`
    Bearer(String),
}

/// Per-request options
///
/// Everything here overrides the session defaults for this one request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    /// Query parameters appended to the target URL
    pub query: Vec<(String, String)>,
    /// Extra headers; these win over session headers with the same name
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: RequestBody,
    /// Credentials
    pub auth: Option<Auth>,
    /// Timeout override for this request
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send raw bytes as the body
    pub fn bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = RequestBody::Bytes(body.into());
        self
    }

    /// Serialize `body` as JSON
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Send url-encoded form fields
    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// HTTP basic auth
    pub fn basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.auth = Some(Auth::Basic {
            username: username.into(),
            password,
        });
        self
    }

    /// Bearer token auth
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(Auth::Bearer(token.into()));
        self
    }

    /// Override the session timeout for this request
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Immutable description of one request
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    target: Url,
    options: RequestOptions,
}

impl RequestDescriptor {
    /// Validate `target` and build a descriptor with default options
    ///
    /// Surrounding whitespace is trimmed. Empty, unparsable and non-http(s)
    /// URLs are rejected with [`Error::InvalidUrl`].
    pub fn new(method: Method, target: &str) -> Result<Self> {
        let trimmed = target.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidUrl {
                url: target.to_string(),
                reason: "URL is empty".to_string(),
            });
        }
        let url = Url::parse(trimmed).map_err(|e| Error::InvalidUrl {
            url: target.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl {
                url: target.to_string(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }
        Ok(Self {
            method,
            target: url,
            options: RequestOptions::default(),
        })
    }

    /// Parse the method from a string, then build as [`RequestDescriptor::new`]
    pub fn parse(method: &str, target: &str) -> Result<Self> {
        Self::new(method.parse()?, target)
    }

    /// GET `target`
    pub fn get(target: &str) -> Result<Self> {
        Self::new(Method::Get, target)
    }

    /// Replace the options
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// HTTP method
    pub fn method(&self) -> Method {
        self.method
    }

    /// Target URL, without the query parameters from the options
    pub fn url(&self) -> &Url {
        &self.target
    }

    /// Request options
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Resolve against the session identity into something a transport can send
    pub fn prepare(&self, identity: &SessionIdentity) -> Result<PreparedRequest> {
        let mut url = self.target.clone();
        if !self.options.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &self.options.query {
                pairs.append_pair(k, v);
            }
        }

        let request_headers = self
            .options
            .headers
            .iter()
            .map(|(name, value)| parse_header(name, value))
            .collect::<Result<Vec<_>>>()?;

        // A request header replaces the session default of the same name;
        // repeated request headers all go out
        let mut headers = identity.current_headers().clone();
        for (name, _) in &request_headers {
            headers.remove(name);
        }
        for (name, value) in request_headers {
            headers.append(name, value);
        }

        let (body, content_type) = encode_body(&self.options.body)?;
        if let Some(ct) = content_type {
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
            }
        }

        let mut basic_auth = None;
        match &self.options.auth {
            Some(Auth::Basic { username, password }) => {
                // The transport adds its own Authorization header for these
                headers.remove(AUTHORIZATION);
                basic_auth = Some((username.clone(), password.clone()));
            }
            Some(Auth::Bearer(token)) => {
                let (_, value) = parse_header(AUTHORIZATION.as_str(), &format!("Bearer {token}"))?;
                headers.insert(AUTHORIZATION, value);
            }
            None => {}
        }

        let timeout = self
            .options
            .timeout
            .unwrap_or_else(|| identity.default_timeout());
        if timeout.is_zero() {
            return Err(Error::config(
                "request timeout must be greater than zero",
                "timeout",
            ));
        }

        Ok(PreparedRequest {
            method: self.method,
            url,
            headers,
            body,
            basic_auth,
            timeout,
        })
    }
}

/// A request with every session default applied, ready for a transport
#[derive(Clone, Debug)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: Method,
    /// Final URL including query parameters
    pub url: Url,
    /// Merged headers
    pub headers: HeaderMap,
    /// Encoded body, if any
    pub body: Option<Vec<u8>>,
    /// Basic auth credentials for the transport to apply
    pub basic_auth: Option<(String, Option<String>)>,
    /// Deadline for the whole exchange
    pub timeout: Duration,
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok((header_name, header_value))
}

fn encode_body(body: &RequestBody) -> Result<(Option<Vec<u8>>, Option<&'static str>)> {
    Ok(match body {
        RequestBody::Empty => (None, None),
        RequestBody::Bytes(bytes) => (Some(bytes.clone()), None),
        RequestBody::Json(value) => (Some(serde_json::to_vec(value)?), Some("application/json")),
        RequestBody::Form(fields) => {
            let encoded = fields
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            (
                Some(encoded.into_bytes()),
                Some("application/x-www-form-urlencoded"),
            )
        }
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;
    use reqwest::header::{ACCEPT, USER_AGENT};

    fn identity() -> SessionIdentity {
        let config = OrchestratorConfig {
            user_agent: Some("session-agent/1.0".to_string()),
            timeout: Duration::from_secs(15),
            ..Default::default()
        };
        SessionIdentity::from_config(&config).unwrap()
    }

    #[test]
    fn new_trims_whitespace() {
        let desc = RequestDescriptor::get("  http://example.com/page \n").unwrap();
        assert_eq!(desc.url().as_str(), "http://example.com/page");
        assert_eq!(desc.method(), Method::Get);
    }

    #[test]
    fn new_rejects_empty_url() {
        match RequestDescriptor::get("   ") {
            Err(Error::InvalidUrl { reason, .. }) => assert_eq!(reason, "URL is empty"),
            other => panic!("expected InvalidUrl, got {other:?}"),
        }
    }

    #[test]
    fn new_rejects_unparsable_and_non_http_urls() {
        assert!(matches!(
            RequestDescriptor::get("not a url"),
            Err(Error::InvalidUrl { .. })
        ));
        assert!(matches!(
            RequestDescriptor::get("ftp://example.com/file"),
            Err(Error::InvalidUrl { .. })
        ));
    }

    #[test]
    fn parse_rejects_unknown_method() {
        match RequestDescriptor::parse("FETCH", "http://example.com") {
            Err(Error::InvalidMethod(m)) => assert_eq!(m, "FETCH"),
            other => panic!("expected InvalidMethod, got {other:?}"),
        }
    }

    #[test]
    fn prepare_applies_session_defaults() {
        let prepared = RequestDescriptor::get("http://example.com/")
            .unwrap()
            .prepare(&identity())
            .unwrap();
        assert_eq!(prepared.headers[USER_AGENT], "session-agent/1.0");
        assert_eq!(prepared.timeout, Duration::from_secs(15));
        assert!(prepared.body.is_none());
    }

    #[test]
    fn request_options_take_precedence() {
        let options = RequestOptions::new()
            .header("User-Agent", "override/2.0")
            .timeout(Duration::from_millis(300));
        let prepared = RequestDescriptor::get("http://example.com/")
            .unwrap()
            .with_options(options)
            .prepare(&identity())
            .unwrap();
        assert_eq!(prepared.headers[USER_AGENT], "override/2.0");
        assert_eq!(prepared.headers.get_all(USER_AGENT).iter().count(), 1);
        assert_eq!(prepared.timeout, Duration::from_millis(300));
    }

    #[test]
    fn query_parameters_are_appended() {
        let options = RequestOptions::new().query("q", "rust lang").query("page", "2");
        let prepared = RequestDescriptor::get("http://example.com/search?lang=en")
            .unwrap()
            .with_options(options)
            .prepare(&identity())
            .unwrap();
        assert_eq!(
            prepared.url.as_str(),
            "http://example.com/search?lang=en&q=rust+lang&page=2"
        );
    }

    #[test]
    fn json_body_sets_content_type() {
        let options = RequestOptions::new()
            .json(&serde_json::json!({"name": "value"}))
            .unwrap();
        let prepared = RequestDescriptor::new(Method::Post, "http://example.com/post")
            .unwrap()
            .with_options(options)
            .prepare(&identity())
            .unwrap();
        assert_eq!(prepared.headers[CONTENT_TYPE], "application/json");
        assert_eq!(prepared.body.unwrap(), br#"{"name":"value"}"#.to_vec());
    }

    #[test]
    fn form_body_is_url_encoded() {
        let options = RequestOptions::new().form([("a b", "c&d"), ("x", "1")]);
        let prepared = RequestDescriptor::new(Method::Post, "http://example.com/post")
            .unwrap()
            .with_options(options)
            .prepare(&identity())
            .unwrap();
        assert_eq!(
            prepared.headers[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        assert_eq!(prepared.body.unwrap(), b"a%20b=c%26d&x=1".to_vec());
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let options = RequestOptions::new()
            .header("Content-Type", "application/vnd.api+json")
            .json(&serde_json::json!([1, 2]))
            .unwrap();
        let prepared = RequestDescriptor::new(Method::Put, "http://example.com/put")
            .unwrap()
            .with_options(options)
            .prepare(&identity())
            .unwrap();
        assert_eq!(prepared.headers[CONTENT_TYPE], "application/vnd.api+json");
    }

    #[test]
    fn bearer_and_basic_auth() {
        let bearer = RequestDescriptor::get("http://example.com/")
            .unwrap()
            .with_options(RequestOptions::new().bearer_auth("tok"))
            .prepare(&identity())
            .unwrap();
        assert_eq!(bearer.headers[AUTHORIZATION], "Bearer tok");
        assert!(bearer.basic_auth.is_none());

        let basic = RequestDescriptor::get("http://example.com/")
            .unwrap()
            .with_options(RequestOptions::new().basic_auth("user", Some("pw".to_string())))
            .prepare(&identity())
            .unwrap();
        assert_eq!(
            basic.basic_auth,
            Some(("user".to_string(), Some("pw".to_string())))
        );
    }

    #[test]
    fn repeated_request_header_keeps_every_value() {
        let mut config = OrchestratorConfig {
            user_agent: Some("session-agent/1.0".to_string()),
            ..Default::default()
        };
        config
            .default_headers
            .insert("Accept".to_string(), "*/*".to_string());
        let identity = SessionIdentity::from_config(&config).unwrap();

        let options = RequestOptions::new()
            .header("Accept", "text/html")
            .header("Accept", "application/json");
        let prepared = RequestDescriptor::get("http://example.com/")
            .unwrap()
            .with_options(options)
            .prepare(&identity)
            .unwrap();

        let values: Vec<&str> = prepared
            .headers
            .get_all(ACCEPT)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["text/html", "application/json"]);
    }

    #[test]
    fn basic_auth_replaces_session_authorization() {
        let mut config = OrchestratorConfig::default();
        config
            .default_headers
            .insert("Authorization".to_string(), "Bearer session-token".to_string());
        let identity = SessionIdentity::from_config(&config).unwrap();

        let prepared = RequestDescriptor::get("http://example.com/")
            .unwrap()
            .with_options(RequestOptions::new().basic_auth("user", Some("pw".to_string())))
            .prepare(&identity)
            .unwrap();

        assert!(prepared.headers.get(AUTHORIZATION).is_none());
        assert_eq!(
            prepared.basic_auth,
            Some(("user".to_string(), Some("pw".to_string())))
        );

        let untouched = RequestDescriptor::get("http://example.com/")
            .unwrap()
            .prepare(&identity)
            .unwrap();
        assert_eq!(untouched.headers[AUTHORIZATION], "Bearer session-token");
    }

    #[test]
    fn invalid_header_is_a_synchronous_error() {
        let result = RequestDescriptor::get("http://example.com/")
            .unwrap()
            .with_options(RequestOptions::new().header("bad header", "v"))
            .prepare(&identity());
        match result {
            Err(Error::InvalidHeader { name, .. }) => assert_eq!(name, "bad header"),
            other => panic!("expected InvalidHeader, got {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_override_is_rejected() {
        let result = RequestDescriptor::get("http://example.com/")
            .unwrap()
            .with_options(RequestOptions::new().timeout(Duration::ZERO))
            .prepare(&identity());
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
