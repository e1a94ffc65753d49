//! Per-session request identity
//!
//! A [`SessionIdentity`] is built once per orchestrator. The User-Agent is picked
//! at construction and then held fixed, so server behaviour that keys on the
//! client identity is reproducible for the whole session.

use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::time::Duration;

/// Browser User-Agent strings used when the configuration supplies none
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

/// Fixed header set and default timeout for one session
#[derive(Clone, Debug)]
pub struct SessionIdentity {
    user_agent: String,
    default_timeout: Duration,
    headers: HeaderMap,
}

impl SessionIdentity {
    /// Build from configuration, picking the User-Agent with the thread RNG
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self> {
        Self::from_config_with_rng(config, &mut rand::thread_rng())
    }

    /// Build from configuration with a caller-supplied RNG
    ///
    /// Precedence for the User-Agent: `config.user_agent`, then a random entry
    /// of `config.user_agents`, then a random entry of [`DEFAULT_USER_AGENTS`].
    pub fn from_config_with_rng<R: Rng + ?Sized>(
        config: &OrchestratorConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let user_agent = match &config.user_agent {
            Some(ua) => ua.clone(),
            None if !config.user_agents.is_empty() => config
                .user_agents
                .choose(rng)
                .cloned()
                .unwrap_or_default(),
            None => DEFAULT_USER_AGENTS
                .choose(rng)
                .map(|ua| (*ua).to_string())
                .unwrap_or_default(),
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }

        // The session User-Agent wins over a User-Agent in default_headers
        let ua_value = HeaderValue::from_str(&user_agent).map_err(|e| Error::InvalidHeader {
            name: USER_AGENT.to_string(),
            reason: e.to_string(),
        })?;
        headers.insert(USER_AGENT, ua_value);

        Ok(Self {
            user_agent,
            default_timeout: config.timeout,
            headers,
        })
    }

    /// Headers sent with every request of this session
    pub fn current_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Timeout applied when a request does not override it
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// The User-Agent chosen for this session
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
