//! Configuration types for scrape-orchestrator

use crate::error::{Error, Result};
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

/// Main configuration for [`FetchOrchestrator`](crate::FetchOrchestrator)
///
/// Every field has a serde default, so an empty JSON object (`{}`) is a valid
/// configuration equivalent to [`OrchestratorConfig::default`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Per-request timeout in seconds, unless the request overrides it (default: 15)
    ///
    /// Serialized as whole seconds, rounded up, so a sub-second timeout set in
    /// code is written out as `1`. Use [`RequestOptions::timeout`](crate::RequestOptions::timeout)
    /// for sub-second deadlines that must survive a config round trip.
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Explicit worker pool size. When `None`, derived from available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,

    /// Workers held back from `2 * available_parallelism` (default: 4)
    ///
    /// The result is clamped to at least one worker.
    #[serde(default = "default_worker_reserve")]
    pub worker_reserve: usize,

    /// Fixed User-Agent. Takes precedence over `user_agents`.
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Pool of User-Agent strings to pick from once per session.
    ///
    /// Empty means the built-in browser pool is used.
    #[serde(default)]
    pub user_agents: Vec<String>,

    /// Extra headers sent with every request of the session
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,

    /// Log a per-response report at debug level
    #[serde(default)]
    pub verbose: bool,

    /// Retry policy for callers layering [`crate::retry`] on top of the orchestrator
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            workers: None,
            worker_reserve: default_worker_reserve(),
            user_agent: None,
            user_agents: Vec::new(),
            default_headers: BTreeMap::new(),
            verbose: false,
            retry: RetryConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Check the configuration for values the orchestrator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::config(
                "timeout must be greater than zero",
                "timeout",
            ));
        }
        if self.workers == Some(0) {
            return Err(Error::config(
                "workers must be at least 1 when set",
                "workers",
            ));
        }
        if let Some(ua) = &self.user_agent {
            if ua.trim().is_empty() {
                return Err(Error::config("user_agent must not be empty", "user_agent"));
            }
        }
        if self.user_agents.iter().any(|ua| ua.trim().is_empty()) {
            return Err(Error::config(
                "user_agents must not contain empty entries",
                "user_agents",
            ));
        }
        for (name, value) in &self.default_headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::config(format!("invalid header name {name:?}: {e}"), "default_headers")
            })?;
            HeaderValue::from_str(value).map_err(|e| {
                Error::config(
                    format!("invalid value for header {name:?}: {e}"),
                    "default_headers",
                )
            })?;
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "backoff_multiplier must be at least 1.0",
                "retry.backoff_multiplier",
            ));
        }
        Ok(())
    }

    /// Worker pool size for the given hardware concurrency hint
    pub fn resolve_workers(&self, available_parallelism: usize) -> usize {
        match self.workers {
            Some(n) => n.max(1),
            None => worker_count(available_parallelism, self.worker_reserve),
        }
    }
}

/// `2 * parallelism - reserve`, never below one
pub fn worker_count(available_parallelism: usize, reserve: usize) -> usize {
    available_parallelism
        .saturating_mul(2)
        .saturating_sub(reserve)
        .max(1)
}

/// Hardware concurrency hint from the OS, falling back to 1
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry in milliseconds (default: 500)
    #[serde(default = "default_initial_delay", with = "millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries in milliseconds (default: 30000)
    #[serde(default = "default_max_delay", with = "millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// Also retry 429/502/503/504 responses (default: true)
    #[serde(default = "default_true")]
    pub retry_server_busy: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
            retry_server_busy: true,
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_worker_reserve() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper, whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    // Rounds up so a non-zero timeout never serializes to 0
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
        serializer.serialize_u64(secs)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_doubles_and_subtracts_reserve() {
        assert_eq!(worker_count(8, 4), 12);
        assert_eq!(worker_count(4, 4), 4);
        assert_eq!(worker_count(16, 0), 32);
    }

    #[test]
    fn worker_count_clamps_to_one_on_small_machines() {
        // 2 * 1 - 4 and 2 * 2 - 4 would be negative / zero
        assert_eq!(worker_count(1, 4), 1);
        assert_eq!(worker_count(2, 4), 1);
        assert_eq!(worker_count(0, 0), 1);
    }

    #[test]
    fn explicit_workers_override_formula() {
        let config = OrchestratorConfig {
            workers: Some(4),
            ..Default::default()
        };
        assert_eq!(config.resolve_workers(64), 4);
    }

    #[test]
    fn empty_json_gives_defaults() {
        let config: OrchestratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.worker_reserve, 4);
        assert!(config.workers.is_none());
        assert!(!config.verbose);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(500));
        config.validate().unwrap();
    }

    #[test]
    fn config_round_trips_through_json() {
        let json = r#"{
            "timeout": 5,
            "workers": 8,
            "user_agent": "test-agent/1.0",
            "default_headers": {"Accept-Language": "en"},
            "retry": {"max_attempts": 1, "initial_delay": 50, "jitter": false}
        }"#;
        let config: OrchestratorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.workers, Some(8));
        assert_eq!(config.retry.initial_delay, Duration::from_millis(50));
        assert!(!config.retry.jitter);

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back["timeout"], 5);
        assert_eq!(back["retry"]["initial_delay"], 50);
    }

    #[test]
    fn sub_second_timeout_survives_round_trip() {
        let config = OrchestratorConfig {
            timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: OrchestratorConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back.timeout, Duration::from_secs(1));
        back.validate().unwrap();

        let exact = OrchestratorConfig {
            timeout: Duration::from_secs(7),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&exact).unwrap()["timeout"], 7);
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let config = OrchestratorConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("timeout")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let config = OrchestratorConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_default_header() {
        let mut config = OrchestratorConfig::default();
        config
            .default_headers
            .insert("bad header".to_string(), "x".to_string());
        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("default_headers"))
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_blank_user_agent() {
        let config = OrchestratorConfig {
            user_agent: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
