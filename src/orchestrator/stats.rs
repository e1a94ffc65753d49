//! Per-session request counters

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use serde::Serialize;

use crate::types::{Method, Outcome};

/// Lock-free counters shared by all workers of one orchestrator
#[derive(Debug, Default)]
pub(super) struct SessionCounters {
    requests: AtomicU64,
    successes: AtomicU64,
    rejected: AtomicU64,
    transport_failures: AtomicU64,
    /// One bit per [`Method`], see `Method::bit`
    methods: AtomicU8,
}

impl SessionCounters {
    pub(super) fn record(&self, method: Method, outcome: &Outcome) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.methods.fetch_or(method.bit(), Ordering::Relaxed);
        let counter = match outcome {
            Outcome::Success(_) => &self.successes,
            Outcome::RejectedByServer { .. } => &self.rejected,
            Outcome::TransportFailed { .. } => &self.transport_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self) -> SessionStats {
        let bits = self.methods.load(Ordering::Relaxed);
        SessionStats {
            requests: self.requests.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            methods_used: Method::ALL
                .into_iter()
                .filter(|m| bits & m.bit() != 0)
                .collect(),
        }
    }
}

/// Request statistics for one orchestrator session
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Requests that reached a worker and were classified
    pub requests: u64,
    /// `Success` outcomes
    pub successes: u64,
    /// `RejectedByServer` outcomes
    pub rejected: u64,
    /// `TransportFailed` outcomes
    pub transport_failures: u64,
    /// Methods issued at least once, in [`Method::ALL`] order
    pub methods_used: Vec<Method>,
}

impl SessionStats {
    /// Whether `method` has been issued in this session
    pub fn used(&self, method: Method) -> bool {
        self.methods_used.contains(&method)
    }
}
