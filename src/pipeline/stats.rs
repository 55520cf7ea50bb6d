use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters updated once per request.
///
/// Counters are independent relaxed atomics; a snapshot taken while requests
/// are in flight may be momentarily inconsistent across fields.
#[derive(Debug, Default)]
pub struct PipelineStats {
    requests: AtomicU64,
    responded: AtomicU64,
    passed_through: AtomicU64,
    failed: AtomicU64,
    aborted: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requests: u64,
    /// Requests answered by a step (including error responses)
    pub responded: u64,
    pub passed_through: u64,
    /// Subset of `responded` produced by a raised error
    pub failed: u64,
    pub aborted: u64,
}

impl PipelineStats {
    pub(crate) fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_responded(&self, failed: bool) {
        self.responded.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_passed_through(&self) {
        self.passed_through.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            responded: self.responded.load(Ordering::Relaxed),
            passed_through: self.passed_through.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
        }
    }
}
