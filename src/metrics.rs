//! Run statistics
//!
//! Lock-free counters shared by the pipeline and the lifecycle manager. A
//! snapshot is logged at shutdown and included in the status report.
//!
//! # Example
//!
//! ```rust
//! use reader_paste::metrics::PipelineStats;
//!
//! let stats = PipelineStats::new();
//! stats.record_attachment();
//! assert_eq!(stats.snapshot().attachments, 1);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters for one agent process
#[derive(Debug)]
pub struct PipelineStats {
    runs: AtomicU64,
    runs_rejected: AtomicU64,
    candidates: AtomicU64,
    retrieval_attempts: AtomicU64,
    timeouts: AtomicU64,
    retrieval_failures: AtomicU64,
    attachments: AtomicU64,
    injection_failures: AtomicU64,
    reinitializations: AtomicU64,
    start_time: Instant,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Pipeline runs that acquired the mutex
    pub runs: u64,
    /// Triggers rejected because a run was in flight
    pub runs_rejected: u64,
    /// Validated candidate URLs
    pub candidates: u64,
    /// Reader requests issued
    pub retrieval_attempts: u64,
    /// Retrievals that ended in a timeout
    pub timeouts: u64,
    /// Retrievals that produced nothing
    pub retrieval_failures: u64,
    /// Paste sequences dispatched
    pub attachments: u64,
    /// Paste sequences that failed
    pub injection_failures: u64,
    /// Full reinitializations
    pub reinitializations: u64,
    /// Seconds since start
    pub uptime_seconds: u64,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStats {
    /// Fresh counters
    pub fn new() -> Self {
        Self {
            runs: AtomicU64::new(0),
            runs_rejected: AtomicU64::new(0),
            candidates: AtomicU64::new(0),
            retrieval_attempts: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            retrieval_failures: AtomicU64::new(0),
            attachments: AtomicU64::new(0),
            injection_failures: AtomicU64::new(0),
            reinitializations: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// A run acquired the mutex
    pub fn record_run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    /// A trigger found the mutex held
    pub fn record_rejected_run(&self) {
        self.runs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Candidates accepted by the scanner
    pub fn record_candidates(&self, count: usize) {
        self.candidates.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Finished retrieval with its attempt count
    pub fn record_retrieval(&self, attempts: u32, timed_out: bool, failed: bool) {
        self.retrieval_attempts
            .fetch_add(u64::from(attempts), Ordering::Relaxed);
        if timed_out {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
        }
        if failed {
            self.retrieval_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Dispatched paste sequence
    pub fn record_attachment(&self) {
        self.attachments.fetch_add(1, Ordering::Relaxed);
    }

    /// Failed paste sequence
    pub fn record_injection_failure(&self) {
        self.injection_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Full reinitialize
    pub fn record_reinitialization(&self) {
        self.reinitializations.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            runs_rejected: self.runs_rejected.load(Ordering::Relaxed),
            candidates: self.candidates.load(Ordering::Relaxed),
            retrieval_attempts: self.retrieval_attempts.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            retrieval_failures: self.retrieval_failures.load(Ordering::Relaxed),
            attachments: self.attachments.load(Ordering::Relaxed),
            injection_failures: self.injection_failures.load(Ordering::Relaxed),
            reinitializations: self.reinitializations.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = PipelineStats::new();
        stats.record_run();
        stats.record_rejected_run();
        stats.record_candidates(3);
        stats.record_retrieval(3, false, true);
        stats.record_retrieval(1, true, true);
        stats.record_retrieval(1, false, false);
        stats.record_attachment();
        stats.record_injection_failure();
        stats.record_reinitialization();

        let snap = stats.snapshot();
        assert_eq!(snap.runs, 1);
        assert_eq!(snap.runs_rejected, 1);
        assert_eq!(snap.candidates, 3);
        assert_eq!(snap.retrieval_attempts, 5);
        assert_eq!(snap.timeouts, 1);
        assert_eq!(snap.retrieval_failures, 2);
        assert_eq!(snap.attachments, 1);
        assert_eq!(snap.injection_failures, 1);
        assert_eq!(snap.reinitializations, 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(PipelineStats::new().snapshot()).unwrap();
        assert_eq!(json["attachments"], 0);
        assert!(json.get("uptime_seconds").is_some());
    }
}
