//! Types for the processor module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::ConversionCandidate;

/// How a single candidate ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Succeeded,
    Failed(String),
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// The outcome of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOutcome {
    pub candidate: ConversionCandidate,
    pub outcome: ConversionOutcome,
}

/// Point-in-time counters of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    /// Conversions currently running.
    pub active: usize,
    /// Candidates with a recorded outcome.
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchProgress {
    /// A conversion acquired a worker slot.
    Started {
        source: PathBuf,
        active: usize,
    },
    /// A candidate finished, successfully or not.
    Finished {
        outcome: CandidateOutcome,
        snapshot: BatchSnapshot,
        total: usize,
    },
}

/// Final result of a batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One entry per candidate that ran, in completion order.
    pub outcomes: Vec<CandidateOutcome>,
    /// Number of candidates submitted.
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Wall time of the batch.
    pub elapsed: Duration,
    /// Whether the batch stopped early because it was cancelled.
    pub cancelled: bool,
}

impl BatchReport {
    /// Whether every submitted candidate ran and succeeded.
    pub fn is_complete_success(&self) -> bool {
        !self.cancelled && self.failed == 0 && self.processed == self.total
    }

    /// Candidates that did not convert.
    pub fn failures(&self) -> impl Iterator<Item = &CandidateOutcome> {
        self.outcomes.iter().filter(|o| !o.outcome.is_success())
    }

    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }
}
