//! Structured results of a collection run

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::DataSource;
use crate::error::CollectorError;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase {
    Idle,
    AcquiringSession,
    CollectingSubscribers,
    CollectingPurchases,
    CollectingTips,
    Done,
    PartialFailure,
    Failed,
}

impl RunPhase {
    #[must_use]
    pub fn collecting(source: DataSource) -> Self {
        match source {
            DataSource::Subscribers => RunPhase::CollectingSubscribers,
            DataSource::Purchases => RunPhase::CollectingPurchases,
            DataSource::Tips => RunPhase::CollectingTips,
        }
    }

    /// A run is between `AcquiringSession` and its terminal phase
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(
            self,
            RunPhase::AcquiringSession
                | RunPhase::CollectingSubscribers
                | RunPhase::CollectingPurchases
                | RunPhase::CollectingTips
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunPhase::Idle => "idle",
            RunPhase::AcquiringSession => "acquiring session",
            RunPhase::CollectingSubscribers => "collecting subscribers",
            RunPhase::CollectingPurchases => "collecting purchases",
            RunPhase::CollectingTips => "collecting tips",
            RunPhase::Done => "done",
            RunPhase::PartialFailure => "partial failure",
            RunPhase::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// How one pass ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassStatus {
    Completed {
        /// Record blocks on the page
        blocks: usize,
        candidates: usize,
        extracted: usize,
        rejected: usize,
        inserted: usize,
        duplicates: usize,
    },
    /// No records appeared in time; nothing was written
    Skipped { reason: String },
    /// Browser or store failure; this pass's writes were rolled back
    Failed { kind: String, message: String },
}

impl PassStatus {
    pub(crate) fn failed(error: &CollectorError) -> Self {
        PassStatus::Failed {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Result of one collection pass
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub source: DataSource,
    pub status: PassStatus,
    pub duration: Duration,
}

impl PassReport {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, PassStatus::Failed { .. })
    }

    #[must_use]
    pub fn inserted(&self) -> usize {
        match self.status {
            PassStatus::Completed { inserted, .. } => inserted,
            _ => 0,
        }
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every pass completed or was skipped for lack of records
    Done,
    /// At least one pass failed; the others were kept
    PartialFailure,
    /// No session could be acquired; nothing was collected
    Failed { kind: String, message: String },
}

/// Structured result of [`Collector::run`](super::Collector::run)
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub outcome: RunOutcome,
    pub passes: Vec<PassReport>,
}

impl RunReport {
    pub(crate) fn from_passes(started_at: DateTime<Local>, passes: Vec<PassReport>) -> Self {
        let outcome = if passes.iter().any(PassReport::is_failed) {
            RunOutcome::PartialFailure
        } else {
            RunOutcome::Done
        };
        Self {
            started_at,
            finished_at: Local::now(),
            outcome,
            passes,
        }
    }

    pub(crate) fn session_failed(started_at: DateTime<Local>, error: &CollectorError) -> Self {
        Self {
            started_at,
            finished_at: Local::now(),
            outcome: RunOutcome::Failed {
                kind: error.kind().to_string(),
                message: error.to_string(),
            },
            passes: Vec::new(),
        }
    }

    /// A run whose future was dropped before it reached a terminal phase
    pub(crate) fn cancelled(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            finished_at: Local::now(),
            outcome: RunOutcome::Failed {
                kind: "cancelled".to_string(),
                message: "run was cancelled before it finished".to_string(),
            },
            passes: Vec::new(),
        }
    }

    /// Boolean view: every pass completed or was skipped
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Done
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        match self.outcome {
            RunOutcome::Done => RunPhase::Done,
            RunOutcome::PartialFailure => RunPhase::PartialFailure,
            RunOutcome::Failed { .. } => RunPhase::Failed,
        }
    }

    /// Rows added across all passes
    #[must_use]
    pub fn total_inserted(&self) -> usize {
        self.passes.iter().map(PassReport::inserted).sum()
    }

    #[must_use]
    pub fn pass(&self, source: DataSource) -> Option<&PassReport> {
        self.passes.iter().find(|p| p.source == source)
    }

    /// One-line summary for logs and the dashboard banner
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.outcome {
            RunOutcome::Done => format!("Collection finished: {} new rows", self.total_inserted()),
            RunOutcome::PartialFailure => {
                let failed: Vec<String> = self
                    .passes
                    .iter()
                    .filter(|p| p.is_failed())
                    .map(|p| p.source.to_string())
                    .collect();
                format!(
                    "Collection finished with errors in {}: {} new rows",
                    failed.join(", "),
                    self.total_inserted()
                )
            }
            RunOutcome::Failed { message, .. } => format!("Collection failed: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(source: DataSource, inserted: usize) -> PassReport {
        PassReport {
            source,
            status: PassStatus::Completed {
                blocks: 5,
                candidates: 4,
                extracted: 3,
                rejected: 1,
                inserted,
                duplicates: 3 - inserted,
            },
            duration: Duration::from_millis(10),
        }
    }

    #[test]
    fn skipped_pass_does_not_fail_the_run() {
        let passes = vec![
            completed(DataSource::Subscribers, 2),
            PassReport {
                source: DataSource::Purchases,
                status: PassStatus::Skipped { reason: "no records".into() },
                duration: Duration::ZERO,
            },
            completed(DataSource::Tips, 1),
        ];
        let report = RunReport::from_passes(Local::now(), passes);
        assert!(report.is_success());
        assert_eq!(report.total_inserted(), 3);
        assert_eq!(report.phase(), RunPhase::Done);
    }

    #[test]
    fn failed_pass_is_partial_failure() {
        let passes = vec![
            completed(DataSource::Subscribers, 2),
            PassReport {
                source: DataSource::Purchases,
                status: PassStatus::Failed {
                    kind: "store".into(),
                    message: "disk full".into(),
                },
                duration: Duration::ZERO,
            },
        ];
        let report = RunReport::from_passes(Local::now(), passes);
        assert!(!report.is_success());
        assert_eq!(report.outcome, RunOutcome::PartialFailure);
        assert!(report.summary().contains("purchases"));
    }

    #[test]
    fn session_failure_carries_the_error_kind() {
        let report = RunReport::session_failed(
            Local::now(),
            &CollectorError::AuthRequired(Duration::from_secs(10)),
        );
        assert!(report.passes.is_empty());
        assert_eq!(report.phase(), RunPhase::Failed);
        match report.outcome {
            RunOutcome::Failed { kind, .. } => assert_eq!(kind, "auth_required"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn cancelled_run_is_failed() {
        let report = RunReport::cancelled(Local::now());
        assert_eq!(report.phase(), RunPhase::Failed);
        assert!(report.summary().contains("cancelled"));
    }
}
