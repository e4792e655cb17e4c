//! Per-call diagnostics.
//!
//! Every completed logical call, successful or not, produces one
//! [`CallReport`] listing each attempt (target checksum, duration, outcome)
//! and the final outcome. Reports are handed to [`CallObserver`]s such as the
//! metrics collector.

use std::time::Duration;

use relay_descriptor::Target;
use serde::{Deserialize, Serialize};

use super::error::{CallError, CallErrorKind};
use super::{MethodName, RequestId};

/// Outcome of one attempt against one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum AttemptOutcome {
    Succeeded,
    Failed {
        kind: CallErrorKind,
        fail_over_allowed: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub target_checksum: u32,
    pub target_address: String,
    pub duration: Duration,
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    pub fn succeeded(target: &Target, duration: Duration) -> Self {
        Self {
            target_checksum: target.checksum(),
            target_address: target.address().to_string(),
            duration,
            outcome: AttemptOutcome::Succeeded,
        }
    }

    pub fn failed(error: &CallError) -> Self {
        Self {
            target_checksum: error.target().checksum(),
            target_address: error.target().address().to_string(),
            duration: error.duration(),
            outcome: AttemptOutcome::Failed {
                kind: error.kind(),
                fail_over_allowed: error.is_fail_over_allowed(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded)
    }
}

/// Final outcome of a logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "kind")]
pub enum CallOutcome {
    Succeeded,
    Failed(CallErrorKind),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallReport {
    pub request_id: RequestId,
    pub method: MethodName,
    pub attempts: Vec<AttemptRecord>,
    pub total_duration: Duration,
    pub outcome: CallOutcome,
}

impl CallReport {
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    /// Number of times the call moved on to another target.
    pub fn failovers(&self) -> usize {
        self.attempts.len().saturating_sub(1)
    }

    pub fn last_target_checksum(&self) -> Option<u32> {
        self.attempts.last().map(|a| a.target_checksum)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CallOutcome::Succeeded)
    }
}

/// Receives a report for every completed logical call.
pub trait CallObserver: Send + Sync {
    fn on_call_complete(&self, report: &CallReport);
}
