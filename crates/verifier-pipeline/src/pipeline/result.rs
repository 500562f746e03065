use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError};

/// Stage of a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Proving,
    Encoding,
    Calling,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proving => write!(f, "proving"),
            Self::Encoding => write!(f, "encoding"),
            Self::Calling => write!(f, "calling"),
        }
    }
}

/// Final outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The verifier answered. `valid: false` means the proof was checked and rejected,
    /// which is still a successful run.
    Verified { valid: bool },
    /// The run halted at the recorded stage.
    Failed { kind: ErrorKind, message: String },
}

/// PipelineRunResult records how far a single run got and how it ended.
///
/// Built once when the run finishes; it exposes no way to modify it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRunResult {
    run_id: u64,
    stage: Stage,
    outcome: RunOutcome,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl PipelineRunResult {
    pub(crate) fn verified(run_id: u64, started_at: DateTime<Utc>, valid: bool) -> Self {
        Self {
            run_id,
            stage: Stage::Calling,
            outcome: RunOutcome::Verified { valid },
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub(crate) fn failed(run_id: u64, started_at: DateTime<Utc>, stage: Stage, err: &PipelineError) -> Self {
        Self {
            run_id,
            stage,
            outcome: RunOutcome::Failed {
                kind: err.kind(),
                message: err.to_string(),
            },
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// The last stage the run entered.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn outcome(&self) -> &RunOutcome {
        &self.outcome
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// True when the pipeline completed, whatever the verifier answered.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Verified { .. })
    }

    /// The verifier's answer, if the call completed.
    pub fn verified_result(&self) -> Option<bool> {
        match self.outcome {
            RunOutcome::Verified { valid } => Some(valid),
            RunOutcome::Failed { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            RunOutcome::Verified { .. } => None,
            RunOutcome::Failed { kind, .. } => Some(*kind),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Verified { .. } => None,
            RunOutcome::Failed { message, .. } => Some(message),
        }
    }
}

impl fmt::Display for PipelineRunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            RunOutcome::Verified { valid } => {
                write!(f, "run {} completed: verifier returned {valid}", self.run_id)
            }
            RunOutcome::Failed { kind, message } => {
                write!(f, "run {} failed at {} with {kind}: {message}", self.run_id, self.stage)
            }
        }
    }
}
