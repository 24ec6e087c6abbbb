use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Where a session's current (or last) run stands.
///
/// Happy path: `Idle → ExtractingContext → Generating → ValidatingGeneration → Analyzing
/// → ValidatingAnalysis → Merging → Done`. `Failed` is reachable from every
/// non-terminal state. A new run starts from `Idle`, `Done` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    ExtractingContext,
    Generating,
    ValidatingGeneration,
    Analyzing,
    ValidatingAnalysis,
    Merging,
    Done,
    Failed(String),
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Done | WorkflowState::Failed(_))
    }

    /// The state a successful stage hands over to.
    pub fn successor(&self) -> Option<WorkflowState> {
        use WorkflowState::*;
        match self {
            Idle => Some(ExtractingContext),
            ExtractingContext => Some(Generating),
            Generating => Some(ValidatingGeneration),
            ValidatingGeneration => Some(Analyzing),
            Analyzing => Some(ValidatingAnalysis),
            ValidatingAnalysis => Some(Merging),
            Merging => Some(Done),
            Done | Failed(_) => None,
        }
    }

    pub fn can_transition_to(&self, next: &WorkflowState) -> bool {
        match next {
            WorkflowState::Failed(_) => !self.is_terminal(),
            WorkflowState::Idle => matches!(self, WorkflowState::Idle) || self.is_terminal(),
            next => self.successor().as_ref() == Some(next),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid workflow transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: WorkflowState,
    pub to: WorkflowState,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Idle => write!(f, "idle"),
            WorkflowState::ExtractingContext => write!(f, "extracting_context"),
            WorkflowState::Generating => write!(f, "generating"),
            WorkflowState::ValidatingGeneration => write!(f, "validating_generation"),
            WorkflowState::Analyzing => write!(f, "analyzing"),
            WorkflowState::ValidatingAnalysis => write!(f, "validating_analysis"),
            WorkflowState::Merging => write!(f, "merging"),
            WorkflowState::Done => write!(f, "done"),
            WorkflowState::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}
