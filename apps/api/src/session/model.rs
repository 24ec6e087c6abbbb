use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

use crate::ledger::{CostLedger, CostSnapshot, LedgerError};
use crate::pipeline::state::InvalidTransition;
use crate::pipeline::WorkflowState;
use crate::simulation::merge::MergeGap;
use crate::simulation::models::{MergedRecord, SimulationRequest};

pub const READY_STATUS: &str = "Ready to Simulate.";

/// A finished pipeline run. Immutable once stored on the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRun {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub request: SimulationRequest,
    pub job_description: String,
    pub records: Vec<MergedRecord>,
    pub gaps: Vec<MergeGap>,
    /// Session ledger as of the moment the run reached `Done`.
    pub cost: CostSnapshot,
}

/// Read-only copy of a session, republished on every change.
///
/// Readers take it from the watch channel without touching the run lock, so progress
/// stays visible while a run holds the session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub state: WorkflowState,
    pub status: String,
    pub cost: CostSnapshot,
    pub runs: Arc<[SimulationRun]>,
    pub last_active: Instant,
}

pub type SnapshotHandle = Arc<watch::Sender<SessionSnapshot>>;

/// Everything one session accumulates across repeated runs.
#[derive(Debug)]
pub struct SessionContext {
    id: Uuid,
    created_at: DateTime<Utc>,
    ledger: CostLedger,
    runs: Vec<SimulationRun>,
    state: WorkflowState,
    status: String,
    published: SnapshotHandle,
}

impl SessionContext {
    pub fn new(id: Uuid) -> Self {
        let created_at = Utc::now();
        let (published, _) = watch::channel(SessionSnapshot {
            id,
            created_at,
            state: WorkflowState::Idle,
            status: READY_STATUS.to_string(),
            cost: CostSnapshot::default(),
            runs: Arc::from(Vec::new()),
            last_active: Instant::now(),
        });
        Self {
            id,
            created_at,
            ledger: CostLedger::new(),
            runs: Vec::new(),
            state: WorkflowState::Idle,
            status: READY_STATUS.to_string(),
            published: Arc::new(published),
        }
    }

    /// Sender side of the snapshot channel, shared with the store.
    pub fn snapshot_handle(&self) -> SnapshotHandle {
        self.published.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.published.borrow().clone()
    }

    fn publish(&self) {
        self.published.send_modify(|snapshot| {
            snapshot.created_at = self.created_at;
            snapshot.state = self.state.clone();
            snapshot.status = self.status.clone();
            snapshot.cost = self.ledger.snapshot();
            snapshot.last_active = Instant::now();
        });
    }

    /// Starts over with an empty ledger and no runs. The id and snapshot channel survive.
    pub fn reset(&mut self) {
        self.created_at = Utc::now();
        self.ledger = CostLedger::new();
        self.runs.clear();
        self.state = WorkflowState::Idle;
        self.status = READY_STATUS.to_string();
        self.published.send_modify(|snapshot| snapshot.runs = Arc::from(Vec::new()));
        self.publish();
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.publish();
    }

    pub fn ledger(&self) -> &CostLedger {
        &self.ledger
    }

    pub fn track_cost(&mut self, provider: &str, amount: f64) -> Result<(), LedgerError> {
        self.ledger.track(provider, amount)?;
        self.publish();
        Ok(())
    }

    /// Moves the workflow state, refusing anything the state machine does not allow.
    pub fn transition(&mut self, next: WorkflowState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(&next) {
            return Err(InvalidTransition {
                from: self.state.clone(),
                to: next,
            });
        }
        self.state = next;
        self.publish();
        Ok(())
    }

    pub(crate) fn record_run(&mut self, run: SimulationRun) {
        self.runs.push(run);
        let runs: Arc<[SimulationRun]> = self.runs.clone().into();
        self.published.send_modify(|snapshot| snapshot.runs = runs);
    }

    /// Abandons an in-flight run. Partial results were never stored; spend stays.
    pub(crate) fn cancel_run(&mut self) {
        self.state = WorkflowState::Idle;
        self.status = "Run cancelled.".to_string();
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let session = SessionContext::new(Uuid::new_v4());
        assert_eq!(session.state(), &WorkflowState::Idle);
        assert_eq!(session.snapshot().status, READY_STATUS);
        assert!(session.snapshot().runs.is_empty());
        assert_eq!(session.ledger().snapshot().total, 0.0);
    }

    #[test]
    fn test_transition_rejects_skipping() {
        let mut session = SessionContext::new(Uuid::new_v4());
        session.transition(WorkflowState::ExtractingContext).unwrap();
        let err = session.transition(WorkflowState::Merging).unwrap_err();
        assert_eq!(err.from, WorkflowState::ExtractingContext);
        assert_eq!(err.to, WorkflowState::Merging);
        assert_eq!(session.state(), &WorkflowState::ExtractingContext);
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut session = SessionContext::new(Uuid::new_v4());
        session.transition(WorkflowState::ExtractingContext).unwrap();
        session.transition(WorkflowState::Generating).unwrap();
        session.cancel_run();
        assert_eq!(session.state(), &WorkflowState::Idle);
        assert_eq!(session.snapshot().status, "Run cancelled.");
    }

    #[test]
    fn test_snapshot_follows_progress() {
        let mut session = SessionContext::new(Uuid::new_v4());
        let handle = session.snapshot_handle();
        session.transition(WorkflowState::ExtractingContext).unwrap();
        session.transition(WorkflowState::Generating).unwrap();
        session.set_status("Drafting job description and inventing candidates...");
        session.track_cost("anthropic", 0.25).unwrap();

        let snapshot = handle.borrow().clone();
        assert_eq!(snapshot.state, WorkflowState::Generating);
        assert_eq!(snapshot.status, "Drafting job description and inventing candidates...");
        assert_eq!(snapshot.cost.total, 0.25);
        assert!(snapshot.runs.is_empty());
    }

    #[test]
    fn test_reset_keeps_id_and_channel() {
        let id = Uuid::new_v4();
        let mut session = SessionContext::new(id);
        let handle = session.snapshot_handle();
        session.track_cost("anthropic", 1.0).unwrap();
        session.transition(WorkflowState::ExtractingContext).unwrap();

        session.reset();

        assert_eq!(session.id(), id);
        let snapshot = handle.borrow().clone();
        assert_eq!(snapshot.state, WorkflowState::Idle);
        assert_eq!(snapshot.status, READY_STATUS);
        assert_eq!(snapshot.cost.total, 0.0);
    }
}
