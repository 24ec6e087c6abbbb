use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ledger::CostSnapshot;
use crate::pipeline::WorkflowState;
use crate::session::{SessionSnapshot, SimulationRun};
use crate::simulation::models::{MergedRecord, SimulationDepth};
use crate::simulation::report::{leaderboard, LeaderboardRow};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RunView {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub job_title: String,
    pub depth: SimulationDepth,
    pub job_description: String,
    pub leaderboard: Vec<LeaderboardRow>,
    pub records: Vec<MergedRecord>,
    /// One line per generated candidate that received no analysis.
    pub warnings: Vec<String>,
    pub cost: CostSnapshot,
}

impl From<&SimulationRun> for RunView {
    fn from(run: &SimulationRun) -> Self {
        RunView {
            run_id: run.run_id,
            created_at: run.created_at,
            job_title: run.request.job_title.clone(),
            depth: run.request.depth,
            job_description: run.job_description.clone(),
            leaderboard: leaderboard(&run.records),
            records: run.records.clone(),
            warnings: run.gaps.iter().map(|g| g.warning()).collect(),
            cost: run.cost.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub workflow: WorkflowState,
    pub status: String,
    pub cost: CostSnapshot,
    pub runs: Vec<RunView>,
}

impl From<SessionSnapshot> for SessionView {
    fn from(session: SessionSnapshot) -> Self {
        SessionView {
            session_id: session.id,
            created_at: session.created_at,
            workflow: session.state,
            status: session.status,
            cost: session.cost,
            runs: session.runs.iter().map(RunView::from).collect(),
        }
    }
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let session = state.sessions.create().await;
    Ok((StatusCode::CREATED, Json(SessionView::from(session))))
}

/// GET /api/v1/sessions/:id
///
/// Served from the published snapshot, so the status line is live during a run.
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.snapshot(id).await?;
    Ok(Json(SessionView::from(session)))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.reset(id).await?;
    Ok(Json(SessionView::from(session)))
}
