use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::collaborators::export::{ExportFormat, Exporter};
use crate::collaborators::extraction::UploadedDocument;
use crate::collaborators::publish::{Publication, PublishReceipt};
use crate::errors::AppError;
use crate::pipeline::Orchestrator;
use crate::session::handlers::RunView;
use crate::session::{SessionSnapshot, SimulationRun};
use crate::simulation::models::SimulationRequest;
use crate::simulation::report::{render_markdown, render_plain, ReportInput};
use crate::state::AppState;

const REQUEST_FIELD: &str = "request";
const REFERENCE_FIELD: &str = "reference";

/// POST /api/v1/sessions/:id/simulations
pub async fn handle_simulate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SimulationRequest>,
) -> Result<Json<RunView>, AppError> {
    run_simulation(&state, id, req, None).await
}

/// POST /api/v1/sessions/:id/simulations/upload
/// Multipart: `request` (JSON SimulationRequest) plus an optional `reference` file.
pub async fn handle_simulate_upload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<RunView>, AppError> {
    let mut request: Option<SimulationRequest> = None;
    let mut reference: Option<UploadedDocument> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(REQUEST_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid request field: {e}")))?;
                request = Some(
                    serde_json::from_str(&text)
                        .map_err(|e| AppError::Validation(format!("Invalid request JSON: {e}")))?,
                );
            }
            Some(REFERENCE_FIELD) => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid reference upload: {e}")))?;
                if !bytes.is_empty() {
                    reference = Some(UploadedDocument {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            _ => {}
        }
    }

    let request = request
        .ok_or_else(|| AppError::Validation(format!("Missing '{REQUEST_FIELD}' field")))?;
    run_simulation(&state, id, request, reference).await
}

async fn run_simulation(
    state: &AppState,
    id: Uuid,
    request: SimulationRequest,
    reference: Option<UploadedDocument>,
) -> Result<Json<RunView>, AppError> {
    request.validate().map_err(AppError::Validation)?;

    let mut session = state.sessions.acquire(id).await?;
    info!(
        "Session {id}: simulating '{}' ({:?}, reference: {})",
        request.job_title,
        request.depth,
        reference.is_some()
    );

    let run = Orchestrator::new(state.llm.as_ref(), state.extractor.as_ref(), &state.pipeline)
        .run(&mut session, request, reference)
        .await?;

    Ok(Json(RunView::from(&run)))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

/// GET /api/v1/sessions/:id/runs/:run_id/export?format=markdown|text
pub async fn handle_export(
    State(state): State<AppState>,
    Path((id, run_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let format = match query.format.as_deref() {
        Some(f) => f.parse::<ExportFormat>()?,
        None => ExportFormat::default(),
    };

    let session = state.sessions.snapshot(id).await?;
    let input = report_input(find_run(&session, run_id)?);
    let text = match format {
        ExportFormat::Markdown => render_markdown(&input),
        ExportFormat::Text => render_plain(&input),
    };

    let document = format.exporter().export(&text)?;
    let disposition = format!(
        "attachment; filename=\"simulation-{run_id}.{}\"",
        document.extension
    );

    Ok((
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// POST /api/v1/sessions/:id/runs/:run_id/publish
pub async fn handle_publish(
    State(state): State<AppState>,
    Path((id, run_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<PublishReceipt>, AppError> {
    let session = state.sessions.snapshot(id).await?;
    let input = report_input(find_run(&session, run_id)?);
    let publication = Publication {
        title: format!("Hiring Simulation: {}", input.title),
        body: render_markdown(&input),
        image_url: req.image_url,
        tags: req.tags,
    };

    let receipt = state.publisher.publish(&publication).await?;
    info!("Session {id}: run {run_id} published ({:?})", receipt.url);
    Ok(Json(receipt))
}

fn find_run(session: &SessionSnapshot, run_id: Uuid) -> Result<&SimulationRun, AppError> {
    session
        .runs
        .iter()
        .find(|r| r.run_id == run_id)
        .ok_or_else(|| AppError::NotFound(format!("Run {run_id} not found")))
}

fn report_input(run: &SimulationRun) -> ReportInput<'_> {
    ReportInput {
        title: run.request.job_title.trim(),
        job_description: &run.job_description,
        records: &run.records,
        gaps: &run.gaps,
    }
}
