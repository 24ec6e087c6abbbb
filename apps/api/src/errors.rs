use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::collaborators::CollaboratorError;
use crate::llm_client::LlmError;
use crate::pipeline::PipelineError;
use crate::session::store::SessionAccessError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SessionAccessError> for AppError {
    fn from(e: SessionAccessError) -> Self {
        match e {
            SessionAccessError::NotFound => AppError::NotFound("Session not found".to_string()),
            SessionAccessError::Busy => {
                AppError::Conflict("A simulation is already running for this session".to_string())
            }
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "RUN_IN_PROGRESS", msg.clone()),
            AppError::Pipeline(e) => pipeline_parts(e),
            AppError::Collaborator(e) => collaborator_parts(e),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

fn pipeline_parts(e: &PipelineError) -> (StatusCode, &'static str, String) {
    match e {
        PipelineError::Extraction(inner) => collaborator_parts(inner),
        PipelineError::Backend {
            error: LlmError::Auth { .. },
            ..
        } => {
            tracing::error!("LLM backend rejected credentials: {e}");
            (StatusCode::BAD_GATEWAY, "BACKEND_AUTH_ERROR", e.to_string())
        }
        PipelineError::Backend { .. } => {
            tracing::error!("LLM error: {e}");
            (StatusCode::BAD_GATEWAY, "LLM_ERROR", e.to_string())
        }
        PipelineError::RetriesExhausted { .. } => {
            tracing::error!("LLM error: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "BACKEND_UNAVAILABLE", e.to_string())
        }
        PipelineError::Malformed(m) => {
            tracing::error!("{m}\nRaw output:\n{}", m.raw);
            (
                StatusCode::BAD_GATEWAY,
                "MALFORMED_OUTPUT",
                format!("{m}\nRaw output:\n{}", m.raw),
            )
        }
        PipelineError::MergeGaps(_) => (StatusCode::BAD_GATEWAY, "INCOMPLETE_ANALYSIS", e.to_string()),
        PipelineError::InvalidTransition(_) => {
            tracing::error!("Workflow error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
            )
        }
    }
}

fn collaborator_parts(e: &CollaboratorError) -> (StatusCode, &'static str, String) {
    match e {
        CollaboratorError::UnknownFormat(_) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
        }
        CollaboratorError::Unavailable => {
            (StatusCode::SERVICE_UNAVAILABLE, "COLLABORATOR_UNAVAILABLE", e.to_string())
        }
        _ => (StatusCode::UNPROCESSABLE_ENTITY, "COLLABORATOR_ERROR", e.to_string()),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
