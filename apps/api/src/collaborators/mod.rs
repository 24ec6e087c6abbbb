//! External collaborators consumed through narrow interfaces.
//!
//! Failures here are surfaced to the caller of the stage that used the collaborator and
//! never touch results already stored on a session.

pub mod export;
pub mod extraction;
pub mod publish;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CollaboratorError {
    #[error("Unsupported document: {0}")]
    Unsupported(String),

    #[error("Corrupt document: {0}")]
    Corrupt(String),

    #[error("Unsupported export format: {0}")]
    UnknownFormat(String),

    #[error("Publishing is not configured")]
    Unavailable,

    #[error("Publishing failed: {0}")]
    Publish(String),
}
