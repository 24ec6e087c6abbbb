// Workflow orchestration: sequences the simulation stages over a session and decides
// run-level abort vs. continue. Rendering is left to presentation collaborators.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{Orchestrator, PipelineError, PipelineSettings, RetryPolicy};
pub use state::WorkflowState;
