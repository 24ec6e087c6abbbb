//! Workflow Orchestrator: runs one simulation over a locked session.
//!
//! Flow: extract reference context → generate → validate → analyze → validate → merge.
//!
//! Stages run strictly in order; each either hands a typed value to the next or stops the
//! run with a typed error. Only transient backend errors are retried, and only within the
//! stage that hit them. Results reach the session only when the run is `Done`.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collaborators::extraction::{ContextExtractor, UploadedDocument};
use crate::collaborators::CollaboratorError;
use crate::ledger::Pricing;
use crate::llm_client::{Completion, GenerationParams, LlmError, ModelInvoker};
use crate::pipeline::state::{InvalidTransition, WorkflowState};
use crate::session::{SessionContext, SimulationRun};
use crate::simulation::merge::{merge, MergeGap, MergePolicy};
use crate::simulation::models::{AnalysisBatch, GeneratedScenario, SimulationDepth, SimulationRequest};
use crate::simulation::prompts::{ANALYSIS_SYSTEM, GENERATION_SYSTEM};
use crate::simulation::scenario::{build_analysis_prompt, build_generation_prompt};
use crate::structured::{extract_and_validate, MalformedOutputError};

const GENERATION_STAGE: &str = "generation";
const ANALYSIS_STAGE: &str = "analysis";

// ────────────────────────────────────────────────────────────────────────────
// Settings
// ────────────────────────────────────────────────────────────────────────────

/// Bounded retry of a stage that hit a transient backend error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Exponential backoff: base, 2×base, 4×base, …
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        self.base_delay
            .checked_mul(1 << exponent)
            .unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub model: String,
    pub generation_temperature: f32,
    pub analysis_temperature: f32,
    pub analysis_max_tokens: u32,
    pub retry: RetryPolicy,
    pub pricing: Pricing,
    pub merge_policy: MergePolicy,
}

impl PipelineSettings {
    pub fn generation_params(&self, depth: SimulationDepth) -> GenerationParams {
        GenerationParams {
            model: self.model.clone(),
            max_output_tokens: depth.generation_max_tokens(),
            temperature: self.generation_temperature,
        }
    }

    pub fn analysis_params(&self) -> GenerationParams {
        GenerationParams {
            model: self.model.clone(),
            max_output_tokens: self.analysis_max_tokens,
            temperature: self.analysis_temperature,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Why a run ended in `Failed`.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Context extraction failed: {0}")]
    Extraction(#[from] CollaboratorError),

    #[error("{stage} call failed: {error}")]
    Backend { stage: &'static str, error: LlmError },

    #[error("{stage} call failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        stage: &'static str,
        attempts: u32,
        last: LlmError,
    },

    #[error(transparent)]
    Malformed(#[from] MalformedOutputError),

    #[error("{} candidate(s) received no analysis: {}", .0.len(), gap_ids(.0))]
    MergeGaps(Vec<MergeGap>),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

fn gap_ids(gaps: &[MergeGap]) -> String {
    gaps.iter()
        .map(|g| g.id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ────────────────────────────────────────────────────────────────────────────
// Run guard
// ────────────────────────────────────────────────────────────────────────────

/// Exclusive handle on a session for the duration of one run.
///
/// Dropped before `settle` (the request future was cancelled), it returns the session
/// to `Idle`. Nothing partial was stored, so there is nothing else to undo.
struct ActiveRun<'a> {
    session: &'a mut SessionContext,
    settled: bool,
}

impl<'a> ActiveRun<'a> {
    fn begin(session: &'a mut SessionContext) -> Result<Self, PipelineError> {
        session.transition(WorkflowState::Idle)?;
        Ok(Self {
            session,
            settled: false,
        })
    }

    fn advance(&mut self, next: WorkflowState, status: &str) -> Result<(), PipelineError> {
        info!("Session {}: {} → {}", self.session.id(), self.session.state(), next);
        self.session.transition(next)?;
        self.session.set_status(status);
        Ok(())
    }

    fn complete(mut self, run: SimulationRun) -> Result<SimulationRun, PipelineError> {
        self.advance(WorkflowState::Done, "Simulation complete!")?;
        self.session.record_run(run.clone());
        self.settled = true;
        Ok(run)
    }

    fn fail(mut self, error: &PipelineError) {
        let reason = error.to_string();
        warn!("Session {}: run failed in {}: {reason}", self.session.id(), self.session.state());
        if let Err(e) = self.session.transition(WorkflowState::Failed(reason.clone())) {
            warn!("Session {}: {e}", self.session.id());
        }
        self.session.set_status(format!("Simulation failed: {reason}"));
        self.settled = true;
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Session {}: run cancelled in {}", self.session.id(), self.session.state());
            self.session.cancel_run();
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct Orchestrator<'a> {
    invoker: &'a dyn ModelInvoker,
    extractor: &'a dyn ContextExtractor,
    settings: &'a PipelineSettings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        invoker: &'a dyn ModelInvoker,
        extractor: &'a dyn ContextExtractor,
        settings: &'a PipelineSettings,
    ) -> Self {
        Self {
            invoker,
            extractor,
            settings,
        }
    }

    /// Runs the full pipeline. On success the run is stored on `session` and returned;
    /// on failure the session is left in `Failed` with the reason as its status.
    pub async fn run(
        &self,
        session: &mut SessionContext,
        request: SimulationRequest,
        reference: Option<UploadedDocument>,
    ) -> Result<SimulationRun, PipelineError> {
        let mut active = ActiveRun::begin(session)?;

        match self.execute(&mut active, request, reference).await {
            Ok(run) => active.complete(run),
            Err(e) => {
                active.fail(&e);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        active: &mut ActiveRun<'_>,
        request: SimulationRequest,
        reference: Option<UploadedDocument>,
    ) -> Result<SimulationRun, PipelineError> {
        // Stage 1: reference context
        active.advance(WorkflowState::ExtractingContext, "Reading reference material...")?;
        let reference_text = match &reference {
            Some(document) => Some(self.extractor.extract(document)?),
            None => None,
        };

        // Stage 2: generation
        active.advance(
            WorkflowState::Generating,
            "Drafting job description and inventing candidates...",
        )?;
        let prompt = build_generation_prompt(&request, reference_text.as_deref());
        let params = self.settings.generation_params(request.depth);
        let completion = self
            .invoke_stage(active.session, GENERATION_STAGE, GENERATION_SYSTEM, &prompt, &params)
            .await?;

        active.advance(WorkflowState::ValidatingGeneration, "Validating generated scenario...")?;
        let scenario: GeneratedScenario = extract_and_validate(&completion.text)?;
        let expected = request.depth.profiles().len();
        if scenario.candidates.len() != expected {
            warn!(
                "Generation returned {} candidates, asked for {expected}",
                scenario.candidates.len()
            );
        }
        info!("Generated {} candidates", scenario.candidates.len());
        for candidate in &scenario.candidates {
            debug!(
                "Candidate {} ({}): {}",
                candidate.id,
                candidate.name,
                candidate.attribute_str("vibe").unwrap_or("-")
            );
        }

        // Stage 3: analysis
        active.advance(WorkflowState::Analyzing, "Analyzing performance...")?;
        let prompt = build_analysis_prompt(&scenario);
        let params = self.settings.analysis_params();
        let completion = self
            .invoke_stage(active.session, ANALYSIS_STAGE, ANALYSIS_SYSTEM, &prompt, &params)
            .await?;

        active.advance(WorkflowState::ValidatingAnalysis, "Validating analysis...")?;
        let batch: AnalysisBatch = extract_and_validate(&completion.text)?;

        // Stage 4: merge
        active.advance(WorkflowState::Merging, "Merging results...")?;
        let outcome = merge(&scenario.candidates, &batch.analyses);
        if !outcome.gaps.is_empty() && self.settings.merge_policy == MergePolicy::Strict {
            return Err(PipelineError::MergeGaps(outcome.gaps));
        }
        info!(
            "Merged {} candidates ({} gaps)",
            outcome.merged.len(),
            outcome.gaps.len()
        );

        Ok(SimulationRun {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            request,
            job_description: scenario.job_description,
            records: outcome.merged,
            gaps: outcome.gaps,
            cost: active.session.ledger().snapshot(),
        })
    }

    /// Calls the backend for one stage, retrying transient failures with backoff.
    /// Every successful call is tracked on the session ledger exactly once.
    async fn invoke_stage(
        &self,
        session: &mut SessionContext,
        stage: &'static str,
        system: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Completion, PipelineError> {
        let attempts = self.settings.retry.max_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            match self.invoker.invoke(system, prompt, params).await {
                Ok(completion) => {
                    let amount = self.settings.pricing.estimate(completion.usage);
                    if let Err(e) = session.track_cost(self.invoker.provider(), amount) {
                        warn!("Cost not tracked: {e}");
                    }
                    return Ok(completion);
                }
                Err(error) if error.is_transient() && attempt < attempts => {
                    let delay = self.settings.retry.delay_for(attempt);
                    warn!(
                        "{stage} attempt {attempt}/{attempts} failed: {error}; retrying after {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) if error.is_transient() => {
                    return Err(PipelineError::RetriesExhausted {
                        stage,
                        attempts,
                        last: error,
                    });
                }
                Err(error) => return Err(PipelineError::Backend { stage, error }),
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
