//! Content Generation Workflow
//!
//! Multi-stage refine loop: generate a draft, score it against a
//! deterministic rubric, and regenerate with critique until the score
//! clears the quality threshold or the iteration budget runs out.
//!
//! The stage machine is explicit (tagged enum + pure decision function)
//! so termination logic is testable without any I/O. Scoring and
//! critique are deterministic, which is what bounds the workflow at
//! `max_iterations` model calls; only drafting touches a provider.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use quillspace_llm::GenerationRequest;

use crate::models::generation::WorkflowResult;
use crate::services::manager::{ManagerError, ModelManager, SelectionLog};

// ============================================================================
// Stages and state
// ============================================================================

/// Workflow stage. Order never regresses except the explicit
/// `Refining -> Evaluating` cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStage {
    Generating,
    Evaluating,
    Feedback,
    Refining,
    Finalized,
    Failed,
}

impl std::fmt::Display for ContentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentStage::Generating => write!(f, "generating"),
            ContentStage::Evaluating => write!(f, "evaluating"),
            ContentStage::Feedback => write!(f, "feedback"),
            ContentStage::Refining => write!(f, "refining"),
            ContentStage::Finalized => write!(f, "finalized"),
            ContentStage::Failed => write!(f, "failed"),
        }
    }
}

/// Mutable workflow state, preserved in failure variants for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentState {
    pub stage: ContentStage,
    pub draft: Option<String>,
    pub score: f32,
    pub feedback: Option<String>,
    pub attempts: u32,
}

impl ContentState {
    fn new() -> Self {
        Self {
            stage: ContentStage::Generating,
            draft: None,
            score: 0.0,
            feedback: None,
            attempts: 0,
        }
    }
}

/// Workflow tuning.
#[derive(Debug, Clone)]
pub struct ContentWorkflowConfig {
    /// Score at which a draft is accepted without further refinement
    pub quality_threshold: f32,
    /// Maximum drafts (initial + refinements)
    pub max_iterations: u32,
}

impl Default for ContentWorkflowConfig {
    fn default() -> Self {
        Self {
            quality_threshold: 0.8,
            max_iterations: 3,
        }
    }
}

/// Errors surfaced to the router. Partial state rides along so callers
/// can distinguish where the workflow died.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("content generation failed: all providers exhausted")]
    Exhausted {
        state: ContentState,
        log: SelectionLog,
    },

    #[error("content generation rejected: {message}")]
    Rejected { state: ContentState, message: String },

    #[error("content generation cancelled")]
    Cancelled { state: ContentState },
}

impl ContentError {
    fn from_manager(mut state: ContentState, err: ManagerError) -> Self {
        state.stage = ContentStage::Failed;
        match err {
            ManagerError::AllProvidersExhausted { log } => ContentError::Exhausted { state, log },
            ManagerError::InvalidRequest(message) => ContentError::Rejected { state, message },
            ManagerError::Cancelled => ContentError::Cancelled { state },
        }
    }

    /// The preserved partial state.
    pub fn state(&self) -> &ContentState {
        match self {
            ContentError::Exhausted { state, .. }
            | ContentError::Rejected { state, .. }
            | ContentError::Cancelled { state } => state,
        }
    }
}

// ============================================================================
// Pure decision logic
// ============================================================================

/// Outcome of the evaluation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Finalize,
    Refine,
}

/// Decide whether to accept the current draft. Checked before every
/// return to `Evaluating`, so the loop cannot run unbounded: attempts is
/// monotonic and the verdict is `Finalize` once it reaches the limit.
pub fn decide(score: f32, attempts: u32, config: &ContentWorkflowConfig) -> Verdict {
    if score >= config.quality_threshold || attempts >= config.max_iterations {
        Verdict::Finalize
    } else {
        Verdict::Refine
    }
}

/// Score a draft against the rubric. Deterministic, in [0, 1].
///
/// Rubric: relevance (prompt-term coverage), completeness (length
/// adequacy), and structure (more than one sentence).
pub fn score_draft(prompt: &str, draft: &str) -> f32 {
    let draft_lower = draft.to_lowercase();

    let keywords: Vec<String> = prompt
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(|w| w.to_string())
        .collect();
    let coverage = if keywords.is_empty() {
        1.0
    } else {
        let hit = keywords.iter().filter(|w| draft_lower.contains(*w)).count();
        hit as f32 / keywords.len() as f32
    };

    let words = draft.split_whitespace().count();
    let adequacy = (words as f32 / 40.0).min(1.0);

    let sentences = draft
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    let structure = if sentences >= 2 { 1.0 } else { 0.5 };

    (0.5 * coverage + 0.3 * adequacy + 0.2 * structure).clamp(0.0, 1.0)
}

/// Build critique text naming the rubric deficits of a draft.
pub fn critique(prompt: &str, draft: &str) -> String {
    let draft_lower = draft.to_lowercase();
    let mut deficits = Vec::new();

    let missing: Vec<String> = prompt
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3 && !draft_lower.contains(*w))
        .map(|w| w.to_string())
        .collect();
    if !missing.is_empty() {
        deficits.push(format!(
            "The draft does not address these prompt terms: {}.",
            missing.join(", ")
        ));
    }

    if draft.split_whitespace().count() < 40 {
        deficits.push("The draft is too short; expand it with concrete detail.".to_string());
    }

    let sentences = draft
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    if sentences < 2 {
        deficits.push("Structure the draft into multiple sentences.".to_string());
    }

    if deficits.is_empty() {
        "Polish the wording and tighten the structure.".to_string()
    } else {
        deficits.join(" ")
    }
}

fn refine_request(original: &GenerationRequest, draft: &str, feedback: &str) -> GenerationRequest {
    let prompt = format!(
        "Revise the draft below to satisfy the original request.\n\n\
         Original request:\n{}\n\nCurrent draft:\n{}\n\nCritique:\n{}\n\n\
         Produce the improved draft only.",
        original.prompt, draft, feedback
    );
    GenerationRequest {
        prompt,
        system: original.system.clone(),
        max_tokens: original.max_tokens,
        temperature: original.temperature,
        preferred_provider: original.preferred_provider.clone(),
    }
}

// ============================================================================
// Driver
// ============================================================================

/// The content generation workflow driver.
pub struct ContentWorkflow {
    manager: Arc<ModelManager>,
    config: ContentWorkflowConfig,
}

impl ContentWorkflow {
    /// Create a workflow over the given manager.
    pub fn new(manager: Arc<ModelManager>, config: ContentWorkflowConfig) -> Self {
        Self { manager, config }
    }

    /// Run the workflow to completion.
    pub async fn run(
        &self,
        request: GenerationRequest,
        token: CancellationToken,
    ) -> Result<WorkflowResult, ContentError> {
        let mut state = ContentState::new();

        debug!(stage = %state.stage, "content workflow started");
        let (first, _log) = self
            .manager
            .generate(&request, &token)
            .await
            .map_err(|e| ContentError::from_manager(state.clone(), e))?;

        state.draft = Some(first.content);
        state.attempts = 1;
        state.stage = ContentStage::Evaluating;
        let mut model = first.model;

        loop {
            let draft = state.draft.clone().unwrap_or_default();
            state.score = score_draft(&request.prompt, &draft);
            debug!(stage = %state.stage, score = state.score, attempts = state.attempts, "draft evaluated");

            match decide(state.score, state.attempts, &self.config) {
                Verdict::Finalize => {
                    let reached_limit = state.score < self.config.quality_threshold;
                    state.stage = ContentStage::Finalized;
                    info!(
                        score = state.score,
                        attempts = state.attempts,
                        reached_iteration_limit = reached_limit,
                        "content workflow finalized"
                    );
                    return Ok(WorkflowResult {
                        content: draft,
                        score: state.score,
                        attempts: state.attempts,
                        model,
                        reached_iteration_limit: reached_limit,
                    });
                }
                Verdict::Refine => {
                    state.stage = ContentStage::Feedback;
                    let feedback = critique(&request.prompt, &draft);
                    state.feedback = Some(feedback.clone());
                    debug!(stage = %state.stage, "critique produced");

                    state.stage = ContentStage::Refining;
                    let refined = refine_request(&request, &draft, &feedback);
                    let (next, _log) = self
                        .manager
                        .generate(&refined, &token)
                        .await
                        .map_err(|e| ContentError::from_manager(state.clone(), e))?;

                    state.draft = Some(next.content);
                    model = next.model;
                    state.attempts += 1;
                    state.stage = ContentStage::Evaluating;
                }
            }
        }
    }
}
