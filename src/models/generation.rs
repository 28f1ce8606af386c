//! Content Generation Result Types

use serde::{Deserialize, Serialize};

/// Final artifact of the content generation workflow.
///
/// A result whose score fell short of the quality threshold is still a
/// success; `reached_iteration_limit` distinguishes "accepted on quality"
/// from "accepted because the refine budget ran out".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// The accepted draft
    pub content: String,
    /// Rubric score of the accepted draft, in [0, 1]
    pub score: f32,
    /// Number of drafts produced (initial + refinements)
    pub attempts: u32,
    /// Model that produced the accepted draft
    pub model: String,
    /// True when the workflow finalized on the iteration limit rather
    /// than the quality threshold
    pub reached_iteration_limit: bool,
}
