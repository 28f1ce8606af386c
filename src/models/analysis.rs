//! Content Analysis Models
//!
//! Types for the single-shot analysis operation. Unlike generation,
//! analysis needs no refine loop: one model call plus light
//! post-processing of the output.

use serde::{Deserialize, Serialize};

/// Kind of analysis to perform on a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// Condense the content into a short summary
    Summary,
    /// Classify the overall sentiment
    Sentiment,
    /// Extract the key terms, one per line
    Keywords,
}

impl AnalysisType {
    /// Instruction prefixed to the content for the model call.
    pub fn instruction(&self) -> &'static str {
        match self {
            AnalysisType::Summary => {
                "Summarize the following content in at most three sentences."
            }
            AnalysisType::Sentiment => {
                "Classify the overall sentiment of the following content as \
                 positive, negative, or neutral, and briefly justify the label."
            }
            AnalysisType::Keywords => {
                "Extract the most important keywords from the following \
                 content. Output one keyword per line, nothing else."
            }
        }
    }
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisType::Summary => write!(f, "summary"),
            AnalysisType::Sentiment => write!(f, "sentiment"),
            AnalysisType::Keywords => write!(f, "keywords"),
        }
    }
}

/// Result of a single-shot analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The analysis that was performed
    pub analysis_type: AnalysisType,
    /// Raw model output
    pub output: String,
    /// Post-processed items (keywords); empty for prose outputs
    pub items: Vec<String>,
    /// Model that produced the analysis
    pub model: String,
}
