//! Multi-Stage Workflows
//!
//! Stateful pipelines that may invoke a provider more than once to
//! produce a final artifact.
//!
//! - `content` - generate/evaluate/refine loop for text artifacts
//! - `query` - natural-language-to-SQL pipeline with a safety gate

pub mod content;
pub mod query;

pub use content::{ContentError, ContentStage, ContentState, ContentWorkflow, ContentWorkflowConfig};
pub use query::{QueryError, QueryWorkflow, QueryWorkflowConfig};
