//! Shared Request/Response Models
//!
//! The externally visible types exchanged with the host application
//! through the request router.

pub mod analysis;
pub mod generation;
pub mod query;

pub use analysis::{AnalysisResult, AnalysisType};
pub use generation::WorkflowResult;
pub use query::{
    FlagSeverity, QueryRequest, QueryResult, SafetyCode, SafetyFlag, SchemaDescription,
    TableSchema,
};
