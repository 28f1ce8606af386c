//! Quillspace AI Core
//!
//! The AI orchestration core of Quillspace Desktop. Selects, invokes,
//! and arbitrates among multiple model providers (local Ollama plus
//! cloud vendors) to satisfy generation, analysis, and
//! natural-language-to-SQL requests, driving each through a multi-stage,
//! retryable workflow.
//!
//! ## Module Organization
//!
//! - `config` - TOML configuration loader
//! - `models` - request/response types exchanged with the host
//! - `services::registry` - model catalog with live health metadata
//! - `services::manager` - provider selection, fallback, circuit breaking
//! - `services::safety` - pure SQL safety validation
//! - `services::workflows` - content generation and query pipelines
//! - `services::router` - the entry point the host application calls
//! - `state` - startup wiring (`AiState::initialize`)
//!
//! The desktop UI, storage, Git integration, search indexing, and the
//! model installer are external collaborators; this crate owns no
//! persistent state and rebuilds its registry from configuration and
//! live health probes on boot.

pub mod config;
pub mod models;
pub mod services;
pub mod state;

// ── Entry Points ───────────────────────────────────────────────────────
pub use state::AiState;

// ── Models ─────────────────────────────────────────────────────────────
pub use models::{
    AnalysisResult, AnalysisType, FlagSeverity, QueryRequest, QueryResult, SafetyCode,
    SafetyFlag, SchemaDescription, TableSchema, WorkflowResult,
};

// ── Services ───────────────────────────────────────────────────────────
pub use services::{
    HealthProber, HealthState, HealthStatus, ManagerConfig, ManagerError, ModelDescriptor,
    ModelKind, ModelManager, ModelRegistry, ModelStatus, ProviderFailure, RequestRouter,
    SafetyConfig, SelectionLog, SqlSafetyValidator,
};
pub use services::workflows::{
    ContentError, ContentStage, ContentState, ContentWorkflow, ContentWorkflowConfig, QueryError,
    QueryWorkflow, QueryWorkflowConfig,
};

// ── Provider Layer Re-exports ──────────────────────────────────────────
pub use quillspace_llm::{
    EmbeddingVector, GeneratedText, GenerationRequest, ModelProvider, ProviderError,
};
