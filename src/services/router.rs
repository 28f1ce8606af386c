//! Request Router
//!
//! Entry point for the host application's HTTP boundary. Maps each
//! inbound request to the correct workflow or single-shot call and
//! returns its typed result. The router owns no policy of its own;
//! selection and safety live in the services it delegates to.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use quillspace_llm::{EmbeddingVector, GenerationRequest};

use crate::models::analysis::{AnalysisResult, AnalysisType};
use crate::models::generation::WorkflowResult;
use crate::models::query::{QueryRequest, QueryResult};
use crate::services::manager::{ManagerError, ModelManager};
use crate::services::registry::{ModelDescriptor, ModelRegistry};
use crate::services::workflows::{
    ContentError, ContentWorkflow, QueryError, QueryWorkflow,
};

/// Overall service health derived from registry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Every registered model is available
    Ok,
    /// Some models are unavailable or installing
    Degraded,
    /// No model is available
    Unavailable,
}

/// Read-only health snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub available: usize,
    pub total: usize,
}

/// Routes inbound requests to workflows and single-shot calls.
pub struct RequestRouter {
    manager: Arc<ModelManager>,
    registry: Arc<ModelRegistry>,
    content: ContentWorkflow,
    query: QueryWorkflow,
}

impl RequestRouter {
    /// Create a router over the given services.
    pub fn new(
        manager: Arc<ModelManager>,
        registry: Arc<ModelRegistry>,
        content: ContentWorkflow,
        query: QueryWorkflow,
    ) -> Self {
        Self {
            manager,
            registry,
            content,
            query,
        }
    }

    /// Run the content generation workflow.
    pub async fn generate(
        &self,
        request: GenerationRequest,
        token: CancellationToken,
    ) -> Result<WorkflowResult, ContentError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("generate", %request_id);
        self.content.run(request, token).instrument(span).await
    }

    /// Single-shot analysis: one model call plus light post-processing.
    pub async fn analyze(
        &self,
        content: &str,
        analysis_type: AnalysisType,
        token: CancellationToken,
    ) -> Result<AnalysisResult, ManagerError> {
        let request_id = Uuid::new_v4();
        debug!(%request_id, analysis = %analysis_type, "analysis requested");

        let prompt = format!("{}\n\n{}", analysis_type.instruction(), content);
        let (text, _log) = self
            .manager
            .generate(&GenerationRequest::new(prompt), &token)
            .await?;

        let items = match analysis_type {
            AnalysisType::Keywords => text
                .content
                .lines()
                .flat_map(|line| line.split(','))
                .map(|item| item.trim().trim_start_matches('-').trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            _ => Vec::new(),
        };

        Ok(AnalysisResult {
            analysis_type,
            output: text.content,
            items,
            model: text.model,
        })
    }

    /// Run the database query workflow.
    pub async fn query(
        &self,
        request: QueryRequest,
        token: CancellationToken,
    ) -> Result<QueryResult, QueryError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("query", %request_id);
        self.query.run(&request, &token).instrument(span).await
    }

    /// Single adapter call producing an embedding.
    pub async fn embed(
        &self,
        text: &str,
        token: CancellationToken,
    ) -> Result<EmbeddingVector, ManagerError> {
        let (vector, _log) = self.manager.embed(text, &token).await?;
        Ok(vector)
    }

    /// Registry introspection: every known model descriptor.
    pub async fn list_models(&self) -> Vec<ModelDescriptor> {
        self.registry.list().await
    }

    /// Registry introspection: overall health.
    pub async fn health(&self) -> HealthStatus {
        let models = self.registry.list().await;
        let total = models.len();
        let available = models
            .iter()
            .filter(|d| d.status == crate::services::registry::ModelStatus::Available)
            .count();

        let status = if total == 0 || available == 0 {
            HealthState::Unavailable
        } else if available < total {
            HealthState::Degraded
        } else {
            HealthState::Ok
        };

        HealthStatus {
            status,
            available,
            total,
        }
    }
}
