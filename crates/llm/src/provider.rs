//! Model Provider Trait
//!
//! Defines the common interface every backend adapter implements. Callers
//! never branch on provider identity; the model manager selects among
//! `dyn ModelProvider` instances purely via registry state and chain order.

use async_trait::async_trait;

use super::types::{
    EmbeddingVector, GeneratedText, GenerationRequest, ProviderResult, ProviderStatsSnapshot,
};

/// Trait that all model providers must implement.
///
/// Provides a unified interface for:
/// - Text generation (`generate`)
/// - Embeddings (`embed`)
/// - Health checking (`health_check`)
///
/// Every `generate`/`embed` call updates the adapter's rolling
/// latency/error statistics, surfaced through `stats()`.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name for identification and log correlation.
    fn name(&self) -> &'static str;

    /// The generation model this adapter is configured for.
    fn model(&self) -> &str;

    /// Whether this provider implements `embed`.
    ///
    /// Default is text-only; adapters with an embedding endpoint override.
    fn supports_embeddings(&self) -> bool {
        false
    }

    /// Produce a completion for the given request.
    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<GeneratedText>;

    /// Produce an embedding vector for the given text.
    async fn embed(&self, text: &str) -> ProviderResult<EmbeddingVector>;

    /// Check whether the provider is reachable and serving its model.
    ///
    /// For API providers this validates credentials against a cheap
    /// listing endpoint; for Ollama it checks the local server and that
    /// the configured model has been pulled.
    async fn health_check(&self) -> ProviderResult<()>;

    /// Snapshot of the adapter's rolling call statistics.
    fn stats(&self) -> ProviderStatsSnapshot;
}
