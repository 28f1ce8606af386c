//! Ollama Provider
//!
//! Implementation of the ModelProvider trait for a local Ollama runtime
//! via the native SDK. Covers text generation and embeddings; health
//! checking verifies both that the server answers and that the configured
//! model has actually been pulled.

use std::time::Instant;

use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest as OllamaGenerationRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::models::ModelOptions;
use ollama_rs::Ollama;
use tracing::debug;

use super::provider::ModelProvider;
use super::types::{
    EmbeddingVector, GeneratedText, GenerationRequest, ProviderConfig, ProviderError,
    ProviderResult, ProviderStats, ProviderStatsSnapshot,
};

/// Default local Ollama endpoint
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Ollama provider (local inference)
pub struct OllamaProvider {
    config: ProviderConfig,
    client: Ollama,
    stats: ProviderStats,
}

impl OllamaProvider {
    /// Create a new Ollama provider with the given configuration.
    ///
    /// Fails only when the configured endpoint is not a valid URL.
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let endpoint = config
            .base_url
            .clone()
            .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string());
        let parsed = url::Url::parse(&endpoint).map_err(|e| ProviderError::InvalidRequest {
            message: format!("invalid Ollama endpoint '{}': {}", endpoint, e),
        })?;

        Ok(Self {
            config,
            client: Ollama::from_url(parsed),
            stats: ProviderStats::new(),
        })
    }

    /// Model used for embeddings; falls back to the generation model.
    fn embedding_model(&self) -> String {
        self.config
            .embedding_model
            .clone()
            .unwrap_or_else(|| self.config.model.clone())
    }

    /// Classify an SDK error message into the adapter taxonomy.
    fn classify_error(message: String) -> ProviderError {
        let lower = message.to_lowercase();
        if lower.contains("timed out") || lower.contains("timeout") {
            ProviderError::Timeout { seconds: 0 }
        } else if lower.contains("connection") || lower.contains("connect") {
            ProviderError::Network {
                message: format!("ollama: {}", message),
            }
        } else if lower.contains("not found") {
            ProviderError::Unavailable {
                message: format!("ollama: {}", message),
            }
        } else {
            ProviderError::Unavailable {
                message: format!("ollama: {}", message),
            }
        }
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<GeneratedText> {
        let options = ModelOptions::default()
            .temperature(request.temperature.unwrap_or(self.config.temperature))
            .num_predict(request.max_tokens.unwrap_or(self.config.max_tokens) as i32);

        let mut ollama_request =
            OllamaGenerationRequest::new(self.config.model.clone(), request.prompt.clone())
                .options(options);
        if let Some(system) = &request.system {
            ollama_request = ollama_request.system(system.clone());
        }

        debug!(model = %self.config.model, "ollama: sending generation request");
        let started = Instant::now();

        let response = self
            .client
            .generate(ollama_request)
            .await
            .map_err(|e| {
                self.stats.record_failure();
                Self::classify_error(e.to_string())
            })?;

        let latency_ms = started.elapsed().as_millis() as u64;
        self.stats.record_success(latency_ms);

        Ok(GeneratedText {
            content: response.response,
            provider: self.name().to_string(),
            model: self.config.model.clone(),
            latency_ms,
        })
    }

    async fn embed(&self, text: &str) -> ProviderResult<EmbeddingVector> {
        let model = self.embedding_model();
        let request =
            GenerateEmbeddingsRequest::new(model.clone(), EmbeddingsInput::Single(text.to_string()));
        let started = Instant::now();

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| {
                self.stats.record_failure();
                Self::classify_error(e.to_string())
            })?;

        let values = response.embeddings.into_iter().next().ok_or_else(|| {
            self.stats.record_failure();
            ProviderError::Unavailable {
                message: "ollama: response contained no embedding".to_string(),
            }
        })?;

        self.stats.record_success(started.elapsed().as_millis() as u64);

        Ok(EmbeddingVector {
            values,
            provider: self.name().to_string(),
            model,
        })
    }

    async fn health_check(&self) -> ProviderResult<()> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| Self::classify_error(e.to_string()))?;

        let wanted = &self.config.model;
        let pulled = models
            .iter()
            .any(|m| &m.name == wanted || m.name.starts_with(&format!("{}:", wanted)));

        if pulled {
            Ok(())
        } else {
            Err(ProviderError::Unavailable {
                message: format!("ollama: model '{}' has not been pulled", wanted),
            })
        }
    }

    fn stats(&self) -> ProviderStatsSnapshot {
        self.stats.snapshot()
    }
}
