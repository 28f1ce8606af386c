//! OpenAI Provider
//!
//! Implementation of the ModelProvider trait for OpenAI's API (and any
//! chat-completions-compatible endpoint via `base_url`). Covers text
//! generation and embeddings.

use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::http_client::build_http_client;
use super::provider::ModelProvider;
use super::types::{
    classify_transport_error, parse_http_error, EmbeddingVector, GeneratedText,
    GenerationRequest, ProviderConfig, ProviderError, ProviderResult, ProviderStats,
    ProviderStatsSnapshot,
};

/// Default OpenAI API base
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI provider
pub struct OpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
    stats: ProviderStats,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the given configuration.
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.timeout_secs, config.proxy.as_ref());
        Self {
            config,
            client,
            stats: ProviderStats::new(),
        }
    }

    fn api_base(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_BASE)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base().trim_end_matches('/'), path)
    }

    fn api_key(&self) -> ProviderResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::missing_api_key("openai"))
    }

    /// Build the chat-completions request body.
    fn build_request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut messages: Vec<serde_json::Value> = Vec::new();
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system,
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": request.prompt,
        }));

        serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "temperature": request.temperature.unwrap_or(self.config.temperature),
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn supports_embeddings(&self) -> bool {
        self.config.embedding_model.is_some()
    }

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<GeneratedText> {
        let api_key = self.api_key()?;
        let body = self.build_request_body(request);
        let started = Instant::now();

        debug!(model = %self.config.model, "openai: sending chat completion request");

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                self.stats.record_failure();
                classify_transport_error(&e, "openai", self.config.timeout_secs)
            })?;

        let status = response.status();
        if !status.is_success() {
            self.stats.record_failure();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status.as_u16(), &text, "openai"));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            self.stats.record_failure();
            ProviderError::Unavailable {
                message: format!("openai: malformed response: {}", e),
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| {
                self.stats.record_failure();
                ProviderError::Unavailable {
                    message: "openai: response contained no completion".to_string(),
                }
            })?;

        let latency_ms = started.elapsed().as_millis() as u64;
        self.stats.record_success(latency_ms);

        Ok(GeneratedText {
            content,
            provider: self.name().to_string(),
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
            latency_ms,
        })
    }

    async fn embed(&self, text: &str) -> ProviderResult<EmbeddingVector> {
        let api_key = self.api_key()?;
        let model = self
            .config
            .embedding_model
            .as_deref()
            .ok_or_else(|| ProviderError::unsupported("openai", "embeddings (no model configured)"))?;

        let body = serde_json::json!({
            "model": model,
            "input": text,
        });
        let started = Instant::now();

        let response = self
            .client
            .post(self.endpoint("embeddings"))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                self.stats.record_failure();
                classify_transport_error(&e, "openai", self.config.timeout_secs)
            })?;

        let status = response.status();
        if !status.is_success() {
            self.stats.record_failure();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status.as_u16(), &text, "openai"));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            self.stats.record_failure();
            ProviderError::Unavailable {
                message: format!("openai: malformed embedding response: {}", e),
            }
        })?;

        let values = parsed
            .data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .ok_or_else(|| {
                self.stats.record_failure();
                ProviderError::Unavailable {
                    message: "openai: response contained no embedding".to_string(),
                }
            })?;

        self.stats.record_success(started.elapsed().as_millis() as u64);

        Ok(EmbeddingVector {
            values,
            provider: self.name().to_string(),
            model: parsed.model.unwrap_or_else(|| model.to_string()),
        })
    }

    async fn health_check(&self) -> ProviderResult<()> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e, "openai", self.config.timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(parse_http_error(status.as_u16(), &text, "openai"))
        }
    }

    fn stats(&self) -> ProviderStatsSnapshot {
        self.stats.snapshot()
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}
