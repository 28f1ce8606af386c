//! Anthropic Provider
//!
//! Implementation of the ModelProvider trait for Anthropic's messages
//! API. Text generation only; Anthropic exposes no embeddings endpoint,
//! so `embed` reports the operation as unsupported and the manager falls
//! through to an embedding-capable provider.

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

/// Default Anthropic API base
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";

/// API version header required by the messages endpoint
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic provider
pub struct AnthropicProvider {
    config: ProviderConfig,
    client: reqwest::Client,
    stats: ProviderStats,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with the given configuration.
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.timeout_secs, config.proxy.as_ref());
        Self {
            config,
            client,
            stats: ProviderStats::new(),
        }
    }

    fn api_base(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(ANTHROPIC_API_BASE)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base().trim_end_matches('/'), path)
    }

    fn api_key(&self) -> ProviderResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::missing_api_key("anthropic"))
    }

    /// Build the messages request body.
    fn build_request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "temperature": request.temperature.unwrap_or(self.config.temperature),
            "messages": [{
                "role": "user",
                "content": request.prompt,
            }],
        });
        if let Some(system) = &request.system {
            body["system"] = serde_json::json!(system);
        }
        body
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<GeneratedText> {
        let api_key = self.api_key()?;
        let body = self.build_request_body(request);
        let started = Instant::now();

        debug!(model = %self.config.model, "anthropic: sending messages request");

        let response = self
            .client
            .post(self.endpoint("messages"))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                self.stats.record_failure();
                classify_transport_error(&e, "anthropic", self.config.timeout_secs)
            })?;

        let status = response.status();
        if !status.is_success() {
            self.stats.record_failure();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status.as_u16(), &text, "anthropic"));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            self.stats.record_failure();
            ProviderError::Unavailable {
                message: format!("anthropic: malformed response: {}", e),
            }
        })?;

        let content: String = parsed
            .content
            .iter()
            .filter_map(|block| {
                if block.kind == "text" {
                    block.text.as_deref()
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        if content.is_empty() {
            self.stats.record_failure();
            return Err(ProviderError::Unavailable {
                message: "anthropic: response contained no text content".to_string(),
            });
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        self.stats.record_success(latency_ms);

        Ok(GeneratedText {
            content,
            provider: self.name().to_string(),
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
            latency_ms,
        })
    }

    async fn embed(&self, _text: &str) -> ProviderResult<EmbeddingVector> {
        Err(ProviderError::unsupported("anthropic", "embeddings"))
    }

    async fn health_check(&self) -> ProviderResult<()> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(self.endpoint("models"))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e, "anthropic", self.config.timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(parse_http_error(status.as_u16(), &text, "anthropic"))
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
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}
