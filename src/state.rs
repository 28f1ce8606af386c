//! Startup Wiring
//!
//! Builds the whole AI core from configuration: adapters, registry,
//! manager, workflows, and router, plus the background health prober.
//! Everything is explicit instance state shared via `Arc`; there is no
//! ambient global registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use quillspace_core::config::{AiConfig, ProviderBackend, ProviderSettings, ServiceClass};
use quillspace_core::{CoreError, CoreResult};
use quillspace_llm::{
    AnthropicProvider, ModelProvider, OllamaProvider, OpenAIProvider, ProviderConfig,
};

use crate::services::manager::{ManagerConfig, ModelManager};
use crate::services::registry::{HealthProber, ModelDescriptor, ModelKind, ModelRegistry};
use crate::services::router::RequestRouter;
use crate::services::safety::{SafetyConfig, SqlSafetyValidator};
use crate::services::workflows::{
    ContentWorkflow, ContentWorkflowConfig, QueryWorkflow, QueryWorkflowConfig,
};

/// The fully wired AI core.
pub struct AiState {
    pub registry: Arc<ModelRegistry>,
    pub manager: Arc<ModelManager>,
    pub router: Arc<RequestRouter>,
    prober: tokio::task::JoinHandle<()>,
}

impl AiState {
    /// Build the core from configuration and spawn the health prober.
    ///
    /// Requires at least one provider; chains may only reference
    /// configured providers.
    pub async fn initialize(config: AiConfig) -> CoreResult<Self> {
        if config.providers.is_empty() {
            return Err(CoreError::config("no providers configured"));
        }

        let registry = Arc::new(ModelRegistry::new());
        let mut providers: HashMap<String, Arc<dyn ModelProvider>> = HashMap::new();

        for settings in &config.providers {
            if providers.contains_key(&settings.name) {
                return Err(CoreError::config(format!(
                    "duplicate provider name '{}'",
                    settings.name
                )));
            }

            let adapter = build_adapter(settings, &config)?;
            let class = settings
                .class
                .unwrap_or_else(|| ServiceClass::default_for(settings.backend));

            registry
                .register(ModelDescriptor::new(
                    &settings.name,
                    &settings.model,
                    ModelKind::TextGeneration,
                    class,
                ))
                .await;

            if adapter.supports_embeddings() {
                let embedding_model = settings
                    .embedding_model
                    .clone()
                    .unwrap_or_else(|| settings.model.clone());
                registry
                    .register(ModelDescriptor::new(
                        &settings.name,
                        embedding_model,
                        ModelKind::Embedding,
                        class,
                    ))
                    .await;
            }

            providers.insert(settings.name.clone(), adapter);
        }

        let chains = build_chains(&config, &providers)?;

        let manager = Arc::new(ModelManager::new(
            registry.clone(),
            providers.clone(),
            chains,
            ManagerConfig {
                call_timeout: Duration::from_secs(config.limits.call_timeout_secs),
                failure_threshold: config.breaker.failure_threshold,
                failure_window: Duration::from_secs(config.breaker.window_secs),
                same_provider_retries: config.limits.same_provider_retries,
                retry_delay: Duration::from_millis(config.limits.retry_delay_ms),
                max_concurrent_requests: config.limits.max_concurrent_requests,
            },
        ));

        let validator = Arc::new(SqlSafetyValidator::new(SafetyConfig {
            scan_warn_rows: config.query.scan_warn_rows,
        }));

        let content = ContentWorkflow::new(
            manager.clone(),
            ContentWorkflowConfig {
                quality_threshold: config.generation.quality_threshold,
                max_iterations: config.generation.max_iterations,
            },
        );
        let query = QueryWorkflow::new(
            manager.clone(),
            validator,
            QueryWorkflowConfig {
                max_alternatives: config.query.max_alternatives,
            },
        );

        let router = Arc::new(RequestRouter::new(
            manager.clone(),
            registry.clone(),
            content,
            query,
        ));

        let prober = HealthProber::spawn(
            registry.clone(),
            providers,
            Duration::from_secs(config.health.probe_interval_secs),
        );

        info!(
            providers = config.providers.len(),
            probe_interval_secs = config.health.probe_interval_secs,
            "AI core initialized"
        );

        Ok(Self {
            registry,
            manager,
            router,
            prober,
        })
    }

    /// Stop the background health prober.
    pub fn shutdown(&self) {
        self.prober.abort();
    }
}

impl Drop for AiState {
    fn drop(&mut self) {
        self.prober.abort();
    }
}

/// Construct the adapter for one provider entry.
fn build_adapter(
    settings: &ProviderSettings,
    config: &AiConfig,
) -> CoreResult<Arc<dyn ModelProvider>> {
    let provider_config = ProviderConfig {
        model: settings.model.clone(),
        embedding_model: settings.embedding_model.clone(),
        api_key: settings.api_key.clone(),
        base_url: settings.base_url.clone(),
        max_tokens: config.generation.max_tokens,
        temperature: config.generation.temperature,
        timeout_secs: settings
            .timeout_secs
            .unwrap_or(config.limits.call_timeout_secs),
        proxy: match settings.backend {
            // Local inference never goes through the proxy.
            ProviderBackend::Ollama => None,
            _ => config.proxy.clone(),
        },
    };

    let adapter: Arc<dyn ModelProvider> = match settings.backend {
        ProviderBackend::Ollama => Arc::new(
            OllamaProvider::new(provider_config)
                .map_err(|e| CoreError::config(format!("provider '{}': {}", settings.name, e)))?,
        ),
        ProviderBackend::OpenAi => Arc::new(OpenAIProvider::new(provider_config)),
        ProviderBackend::Anthropic => Arc::new(AnthropicProvider::new(provider_config)),
    };
    Ok(adapter)
}

/// Build the per-kind fallback chains, validating every entry.
fn build_chains(
    config: &AiConfig,
    providers: &HashMap<String, Arc<dyn ModelProvider>>,
) -> CoreResult<HashMap<ModelKind, Vec<String>>> {
    let mut chains = HashMap::new();
    for (kind, chain) in [
        (ModelKind::TextGeneration, config.text_generation_chain()),
        (ModelKind::Embedding, config.embedding_chain()),
    ] {
        for name in &chain {
            if !providers.contains_key(name) {
                return Err(CoreError::config(format!(
                    "fallback chain for {} references unknown provider '{}'",
                    kind, name
                )));
            }
        }
        chains.insert(kind, chain);
    }
    Ok(chains)
}
