//! Model Manager
//!
//! Selects a provider for each request using priority fallback over the
//! configured chain, with a bounded per-call timeout, per-provider
//! concurrency limits, and a failure-window circuit breaker that
//! downgrades descriptors in the registry.
//!
//! Selection is deterministic given registry state and chain order: the
//! preference (when available) is tried first, then the chain in priority
//! order. There is no randomized balancing.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use quillspace_llm::{
    EmbeddingVector, GeneratedText, GenerationRequest, ModelProvider, ProviderResult, RetryClass,
    ProviderStatsSnapshot,
};

use super::registry::{ModelKind, ModelRegistry};

// ============================================================================
// Configuration
// ============================================================================

/// Manager tuning, derived from the application configuration.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Bounded timeout per provider call
    pub call_timeout: Duration,
    /// Failures within the window that trip the breaker
    pub failure_threshold: u32,
    /// Rolling failure window
    pub failure_window: Duration,
    /// Same-provider retries for clearly transient failures
    pub same_provider_retries: u32,
    /// Delay before a same-provider retry
    pub retry_delay: Duration,
    /// In-flight calls allowed per provider
    pub max_concurrent_requests: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            failure_threshold: 3,
            failure_window: Duration::from_secs(60),
            same_provider_retries: 1,
            retry_delay: Duration::from_millis(500),
            max_concurrent_requests: 4,
        }
    }
}

// ============================================================================
// Failure records
// ============================================================================

/// Transient record of one failed provider attempt. Consumed by the
/// circuit breaker and surfaced in the selection log; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderFailure {
    /// Provider that failed
    pub provider: String,
    /// Machine-readable error kind
    pub kind: String,
    /// When the failure happened
    pub at: DateTime<Utc>,
}

/// Log of one selection pass: every failed attempt plus the provider
/// that ultimately served the request (if any).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionLog {
    /// Failed attempts, in order
    pub attempts: Vec<ProviderFailure>,
    /// Provider that succeeded
    pub selected: Option<String>,
}

impl SelectionLog {
    /// Record a failed attempt.
    pub fn record_failure(&mut self, provider: &str, kind: &str) {
        self.attempts.push(ProviderFailure {
            provider: provider.to_string(),
            kind: kind.to_string(),
            at: Utc::now(),
        });
    }

    /// Distinct providers that were attempted and failed.
    pub fn providers_tried(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for attempt in &self.attempts {
            if !seen.contains(&attempt.provider.as_str()) {
                seen.push(attempt.provider.as_str());
            }
        }
        seen
    }
}

/// Errors surfaced by the model manager. Adapter failures never cross
/// this boundary raw; they are folded into the selection log.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// Every candidate in the fallback chain failed (or none was available)
    #[error("all providers exhausted after {} failed attempt(s)", .log.attempts.len())]
    AllProvidersExhausted { log: SelectionLog },

    /// The request itself was rejected by a provider; retrying elsewhere
    /// would fail identically
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The caller cancelled; no further provider quota is consumed
    #[error("request cancelled")]
    Cancelled,
}

// ============================================================================
// Circuit breaker window
// ============================================================================

/// Rolling window of failure instants for one provider.
#[derive(Debug, Default)]
struct FailureWindow {
    failures: VecDeque<Instant>,
}

impl FailureWindow {
    /// Record a failure and return how many fall within the window.
    fn record(&mut self, now: Instant, window: Duration) -> usize {
        self.failures.push_back(now);
        while let Some(front) = self.failures.front() {
            if now.duration_since(*front) > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
        self.failures.len()
    }

    fn clear(&mut self) {
        self.failures.clear();
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Arbitrates provider selection and invocation for all workflows.
pub struct ModelManager {
    registry: Arc<ModelRegistry>,
    providers: HashMap<String, Arc<dyn ModelProvider>>,
    chains: HashMap<ModelKind, Vec<String>>,
    breakers: Mutex<HashMap<String, FailureWindow>>,
    limiters: HashMap<String, Arc<Semaphore>>,
    config: ManagerConfig,
}

impl ModelManager {
    /// Create a manager over the given providers and fallback chains.
    pub fn new(
        registry: Arc<ModelRegistry>,
        providers: HashMap<String, Arc<dyn ModelProvider>>,
        chains: HashMap<ModelKind, Vec<String>>,
        config: ManagerConfig,
    ) -> Self {
        let limiters = providers
            .keys()
            .map(|name| {
                (
                    name.clone(),
                    Arc::new(Semaphore::new(config.max_concurrent_requests)),
                )
            })
            .collect();

        Self {
            registry,
            providers,
            chains,
            breakers: Mutex::new(HashMap::new()),
            limiters,
            config,
        }
    }

    /// The registry this manager selects from.
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Rolling statistics of every provider, ordered by name.
    pub fn provider_stats(&self) -> Vec<(String, ProviderStatsSnapshot)> {
        let mut stats: Vec<(String, ProviderStatsSnapshot)> = self
            .providers
            .iter()
            .map(|(name, provider)| (name.clone(), provider.stats()))
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        stats
    }

    /// Candidate providers for a request, in selection order: the
    /// preference first when its descriptor is available, then the
    /// fallback chain for the kind, skipping anything unavailable or
    /// (for embeddings) incapable.
    async fn candidates(&self, kind: ModelKind, preference: Option<&str>) -> Vec<String> {
        let mut ordered = Vec::new();

        if let Some(name) = preference {
            if self.usable(name, kind).await {
                ordered.push(name.to_string());
            } else {
                debug!(provider = %name, "preferred provider not usable, falling back to chain");
            }
        }

        if let Some(chain) = self.chains.get(&kind) {
            for name in chain {
                if ordered.iter().any(|existing| existing == name) {
                    continue;
                }
                if self.usable(name, kind).await {
                    ordered.push(name.clone());
                }
            }
        }

        ordered
    }

    async fn usable(&self, name: &str, kind: ModelKind) -> bool {
        let Some(provider) = self.providers.get(name) else {
            return false;
        };
        if kind == ModelKind::Embedding && !provider.supports_embeddings() {
            return false;
        }
        self.registry.is_available(name, kind).await
    }

    /// Select a provider and invoke `op` against it, falling back through
    /// the chain on recoverable failures.
    ///
    /// `op` is called once per attempt with the chosen provider. The call
    /// runs under the bounded timeout and the provider's concurrency
    /// permit; the registry lock is never held across it.
    pub async fn select_and_invoke<T, F, Fut>(
        &self,
        kind: ModelKind,
        preference: Option<&str>,
        token: &CancellationToken,
        op: F,
    ) -> Result<(T, SelectionLog), ManagerError>
    where
        F: Fn(Arc<dyn ModelProvider>) -> Fut,
        Fut: Future<Output = ProviderResult<T>> + Send,
        T: Send,
    {
        let mut log = SelectionLog::default();
        let candidates = self.candidates(kind, preference).await;

        if candidates.is_empty() {
            warn!(kind = %kind, "no available provider for request");
            return Err(ManagerError::AllProvidersExhausted { log });
        }

        for name in candidates {
            let Some(provider) = self.providers.get(&name).cloned() else {
                continue;
            };
            let Some(limiter) = self.limiters.get(&name).cloned() else {
                continue;
            };

            let mut same_provider_attempts = 0u32;
            loop {
                if token.is_cancelled() {
                    return Err(ManagerError::Cancelled);
                }

                let permit = match limiter.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };

                debug!(provider = %name, kind = %kind, "invoking provider");
                let outcome = tokio::select! {
                    _ = token.cancelled() => {
                        drop(permit);
                        return Err(ManagerError::Cancelled);
                    }
                    result = tokio::time::timeout(self.config.call_timeout, op(provider.clone())) => result,
                };
                drop(permit);

                match outcome {
                    Ok(Ok(value)) => {
                        self.clear_failures(&name).await;
                        log.selected = Some(name.clone());
                        info!(provider = %name, kind = %kind, "provider call succeeded");
                        return Ok((value, log));
                    }
                    Ok(Err(err)) => {
                        warn!(provider = %name, kind = %kind, error = %err, "provider call failed");
                        log.record_failure(&name, err.kind());
                        self.note_failure(&name, kind).await;

                        match err.retry_class() {
                            RetryClass::Abort => {
                                return Err(ManagerError::InvalidRequest(err.to_string()));
                            }
                            RetryClass::RetrySameOnce
                                if same_provider_attempts < self.config.same_provider_retries =>
                            {
                                same_provider_attempts += 1;
                                debug!(provider = %name, "retrying same provider after transient failure");
                                tokio::time::sleep(self.config.retry_delay).await;
                                continue;
                            }
                            _ => break,
                        }
                    }
                    Err(_elapsed) => {
                        warn!(provider = %name, kind = %kind, timeout_secs = self.config.call_timeout.as_secs(), "provider call timed out");
                        log.record_failure(&name, "timeout");
                        self.note_failure(&name, kind).await;
                        break;
                    }
                }
            }
        }

        warn!(kind = %kind, attempts = log.attempts.len(), "fallback chain exhausted");
        Err(ManagerError::AllProvidersExhausted { log })
    }

    /// Generate text via the fallback chain, honoring the request's
    /// provider preference.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        token: &CancellationToken,
    ) -> Result<(GeneratedText, SelectionLog), ManagerError> {
        let preference = request.preferred_provider.clone();
        self.select_and_invoke(
            ModelKind::TextGeneration,
            preference.as_deref(),
            token,
            |provider| {
                let request = request.clone();
                async move { provider.generate(&request).await }
            },
        )
        .await
    }

    /// Produce an embedding via the embedding fallback chain.
    pub async fn embed(
        &self,
        text: &str,
        token: &CancellationToken,
    ) -> Result<(EmbeddingVector, SelectionLog), ManagerError> {
        self.select_and_invoke(ModelKind::Embedding, None, token, |provider| {
            let text = text.to_string();
            async move { provider.embed(&text).await }
        })
        .await
    }

    /// Feed the circuit breaker; past the threshold, downgrade the
    /// provider's descriptor so selection skips it until a probe recovers it.
    async fn note_failure(&self, provider: &str, kind: ModelKind) {
        let recent = {
            let mut breakers = self.breakers.lock().await;
            breakers
                .entry(provider.to_string())
                .or_default()
                .record(Instant::now(), self.config.failure_window)
        };

        if recent as u32 >= self.config.failure_threshold {
            if let Some(descriptor) = self.registry.descriptor_for(provider, kind).await {
                warn!(
                    provider = %provider,
                    failures = recent,
                    window_secs = self.config.failure_window.as_secs(),
                    "circuit breaker opened, marking model unavailable"
                );
                self.registry.mark_unavailable(&descriptor.id).await;
            }
        }
    }

    /// Reset the failure window after a success.
    async fn clear_failures(&self, provider: &str) {
        let mut breakers = self.breakers.lock().await;
        if let Some(window) = breakers.get_mut(provider) {
            window.clear();
        }
    }
}
