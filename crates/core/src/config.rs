//! Configuration Data Types
//!
//! Serde-backed configuration for the AI core. The structs here carry the
//! fallback chains, workflow thresholds, circuit-breaker tuning, and
//! provider credentials supplied by the host application at startup. The
//! TOML loader lives in the application crate; this module only defines
//! the shapes and their defaults.
//!
//! Every tunable has a serde default so an empty TOML document produces a
//! usable configuration (minus providers, which must be listed).

use serde::{Deserialize, Serialize};

use crate::proxy::ProxyConfig;

/// Which adapter implementation backs a configured provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderBackend {
    /// Local Ollama runtime
    Ollama,
    /// OpenAI chat-completions API (or any compatible endpoint)
    OpenAi,
    /// Anthropic messages API
    Anthropic,
}

impl std::fmt::Display for ProviderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderBackend::Ollama => write!(f, "ollama"),
            ProviderBackend::OpenAi => write!(f, "openai"),
            ProviderBackend::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Combined cost/latency class of a model, used for selection metadata
/// and surfaced through registry introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceClass {
    /// On-device inference: free, low latency, no quota
    LocalFast,
    /// Metered cloud API, standard latency
    CloudStandard,
    /// Metered cloud API, premium models (higher cost and latency)
    CloudPremium,
}

impl ServiceClass {
    /// Default class for a backend when the configuration does not set one.
    pub fn default_for(backend: ProviderBackend) -> Self {
        match backend {
            ProviderBackend::Ollama => ServiceClass::LocalFast,
            ProviderBackend::OpenAi => ServiceClass::CloudStandard,
            ProviderBackend::Anthropic => ServiceClass::CloudPremium,
        }
    }
}

/// A single configured provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Unique provider name referenced by fallback chains and preferences
    pub name: String,
    /// Adapter implementation
    pub backend: ProviderBackend,
    /// Model used for text generation
    pub model: String,
    /// Model used for embeddings (if the backend supports them)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    /// API key, inline. Prefer `api_key_env` so keys stay out of config files.
    #[serde(default, skip_serializing, skip_deserializing)]
    pub api_key: Option<String>,
    /// Name of the environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Endpoint override (base URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Cost/latency class override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<ServiceClass>,
    /// Per-provider request timeout override, seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Ordered fallback chains per model kind. Entries are provider names.
/// An empty chain falls back to the declaration order of `providers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackSettings {
    #[serde(default)]
    pub text_generation: Vec<String>,
    #[serde(default)]
    pub embedding: Vec<String>,
}

/// Content generation workflow tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Score in [0, 1] at which a draft is accepted without refinement
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f32,
    /// Maximum refine iterations before the workflow finalizes regardless
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Default max tokens per model call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Default sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_quality_threshold() -> f32 {
    0.8
}

fn default_max_iterations() -> u32 {
    3
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
            max_iterations: default_max_iterations(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Database query workflow tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySettings {
    /// Row-count heuristic above which an unbounded scan draws a warning.
    /// Tables with unknown row counts are treated as exceeding it.
    #[serde(default = "default_scan_warn_rows")]
    pub scan_warn_rows: u64,
    /// Maximum number of alternative SQL formulations to produce
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
}

fn default_scan_warn_rows() -> u64 {
    10_000
}

fn default_max_alternatives() -> usize {
    2
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            scan_warn_rows: default_scan_warn_rows(),
            max_alternatives: default_max_alternatives(),
        }
    }
}

/// Health probing cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Interval between health probes, seconds
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
}

fn default_probe_interval() -> u64 {
    30
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            probe_interval_secs: default_probe_interval(),
        }
    }
}

/// Circuit breaker tuning for failure-driven provider downgrades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSettings {
    /// Failures within the window that trip the breaker
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Rolling window, seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_window_secs() -> u64 {
    60
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            window_secs: default_window_secs(),
        }
    }
}

/// Concurrency and retry limits applied by the model manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSettings {
    /// In-flight calls allowed per provider
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    /// Bounded timeout per provider call, seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    /// Same-provider retries for clearly transient failures
    #[serde(default = "default_same_provider_retries")]
    pub same_provider_retries: u32,
    /// Delay before a same-provider retry, milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_call_timeout() -> u64 {
    60
}

fn default_same_provider_retries() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            call_timeout_secs: default_call_timeout(),
            same_provider_retries: default_same_provider_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Top-level configuration for the AI core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    /// Configured providers, in declaration order
    #[serde(default)]
    pub providers: Vec<ProviderSettings>,
    /// Fallback chains per model kind
    #[serde(default)]
    pub fallback: FallbackSettings,
    /// Content generation workflow tuning
    #[serde(default)]
    pub generation: GenerationSettings,
    /// Database query workflow tuning
    #[serde(default)]
    pub query: QuerySettings,
    /// Health probing cadence
    #[serde(default)]
    pub health: HealthSettings,
    /// Circuit breaker tuning
    #[serde(default)]
    pub breaker: BreakerSettings,
    /// Concurrency and retry limits
    #[serde(default)]
    pub limits: LimitSettings,
    /// Global proxy configuration for cloud providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

impl AiConfig {
    /// Look up a provider by name.
    pub fn provider(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Effective text-generation chain: configured, or provider order.
    pub fn text_generation_chain(&self) -> Vec<String> {
        if self.fallback.text_generation.is_empty() {
            self.providers.iter().map(|p| p.name.clone()).collect()
        } else {
            self.fallback.text_generation.clone()
        }
    }

    /// Effective embedding chain: configured, or provider order.
    pub fn embedding_chain(&self) -> Vec<String> {
        if self.fallback.embedding.is_empty() {
            self.providers.iter().map(|p| p.name.clone()).collect()
        } else {
            self.fallback.embedding.clone()
        }
    }
}
