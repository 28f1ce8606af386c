//! Shared Provider Types
//!
//! Request/response types, the adapter error taxonomy, and the rolling
//! per-adapter statistics consumed by health checks and introspection.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use quillspace_core::proxy::ProxyConfig;

/// How many recent call latencies each adapter keeps for its average.
const LATENCY_WINDOW: usize = 32;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by provider adapters.
///
/// `Unavailable`, `Timeout`, and `RateLimited` are the recoverable
/// taxonomy the model manager handles via fallback. `Network` marks a
/// clearly transient transport blip eligible for one same-provider retry.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Provider is unreachable, misbehaving, or the model is missing
    #[error("provider unavailable: {message}")]
    Unavailable { message: String },

    /// Transient network failure (connect reset, DNS blip)
    #[error("network error: {message}")]
    Network { message: String },

    /// The call exceeded its bounded timeout
    #[error("provider timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Provider-side rate limiting
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },

    /// Invalid or missing credentials
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The request itself was rejected (malformed, too large)
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The provider does not implement the requested operation
    #[error("unsupported operation: {message}")]
    Unsupported { message: String },
}

/// Result type for provider adapter calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// What the model manager should do after a given failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Retry the same provider once before advancing
    RetrySameOnce,
    /// Advance to the next candidate in the fallback chain
    NextProvider,
    /// Surface the failure without trying anyone else
    Abort,
}

impl ProviderError {
    /// Classify this failure for the manager's retry/fallback decision.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            ProviderError::Network { .. } => RetryClass::RetrySameOnce,
            ProviderError::Unavailable { .. }
            | ProviderError::Timeout { .. }
            | ProviderError::RateLimited { .. }
            | ProviderError::Authentication { .. }
            | ProviderError::Unsupported { .. } => RetryClass::NextProvider,
            ProviderError::InvalidRequest { .. } => RetryClass::Abort,
        }
    }

    /// Short machine-readable kind, used in failure records and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Unavailable { .. } => "unavailable",
            ProviderError::Network { .. } => "network",
            ProviderError::Timeout { .. } => "timeout",
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::Authentication { .. } => "authentication",
            ProviderError::InvalidRequest { .. } => "invalid_request",
            ProviderError::Unsupported { .. } => "unsupported",
        }
    }

    /// Error for a provider with no API key configured.
    pub fn missing_api_key(provider: &str) -> Self {
        ProviderError::Authentication {
            message: format!("API key not configured for {}", provider),
        }
    }

    /// Error for an operation the provider does not implement.
    pub fn unsupported(provider: &str, operation: &str) -> Self {
        ProviderError::Unsupported {
            message: format!("{} does not support {}", provider, operation),
        }
    }
}

/// Map an HTTP error status to a provider error.
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Authentication {
            message: format!("{}: access denied", provider),
        },
        404 => ProviderError::Unavailable {
            message: format!("{}: endpoint or model not found", provider),
        },
        429 => ProviderError::RateLimited {
            message: format!("{}: {}", provider, body),
            retry_after: None,
        },
        400 => ProviderError::InvalidRequest {
            message: format!("{}: {}", provider, body),
        },
        500..=599 => ProviderError::Unavailable {
            message: format!("{}: server error (HTTP {})", provider, status),
        },
        _ => ProviderError::Unavailable {
            message: format!("{}: HTTP {}: {}", provider, status, body),
        },
    }
}

/// Map a reqwest transport error to a provider error.
pub fn classify_transport_error(
    err: &reqwest::Error,
    provider: &str,
    timeout_secs: u64,
) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            seconds: timeout_secs,
        }
    } else if err.is_connect() {
        ProviderError::Network {
            message: format!("{}: {}", provider, err),
        }
    } else {
        ProviderError::Unavailable {
            message: format!("{}: {}", provider, err),
        }
    }
}

// ============================================================================
// Requests and responses
// ============================================================================

/// A text generation request. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// User prompt
    pub prompt: String,
    /// Optional system instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Max tokens override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Temperature override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Preferred provider name, tried ahead of the fallback chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_provider: Option<String>,
}

impl GenerationRequest {
    /// Create a request with just a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            max_tokens: None,
            temperature: None,
            preferred_provider: None,
        }
    }

    /// Set system instructions.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set a max-tokens override.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set a temperature override.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Prefer a specific provider ahead of the fallback chain.
    pub fn with_preferred_provider(mut self, provider: impl Into<String>) -> Self {
        self.preferred_provider = Some(provider.into());
        self
    }
}

/// A completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedText {
    /// Generated content
    pub content: String,
    /// Provider that produced it
    pub provider: String,
    /// Model that produced it
    pub model: String,
    /// Wall-clock latency of the call
    pub latency_ms: u64,
}

/// An embedding produced by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingVector {
    /// Vector components
    pub values: Vec<f32>,
    /// Provider that produced it
    pub provider: String,
    /// Model that produced it
    pub model: String,
}

impl EmbeddingVector {
    /// Dimensionality of the vector.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// Provider configuration
// ============================================================================

/// Runtime configuration for a single adapter instance.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Text generation model
    pub model: String,
    /// Embedding model, when the provider supports embeddings
    pub embedding_model: Option<String>,
    /// API key (cloud providers)
    pub api_key: Option<String>,
    /// Endpoint base URL override
    pub base_url: Option<String>,
    /// Default max tokens
    pub max_tokens: u32,
    /// Default sampling temperature
    pub temperature: f32,
    /// HTTP timeout, seconds
    pub timeout_secs: u64,
    /// Proxy configuration for cloud calls
    pub proxy: Option<ProxyConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            embedding_model: None,
            api_key: None,
            base_url: None,
            max_tokens: 1024,
            temperature: 0.7,
            timeout_secs: 60,
            proxy: None,
        }
    }
}

// ============================================================================
// Rolling statistics
// ============================================================================

#[derive(Debug, Default)]
struct StatsWindow {
    latencies: VecDeque<u64>,
    successes: u64,
    failures: u64,
}

/// Rolling latency/error statistics owned by each adapter.
///
/// Updated on every `generate`/`embed` call; consumed by health checks
/// and registry introspection. Lock contention is negligible (one short
/// lock per completed call), so a plain mutex suffices.
#[derive(Debug, Default)]
pub struct ProviderStats {
    inner: Mutex<StatsWindow>,
}

impl ProviderStats {
    /// Create empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful call and its latency.
    pub fn record_success(&self, latency_ms: u64) {
        if let Ok(mut window) = self.inner.lock() {
            window.successes += 1;
            window.latencies.push_back(latency_ms);
            while window.latencies.len() > LATENCY_WINDOW {
                window.latencies.pop_front();
            }
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        if let Ok(mut window) = self.inner.lock() {
            window.failures += 1;
        }
    }

    /// Snapshot the current statistics.
    pub fn snapshot(&self) -> ProviderStatsSnapshot {
        match self.inner.lock() {
            Ok(window) => {
                let total = window.successes + window.failures;
                let avg_latency_ms = if window.latencies.is_empty() {
                    None
                } else {
                    Some(window.latencies.iter().sum::<u64>() / window.latencies.len() as u64)
                };
                ProviderStatsSnapshot {
                    successes: window.successes,
                    failures: window.failures,
                    avg_latency_ms,
                    error_rate: if total == 0 {
                        0.0
                    } else {
                        window.failures as f32 / total as f32
                    },
                }
            }
            Err(_) => ProviderStatsSnapshot::default(),
        }
    }
}

/// Point-in-time view of an adapter's rolling statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderStatsSnapshot {
    pub successes: u64,
    pub failures: u64,
    pub avg_latency_ms: Option<u64>,
    pub error_rate: f32,
}
