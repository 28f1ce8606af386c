//! Quillspace Core
//!
//! Foundational error and configuration types for the Quillspace AI
//! workspace. This crate has zero dependencies on application-level code
//! (providers, workflows, HTTP clients).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `config` - Configuration data types (`AiConfig` and its sections)
//! - `proxy` - Proxy configuration shared by every HTTP-using service
//!
//! ## Design Principles
//!
//! 1. **Only serde + thiserror** - keeps build times minimal
//! 2. **Unidirectional dependency** - this crate depends on nothing else
//!    in the workspace

pub mod config;
pub mod error;
pub mod proxy;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Configuration ──────────────────────────────────────────────────────
pub use config::{
    AiConfig, BreakerSettings, FallbackSettings, GenerationSettings, HealthSettings,
    LimitSettings, ProviderBackend, ProviderSettings, QuerySettings, ServiceClass,
};

// ── Proxy Types ────────────────────────────────────────────────────────
pub use proxy::{ProxyConfig, ProxyProtocol};
