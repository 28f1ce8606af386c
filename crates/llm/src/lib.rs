//! Quillspace LLM
//!
//! Provides a unified interface for invoking heterogeneous model
//! providers:
//! - Ollama (local inference)
//! - OpenAI (and chat-completions-compatible endpoints)
//! - Anthropic
//!
//! Also includes the HTTP client factory and the rolling per-adapter
//! statistics consumed by health probing.

pub mod anthropic;
pub mod http_client;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use http_client::build_http_client;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
pub use provider::ModelProvider;
pub use types::*;
