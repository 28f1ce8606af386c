//! Configuration Loader
//!
//! Reads the TOML configuration supplied by the host application at
//! startup. The shapes and defaults live in `quillspace-core`; this
//! module only handles the file I/O and API key resolution.

use std::path::Path;

use quillspace_core::config::{AiConfig, ProviderSettings};
use quillspace_core::{CoreError, CoreResult};

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> CoreResult<AiConfig> {
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}

/// Load configuration, falling back to defaults when the file is absent.
pub fn load_config_or_default(path: &Path) -> CoreResult<AiConfig> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(AiConfig::default())
    }
}

/// Parse a TOML configuration document.
pub fn parse_config(text: &str) -> CoreResult<AiConfig> {
    let mut config: AiConfig = toml::from_str(text).map_err(|e| CoreError::parse(e.to_string()))?;
    for provider in &mut config.providers {
        resolve_api_key(provider);
    }
    Ok(config)
}

/// Resolve a provider's API key from its configured environment
/// variable. Inline keys are never read from config files.
fn resolve_api_key(provider: &mut ProviderSettings) {
    if provider.api_key.is_none() {
        if let Some(var) = &provider.api_key_env {
            provider.api_key = std::env::var(var).ok().filter(|v| !v.is_empty());
        }
    }
}
