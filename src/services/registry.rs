//! Model Registry
//!
//! Catalog of known models with live health and capability metadata.
//! Status transitions are written only by the health prober, the model
//! manager's failure-driven downgrade, and the installer boundary
//! (`mark_installing`). Everything else reads.
//!
//! A single `RwLock` around the descriptor map is deliberate: writes are
//! rare (probes and breaker trips) relative to selection reads, and the
//! lock is never held across a provider call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use quillspace_core::config::ServiceClass;
use quillspace_llm::ModelProvider;

/// What a model is capable of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    TextGeneration,
    Embedding,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::TextGeneration => write!(f, "text-generation"),
            ModelKind::Embedding => write!(f, "embedding"),
        }
    }
}

/// Live status of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// Selectable by the model manager
    Available,
    /// Excluded from selection until a successful health probe
    Unavailable,
    /// Being downloaded by the installer; excluded from selection and
    /// from health probing until the installer flips it
    Installing,
}

/// Identity, capability, and health metadata for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Stable id, `provider/model`
    pub id: String,
    /// Provider name (fallback chains reference this)
    pub provider: String,
    /// Model name
    pub model: String,
    /// Capability
    pub kind: ModelKind,
    /// Live status
    pub status: ModelStatus,
    /// Combined cost/latency class
    pub class: ServiceClass,
    /// When the status was last confirmed by a probe or call outcome
    pub last_health_check: Option<DateTime<Utc>>,
}

impl ModelDescriptor {
    /// Create an available descriptor.
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        kind: ModelKind,
        class: ServiceClass,
    ) -> Self {
        let provider = provider.into();
        let model = model.into();
        Self {
            id: format!("{}/{}", provider, model),
            provider,
            model,
            kind,
            status: ModelStatus::Available,
            class,
            last_health_check: None,
        }
    }

    /// Override the initial status.
    pub fn with_status(mut self, status: ModelStatus) -> Self {
        self.status = status;
        self
    }
}

/// Registry of model descriptors.
#[derive(Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<String, ModelDescriptor>>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a descriptor.
    pub async fn register(&self, descriptor: ModelDescriptor) {
        debug!(id = %descriptor.id, kind = %descriptor.kind, "registering model");
        let mut models = self.models.write().await;
        models.insert(descriptor.id.clone(), descriptor);
    }

    /// All descriptors, ordered by id for deterministic output.
    pub async fn list(&self) -> Vec<ModelDescriptor> {
        let models = self.models.read().await;
        let mut all: Vec<ModelDescriptor> = models.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Available descriptors of the given kind, ordered by id.
    pub async fn list_available(&self, kind: ModelKind) -> Vec<ModelDescriptor> {
        let models = self.models.read().await;
        let mut available: Vec<ModelDescriptor> = models
            .values()
            .filter(|d| d.kind == kind && d.status == ModelStatus::Available)
            .cloned()
            .collect();
        available.sort_by(|a, b| a.id.cmp(&b.id));
        available
    }

    /// Descriptor by id.
    pub async fn get(&self, id: &str) -> Option<ModelDescriptor> {
        let models = self.models.read().await;
        models.get(id).cloned()
    }

    /// Descriptor for a provider/kind pair.
    pub async fn descriptor_for(&self, provider: &str, kind: ModelKind) -> Option<ModelDescriptor> {
        let models = self.models.read().await;
        models
            .values()
            .find(|d| d.provider == provider && d.kind == kind)
            .cloned()
    }

    /// Whether the provider has an available descriptor of the kind.
    pub async fn is_available(&self, provider: &str, kind: ModelKind) -> bool {
        let models = self.models.read().await;
        models
            .values()
            .any(|d| d.provider == provider && d.kind == kind && d.status == ModelStatus::Available)
    }

    /// All descriptors belonging to a provider.
    pub async fn descriptors_for_provider(&self, provider: &str) -> Vec<ModelDescriptor> {
        let models = self.models.read().await;
        models
            .values()
            .filter(|d| d.provider == provider)
            .cloned()
            .collect()
    }

    /// Mark a descriptor available and stamp the health check time.
    pub async fn mark_available(&self, id: &str) -> bool {
        self.set_status(id, ModelStatus::Available).await
    }

    /// Mark a descriptor unavailable and stamp the health check time.
    pub async fn mark_unavailable(&self, id: &str) -> bool {
        self.set_status(id, ModelStatus::Unavailable).await
    }

    /// Installer boundary: mark a descriptor as being installed.
    pub async fn mark_installing(&self, id: &str) -> bool {
        self.set_status(id, ModelStatus::Installing).await
    }

    async fn set_status(&self, id: &str, status: ModelStatus) -> bool {
        let mut models = self.models.write().await;
        match models.get_mut(id) {
            Some(descriptor) => {
                if descriptor.status != status {
                    info!(id = %id, from = ?descriptor.status, to = ?status, "model status change");
                }
                descriptor.status = status;
                descriptor.last_health_check = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Number of registered descriptors.
    pub async fn len(&self) -> usize {
        self.models.read().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.models.read().await.is_empty()
    }
}

// ============================================================================
// Health prober
// ============================================================================

/// Periodic health prober.
///
/// The only writer of status transitions besides the manager's
/// failure-driven downgrade and the installer boundary. Probes every
/// provider on a fixed interval and flips its descriptors (all kinds)
/// accordingly; descriptors in `Installing` are left alone.
pub struct HealthProber;

impl HealthProber {
    /// Spawn the probing task. Aborting the returned handle stops it.
    pub fn spawn(
        registry: Arc<ModelRegistry>,
        providers: HashMap<String, Arc<dyn ModelProvider>>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                Self::probe_all(&registry, &providers).await;
            }
        })
    }

    /// Probe every provider once. Exposed for direct use in tests and at
    /// startup, ahead of the first interval tick.
    pub async fn probe_all(
        registry: &ModelRegistry,
        providers: &HashMap<String, Arc<dyn ModelProvider>>,
    ) {
        for (name, provider) in providers {
            let healthy = match provider.health_check().await {
                Ok(()) => true,
                Err(err) => {
                    warn!(provider = %name, error = %err, "health probe failed");
                    false
                }
            };

            for descriptor in registry.descriptors_for_provider(name).await {
                if descriptor.status == ModelStatus::Installing {
                    continue;
                }
                if healthy {
                    registry.mark_available(&descriptor.id).await;
                } else {
                    registry.mark_unavailable(&descriptor.id).await;
                }
            }
        }
    }
}
