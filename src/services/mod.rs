//! Core Services
//!
//! The orchestration services behind the request router:
//!
//! - `registry` - model catalog with live health metadata
//! - `manager` - provider selection, fallback, and circuit breaking
//! - `safety` - pure SQL safety validation
//! - `workflows` - the multi-stage content and query pipelines
//! - `router` - the entry point the host application calls

pub mod manager;
pub mod registry;
pub mod router;
pub mod safety;
pub mod workflows;

pub use manager::{ManagerConfig, ManagerError, ModelManager, ProviderFailure, SelectionLog};
pub use registry::{HealthProber, ModelDescriptor, ModelKind, ModelRegistry, ModelStatus};
pub use router::{HealthState, HealthStatus, RequestRouter};
pub use safety::{SafetyConfig, SqlSafetyValidator};
