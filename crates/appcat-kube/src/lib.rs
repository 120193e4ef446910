//! appcat kube - Kubernetes integration for the application catalog manager
//!
//! This crate provides:
//! - **Stores**: ApplicationDefinition and catalog access, live or in memory
//! - **Reconciler**: converges ApplicationDefinitions with their catalogs
//! - **Conflict Detection**: cross-catalog ownership checks at admission time
//! - **Webhooks**: mutating and validating admission endpoints over TLS
//! - **Controller**: watch-driven reconciliation with backoff and deletion handling
//! - **Leader Election**: Lease based, so only one replica reconciles

pub mod conflicts;
pub mod controller;
pub mod error;
pub mod leader;
pub mod reconciler;
pub mod store;
pub mod webhook;

pub use conflicts::{Conflict, ConflictDetector, Verdict};
pub use controller::{ControllerConfig, DEFAULT_RECONCILIATION_INTERVAL};
pub use error::{Result, SyncError};
pub use leader::{LeaderElector, LeaderGuard};
pub use reconciler::{ReconcileOutcome, Reconciler, SyncSummary};
pub use store::{
    CatalogStore, DefinitionStore, KubeCatalogStore, KubeDefinitionStore, MockCatalogStore,
    MockDefinitionStore, OperationCounts,
};
pub use webhook::{WebhookState, webhook_router};
