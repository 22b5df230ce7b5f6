// Shipshape Library - fleet change-management workflow core
// This exposes the core components for testing and integration

pub mod audit;
pub mod cli;
pub mod config;
pub mod database;
pub mod forms;
pub mod identity;
pub mod ledger;
pub mod telemetry;
pub mod trail;
pub mod workflow;

// Re-export key types for easy access
pub use audit::{AuditRecorder, TracingAuditRecorder};
pub use config::{config, init_config, ShipshapeConfig};
pub use forms::{FormDetails, FormRecord, FormStore, InMemoryFormStore, NewForm};
pub use identity::{IdentityProvider, Role, StaticIdentity, UserIdentity};
pub use ledger::{
    InMemoryLedgerStore, LedgerEntry, LedgerStore, NewLedgerEntry, RequestKind, RequestStatus,
    StoreError,
};
pub use telemetry::{generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use trail::{InMemoryTrailStore, TrailAction, TrailEntry, TrailStore};
pub use workflow::{
    ReconciliationIssue, ReconciliationReport, RequestAction, WorkflowCoordinator, WorkflowError,
};
