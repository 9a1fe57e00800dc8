//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Datasource lifecycle orchestration core."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
//! Lifecycle orchestration for datasources backed by dependent runtime services.
//!
//! Handlers mutate the persisted model first and then reconcile the runtime
//! service directory. Runtime transitions register compensation records on
//! the surrounding [`Transaction`], which replays them if it rolls back.

pub mod address;
pub mod context;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod overrides;
pub mod rollback;
pub mod runtime;
pub mod transaction;

pub use address::{PathElement, ResourceAddress};
pub use context::HostEnvironment;
pub use error::LifecycleError;
pub use handlers::{AddHandler, DisableHandler, EnableHandler, OperationOutcome, RemoveHandler};
pub use metrics::LifecycleMetrics;
pub use model::{ConfigurationModel, InMemoryModel, ResourceModel, StatisticsResource};
pub use orchestrator::{LifecycleOrchestrator, ManagementOperation};
pub use overrides::{InMemoryOverrides, OverrideRegistry};
pub use rollback::{Compensation, RollbackCoordinator};
pub use runtime::{InstallPolicy, RuntimeChanges};
pub use transaction::{
    OperationKind, PriorState, RollbackFailure, RollbackReport, Transaction, TransitionRecord,
};

pub use dslo_common::{DataSourceKind, RuntimeMode};

/// Result alias used throughout the lifecycle core.
pub type Result<T> = std::result::Result<T, LifecycleError>;
