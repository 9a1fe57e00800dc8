//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Handler dispatch types, operation outcomes and shared helpers."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
//! Each handler runs a model phase, which always applies, and then a runtime
//! phase that only runs in normal runtime mode. Handlers are parameterised by
//! the datasource variant instead of being specialised per variant.

mod add;
mod disable;
mod enable;
mod remove;

pub use add::AddHandler;
pub use disable::DisableHandler;
pub use enable::EnableHandler;
pub use remove::RemoveHandler;

use std::collections::BTreeSet;

use dslo_common::DataSourceKind;

use crate::address::ResourceAddress;
use crate::context::HostEnvironment;
use crate::error::LifecycleError;
use crate::model::StatisticsResource;
use crate::runtime::RuntimeChanges;
use crate::Result;

/// What a handler did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The model was updated and the runtime reconciled.
    Applied(RuntimeChanges),
    /// Only the model was updated.
    ModelOnly,
    /// The model was updated; the runtime waits for a full reload.
    ReloadRequired,
    /// The resource was no longer defined; leftover units were swept.
    AlreadyAbsent(RuntimeChanges),
}

impl OperationOutcome {
    pub fn changes(&self) -> RuntimeChanges {
        match self {
            OperationOutcome::Applied(changes) | OperationOutcome::AlreadyAbsent(changes) => {
                *changes
            }
            OperationOutcome::ModelOnly | OperationOutcome::ReloadRequired => {
                RuntimeChanges::default()
            }
        }
    }
}

/// Check that `address` names a datasource of `variant` and return its name.
pub(crate) fn resolve_target(address: &ResourceAddress, variant: DataSourceKind) -> Result<&str> {
    let kind = address.kind()?;
    if kind != variant {
        return Err(LifecycleError::InvalidAddress {
            address: address.to_string(),
            reason: format!("a {variant} handler cannot operate on a {kind} datasource"),
        });
    }
    address.resource_name()
}

/// Register the runtime statistics children on the live model entry, if any.
pub(crate) fn register_statistics(env: &HostEnvironment, address: &ResourceAddress) {
    if let Some(mut current) = env.model().read(address) {
        let expected: BTreeSet<StatisticsResource> = StatisticsResource::ALL.into_iter().collect();
        if current.statistics_resources != expected {
            current.statistics_resources = expected;
            env.model().write(address, current);
        }
    }
}
