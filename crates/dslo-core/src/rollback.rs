//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Compensation of runtime transitions."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
//! Compensation is a pure function of a [`TransitionRecord`]: the record names
//! the resource, the model snapshot and the operation, and the plan below
//! decides which opposite transition replays it. Compensation only touches
//! the runtime and the override registry. Model entries are restored by the
//! transaction's own journal, except Disable's `enabled=false`.

use dslo_naming::derive;
use tracing::info;

use crate::context::HostEnvironment;
use crate::handlers::EnableHandler;
use crate::runtime::teardown_services;
use crate::transaction::{OperationKind, PriorState, TransitionRecord};
use crate::Result;

/// Action replayed when a transaction holding a record rolls back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// Re-run the enable runtime phase with the snapshot.
    RecoverServices,
    /// Re-register the instance override, then recover services.
    RestoreRemoved,
    /// Remove every unit derived from the snapshot.
    Teardown,
    /// Nothing to undo.
    Nothing,
}

pub struct RollbackCoordinator;

impl RollbackCoordinator {
    /// Decide how a record is compensated.
    pub fn plan(record: &TransitionRecord) -> Compensation {
        match record.kind {
            OperationKind::Disable => Compensation::RecoverServices,
            OperationKind::Remove => Compensation::RestoreRemoved,
            OperationKind::Enable | OperationKind::Add => match record.prior_state {
                PriorState::Running => Compensation::Nothing,
                PriorState::Stopped | PriorState::Absent => Compensation::Teardown,
            },
        }
    }

    /// Replay the compensation planned for `record`.
    pub(crate) fn compensate(env: &HostEnvironment, record: &TransitionRecord) -> Result<()> {
        let plan = Self::plan(record);
        info!(
            resource = %record.address,
            operation = %record.kind,
            compensation = ?plan,
            "compensating transition"
        );
        match plan {
            Compensation::RecoverServices => {
                EnableHandler::new(record.variant).recover_services(
                    env,
                    &record.address,
                    &record.snapshot,
                )?;
            }
            Compensation::RestoreRemoved => {
                let resource = record.address.resource_name()?;
                env.overrides().register(resource);
                EnableHandler::new(record.variant).recover_services(
                    env,
                    &record.address,
                    &record.snapshot,
                )?;
            }
            Compensation::Teardown => {
                let resource = record.address.resource_name()?;
                let names = derive(resource, &record.snapshot.binding_name);
                teardown_services(env, &names);
            }
            Compensation::Nothing => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::ResourceAddress;
    use crate::model::ResourceModel;
    use dslo_common::DataSourceKind;
    use uuid::Uuid;

    fn record(kind: OperationKind, prior_state: PriorState) -> TransitionRecord {
        TransitionRecord::new(
            Uuid::new_v4(),
            ResourceAddress::data_source(DataSourceKind::Plain, "ds1"),
            ResourceModel::new("java:/DS1"),
            kind,
            DataSourceKind::Plain,
            prior_state,
        )
    }

    #[test]
    fn disable_and_remove_are_compensated_by_recovery() {
        assert_eq!(
            RollbackCoordinator::plan(&record(OperationKind::Disable, PriorState::Running)),
            Compensation::RecoverServices
        );
        assert_eq!(
            RollbackCoordinator::plan(&record(OperationKind::Remove, PriorState::Running)),
            Compensation::RestoreRemoved
        );
    }

    #[test]
    fn enable_is_compensated_by_teardown_unless_already_running() {
        assert_eq!(
            RollbackCoordinator::plan(&record(OperationKind::Enable, PriorState::Absent)),
            Compensation::Teardown
        );
        assert_eq!(
            RollbackCoordinator::plan(&record(OperationKind::Enable, PriorState::Stopped)),
            Compensation::Teardown
        );
        assert_eq!(
            RollbackCoordinator::plan(&record(OperationKind::Enable, PriorState::Running)),
            Compensation::Nothing
        );
        assert_eq!(
            RollbackCoordinator::plan(&record(OperationKind::Add, PriorState::Absent)),
            Compensation::Teardown
        );
    }
}
