//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Remove handler with idempotent teardown and leftover sweep."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use dslo_common::DataSourceKind;
use dslo_logging::{dslo_info, LogContext};
use dslo_naming::{derive, ResourceServiceNames};

use crate::address::ResourceAddress;
use crate::handlers::{resolve_target, OperationOutcome};
use crate::runtime::{sweep_resource_services, teardown_services};
use crate::transaction::{OperationKind, PriorState, Transaction, TransitionRecord};
use crate::Result;

/// Removes a datasource definition and every unit derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveHandler {
    variant: DataSourceKind,
}

impl RemoveHandler {
    /// Handler for `data-source` resources.
    pub const PLAIN: RemoveHandler = RemoveHandler::new(DataSourceKind::Plain);
    /// Handler for `xa-data-source` resources.
    pub const XA: RemoveHandler = RemoveHandler::new(DataSourceKind::Xa);

    pub const fn new(variant: DataSourceKind) -> Self {
        Self { variant }
    }

    /// Variant this handler accepts; other addresses are rejected.
    pub fn variant(&self) -> DataSourceKind {
        self.variant
    }

    /// Idempotent: every unit is removed only if present, and an address that
    /// is no longer defined reports [`OperationOutcome::AlreadyAbsent`].
    ///
    /// Rolling back restores the model entry and the override, then recovers
    /// the services of an enabled snapshot.
    pub fn execute(
        &self,
        tx: &mut Transaction<'_>,
        address: &ResourceAddress,
    ) -> Result<OperationOutcome> {
        let resource = resolve_target(address, self.variant)?;
        let env = tx.env();
        let transaction = tx.id().to_string();
        let ctx = LogContext::new()
            .with_resource(resource)
            .with_operation(OperationKind::Remove.as_str())
            .with_transaction(&transaction);

        let Some(snapshot) = env.model().remove(address) else {
            let changes =
                sweep_resource_services(env, resource, &ResourceServiceNames::for_resource(resource));
            env.overrides().unregister(resource);
            dslo_info!(
                context = ctx,
                "resource already absent; swept {} leftover services",
                changes.removed
            );
            return Ok(OperationOutcome::AlreadyAbsent(changes));
        };

        tx.journal_model(address, Some(snapshot.clone()));

        let names = derive(resource, &snapshot.binding_name);
        let prior_state =
            PriorState::observe(env.directory().lookup(&names.resource.data_source).as_ref());
        tx.on_rollback(TransitionRecord::new(
            tx.id(),
            address.clone(),
            snapshot,
            OperationKind::Remove,
            self.variant,
            prior_state,
        ));

        let changes = teardown_services(env, &names);
        env.overrides().unregister(resource);
        dslo_info!(context = ctx, "removed {} services", changes.removed);
        Ok(OperationOutcome::Applied(changes))
    }
}
