//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Enable handler and service recovery from a model snapshot."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use dslo_common::DataSourceKind;
use dslo_logging::{dslo_debug, dslo_info, LogContext};
use dslo_naming::{derive, ServiceName};

use crate::address::ResourceAddress;
use crate::context::HostEnvironment;
use crate::error::LifecycleError;
use crate::handlers::{register_statistics, resolve_target, OperationOutcome};
use crate::model::ResourceModel;
use crate::runtime::{install_services, InstallPolicy, RuntimeChanges};
use crate::transaction::{OperationKind, PriorState, Transaction, TransitionRecord};
use crate::Result;

/// Marks a datasource enabled and brings its runtime services up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnableHandler {
    variant: DataSourceKind,
}

impl EnableHandler {
    /// Handler for `data-source` resources.
    pub const PLAIN: EnableHandler = EnableHandler::new(DataSourceKind::Plain);
    /// Handler for `xa-data-source` resources.
    pub const XA: EnableHandler = EnableHandler::new(DataSourceKind::Xa);

    pub const fn new(variant: DataSourceKind) -> Self {
        Self { variant }
    }

    /// Variant this handler accepts; other addresses are rejected.
    pub fn variant(&self) -> DataSourceKind {
        self.variant
    }

    /// Write `enabled=true` and bring the services up.
    ///
    /// A rollback restores the previous model entry. Services are torn down
    /// only when the primary was not already running.
    pub fn execute(
        &self,
        tx: &mut Transaction<'_>,
        address: &ResourceAddress,
    ) -> Result<OperationOutcome> {
        let resource = resolve_target(address, self.variant)?;
        let env = tx.env();
        let snapshot = env
            .model()
            .read(address)
            .ok_or_else(|| LifecycleError::ResourceNotFound {
                address: address.clone(),
            })?;

        let mut updated = snapshot.clone();
        updated.enabled = Some(true);
        tx.journal_model(address, Some(snapshot.clone()));
        env.model().write(address, updated.clone());

        if !tx.is_normal_runtime_mode() {
            return Ok(OperationOutcome::ModelOnly);
        }

        let names = derive(resource, &updated.binding_name);
        let prior_state =
            PriorState::observe(env.directory().lookup(&names.resource.data_source).as_ref());
        if prior_state != PriorState::Running {
            tx.on_rollback(TransitionRecord::new(
                tx.id(),
                address.clone(),
                snapshot,
                OperationKind::Enable,
                self.variant,
                prior_state,
            ));
        }

        let changes =
            self.recover_with(env, address, &updated, &mut |name| tx.journal_created(name))?;

        let transaction = tx.id().to_string();
        let ctx = LogContext::new()
            .with_resource(resource)
            .with_operation(OperationKind::Enable.as_str())
            .with_transaction(&transaction);
        dslo_info!(
            context = ctx,
            "created {} services, restarted {}",
            changes.created,
            changes.restarted
        );
        Ok(OperationOutcome::Applied(changes))
    }

    /// Bring the services described by `snapshot` back up.
    ///
    /// Runs only when the runtime is in normal mode and the snapshot is
    /// enabled. Absent units are created, stopped ones restarted and running
    /// ones left alone, so the call can be repeated safely.
    pub fn recover_services(
        &self,
        env: &HostEnvironment,
        address: &ResourceAddress,
        snapshot: &ResourceModel,
    ) -> Result<RuntimeChanges> {
        self.recover_with(env, address, snapshot, &mut |_| {})
    }

    fn recover_with(
        &self,
        env: &HostEnvironment,
        address: &ResourceAddress,
        snapshot: &ResourceModel,
        on_created: &mut dyn FnMut(&ServiceName),
    ) -> Result<RuntimeChanges> {
        let resource = address.resource_name()?;
        if !env.is_normal_runtime_mode() || !snapshot.is_enabled() {
            let ctx = LogContext::new().with_resource(resource);
            dslo_debug!(context = ctx, "recovery skipped");
            return Ok(RuntimeChanges::default());
        }
        let names = derive(resource, &snapshot.binding_name);
        let changes = install_services(
            env,
            &names,
            self.variant,
            snapshot,
            InstallPolicy::Reconcile,
            on_created,
        )?;
        register_statistics(env, address);
        Ok(changes)
    }
}
