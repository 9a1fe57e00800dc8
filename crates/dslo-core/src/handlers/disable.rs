//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Disable handler: runtime preconditions, stop and teardown, reload-required path."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use dslo_common::DataSourceKind;
use dslo_logging::{dslo_info, LogContext};
use dslo_naming::{derive, ServiceKind, ServiceName};
use dslo_registry::{ServiceMode, ServiceState};

use crate::address::ResourceAddress;
use crate::context::HostEnvironment;
use crate::error::LifecycleError;
use crate::handlers::{resolve_target, OperationOutcome};
use crate::runtime::{property_descendants, remove_service, RuntimeChanges};
use crate::transaction::{OperationKind, PriorState, Transaction, TransitionRecord};
use crate::Result;

/// Marks a datasource disabled and stops its runtime services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisableHandler {
    variant: DataSourceKind,
}

impl DisableHandler {
    /// Handler for `data-source` resources.
    pub const PLAIN: DisableHandler = DisableHandler::new(DataSourceKind::Plain);
    /// Handler for `xa-data-source` resources.
    pub const XA: DisableHandler = DisableHandler::new(DataSourceKind::Xa);

    pub const fn new(variant: DataSourceKind) -> Self {
        Self { variant }
    }

    /// Variant this handler accepts; other addresses are rejected.
    pub fn variant(&self) -> DataSourceKind {
        self.variant
    }

    /// `enabled=false` is written before anything else and stays written even
    /// when the runtime phase fails or the transaction rolls back.
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

        let normal = tx.is_normal_runtime_mode();
        let mut updated = snapshot.clone();
        updated.enabled = Some(false);
        if normal {
            updated.statistics_resources.clear();
        }
        env.model().write(address, updated);

        if !normal {
            return Ok(OperationOutcome::ModelOnly);
        }
        if !tx.is_service_restart_allowed() {
            tx.require_full_reload();
            return Ok(OperationOutcome::ReloadRequired);
        }

        let names = derive(resource, &snapshot.binding_name);
        let primary = &names.resource.data_source;
        require_up(env, resource, ServiceKind::DataSource, primary)?;
        tx.on_rollback(TransitionRecord::new(
            tx.id(),
            address.clone(),
            snapshot,
            OperationKind::Disable,
            self.variant,
            PriorState::Running,
        ));

        let directory = env.directory();
        let mut changes = RuntimeChanges::default();
        directory.set_mode(primary, ServiceMode::Never)?;
        changes.stopped += 1;

        for name in [
            &names.deployment,
            &names.resource.statistics,
            &names.resource.reference_factory,
            &names.binder,
        ] {
            if remove_service(env, resource, name) {
                changes.removed += 1;
            }
        }

        for child in property_descendants(env, &names.resource) {
            let kind = names
                .resource
                .property_kind(&child)
                .unwrap_or(ServiceKind::ConnectionProperty);
            require_up(env, resource, kind, &child)?;
            directory.set_mode(&child, ServiceMode::Never)?;
            changes.stopped += 1;
        }

        for name in [&names.resource.xa_config, &names.resource.config] {
            if remove_service(env, resource, name) {
                changes.removed += 1;
            }
        }

        let transaction = tx.id().to_string();
        let ctx = LogContext::new()
            .with_resource(resource)
            .with_operation(OperationKind::Disable.as_str())
            .with_transaction(&transaction);
        dslo_info!(
            context = ctx,
            "stopped {} services, removed {}",
            changes.stopped,
            changes.removed
        );
        Ok(OperationOutcome::Applied(changes))
    }
}

/// ABSENT is `ServiceNotAvailable`; registered but not UP is `ServiceNotEnabled`.
fn require_up(
    env: &HostEnvironment,
    resource: &str,
    unit: ServiceKind,
    service: &ServiceName,
) -> Result<()> {
    match env.directory().lookup(service) {
        None => Err(LifecycleError::ServiceNotAvailable {
            unit,
            resource: resource.to_owned(),
            service: service.clone(),
        }),
        Some(found) if found.state != ServiceState::Up => Err(LifecycleError::ServiceNotEnabled {
            unit,
            resource: resource.to_owned(),
            service: service.clone(),
            expected: ServiceState::Up,
            actual: found.state,
        }),
        Some(_) => Ok(()),
    }
}
