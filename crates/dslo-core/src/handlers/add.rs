//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Add handler: model write plus strict service installation."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use dslo_common::DataSourceKind;
use dslo_logging::{dslo_info, LogContext};
use dslo_naming::derive;

use crate::address::ResourceAddress;
use crate::error::LifecycleError;
use crate::handlers::{register_statistics, resolve_target, OperationOutcome};
use crate::model::ResourceModel;
use crate::runtime::{install_services, InstallPolicy};
use crate::transaction::{OperationKind, PriorState, Transaction, TransitionRecord};
use crate::Result;

/// Defines a datasource and, when enabled, installs its runtime services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddHandler {
    variant: DataSourceKind,
}

impl AddHandler {
    /// Handler for `data-source` resources.
    pub const PLAIN: AddHandler = AddHandler::new(DataSourceKind::Plain);
    /// Handler for `xa-data-source` resources.
    pub const XA: AddHandler = AddHandler::new(DataSourceKind::Xa);

    pub const fn new(variant: DataSourceKind) -> Self {
        Self { variant }
    }

    /// Variant this handler accepts; other addresses are rejected.
    pub fn variant(&self) -> DataSourceKind {
        self.variant
    }

    /// Write the definition, then install services with strict creation.
    ///
    /// A creation failure is returned as is. Units created before it are
    /// journaled on `tx` and disappear when the transaction rolls back, along
    /// with the model entry and the override. A unit that was already
    /// registered by someone else is never touched.
    pub fn execute(
        &self,
        tx: &mut Transaction<'_>,
        address: &ResourceAddress,
        model: ResourceModel,
    ) -> Result<OperationOutcome> {
        let resource = resolve_target(address, self.variant)?;
        if model.binding_name.trim().is_empty() {
            return Err(LifecycleError::InvalidBindingName {
                resource: resource.to_owned(),
                binding: model.binding_name,
            });
        }
        let env = tx.env();
        if env.model().contains(address) {
            return Err(LifecycleError::ResourceAlreadyDefined {
                address: address.clone(),
            });
        }

        let mut model = model;
        model.statistics_resources.clear();
        tx.journal_model(address, None);
        env.model().write(address, model.clone());
        if env.overrides().register(resource) {
            tx.journal_override(resource);
        }

        if !model.is_enabled() || !tx.is_normal_runtime_mode() {
            return Ok(OperationOutcome::ModelOnly);
        }

        let names = derive(resource, &model.binding_name);
        let changes = install_services(
            env,
            &names,
            self.variant,
            &model,
            InstallPolicy::Strict,
            &mut |name| tx.journal_created(name),
        )?;
        register_statistics(env, address);

        let record = TransitionRecord::new(
            tx.id(),
            address.clone(),
            model,
            OperationKind::Add,
            self.variant,
            PriorState::Absent,
        );
        tx.on_rollback(record);

        let transaction = tx.id().to_string();
        let ctx = LogContext::new()
            .with_resource(resource)
            .with_operation(OperationKind::Add.as_str())
            .with_transaction(&transaction);
        dslo_info!(context = ctx, "installed {} services", changes.created);
        Ok(OperationOutcome::Applied(changes))
    }
}
