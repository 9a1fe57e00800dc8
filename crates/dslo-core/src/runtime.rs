//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Installation and teardown of dependent runtime services."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use dslo_common::DataSourceKind;
use dslo_naming::{DependentServiceNames, ResourceServiceNames, ServiceKind, ServiceName};
use dslo_registry::{DirectoryError, ServiceMode};
use serde_json::{json, Value};
use tracing::debug;

use crate::context::HostEnvironment;
use crate::error::LifecycleError;
use crate::model::{ResourceModel, StatisticsResource};
use crate::Result;

/// How installation treats units that are already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPolicy {
    /// Create every unit; an existing name is an error.
    Strict,
    /// Create absent units, restart stopped ones, leave running ones alone.
    Reconcile,
}

/// Counts of directory mutations made by one runtime phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeChanges {
    pub created: usize,
    pub restarted: usize,
    pub stopped: usize,
    pub removed: usize,
}

impl RuntimeChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Install every unit backing a datasource, dependencies first.
///
/// `on_created` sees each unit this call created, in creation order.
pub(crate) fn install_services(
    env: &HostEnvironment,
    names: &DependentServiceNames,
    variant: DataSourceKind,
    model: &ResourceModel,
    policy: InstallPolicy,
    on_created: &mut dyn FnMut(&ServiceName),
) -> Result<RuntimeChanges> {
    let mut changes = RuntimeChanges::default();
    let resource = names.resource_name();
    let mut install = |kind: ServiceKind, name: &ServiceName, payload: Value| {
        install_one(env, resource, kind, name, payload, policy, &mut changes, on_created)
    };

    install(
        ServiceKind::DataSource,
        &names.resource.data_source,
        json!({
            "resource": resource,
            "binding": names.binding_name(),
            "variant": variant.to_string(),
            "driver": model.driver_name,
        }),
    )?;

    match variant {
        DataSourceKind::Plain => {
            install(
                ServiceKind::Config,
                &names.resource.config,
                json!({ "resource": resource, "properties": model.connection_properties.len() }),
            )?;
            for (property, value) in &model.connection_properties {
                install(
                    ServiceKind::ConnectionProperty,
                    &names.connection_property(property),
                    json!({ "name": property, "value": value }),
                )?;
            }
        }
        DataSourceKind::Xa => {
            install(
                ServiceKind::XaConfig,
                &names.resource.xa_config,
                json!({ "resource": resource, "properties": model.xa_properties.len() }),
            )?;
            for (property, value) in &model.xa_properties {
                install(
                    ServiceKind::XaDatasourceProperty,
                    &names.xa_datasource_property(property),
                    json!({ "name": property, "value": value }),
                )?;
            }
        }
    }

    if policy == InstallPolicy::Reconcile {
        // Children registered outside the model's property list are restarted too.
        for child in property_descendants(env, &names.resource) {
            let kind = names
                .resource
                .property_kind(&child)
                .unwrap_or(ServiceKind::ConnectionProperty);
            install(kind, &child, Value::Null)?;
        }
    }

    install(
        ServiceKind::ReferenceFactory,
        &names.resource.reference_factory,
        json!({ "resource": resource }),
    )?;
    install(
        ServiceKind::Binder,
        &names.binder,
        json!({ "binding": names.binding_name() }),
    )?;
    install(
        ServiceKind::Deployment,
        &names.deployment,
        json!({ "binding": names.binding_name() }),
    )?;
    install(
        ServiceKind::Statistics,
        &names.resource.statistics,
        json!({ "resources": StatisticsResource::ALL }),
    )?;
    install(
        ServiceKind::DriverDemander,
        &names.driver_demander,
        json!({ "driver": model.driver_name }),
    )?;

    if let Some(metrics) = env.metrics() {
        metrics.record_units_created(changes.created);
    }
    Ok(changes)
}

#[allow(clippy::too_many_arguments)]
fn install_one(
    env: &HostEnvironment,
    resource: &str,
    kind: ServiceKind,
    name: &ServiceName,
    payload: Value,
    policy: InstallPolicy,
    changes: &mut RuntimeChanges,
    on_created: &mut dyn FnMut(&ServiceName),
) -> Result<()> {
    let directory = env.directory();
    if policy == InstallPolicy::Reconcile {
        if let Some(unit) = directory.lookup(name) {
            if unit.is_up() && unit.mode == ServiceMode::Active {
                debug!(resource, service = %name, unit = %kind, "service already running");
                return Ok(());
            }
            directory.set_mode(name, ServiceMode::Active)?;
            changes.restarted += 1;
            debug!(resource, service = %name, unit = %kind, "service restarted");
            return Ok(());
        }
    }
    match directory.create(name.clone(), payload) {
        Ok(_) => {
            changes.created += 1;
            on_created(name);
            debug!(resource, service = %name, unit = %kind, "service created");
            Ok(())
        }
        Err(DirectoryError::AlreadyExists { .. }) => Err(LifecycleError::AlreadyExists {
            unit: kind,
            resource: resource.to_owned(),
            service: name.clone(),
        }),
        Err(err) => Err(err.into()),
    }
}

/// Remove one unit if present, returning whether anything was removed.
pub(crate) fn remove_service(env: &HostEnvironment, resource: &str, name: &ServiceName) -> bool {
    let removed = env.directory().remove(name);
    if removed {
        debug!(resource, service = %name, "service removed");
        if let Some(metrics) = env.metrics() {
            metrics.record_units_removed(1);
        }
    }
    removed
}

/// Registered descendants of both property roots, in name order.
pub(crate) fn property_descendants(
    env: &HostEnvironment,
    names: &ResourceServiceNames,
) -> Vec<ServiceName> {
    let directory = env.directory();
    let mut found = directory.descendants_of(&names.connection_properties);
    found.extend(directory.descendants_of(&names.xa_datasource_properties));
    found.sort();
    found
}

/// Remove every unit backing a datasource. Absent units are skipped.
pub(crate) fn teardown_services(env: &HostEnvironment, names: &DependentServiceNames) -> RuntimeChanges {
    let resource = names.resource_name();
    let mut changes = RuntimeChanges::default();
    let mut remove = |name: &ServiceName| {
        if remove_service(env, resource, name) {
            changes.removed += 1;
        }
    };

    remove(&names.binder);
    remove(&names.resource.reference_factory);
    for child in property_descendants(env, &names.resource) {
        remove(&child);
    }
    remove(&names.resource.config);
    remove(&names.resource.xa_config);
    remove(&names.resource.data_source);
    remove(&names.deployment);
    remove(&names.resource.statistics);
    remove(&names.driver_demander);
    changes
}

/// Remove the units whose names derive from the resource name alone.
///
/// Used when the binding name can no longer be read from the model.
pub(crate) fn sweep_resource_services(
    env: &HostEnvironment,
    resource: &str,
    names: &ResourceServiceNames,
) -> RuntimeChanges {
    let mut changes = RuntimeChanges::default();
    let mut targets = vec![names.reference_factory.clone()];
    targets.extend(property_descendants(env, names));
    targets.extend([
        names.config.clone(),
        names.xa_config.clone(),
        names.statistics.clone(),
        names.data_source.clone(),
    ]);
    for name in &targets {
        if remove_service(env, resource, name) {
            changes.removed += 1;
        }
    }
    changes
}
