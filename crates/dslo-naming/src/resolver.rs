//! ---
//! dslo_section: "02-service-naming"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Derivation and classification of per-datasource service names."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::collections::BTreeSet;
use std::fmt;

use crate::binding::BindInfo;
use crate::name::ServiceName;

pub(crate) const ROOT: &str = "dslo";

/// Capability under which the primary datasource unit is registered.
pub const DATA_SOURCE_CAPABILITY: &str = "dslo.data-source";
/// Segment below the base config name holding connection property units.
pub const CONNECTION_PROPERTIES: &str = "connection-properties";
/// Segment below the XA config name holding XA property units.
pub const XA_DATASOURCE_PROPERTIES: &str = "xa-datasource-properties";
/// Segment below the primary name holding the statistics unit.
pub const STATISTICS: &str = "statistics";

/// Kind of a dependent unit, used for ordering and operator-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKind {
    /// The datasource itself.
    DataSource,
    /// Plain datasource configuration.
    Config,
    /// XA datasource configuration.
    XaConfig,
    /// One connection property below [`ServiceKind::Config`].
    ConnectionProperty,
    /// One XA property below [`ServiceKind::XaConfig`].
    XaDatasourceProperty,
    /// Reference factory handed out to naming clients.
    ReferenceFactory,
    /// Naming binder publishing the datasource.
    Binder,
    /// Deployment unit tied to the binding name.
    Deployment,
    /// Runtime statistics below the primary unit.
    Statistics,
    /// Demand on the JDBC driver keeping it installed.
    DriverDemander,
}

impl ServiceKind {
    /// Label used in failure messages.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceKind::DataSource => "Data-source",
            ServiceKind::Config => "Data-source.config",
            ServiceKind::XaConfig => "Data-source.xa-config",
            ServiceKind::ConnectionProperty => "Data-source.connectionProperty",
            ServiceKind::XaDatasourceProperty => "Data-source.xa-config-property",
            ServiceKind::ReferenceFactory => "Data-source.reference-factory",
            ServiceKind::Binder => "Data-source.binder",
            ServiceKind::Deployment => "Data-source.deployment",
            ServiceKind::Statistics => "Data-source.statistics",
            ServiceKind::DriverDemander => "Data-source.driver-demander",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Build the service name of a dynamic capability instance.
pub fn capability_service_name(capability: &str, dynamic_part: &str) -> ServiceName {
    ServiceName::of(capability.split('.')).append(dynamic_part)
}

/// True when `candidate` lies strictly below `parent`.
pub fn is_descendant_of(parent: &ServiceName, candidate: &ServiceName) -> bool {
    parent.is_ancestor_of(candidate)
}

/// Names derived from the resource name alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceServiceNames {
    /// Primary datasource unit.
    pub data_source: ServiceName,
    /// Plain configuration unit.
    pub config: ServiceName,
    /// XA configuration unit.
    pub xa_config: ServiceName,
    /// Root below which connection property units are registered.
    pub connection_properties: ServiceName,
    /// Root below which XA property units are registered.
    pub xa_datasource_properties: ServiceName,
    /// Reference factory unit.
    pub reference_factory: ServiceName,
    /// Statistics unit, a child of the primary.
    pub statistics: ServiceName,
}

impl ResourceServiceNames {
    /// Derive every resource-scoped name for `resource_name`.
    pub fn for_resource(resource_name: &str) -> Self {
        let data_source = capability_service_name(DATA_SOURCE_CAPABILITY, resource_name);
        let config = ServiceName::of([ROOT, "data-source-config", resource_name]);
        let xa_config = ServiceName::of([ROOT, "xa-data-source-config", resource_name]);
        Self {
            statistics: data_source.append(STATISTICS),
            connection_properties: config.append(CONNECTION_PROPERTIES),
            xa_datasource_properties: xa_config.append(XA_DATASOURCE_PROPERTIES),
            reference_factory: ServiceName::of([
                ROOT,
                "data-source-reference-factory",
                resource_name,
            ]),
            data_source,
            config,
            xa_config,
        }
    }

    /// Property kind of `name` when it sits below one of the property roots.
    pub fn property_kind(&self, name: &ServiceName) -> Option<ServiceKind> {
        if self.connection_properties.is_ancestor_of(name) {
            Some(ServiceKind::ConnectionProperty)
        } else if self.xa_datasource_properties.is_ancestor_of(name) {
            Some(ServiceKind::XaDatasourceProperty)
        } else {
            None
        }
    }
}

/// Complete set of names a datasource's runtime is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentServiceNames {
    resource_name: String,
    binding_name: String,
    /// Names derived from the resource name.
    pub resource: ResourceServiceNames,
    /// Binder derived from the binding name.
    pub binder: ServiceName,
    /// Deployment unit derived from the binding name.
    pub deployment: ServiceName,
    /// Driver demander derived from the binding name.
    pub driver_demander: ServiceName,
}

/// Derive every dependent name for a datasource. Pure and total.
pub fn derive(resource_name: &str, binding_name: &str) -> DependentServiceNames {
    DependentServiceNames {
        resource_name: resource_name.to_owned(),
        binding_name: binding_name.to_owned(),
        resource: ResourceServiceNames::for_resource(resource_name),
        binder: BindInfo::parse(binding_name).binder_service_name(),
        deployment: ServiceName::of([ROOT, "data-source-deployment", binding_name]),
        driver_demander: ServiceName::of([ROOT, "driver-demander", binding_name]),
    }
}

impl DependentServiceNames {
    /// Resource name the names were derived from.
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// Binding name the names were derived from.
    pub fn binding_name(&self) -> &str {
        &self.binding_name
    }

    /// Every fixed (non-property) name with its kind.
    pub fn fixed(&self) -> [(ServiceKind, &ServiceName); 8] {
        [
            (ServiceKind::DataSource, &self.resource.data_source),
            (ServiceKind::Config, &self.resource.config),
            (ServiceKind::XaConfig, &self.resource.xa_config),
            (ServiceKind::ReferenceFactory, &self.resource.reference_factory),
            (ServiceKind::Binder, &self.binder),
            (ServiceKind::Deployment, &self.deployment),
            (ServiceKind::Statistics, &self.resource.statistics),
            (ServiceKind::DriverDemander, &self.driver_demander),
        ]
    }

    /// Every fixed name as an ordered set.
    pub fn all(&self) -> BTreeSet<ServiceName> {
        self.fixed()
            .into_iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Name of the unit for connection property `property`.
    pub fn connection_property(&self, property: &str) -> ServiceName {
        self.resource.connection_properties.append(property)
    }

    /// Name of the unit for XA property `property`.
    pub fn xa_datasource_property(&self, property: &str) -> ServiceName {
        self.resource.xa_datasource_properties.append(property)
    }

    /// Kind of `name` if it belongs to this datasource.
    pub fn classify(&self, name: &ServiceName) -> Option<ServiceKind> {
        self.fixed()
            .into_iter()
            .find(|(_, candidate)| *candidate == name)
            .map(|(kind, _)| kind)
            .or_else(|| self.resource.property_kind(name))
    }
}
