//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "tests"
//! dslo_type: "source"
//! dslo_scope: "test"
//! dslo_description: "Shared fixtures for lifecycle integration tests."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
#![allow(dead_code)]

use std::sync::Arc;

use dslo_core::{
    DataSourceKind, HostEnvironment, InMemoryModel, InMemoryOverrides, ResourceAddress,
    ResourceModel, RuntimeMode,
};
use dslo_naming::{derive, DependentServiceNames, ServiceName};
use dslo_registry::{InMemoryDirectory, ServiceDirectory};

pub struct Fixture {
    pub directory: Arc<InMemoryDirectory>,
    pub model: Arc<InMemoryModel>,
    pub overrides: Arc<InMemoryOverrides>,
    pub env: HostEnvironment,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(|env| env)
    }

    pub fn with_mode(mode: RuntimeMode) -> Self {
        Self::build(|env| env.with_runtime_mode(mode))
    }

    pub fn without_restart() -> Self {
        Self::build(|env| env.with_restart_allowed(false))
    }

    pub fn build(configure: impl FnOnce(HostEnvironment) -> HostEnvironment) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let model = Arc::new(InMemoryModel::new());
        let overrides = Arc::new(InMemoryOverrides::new());
        let env = configure(HostEnvironment::new(
            directory.clone(),
            model.clone(),
            overrides.clone(),
        ));
        Self {
            directory,
            model,
            overrides,
            env,
        }
    }

    /// Names under which `names` has units registered.
    pub fn registered(&self, names: &DependentServiceNames) -> Vec<ServiceName> {
        self.directory
            .list_names()
            .into_iter()
            .filter(|name| names.classify(name).is_some())
            .collect()
    }
}

pub fn ds1_address() -> ResourceAddress {
    ResourceAddress::data_source(DataSourceKind::Plain, "ds1")
}

pub fn ds1_model() -> ResourceModel {
    ResourceModel::new("java:/DS1")
        .with_enabled(true)
        .with_driver("h2")
        .with_connection_property("url", "jdbc:h2:mem:ds1")
}

pub fn ds1_names() -> DependentServiceNames {
    derive("ds1", "java:/DS1")
}

pub fn xa1_address() -> ResourceAddress {
    ResourceAddress::data_source(DataSourceKind::Xa, "xa1")
}

pub fn xa1_model() -> ResourceModel {
    ResourceModel::new("java:jboss/datasources/XA1")
        .with_enabled(true)
        .with_driver("postgresql")
        .with_xa_property("ServerName", "db.local")
        .with_xa_property("DatabaseName", "orders")
}

pub fn xa1_names() -> DependentServiceNames {
    derive("xa1", "java:jboss/datasources/XA1")
}
