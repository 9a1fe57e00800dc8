//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Persisted resource model and its storage contract."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use dslo_common::DataSourceConfig;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::ResourceAddress;

/// Runtime-only statistics children registered under an installed datasource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticsResource {
    Pool,
    Jdbc,
}

impl StatisticsResource {
    pub const ALL: [StatisticsResource; 2] = [StatisticsResource::Pool, StatisticsResource::Jdbc];
}

/// Persisted definition of one datasource.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceModel {
    pub binding_name: String,
    /// `None` means the flag was never written; the host treats that as enabled.
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub connection_properties: IndexMap<String, String>,
    #[serde(default)]
    pub xa_properties: IndexMap<String, String>,
    #[serde(default)]
    pub statistics_resources: BTreeSet<StatisticsResource>,
    #[serde(default)]
    pub attributes: IndexMap<String, Value>,
}

impl ResourceModel {
    pub fn new(binding_name: impl Into<String>) -> Self {
        Self {
            binding_name: binding_name.into(),
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver_name = Some(driver.into());
        self
    }

    pub fn with_connection_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.connection_properties.insert(name.into(), value.into());
        self
    }

    pub fn with_xa_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.xa_properties.insert(name.into(), value.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Resolve a persisted attribute by its management name.
    pub fn resolve_attribute(&self, name: &str) -> Option<Value> {
        match name {
            "jndi-name" | "binding-name" => Some(Value::String(self.binding_name.clone())),
            "enabled" => Some(Value::Bool(self.is_enabled())),
            "driver-name" => self.driver_name.clone().map(Value::String),
            other => self.attributes.get(other).cloned(),
        }
    }
}

impl From<&DataSourceConfig> for ResourceModel {
    fn from(config: &DataSourceConfig) -> Self {
        Self {
            binding_name: config.binding_name.clone(),
            enabled: config.enabled,
            driver_name: config.driver.clone(),
            connection_properties: config.connection_properties.clone(),
            xa_properties: config.xa_properties.clone(),
            statistics_resources: BTreeSet::new(),
            attributes: IndexMap::new(),
        }
    }
}

/// Persisted configuration tree, keyed by resource address.
pub trait ConfigurationModel: Send + Sync + fmt::Debug {
    fn read(&self, address: &ResourceAddress) -> Option<ResourceModel>;

    fn write(&self, address: &ResourceAddress, model: ResourceModel);

    /// Remove a definition, returning it when present.
    fn remove(&self, address: &ResourceAddress) -> Option<ResourceModel>;

    fn addresses(&self) -> Vec<ResourceAddress>;

    fn contains(&self, address: &ResourceAddress) -> bool {
        self.read(address).is_some()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryModel {
    entries: RwLock<BTreeMap<ResourceAddress, ResourceModel>>,
}

impl InMemoryModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigurationModel for InMemoryModel {
    fn read(&self, address: &ResourceAddress) -> Option<ResourceModel> {
        self.entries.read().get(address).cloned()
    }

    fn write(&self, address: &ResourceAddress, model: ResourceModel) {
        self.entries.write().insert(address.clone(), model);
    }

    fn remove(&self, address: &ResourceAddress) -> Option<ResourceModel> {
        self.entries.write().remove(address)
    }

    fn addresses(&self) -> Vec<ResourceAddress> {
        self.entries.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dslo_common::DataSourceKind;
    use serde_json::json;

    #[test]
    fn undefined_enabled_flag_counts_as_enabled() {
        let model = ResourceModel::new("java:/DS1");
        assert_eq!(model.enabled, None);
        assert!(model.is_enabled());
        assert!(!model.with_enabled(false).is_enabled());
    }

    #[test]
    fn resolves_well_known_and_opaque_attributes() {
        let model = ResourceModel::new("java:/DS1")
            .with_driver("h2")
            .with_attribute("min-pool-size", json!(5));
        assert_eq!(model.resolve_attribute("jndi-name"), Some(json!("java:/DS1")));
        assert_eq!(model.resolve_attribute("enabled"), Some(json!(true)));
        assert_eq!(model.resolve_attribute("driver-name"), Some(json!("h2")));
        assert_eq!(model.resolve_attribute("min-pool-size"), Some(json!(5)));
        assert_eq!(model.resolve_attribute("max-pool-size"), None);
    }

    #[test]
    fn in_memory_model_round_trips_definitions() {
        let model = InMemoryModel::new();
        let address = ResourceAddress::data_source(DataSourceKind::Plain, "ds1");
        assert!(!model.contains(&address));

        model.write(&address, ResourceModel::new("java:/DS1"));
        assert!(model.contains(&address));
        assert_eq!(model.addresses(), vec![address.clone()]);

        let removed = model.remove(&address).unwrap();
        assert_eq!(removed.binding_name, "java:/DS1");
        assert!(model.remove(&address).is_none());
    }

    #[test]
    fn converts_declared_configuration() {
        let config = DataSourceConfig {
            binding_name: "java:/DS1".to_owned(),
            enabled: Some(true),
            driver: Some("h2".to_owned()),
            ..DataSourceConfig::default()
        };
        let model = ResourceModel::from(&config);
        assert_eq!(model.binding_name, "java:/DS1");
        assert_eq!(model.driver_name.as_deref(), Some("h2"));
        assert!(model.statistics_resources.is_empty());
    }
}
