//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Per-instance resource definition overrides."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::collections::BTreeSet;
use std::fmt;

use parking_lot::Mutex;

/// Registry of per-instance management metadata registered when a datasource is added.
pub trait OverrideRegistry: Send + Sync + fmt::Debug {
    /// Returns `false` when the name was already registered.
    fn register(&self, resource_name: &str) -> bool;

    /// Returns `false` when nothing was registered. Never fails.
    fn unregister(&self, resource_name: &str) -> bool;

    fn is_registered(&self, resource_name: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct InMemoryOverrides {
    names: Mutex<BTreeSet<String>>,
}

impl InMemoryOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverrideRegistry for InMemoryOverrides {
    fn register(&self, resource_name: &str) -> bool {
        self.names.lock().insert(resource_name.to_owned())
    }

    fn unregister(&self, resource_name: &str) -> bool {
        self.names.lock().remove(resource_name)
    }

    fn is_registered(&self, resource_name: &str) -> bool {
        self.names.lock().contains(resource_name)
    }
}
