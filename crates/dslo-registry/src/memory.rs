//! ---
//! dslo_section: "05-runtime-directory"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "In-memory service directory with snapshots and injected failures."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::collections::{BTreeMap, HashMap};

use dslo_naming::ServiceName;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::directory::{DirectoryError, ServiceDirectory, ServiceMode, ServiceState, ServiceUnit};
use crate::Result;

/// Name → (state, mode) view of a directory, ordered by name.
pub type DirectorySnapshot = BTreeMap<ServiceName, (ServiceState, ServiceMode)>;

/// In-memory directory. Units start synchronously: `create` yields an UP unit.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    units: RwLock<BTreeMap<ServiceName, ServiceUnit>>,
    failures: Mutex<HashMap<ServiceName, String>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the state and mode of every registered unit.
    pub fn snapshot(&self) -> DirectorySnapshot {
        self.units
            .read()
            .values()
            .map(|unit| (unit.name.clone(), (unit.state, unit.mode)))
            .collect()
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.units.read().len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.units.read().is_empty()
    }

    /// Overwrite the observed state of a unit without touching its mode.
    ///
    /// Used to stage units that failed to start or were stopped behind the
    /// orchestrator's back.
    pub fn force_state(&self, name: &ServiceName, state: ServiceState) -> Result<()> {
        let mut units = self.units.write();
        let unit = units.get_mut(name).ok_or_else(|| DirectoryError::NotFound {
            name: name.clone(),
        })?;
        unit.state = state;
        Ok(())
    }

    /// Make the next `create` of `name` fail with [`DirectoryError::CreateFailed`].
    pub fn inject_failure(&self, name: ServiceName, reason: impl Into<String>) {
        self.failures.lock().insert(name, reason.into());
    }
}

impl ServiceDirectory for InMemoryDirectory {
    fn lookup(&self, name: &ServiceName) -> Option<ServiceUnit> {
        self.units.read().get(name).cloned()
    }

    fn list_names(&self) -> Vec<ServiceName> {
        self.units.read().keys().cloned().collect()
    }

    fn set_mode(&self, name: &ServiceName, mode: ServiceMode) -> Result<()> {
        let mut units = self.units.write();
        let unit = units.get_mut(name).ok_or_else(|| DirectoryError::NotFound {
            name: name.clone(),
        })?;
        match mode {
            ServiceMode::Never => {
                if unit.state != ServiceState::Up {
                    return Err(DirectoryError::InvalidState {
                        name: name.clone(),
                        expected: ServiceState::Up,
                        actual: unit.state,
                        requested: mode,
                    });
                }
                unit.mode = ServiceMode::Never;
                unit.state = ServiceState::Down;
            }
            ServiceMode::Active => {
                unit.mode = ServiceMode::Active;
                unit.state = ServiceState::Up;
            }
        }
        debug!(service = %name, mode = %mode, "service mode changed");
        Ok(())
    }

    fn remove(&self, name: &ServiceName) -> bool {
        let removed = self.units.write().remove(name).is_some();
        if removed {
            debug!(service = %name, "service removed");
        }
        removed
    }

    fn create(&self, name: ServiceName, payload: serde_json::Value) -> Result<ServiceUnit> {
        if let Some(reason) = self.failures.lock().remove(&name) {
            return Err(DirectoryError::CreateFailed { name, reason });
        }
        let mut units = self.units.write();
        if units.contains_key(&name) {
            return Err(DirectoryError::AlreadyExists { name });
        }
        let unit = ServiceUnit {
            name: name.clone(),
            state: ServiceState::Up,
            mode: ServiceMode::Active,
            payload,
        };
        units.insert(name, unit.clone());
        debug!(service = %unit.name, "service created");
        Ok(unit)
    }
}
