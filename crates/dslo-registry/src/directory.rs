//! ---
//! dslo_section: "05-runtime-directory"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Service directory contract, unit states and errors."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::fmt;

use dslo_naming::ServiceName;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Observed state of a registered unit. Absence from the directory is ABSENT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceState {
    /// Registered but not running.
    Down,
    /// Registered and running.
    Up,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Down => f.write_str("DOWN"),
            ServiceState::Up => f.write_str("UP"),
        }
    }
}

/// Administrative mode of a registered unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceMode {
    /// The unit should be running.
    Active,
    /// The unit is administratively stopped.
    Never,
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceMode::Active => f.write_str("ACTIVE"),
            ServiceMode::Never => f.write_str("NEVER"),
        }
    }
}

/// Entry of the runtime service directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceUnit {
    /// Unique name of the unit.
    pub name: ServiceName,
    /// Current running state.
    pub state: ServiceState,
    /// Administrative mode.
    pub mode: ServiceMode,
    /// Opaque payload handed over at creation.
    pub payload: serde_json::Value,
}

impl ServiceUnit {
    /// True when the unit is running.
    pub fn is_up(&self) -> bool {
        self.state == ServiceState::Up
    }
}

/// Errors raised by directory operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DirectoryError {
    /// The unit is not registered.
    #[error("service {name} is not registered")]
    NotFound {
        /// Offending unit.
        name: ServiceName,
    },
    /// The unit is registered but in a state that forbids the mode change.
    #[error("service {name} is {actual}, expected {expected} before switching to {requested}")]
    InvalidState {
        /// Offending unit.
        name: ServiceName,
        /// State the change requires.
        expected: ServiceState,
        /// State the unit is in.
        actual: ServiceState,
        /// Mode that was requested.
        requested: ServiceMode,
    },
    /// A unit with the same name is already registered.
    #[error("service {name} is already registered")]
    AlreadyExists {
        /// Offending unit.
        name: ServiceName,
    },
    /// The host refused to install the unit.
    #[error("service {name} failed to start: {reason}")]
    CreateFailed {
        /// Offending unit.
        name: ServiceName,
        /// Host supplied reason.
        reason: String,
    },
}

/// Live set of runtime service units, shared by every lifecycle operation.
///
/// Mutations are either idempotent ([`ServiceDirectory::remove`]) or fail
/// explicitly on a precondition violation. Once `remove` returns, `lookup`
/// reports the name as absent until it is created again.
pub trait ServiceDirectory: Send + Sync + fmt::Debug {
    /// Look a unit up by name; `None` means ABSENT.
    fn lookup(&self, name: &ServiceName) -> Option<ServiceUnit>;

    /// Names of every registered unit.
    fn list_names(&self) -> Vec<ServiceName>;

    /// Change the administrative mode of a unit.
    ///
    /// Fails with [`DirectoryError::NotFound`] when absent and with
    /// [`DirectoryError::InvalidState`] when asked to stop a unit that is not UP.
    fn set_mode(&self, name: &ServiceName, mode: ServiceMode) -> Result<()>;

    /// Remove a unit. Returns whether anything was removed; absent names are a no-op.
    fn remove(&self, name: &ServiceName) -> bool;

    /// Register and start a new unit.
    fn create(&self, name: ServiceName, payload: serde_json::Value) -> Result<ServiceUnit>;

    /// Registered names lying strictly below `parent`.
    fn descendants_of(&self, parent: &ServiceName) -> Vec<ServiceName> {
        self.list_names()
            .into_iter()
            .filter(|name| parent.is_ancestor_of(name))
            .collect()
    }
}
