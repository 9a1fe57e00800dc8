//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Lifecycle error taxonomy."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::time::Duration;

use dslo_naming::{ServiceKind, ServiceName};
use dslo_registry::{DirectoryError, ServiceState};
use thiserror::Error;

use crate::address::ResourceAddress;

/// Errors surfaced by lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A dependent unit expected to exist is absent from the directory.
    #[error("{unit} service {service} of resource {resource} is not available")]
    ServiceNotAvailable {
        unit: ServiceKind,
        resource: String,
        service: ServiceName,
    },
    /// A dependent unit exists but is not in the state the transition requires.
    #[error("{unit} service {service} of resource {resource} is {actual}, expected {expected}")]
    ServiceNotEnabled {
        unit: ServiceKind,
        resource: String,
        service: ServiceName,
        expected: ServiceState,
        actual: ServiceState,
    },
    /// Add tried to create a unit that is already registered.
    #[error("{unit} service {service} of resource {resource} is already registered")]
    AlreadyExists {
        unit: ServiceKind,
        resource: String,
        service: ServiceName,
    },
    /// The address has no definition in the model.
    #[error("resource {address} is not defined")]
    ResourceNotFound { address: ResourceAddress },
    /// Add targeted an address that is already defined.
    #[error("resource {address} is already defined")]
    ResourceAlreadyDefined { address: ResourceAddress },
    /// The binding name cannot be published.
    #[error("resource {resource} has an invalid binding name '{binding}'")]
    InvalidBindingName { resource: String, binding: String },
    /// The address does not identify a datasource.
    #[error("invalid resource address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    /// Another operation held the address lock for longer than allowed.
    #[error("timed out after {timeout:?} waiting for resource {address}")]
    OperationTimedOut {
        address: ResourceAddress,
        timeout: Duration,
    },
    /// The directory rejected a call.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    /// Metric registration failed.
    #[error("metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl LifecycleError {
    /// Resource name carried by the error, when it names one.
    pub fn resource(&self) -> Option<&str> {
        match self {
            LifecycleError::ServiceNotAvailable { resource, .. }
            | LifecycleError::ServiceNotEnabled { resource, .. }
            | LifecycleError::AlreadyExists { resource, .. }
            | LifecycleError::InvalidBindingName { resource, .. } => Some(resource),
            LifecycleError::ResourceNotFound { address }
            | LifecycleError::ResourceAlreadyDefined { address }
            | LifecycleError::OperationTimedOut { address, .. } => {
                address.last().map(|element| element.value.as_str())
            }
            _ => None,
        }
    }
}
