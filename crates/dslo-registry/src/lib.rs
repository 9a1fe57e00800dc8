//! ---
//! dslo_section: "05-runtime-directory"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Runtime service directory crate root."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
//! Contract between the lifecycle orchestrator and the host runtime's live
//! set of service units, plus an in-memory implementation.
#![warn(missing_docs)]

pub mod directory;
pub mod memory;

pub use directory::{DirectoryError, ServiceDirectory, ServiceMode, ServiceState, ServiceUnit};
pub use memory::{DirectorySnapshot, InMemoryDirectory};

/// Result alias used throughout the directory crate.
pub type Result<T> = std::result::Result<T, DirectoryError>;
