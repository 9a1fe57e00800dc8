//! ---
//! dslo_section: "01-core-functionality"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Shared configuration and tracing bootstrap."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
//! Shared primitives for the dslo workspace.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the orchestrator and its operator tooling.

pub mod config;
pub mod logging;

pub use config::{
    DataSourceConfig, DataSourceKind, DsloConfig, LoadedConfig, LoggingConfig, RuntimeConfig,
    RuntimeMode,
};
pub use logging::{init_tracing, LogFormat, LogGuard};
