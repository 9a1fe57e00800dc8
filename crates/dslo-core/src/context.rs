//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Host environment shared by lifecycle transactions."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dslo_common::{RuntimeConfig, RuntimeMode};
use dslo_registry::ServiceDirectory;

use crate::metrics::LifecycleMetrics;
use crate::model::ConfigurationModel;
use crate::overrides::OverrideRegistry;
use crate::transaction::Transaction;

/// Collaborators and process-level flags every transition runs against.
#[derive(Debug)]
pub struct HostEnvironment {
    directory: Arc<dyn ServiceDirectory>,
    model: Arc<dyn ConfigurationModel>,
    overrides: Arc<dyn OverrideRegistry>,
    runtime_mode: RuntimeMode,
    restart_allowed: bool,
    reload_required: AtomicBool,
    metrics: Option<LifecycleMetrics>,
}

impl HostEnvironment {
    /// Normal runtime mode with service restarts allowed.
    pub fn new(
        directory: Arc<dyn ServiceDirectory>,
        model: Arc<dyn ConfigurationModel>,
        overrides: Arc<dyn OverrideRegistry>,
    ) -> Self {
        Self {
            directory,
            model,
            overrides,
            runtime_mode: RuntimeMode::Normal,
            restart_allowed: true,
            reload_required: AtomicBool::new(false),
            metrics: None,
        }
    }

    pub fn with_runtime_mode(mut self, mode: RuntimeMode) -> Self {
        self.runtime_mode = mode;
        self
    }

    pub fn with_restart_allowed(mut self, allowed: bool) -> Self {
        self.restart_allowed = allowed;
        self
    }

    /// Apply the `[runtime]` section of the configuration.
    pub fn with_runtime_config(self, config: &RuntimeConfig) -> Self {
        self.with_runtime_mode(config.mode)
            .with_restart_allowed(config.allow_service_restart)
    }

    pub fn with_metrics(mut self, metrics: LifecycleMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn directory(&self) -> &dyn ServiceDirectory {
        self.directory.as_ref()
    }

    pub fn model(&self) -> &dyn ConfigurationModel {
        self.model.as_ref()
    }

    pub fn overrides(&self) -> &dyn OverrideRegistry {
        self.overrides.as_ref()
    }

    pub fn metrics(&self) -> Option<&LifecycleMetrics> {
        self.metrics.as_ref()
    }

    pub fn runtime_mode(&self) -> RuntimeMode {
        self.runtime_mode
    }

    pub fn is_normal_runtime_mode(&self) -> bool {
        self.runtime_mode.is_normal()
    }

    pub fn is_service_restart_allowed(&self) -> bool {
        self.restart_allowed
    }

    pub fn is_reload_required(&self) -> bool {
        self.reload_required.load(Ordering::SeqCst)
    }

    /// Set the reload-required flag, returning its previous value.
    pub(crate) fn set_reload_required(&self, required: bool) -> bool {
        let previous = self.reload_required.swap(required, Ordering::SeqCst);
        if let Some(metrics) = &self.metrics {
            metrics.set_reload_required(required);
        }
        previous
    }

    /// Open a transaction against this environment.
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(self)
    }
}
