//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Prometheus metrics for lifecycle transitions."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

use crate::Result;

/// Metrics published by the lifecycle orchestrator.
#[derive(Clone)]
pub struct LifecycleMetrics {
    transitions: IntCounterVec,
    rollbacks: IntCounterVec,
    rollback_failures: IntCounter,
    units_created: IntCounter,
    units_removed: IntCounter,
    reload_required: IntGauge,
    registry: Arc<Registry>,
}

impl LifecycleMetrics {
    /// Register all lifecycle metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> Result<Self> {
        let transitions = IntCounterVec::new(
            Opts::new(
                "dslo_transitions_total",
                "Total number of lifecycle operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(transitions.clone()))?;

        let rollbacks = IntCounterVec::new(
            Opts::new(
                "dslo_rollbacks_total",
                "Total number of compensations replayed by rolled back transactions",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(rollbacks.clone()))?;

        let rollback_failures = IntCounter::new(
            "dslo_rollback_failures_total",
            "Total number of rollback steps that failed and were suppressed",
        )?;
        registry.register(Box::new(rollback_failures.clone()))?;

        let units_created = IntCounter::new(
            "dslo_service_units_created_total",
            "Total number of runtime service units created",
        )?;
        registry.register(Box::new(units_created.clone()))?;

        let units_removed = IntCounter::new(
            "dslo_service_units_removed_total",
            "Total number of runtime service units removed",
        )?;
        registry.register(Box::new(units_removed.clone()))?;

        let reload_required = IntGauge::new(
            "dslo_reload_required",
            "1 when a change is waiting for a full process reload",
        )?;
        registry.register(Box::new(reload_required.clone()))?;

        Ok(Self {
            transitions,
            rollbacks,
            rollback_failures,
            units_created,
            units_removed,
            reload_required,
            registry,
        })
    }

    pub fn record_transition(&self, operation: &str, outcome: &str) {
        self.transitions
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn record_rollback(&self, operation: &str) {
        self.rollbacks.with_label_values(&[operation]).inc();
    }

    pub fn record_rollback_failure(&self) {
        self.rollback_failures.inc();
    }

    pub fn record_units_created(&self, count: usize) {
        self.units_created.inc_by(count as u64);
    }

    pub fn record_units_removed(&self, count: usize) {
        self.units_removed.inc_by(count as u64);
    }

    pub fn set_reload_required(&self, required: bool) {
        self.reload_required.set(i64::from(required));
    }

    pub fn transitions(&self, operation: &str, outcome: &str) -> u64 {
        self.transitions
            .with_label_values(&[operation, outcome])
            .get()
    }

    pub fn rollbacks(&self, operation: &str) -> u64 {
        self.rollbacks.with_label_values(&[operation]).get()
    }

    pub fn rollback_failures(&self) -> u64 {
        self.rollback_failures.get()
    }

    /// Registry the metrics were registered with.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl std::fmt::Debug for LifecycleMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleMetrics").finish_non_exhaustive()
    }
}
