//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Transactions, transition records and the undo stack."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
//! A [`Transaction`] collects undo entries while handlers run. Commit drops
//! them; rollback replays them newest first and never fails: every step that
//! errors is logged, counted and reported in the returned [`RollbackReport`].
//!
//! Model writes made by Add, Remove and Enable are journaled and restored.
//! Disable's `enabled=false` write is not journaled and survives rollback.

use std::fmt;

use chrono::{DateTime, Utc};
use dslo_common::DataSourceKind;
use dslo_naming::ServiceName;
use dslo_registry::{ServiceState, ServiceUnit};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::address::ResourceAddress;
use crate::context::HostEnvironment;
use crate::model::ResourceModel;
use crate::rollback::RollbackCoordinator;

/// Management operation a record was captured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Remove,
    Enable,
    Disable,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Add => "add",
            OperationKind::Remove => "remove",
            OperationKind::Enable => "enable",
            OperationKind::Disable => "disable",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime state of the primary unit when the record was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorState {
    Running,
    Stopped,
    Absent,
}

impl PriorState {
    pub fn observe(unit: Option<&ServiceUnit>) -> Self {
        match unit.map(|unit| unit.state) {
            Some(ServiceState::Up) => PriorState::Running,
            Some(ServiceState::Down) => PriorState::Stopped,
            None => PriorState::Absent,
        }
    }
}

/// Everything needed to invert one runtime transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub transaction_id: Uuid,
    pub address: ResourceAddress,
    /// Model as it was before the operation's model phase.
    pub snapshot: ResourceModel,
    pub kind: OperationKind,
    pub variant: DataSourceKind,
    pub prior_state: PriorState,
    pub captured_at: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn new(
        transaction_id: Uuid,
        address: ResourceAddress,
        snapshot: ResourceModel,
        kind: OperationKind,
        variant: DataSourceKind,
        prior_state: PriorState,
    ) -> Self {
        Self {
            transaction_id,
            address,
            snapshot,
            kind,
            variant,
            prior_state,
            captured_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum UndoEntry {
    /// A unit created inside the transaction; removed on rollback.
    Created(ServiceName),
    Compensate(TransitionRecord),
    RevertReloadRequired { previous: bool },
    UnregisterOverride(String),
    /// Model entry as it was before a handler wrote it; `None` means undefined.
    RestoreModel {
        address: ResourceAddress,
        previous: Option<ResourceModel>,
    },
}

impl fmt::Display for UndoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndoEntry::Created(name) => write!(f, "remove created service {name}"),
            UndoEntry::Compensate(record) => {
                write!(f, "compensate {} of {}", record.kind, record.address)
            }
            UndoEntry::RevertReloadRequired { previous } => {
                write!(f, "restore reload-required={previous}")
            }
            UndoEntry::UnregisterOverride(name) => write!(f, "unregister override {name}"),
            UndoEntry::RestoreModel { address, previous } => match previous {
                Some(_) => write!(f, "restore model of {address}"),
                None => write!(f, "undefine {address}"),
            },
        }
    }
}

/// A rollback step that failed and was suppressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackFailure {
    pub step: String,
    pub error: String,
}

/// Result of replaying a transaction's undo stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackReport {
    pub transaction_id: Uuid,
    pub steps: usize,
    pub failures: Vec<RollbackFailure>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Unit of work spanning one or more lifecycle operations.
///
/// Dropping a transaction that still holds undo entries rolls it back.
pub struct Transaction<'env> {
    id: Uuid,
    env: &'env HostEnvironment,
    undo: Vec<UndoEntry>,
    finished: bool,
}

impl<'env> Transaction<'env> {
    pub(crate) fn new(env: &'env HostEnvironment) -> Self {
        let id = Uuid::new_v4();
        debug!(transaction = %id, "transaction opened");
        Self {
            id,
            env,
            undo: Vec::new(),
            finished: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn env(&self) -> &'env HostEnvironment {
        self.env
    }

    pub fn is_normal_runtime_mode(&self) -> bool {
        self.env.is_normal_runtime_mode()
    }

    pub fn is_service_restart_allowed(&self) -> bool {
        self.env.is_service_restart_allowed()
    }

    /// Register the compensation for a runtime transition.
    pub fn on_rollback(&mut self, record: TransitionRecord) {
        debug!(
            transaction = %self.id,
            resource = %record.address,
            operation = %record.kind,
            "compensation registered"
        );
        self.undo.push(UndoEntry::Compensate(record));
    }

    /// Mark the process as needing a full reload instead of live reconciliation.
    pub fn require_full_reload(&mut self) {
        let previous = self.env.set_reload_required(true);
        info!(transaction = %self.id, "process reload required");
        self.undo.push(UndoEntry::RevertReloadRequired { previous });
    }

    /// Compensation records waiting for commit or rollback, oldest first.
    pub fn pending_records(&self) -> Vec<&TransitionRecord> {
        self.undo
            .iter()
            .filter_map(|entry| match entry {
                UndoEntry::Compensate(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Number of undo entries of any kind.
    pub fn pending_steps(&self) -> usize {
        self.undo.len()
    }

    pub(crate) fn journal_created(&mut self, name: &ServiceName) {
        self.undo.push(UndoEntry::Created(name.clone()));
    }

    pub(crate) fn journal_override(&mut self, resource_name: &str) {
        self.undo
            .push(UndoEntry::UnregisterOverride(resource_name.to_owned()));
    }

    pub(crate) fn journal_model(
        &mut self,
        address: &ResourceAddress,
        previous: Option<ResourceModel>,
    ) {
        self.undo.push(UndoEntry::RestoreModel {
            address: address.clone(),
            previous,
        });
    }

    /// Discard every undo entry.
    pub fn commit(mut self) -> Uuid {
        let discarded = self.undo.len();
        self.undo.clear();
        self.finished = true;
        debug!(transaction = %self.id, discarded, "transaction committed");
        self.id
    }

    /// Replay the undo stack newest first.
    pub fn rollback(mut self) -> RollbackReport {
        self.unwind()
    }

    fn unwind(&mut self) -> RollbackReport {
        self.finished = true;
        let entries = std::mem::take(&mut self.undo);
        let mut report = RollbackReport {
            transaction_id: self.id,
            steps: entries.len(),
            failures: Vec::new(),
        };
        for entry in entries.into_iter().rev() {
            if let Err(err) = self.apply(&entry) {
                warn!(
                    transaction = %self.id,
                    step = %entry,
                    error = %err,
                    "rollback step failed; continuing"
                );
                if let Some(metrics) = self.env.metrics() {
                    metrics.record_rollback_failure();
                }
                report.failures.push(RollbackFailure {
                    step: entry.to_string(),
                    error: err.to_string(),
                });
            }
        }
        info!(
            transaction = %self.id,
            steps = report.steps,
            failures = report.failures.len(),
            "transaction rolled back"
        );
        report
    }

    fn apply(&self, entry: &UndoEntry) -> crate::Result<()> {
        match entry {
            UndoEntry::Created(name) => {
                if self.env.directory().remove(name) {
                    if let Some(metrics) = self.env.metrics() {
                        metrics.record_units_removed(1);
                    }
                }
                Ok(())
            }
            UndoEntry::Compensate(record) => {
                if let Some(metrics) = self.env.metrics() {
                    metrics.record_rollback(record.kind.as_str());
                }
                RollbackCoordinator::compensate(self.env, record)
            }
            UndoEntry::RevertReloadRequired { previous } => {
                self.env.set_reload_required(*previous);
                Ok(())
            }
            UndoEntry::UnregisterOverride(name) => {
                self.env.overrides().unregister(name);
                Ok(())
            }
            UndoEntry::RestoreModel { address, previous } => {
                match previous {
                    Some(model) => self.env.model().write(address, model.clone()),
                    None => {
                        self.env.model().remove(address);
                    }
                }
                Ok(())
            }
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished && !self.undo.is_empty() {
            warn!(transaction = %self.id, "transaction dropped without commit; rolling back");
            self.unwind();
        }
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("pending", &self.undo.len())
            .finish_non_exhaustive()
    }
}
