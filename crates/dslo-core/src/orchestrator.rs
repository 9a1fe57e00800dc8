//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Per-address serialisation of lifecycle operations."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use dslo_logging::{log_transition_event, LogContext, TransitionOutcome};
use parking_lot::Mutex;
use tracing::warn;

use crate::address::ResourceAddress;
use crate::context::HostEnvironment;
use crate::error::LifecycleError;
use crate::handlers::{AddHandler, DisableHandler, EnableHandler, OperationOutcome, RemoveHandler};
use crate::model::ResourceModel;
use crate::transaction::{OperationKind, Transaction};
use crate::Result;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// A management request against one resource address.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagementOperation {
    Add(ResourceModel),
    Remove,
    Enable,
    Disable,
}

impl ManagementOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            ManagementOperation::Add(_) => OperationKind::Add,
            ManagementOperation::Remove => OperationKind::Remove,
            ManagementOperation::Enable => OperationKind::Enable,
            ManagementOperation::Disable => OperationKind::Disable,
        }
    }
}

/// Runs lifecycle operations one transaction at a time per resource address.
///
/// Operations on different addresses proceed independently. A failed
/// operation rolls its transaction back before the error is returned.
#[derive(Debug)]
pub struct LifecycleOrchestrator {
    env: Arc<HostEnvironment>,
    locks: Mutex<HashMap<ResourceAddress, Arc<Mutex<()>>>>,
    lock_timeout: Duration,
}

impl LifecycleOrchestrator {
    pub fn new(env: Arc<HostEnvironment>) -> Self {
        Self {
            env,
            locks: Mutex::new(HashMap::new()),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn env(&self) -> &HostEnvironment {
        &self.env
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Run one operation in its own transaction.
    pub fn execute(
        &self,
        address: &ResourceAddress,
        operation: ManagementOperation,
    ) -> Result<OperationOutcome> {
        let lock = self.lock_for(address);
        let result = match lock.try_lock_for(self.lock_timeout) {
            Some(_guard) => self.run(address, operation),
            None => Err(LifecycleError::OperationTimedOut {
                address: address.clone(),
                timeout: self.lock_timeout,
            }),
        };
        self.release(address, lock);
        result
    }

    fn run(
        &self,
        address: &ResourceAddress,
        operation: ManagementOperation,
    ) -> Result<OperationOutcome> {
        let kind = operation.kind();
        let mut tx = self.env.begin();
        match Self::apply(&mut tx, address, operation) {
            Ok(outcome) => {
                let id = tx.commit().to_string();
                self.report(address, kind, &id, TransitionOutcome::Success, "committed");
                Ok(outcome)
            }
            Err(err) => {
                let id = tx.id().to_string();
                let report = tx.rollback();
                if !report.is_clean() {
                    warn!(
                        resource = %address,
                        failures = report.failures.len(),
                        "rollback left runtime partially restored"
                    );
                }
                self.report(address, kind, &id, TransitionOutcome::Fault, &err.to_string());
                Err(err)
            }
        }
    }

    /// Run several operations in a single transaction.
    ///
    /// Every touched address is locked up front, in address order. The first
    /// failure rolls back every step that already ran.
    pub fn execute_composite(
        &self,
        steps: Vec<(ResourceAddress, ManagementOperation)>,
    ) -> Result<Vec<OperationOutcome>> {
        let addresses: BTreeSet<ResourceAddress> =
            steps.iter().map(|(address, _)| address.clone()).collect();
        let locks: Vec<(ResourceAddress, Arc<Mutex<()>>)> = addresses
            .into_iter()
            .map(|address| {
                let lock = self.lock_for(&address);
                (address, lock)
            })
            .collect();

        let result = {
            let mut guards = Vec::with_capacity(locks.len());
            let mut timed_out = None;
            for (address, lock) in &locks {
                match lock.try_lock_for(self.lock_timeout) {
                    Some(guard) => guards.push(guard),
                    None => {
                        timed_out = Some(address.clone());
                        break;
                    }
                }
            }
            match timed_out {
                Some(address) => Err(LifecycleError::OperationTimedOut {
                    address,
                    timeout: self.lock_timeout,
                }),
                None => self.run_composite(steps),
            }
        };

        for (address, lock) in locks {
            self.release(&address, lock);
        }
        result
    }

    fn run_composite(
        &self,
        steps: Vec<(ResourceAddress, ManagementOperation)>,
    ) -> Result<Vec<OperationOutcome>> {
        let mut tx = self.env.begin();
        let id = tx.id().to_string();
        let mut outcomes = Vec::with_capacity(steps.len());
        let mut applied = Vec::with_capacity(steps.len());
        for (address, operation) in steps {
            let kind = operation.kind();
            match Self::apply(&mut tx, &address, operation) {
                Ok(outcome) => {
                    outcomes.push(outcome);
                    applied.push((address, kind));
                }
                Err(err) => {
                    tx.rollback();
                    self.report(&address, kind, &id, TransitionOutcome::Fault, &err.to_string());
                    return Err(err);
                }
            }
        }
        tx.commit();
        for (address, kind) in &applied {
            self.report(address, *kind, &id, TransitionOutcome::Success, "committed");
        }
        Ok(outcomes)
    }

    /// Dispatch an operation to the handler for the address's variant.
    ///
    /// No locking: the caller owns `tx` and decides whether to commit.
    pub fn apply(
        tx: &mut Transaction<'_>,
        address: &ResourceAddress,
        operation: ManagementOperation,
    ) -> Result<OperationOutcome> {
        let variant = address.kind()?;
        match operation {
            ManagementOperation::Add(model) => AddHandler::new(variant).execute(tx, address, model),
            ManagementOperation::Remove => RemoveHandler::new(variant).execute(tx, address),
            ManagementOperation::Enable => EnableHandler::new(variant).execute(tx, address),
            ManagementOperation::Disable => DisableHandler::new(variant).execute(tx, address),
        }
    }

    /// Number of addresses that currently have a lock entry.
    pub fn tracked_addresses(&self) -> usize {
        self.locks.lock().len()
    }

    fn lock_for(&self, address: &ResourceAddress) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(address.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the caller's handle and evict the entry once nobody else holds it.
    fn release(&self, address: &ResourceAddress, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        drop(lock);
        if locks
            .get(address)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(address);
        }
    }

    fn report(
        &self,
        address: &ResourceAddress,
        kind: OperationKind,
        transaction: &str,
        outcome: TransitionOutcome,
        message: &str,
    ) {
        if let Some(metrics) = self.env.metrics() {
            metrics.record_transition(kind.as_str(), outcome.as_str());
        }
        let resource = address.to_string();
        let ctx = LogContext::new()
            .with_resource(&resource)
            .with_operation(kind.as_str())
            .with_transaction(transaction);
        log_transition_event(Some(&ctx), "lifecycle.transition", message, outcome);
    }
}
