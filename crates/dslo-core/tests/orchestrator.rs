//! ---
//! dslo_section: "04-lifecycle-core"
//! dslo_subsection: "tests"
//! dslo_type: "source"
//! dslo_scope: "test"
//! dslo_description: "Orchestrator locking, commit and rollback tests."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{ds1_address, ds1_model, ds1_names, Fixture};
use dslo_core::{
    ConfigurationModel, DataSourceKind, HostEnvironment, InMemoryModel, InMemoryOverrides,
    LifecycleError, LifecycleMetrics, LifecycleOrchestrator, ManagementOperation,
    OperationOutcome, OverrideRegistry, ResourceAddress, ResourceModel,
};
use dslo_naming::{derive, ServiceName};
use dslo_registry::{
    DirectoryError, InMemoryDirectory, ServiceDirectory, ServiceMode, ServiceState, ServiceUnit,
};
use prometheus::Registry;

fn metered(fx: Fixture) -> (LifecycleOrchestrator, LifecycleMetrics, Arc<InMemoryDirectory>) {
    let metrics = LifecycleMetrics::new(Arc::new(Registry::new())).unwrap();
    let directory = fx.directory.clone();
    let env = fx.env.with_metrics(metrics.clone());
    (LifecycleOrchestrator::new(Arc::new(env)), metrics, directory)
}

fn address(name: &str) -> ResourceAddress {
    ResourceAddress::data_source(DataSourceKind::Plain, name)
}

fn model(name: &str) -> ResourceModel {
    ResourceModel::new(format!("java:/{}", name.to_uppercase()))
        .with_driver("h2")
        .with_connection_property("url", format!("jdbc:h2:mem:{name}"))
}

#[test]
fn committed_operations_are_counted_by_outcome() {
    let (orchestrator, metrics, directory) = metered(Fixture::new());

    orchestrator
        .execute(&ds1_address(), ManagementOperation::Add(ds1_model()))
        .unwrap();
    orchestrator
        .execute(&ds1_address(), ManagementOperation::Disable)
        .unwrap();
    orchestrator
        .execute(&ds1_address(), ManagementOperation::Enable)
        .unwrap();

    assert_eq!(metrics.transitions("add", "success"), 1);
    assert_eq!(metrics.transitions("disable", "success"), 1);
    assert_eq!(metrics.transitions("enable", "success"), 1);
    assert_eq!(metrics.rollbacks("disable"), 0);
    assert_eq!(directory.len(), 8);

    let exported = metrics.registry().gather();
    assert!(exported
        .iter()
        .any(|family| family.get_name() == "dslo_transitions_total"));
}

#[test]
fn failed_disable_is_compensated_before_the_error_returns() {
    let (orchestrator, metrics, directory) = metered(Fixture::new());
    orchestrator
        .execute(&ds1_address(), ManagementOperation::Add(ds1_model()))
        .unwrap();
    let names = ds1_names();
    let url = names.connection_property("url");
    directory.force_state(&url, ServiceState::Down).unwrap();

    let err = orchestrator
        .execute(&ds1_address(), ManagementOperation::Disable)
        .unwrap_err();
    assert!(matches!(err, LifecycleError::ServiceNotEnabled { .. }));

    assert_eq!(metrics.transitions("disable", "fault"), 1);
    assert_eq!(metrics.rollbacks("disable"), 1);
    assert_eq!(metrics.rollback_failures(), 0);
    let snapshot = directory.snapshot();
    assert_eq!(snapshot.len(), 8);
    assert!(snapshot
        .values()
        .all(|entry| *entry == (ServiceState::Up, ServiceMode::Active)));
    assert_eq!(
        orchestrator
            .env()
            .model()
            .read(&ds1_address())
            .and_then(|stored| stored.enabled),
        Some(false)
    );
}

#[test]
fn failed_add_rolls_back_created_units() {
    let (orchestrator, metrics, directory) = metered(Fixture::new());
    directory.inject_failure(ds1_names().deployment, "deployer offline");

    let err = orchestrator
        .execute(&ds1_address(), ManagementOperation::Add(ds1_model()))
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Directory(DirectoryError::CreateFailed { .. })
    ));
    assert!(directory.is_empty());
    assert_eq!(metrics.transitions("add", "fault"), 1);
    assert!(!orchestrator.env().overrides().is_registered("ds1"));
    assert!(!orchestrator.env().model().contains(&ds1_address()));

    let retried = orchestrator
        .execute(&ds1_address(), ManagementOperation::Add(ds1_model()))
        .unwrap();
    assert_eq!(retried.changes().created, 8);
}

#[test]
fn reload_required_gauge_follows_the_environment() {
    let (orchestrator, metrics, _) = metered(Fixture::without_restart());
    orchestrator
        .execute(&ds1_address(), ManagementOperation::Add(ds1_model()))
        .unwrap();
    let outcome = orchestrator
        .execute(&ds1_address(), ManagementOperation::Disable)
        .unwrap();
    assert_eq!(outcome, OperationOutcome::ReloadRequired);
    assert!(orchestrator.env().is_reload_required());

    let gauge = metrics
        .registry()
        .gather()
        .into_iter()
        .find(|family| family.get_name() == "dslo_reload_required")
        .map(|family| family.get_metric()[0].get_gauge().get_value());
    assert_eq!(gauge, Some(1.0));
}

#[test]
fn composite_operations_commit_together() {
    let (orchestrator, metrics, directory) = metered(Fixture::new());
    let outcomes = orchestrator
        .execute_composite(vec![
            (address("ds1"), ManagementOperation::Add(model("ds1"))),
            (address("ds2"), ManagementOperation::Add(model("ds2"))),
            (address("ds1"), ManagementOperation::Disable),
        ])
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[2].changes().stopped, 2);
    assert_eq!(metrics.transitions("add", "success"), 2);
    assert_eq!(metrics.transitions("disable", "success"), 1);
    assert_eq!(
        directory.lookup(&derive("ds1", "java:/DS1").resource.data_source).map(|unit| unit.state),
        Some(ServiceState::Down)
    );
    assert!(directory
        .lookup(&derive("ds2", "java:/DS2").binder)
        .is_some_and(|unit| unit.is_up()));
}

#[test]
fn composite_failure_rolls_back_every_step() {
    let (orchestrator, metrics, directory) = metered(Fixture::new());
    orchestrator
        .execute(&address("ds1"), ManagementOperation::Add(model("ds1")))
        .unwrap();
    let before = directory.snapshot();

    let err = orchestrator
        .execute_composite(vec![
            (address("ds1"), ManagementOperation::Disable),
            (address("ds2"), ManagementOperation::Add(model("ds2"))),
            (address("ds3"), ManagementOperation::Enable),
        ])
        .unwrap_err();
    assert!(matches!(err, LifecycleError::ResourceNotFound { .. }));

    assert_eq!(directory.snapshot(), before);
    let stored = orchestrator.env().model();
    assert!(!stored.contains(&address("ds2")));
    // disable's enabled=false write is kept
    assert_eq!(stored.read(&address("ds1")).unwrap().enabled, Some(false));
    assert_eq!(metrics.rollbacks("disable"), 1);
    assert_eq!(metrics.rollbacks("add"), 1);
    assert_eq!(metrics.transitions("enable", "fault"), 1);
    assert_eq!(metrics.transitions("disable", "success"), 0);
    assert_eq!(orchestrator.tracked_addresses(), 0);
}

#[test]
fn apply_leaves_commit_to_the_caller() {
    let fx = Fixture::new();
    let mut tx = fx.env.begin();
    LifecycleOrchestrator::apply(&mut tx, &ds1_address(), ManagementOperation::Add(ds1_model()))
        .unwrap();
    assert_eq!(tx.pending_records().len(), 1);
    tx.rollback();
    assert!(fx.directory.is_empty());
}

/// Directory whose `create` stalls, signalling when the first call starts.
#[derive(Debug)]
struct SlowDirectory {
    inner: InMemoryDirectory,
    delay: Duration,
    entered: AtomicBool,
}

impl ServiceDirectory for SlowDirectory {
    fn lookup(&self, name: &ServiceName) -> Option<ServiceUnit> {
        self.inner.lookup(name)
    }

    fn list_names(&self) -> Vec<ServiceName> {
        self.inner.list_names()
    }

    fn set_mode(&self, name: &ServiceName, mode: ServiceMode) -> Result<(), DirectoryError> {
        self.inner.set_mode(name, mode)
    }

    fn remove(&self, name: &ServiceName) -> bool {
        self.inner.remove(name)
    }

    fn create(
        &self,
        name: ServiceName,
        payload: serde_json::Value,
    ) -> Result<ServiceUnit, DirectoryError> {
        self.entered.store(true, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.inner.create(name, payload)
    }
}

fn slow_orchestrator(delay: Duration, lock_timeout: Duration) -> (Arc<LifecycleOrchestrator>, Arc<SlowDirectory>) {
    let directory = Arc::new(SlowDirectory {
        inner: InMemoryDirectory::new(),
        delay,
        entered: AtomicBool::new(false),
    });
    let env = HostEnvironment::new(
        directory.clone(),
        Arc::new(InMemoryModel::new()),
        Arc::new(InMemoryOverrides::new()),
    );
    let orchestrator =
        LifecycleOrchestrator::new(Arc::new(env)).with_lock_timeout(lock_timeout);
    (Arc::new(orchestrator), directory)
}

#[test]
fn contended_address_times_out_while_others_proceed() {
    let (orchestrator, directory) =
        slow_orchestrator(Duration::from_millis(50), Duration::from_millis(10));

    let worker = {
        let orchestrator = orchestrator.clone();
        thread::spawn(move || {
            orchestrator.execute(&ds1_address(), ManagementOperation::Add(ds1_model()))
        })
    };
    while !directory.entered.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(1));
    }

    let err = orchestrator
        .execute(&ds1_address(), ManagementOperation::Enable)
        .unwrap_err();
    match err {
        LifecycleError::OperationTimedOut { address, timeout } => {
            assert_eq!(address, ds1_address());
            assert_eq!(timeout, Duration::from_millis(10));
        }
        other => panic!("unexpected error {other}"),
    }

    // a different address is not serialised behind ds1
    let err = orchestrator
        .execute(&address("ds2"), ManagementOperation::Disable)
        .unwrap_err();
    assert!(matches!(err, LifecycleError::ResourceNotFound { .. }));
    // only the running add still holds a lock entry
    assert_eq!(orchestrator.tracked_addresses(), 1);

    let outcome = worker.join().unwrap().unwrap();
    assert_eq!(outcome.changes().created, 8);
    assert_eq!(orchestrator.tracked_addresses(), 0);
}

#[test]
fn concurrent_operations_on_distinct_resources_all_commit() {
    let (orchestrator, directory) =
        slow_orchestrator(Duration::from_millis(1), Duration::from_secs(5));

    let workers: Vec<_> = (0..6)
        .map(|index| {
            let orchestrator = orchestrator.clone();
            thread::spawn(move || {
                let name = format!("ds{index}");
                orchestrator.execute(&address(&name), ManagementOperation::Add(model(&name)))?;
                orchestrator.execute(&address(&name), ManagementOperation::Disable)?;
                orchestrator.execute(&address(&name), ManagementOperation::Enable)
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap().unwrap();
    }

    assert_eq!(orchestrator.tracked_addresses(), 0);
    let names = directory.list_names();
    assert_eq!(names.len(), 6 * 8);
    assert!(names
        .iter()
        .all(|name| directory.lookup(name).is_some_and(|unit| unit.is_up())));
}

#[test]
fn serialised_operations_on_one_resource_see_each_other() {
    let (orchestrator, _) = slow_orchestrator(Duration::from_millis(1), Duration::from_secs(5));
    orchestrator
        .execute(&ds1_address(), ManagementOperation::Add(ds1_model()))
        .unwrap();

    let workers: Vec<_> = (0..4)
        .map(|index| {
            let orchestrator = orchestrator.clone();
            thread::spawn(move || {
                let operation = if index % 2 == 0 {
                    ManagementOperation::Disable
                } else {
                    ManagementOperation::Enable
                };
                orchestrator.execute(&ds1_address(), operation)
            })
        })
        .collect();
    for worker in workers {
        // a disable that runs after another disable finds the primary stopped
        match worker.join().unwrap() {
            Ok(_) | Err(LifecycleError::ServiceNotEnabled { .. }) => {}
            Err(other) => panic!("unexpected error {other}"),
        }
    }

    orchestrator
        .execute(&ds1_address(), ManagementOperation::Enable)
        .unwrap();
    let stored = orchestrator.env().model().read(&ds1_address()).unwrap();
    assert_eq!(stored.enabled, Some(true));
    assert!(orchestrator
        .env()
        .directory()
        .lookup(&ds1_names().resource.data_source)
        .is_some_and(|unit| unit.is_up()));
}
