//! ---
//! dslo_section: "05-operator-interfaces"
//! dslo_subsection: "binary"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Apply and cycle commands against an in-memory host."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use dslo_common::DsloConfig;
use dslo_core::{
    ConfigurationModel, HostEnvironment, InMemoryModel, InMemoryOverrides, LifecycleMetrics,
    LifecycleOrchestrator, ManagementOperation, OperationOutcome, ResourceAddress, ResourceModel,
};
use dslo_logging::{dslo_info, dslo_warn, LogContext};
use dslo_registry::{DirectorySnapshot, InMemoryDirectory, ServiceState};
use prometheus::{Encoder, Registry, TextEncoder};

#[derive(Debug, Args)]
pub struct ApplyCommand {
    /// Print the Prometheus metrics after applying.
    #[arg(long = "metrics", action = clap::ArgAction::SetTrue)]
    metrics: bool,
}

#[derive(Debug, Args)]
pub struct CycleCommand {
    /// Configured datasource to disable and roll back.
    resource: String,

    /// Print the Prometheus metrics after the cycle.
    #[arg(long = "metrics", action = clap::ArgAction::SetTrue)]
    metrics: bool,
}

struct Host {
    orchestrator: LifecycleOrchestrator,
    directory: Arc<InMemoryDirectory>,
    metrics: LifecycleMetrics,
}

impl Host {
    fn from_config(config: &DsloConfig) -> Result<Self> {
        let directory = Arc::new(InMemoryDirectory::new());
        let metrics = LifecycleMetrics::new(Arc::new(Registry::new()))
            .context("failed to register lifecycle metrics")?;
        let env = HostEnvironment::new(
            directory.clone(),
            Arc::new(InMemoryModel::new()),
            Arc::new(InMemoryOverrides::new()),
        )
        .with_runtime_config(&config.runtime)
        .with_metrics(metrics.clone());
        let orchestrator =
            LifecycleOrchestrator::new(Arc::new(env)).with_lock_timeout(config.runtime.lock_timeout);
        Ok(Self {
            orchestrator,
            directory,
            metrics,
        })
    }

    /// Add every declared datasource in declaration order.
    fn apply_all(&self, config: &DsloConfig) -> Result<Vec<(ResourceAddress, OperationOutcome)>> {
        let mut applied = Vec::with_capacity(config.datasources.len());
        for (name, declaration) in &config.datasources {
            let address = ResourceAddress::data_source(declaration.kind, name);
            let outcome = self
                .orchestrator
                .execute(&address, ManagementOperation::Add(ResourceModel::from(declaration)))
                .with_context(|| format!("failed to add datasource {name}"))?;
            applied.push((address, outcome));
        }
        Ok(applied)
    }

    fn print_metrics(&self) -> Result<()> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.metrics.registry().gather(), &mut buffer)?;
        print!("{}", String::from_utf8(buffer)?);
        Ok(())
    }
}

pub fn apply(command: ApplyCommand, config: &DsloConfig) -> Result<()> {
    let host = Host::from_config(config)?;
    for (address, outcome) in host.apply_all(config)? {
        println!("{address}: {}", describe(&outcome));
    }
    print_directory(&host.directory.snapshot());
    if command.metrics {
        host.print_metrics()?;
    }
    Ok(())
}

pub fn cycle(command: CycleCommand, config: &DsloConfig) -> Result<()> {
    let declaration = config
        .datasource(&command.resource)
        .ok_or_else(|| anyhow!("datasource {} is not configured", command.resource))?;
    let host = Host::from_config(config)?;
    host.apply_all(config)?;

    let address = ResourceAddress::data_source(declaration.kind, &command.resource);
    let before = host.directory.snapshot();
    let env = host.orchestrator.env();

    let mut tx = env.begin();
    let transaction = tx.id().to_string();
    let ctx = LogContext::new()
        .with_resource(&command.resource)
        .with_operation("disable")
        .with_transaction(&transaction);
    match LifecycleOrchestrator::apply(&mut tx, &address, ManagementOperation::Disable) {
        Ok(outcome) => {
            println!(
                "disable: {} ({} rollback steps pending)",
                describe(&outcome),
                tx.pending_steps()
            );
            dslo_info!(context = &ctx, "disable applied, rolling back");
        }
        Err(err) => {
            println!("disable failed: {err}");
            dslo_warn!(context = &ctx, "disable failed, rolling back: {err}");
        }
    }
    let during = host.directory.snapshot();
    let report = tx.rollback();
    let after = host.directory.snapshot();

    println!(
        "units: {} before, {} running while disabled, {} after rollback",
        before.len(),
        during.values().filter(|(state, _)| *state == ServiceState::Up).count(),
        after.len()
    );
    for failure in &report.failures {
        println!("rollback step failed: {} ({})", failure.step, failure.error);
    }
    let enabled = env
        .model()
        .read(&address)
        .map(|model| model.is_enabled())
        .unwrap_or(false);
    println!("model enabled flag after rollback: {enabled}");

    if command.metrics {
        host.print_metrics()?;
    }
    if before != after {
        print_directory(&after);
        bail!("directory did not round-trip for {}", command.resource);
    }
    println!("directory round-tripped for {}", command.resource);
    Ok(())
}

fn describe(outcome: &OperationOutcome) -> String {
    match outcome {
        OperationOutcome::Applied(changes) => format!(
            "applied (created {}, restarted {}, stopped {}, removed {})",
            changes.created, changes.restarted, changes.stopped, changes.removed
        ),
        OperationOutcome::ModelOnly => "model updated, runtime untouched".to_owned(),
        OperationOutcome::ReloadRequired => "model updated, reload required".to_owned(),
        OperationOutcome::AlreadyAbsent(changes) => {
            format!("already absent (swept {})", changes.removed)
        }
    }
}

fn print_directory(snapshot: &DirectorySnapshot) {
    for (name, (state, mode)) in snapshot {
        println!("{:<4} {:<6} {name}", state.to_string(), mode.to_string());
    }
}
