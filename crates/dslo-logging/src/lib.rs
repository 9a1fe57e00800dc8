//! ---
//! dslo_section: "03-logging"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Log context and transition events for lifecycle operations."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Context-carrying log macros and the transition event helper.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for development and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Resource (datasource) name associated with the log event.
    pub resource: Option<&'a str>,
    /// Canonical name of the service unit being touched.
    pub service: Option<&'a str>,
    /// Lifecycle operation (add, remove, enable, disable).
    pub operation: Option<&'a str>,
    /// Transaction identifier.
    pub transaction: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a resource name.
    pub fn with_resource(mut self, resource: &'a str) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Attach a service unit name.
    pub fn with_service(mut self, service: &'a str) -> Self {
        self.service = Some(service);
        self
    }

    /// Attach the operation name.
    pub fn with_operation(mut self, operation: &'a str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Attach a transaction identifier.
    pub fn with_transaction(mut self, transaction: &'a str) -> Self {
        self.transaction = Some(transaction);
        self
    }
}

/// Outcome of a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition completed.
    Success,
    /// The transition failed and its transaction was rolled back.
    Fault,
}

impl TransitionOutcome {
    /// Label used for the `outcome` field and metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionOutcome::Success => "success",
            TransitionOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized transition event with a success/fault outcome.
pub fn log_transition_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: TransitionOutcome,
) {
    let fallback = LogContext::default();
    let ctx = context.unwrap_or(&fallback);
    match outcome {
        TransitionOutcome::Success => tracing::info!(
            event,
            outcome = outcome.as_str(),
            resource = ctx.resource.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            transaction = ctx.transaction.unwrap_or(""),
            "{message}"
        ),
        TransitionOutcome::Fault => tracing::error!(
            event,
            outcome = outcome.as_str(),
            resource = ctx.resource.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            transaction = ctx.transaction.unwrap_or(""),
            "{message}"
        ),
    }
}
