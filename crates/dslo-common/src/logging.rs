//! ---
//! dslo_section: "01-core-functionality"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Tracing subscriber for dslo tools with an optional JSON journal."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "DSLO_LOG";
const FALLBACK_DIRECTIVE: &str = "info";

/// Tool that installed the process-wide subscriber.
static INSTALLED_BY: OnceCell<String> = OnceCell::new();

/// Console log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    StructuredJson,
}

/// Keeps the journal writer flushing. Hold it until the tool exits.
#[must_use = "dropping the guard stops the log journal"]
#[derive(Debug, Default)]
pub struct LogGuard {
    journal: Option<WorkerGuard>,
    journal_path: Option<PathBuf>,
}

impl LogGuard {
    /// Base path of the rolling journal, when one was opened.
    pub fn journal_path(&self) -> Option<&Path> {
        self.journal_path.as_deref()
    }

    pub fn has_journal(&self) -> bool {
        self.journal.is_some()
    }
}

/// Install the process-wide subscriber for a dslo tool.
///
/// Console output goes to stderr; stdout is left to command output. The
/// filter is taken from `DSLO_LOG`, then `RUST_LOG`, then `config.level`.
/// A daily rolling JSON journal is written only when `config.directory` is
/// set. Only the first call in a process installs anything; later calls get
/// an empty guard.
pub fn init_tracing(tool: &str, config: &LoggingConfig) -> Result<LogGuard> {
    if let Some(owner) = INSTALLED_BY.get() {
        debug!(tool = %tool, installed_by = %owner, "tracing already initialised");
        return Ok(LogGuard::default());
    }

    let filter = build_filter(std::env::var(LOG_ENV).ok(), &config.level);
    let console = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::StructuredJson => fmt::layer()
            .json()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let mut guard = LogGuard::default();
    let journal = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory).with_context(|| {
                format!("unable to create log directory {}", directory.display())
            })?;
            let file_name = journal_file_name(tool, config.file_prefix.as_deref());
            let (writer, worker) = tracing_appender::non_blocking(daily(directory, &file_name));
            guard.journal = Some(worker);
            guard.journal_path = Some(directory.join(file_name));
            Some(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    if tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(journal)
        .try_init()
        .is_err()
    {
        // another subscriber owns the process; our journal would never see an event
        return Ok(LogGuard::default());
    }
    let _ = INSTALLED_BY.set(tool.to_owned());

    info!(
        tool = %tool,
        format = ?config.format,
        journal = ?guard.journal_path,
        "tracing initialised"
    );
    Ok(guard)
}

fn build_filter(directive: Option<String>, level: &str) -> EnvFilter {
    let configured =
        || EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVE));
    match directive.filter(|directive| !directive.trim().is_empty()) {
        Some(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive ({err}); using logging.level {level}");
            configured()
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| configured()),
    }
}

fn journal_file_name(tool: &str, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) if prefix != tool => format!("{prefix}-{tool}.log"),
        _ => format!("{tool}.log"),
    }
}
