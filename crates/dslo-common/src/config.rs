//! ---
//! dslo_section: "01-core-functionality"
//! dslo_subsection: "module"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "TOML configuration loading and validation."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::logging::LogFormat;

fn default_runtime_mode() -> RuntimeMode {
    RuntimeMode::Normal
}

fn default_allow_service_restart() -> bool {
    true
}

fn default_lock_timeout() -> Duration {
    Duration::from_millis(5_000)
}

fn default_log_level() -> String {
    "info".to_owned()
}

/// Primary configuration object for the orchestrator and `dsloctl`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DsloConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub datasources: IndexMap<String, DataSourceConfig>,
}

/// Metadata describing where a [`DsloConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: DsloConfig,
    pub source: PathBuf,
}

impl DsloConfig {
    pub const ENV_CONFIG_PATH: &str = "DSLO_CONFIG";

    /// Load configuration from disk, respecting the `DSLO_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<DsloConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Retrieve a datasource declaration by resource name.
    pub fn datasource(&self, name: &str) -> Option<&DataSourceConfig> {
        self.datasources.get(name)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.runtime.validate()?;
        self.logging.validate()?;
        for (name, datasource) in &self.datasources {
            datasource.validate(name)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for DsloConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: DsloConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Runtime mode of the hosting process. Only `Normal` reconciles live services.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeMode {
    #[default]
    Normal,
    AdminOnly,
    Bootstrap,
}

impl RuntimeMode {
    pub fn is_normal(&self) -> bool {
        matches!(self, RuntimeMode::Normal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeMode::Normal => "normal",
            RuntimeMode::AdminOnly => "admin-only",
            RuntimeMode::Bootstrap => "bootstrap",
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(RuntimeMode::Normal),
            "admin-only" => Ok(RuntimeMode::AdminOnly),
            "bootstrap" => Ok(RuntimeMode::Bootstrap),
            other => Err(format!("unknown runtime mode: {}", other)),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_runtime_mode")]
    pub mode: RuntimeMode,
    #[serde(default = "default_allow_service_restart")]
    pub allow_service_restart: bool,
    #[serde(rename = "lock_timeout_ms", default = "default_lock_timeout")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub lock_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: default_runtime_mode(),
            allow_service_restart: default_allow_service_restart(),
            lock_timeout: default_lock_timeout(),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lock_timeout.is_zero() {
            return Err(anyhow!("runtime.lock_timeout_ms must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when neither `DSLO_LOG` nor `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Directory of the rolling JSON journal. No journal is written when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            directory: None,
            file_prefix: None,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        EnvFilter::try_new(&self.level)
            .map_err(|err| anyhow!("logging.level '{}' is not a valid filter: {err}", self.level))?;
        Ok(())
    }
}

/// Datasource variant. Selects the configuration unit and property family.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    #[default]
    Plain,
    Xa,
}

impl DataSourceKind {
    /// Resource type of the address element that declares this variant.
    pub fn resource_type(&self) -> &'static str {
        match self {
            DataSourceKind::Plain => "data-source",
            DataSourceKind::Xa => "xa-data-source",
        }
    }

    pub fn from_resource_type(resource_type: &str) -> Option<Self> {
        match resource_type {
            "data-source" => Some(DataSourceKind::Plain),
            "xa-data-source" => Some(DataSourceKind::Xa),
            _ => None,
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceKind::Plain => f.write_str("plain"),
            DataSourceKind::Xa => f.write_str("xa"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataSourceConfig {
    #[serde(default)]
    pub kind: DataSourceKind,
    pub binding_name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub connection_properties: IndexMap<String, String>,
    #[serde(default)]
    pub xa_properties: IndexMap<String, String>,
}

impl DataSourceConfig {
    pub fn validate(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(anyhow!("datasource names must not be empty"));
        }
        if self.binding_name.trim().is_empty() {
            return Err(anyhow!(
                "datasource '{}' must declare a binding_name",
                name
            ));
        }
        match self.kind {
            DataSourceKind::Plain if !self.xa_properties.is_empty() => Err(anyhow!(
                "datasource '{}' is plain but declares xa_properties",
                name
            )),
            DataSourceKind::Xa if !self.connection_properties.is_empty() => Err(anyhow!(
                "datasource '{}' is xa but declares connection_properties",
                name
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[runtime]
mode = "normal"
allow_service_restart = true
lock_timeout_ms = 250

[logging]
level = "debug"
format = "compact"

[datasources.ds1]
binding_name = "java:/DS1"
driver = "h2"

[datasources.ds1.connection_properties]
url = "jdbc:h2:mem:test"

[datasources.xa1]
kind = "xa"
binding_name = "java:jboss/datasources/XA1"
enabled = false

[datasources.xa1.xa_properties]
ServerName = "db.local"
"#;

    #[test]
    fn parses_sample_configuration() {
        let config: DsloConfig = SAMPLE.parse().unwrap();
        assert_eq!(config.runtime.mode, RuntimeMode::Normal);
        assert_eq!(config.runtime.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.directory.is_none());
        let names: Vec<_> = config.datasources.keys().cloned().collect();
        assert_eq!(names, vec!["ds1", "xa1"]);

        let ds1 = config.datasource("ds1").unwrap();
        assert_eq!(ds1.kind, DataSourceKind::Plain);
        assert_eq!(ds1.enabled, None);
        assert_eq!(
            ds1.connection_properties.get("url").map(String::as_str),
            Some("jdbc:h2:mem:test")
        );

        let xa1 = config.datasource("xa1").unwrap();
        assert_eq!(xa1.kind, DataSourceKind::Xa);
        assert_eq!(xa1.enabled, Some(false));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: DsloConfig = "".parse().unwrap();
        assert!(config.runtime.mode.is_normal());
        assert!(config.runtime.allow_service_restart);
        assert_eq!(config.runtime.lock_timeout, default_lock_timeout());
        assert!(config.datasources.is_empty());
    }

    #[test]
    fn rejects_blank_binding_name() {
        let err = "[datasources.ds1]\nbinding_name = \"  \"\n"
            .parse::<DsloConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("binding_name"));
    }

    #[test]
    fn rejects_properties_of_the_other_variant() {
        let doc = r#"
[datasources.ds1]
binding_name = "java:/DS1"
[datasources.ds1.xa_properties]
ServerName = "x"
"#;
        assert!(doc.parse::<DsloConfig>().is_err());
    }

    #[test]
    fn logging_defaults_to_pretty_console_without_journal() {
        let config: DsloConfig = "".parse().unwrap();
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn rejects_unparseable_log_level() {
        let err = "[logging]\nlevel = \"dslo_core=loud\"\n"
            .parse::<DsloConfig>()
            .unwrap_err();
        assert!(format!("{err:#}").contains("logging.level"));
    }

    #[test]
    fn rejects_zero_lock_timeout() {
        assert!("[runtime]\nlock_timeout_ms = 0\n"
            .parse::<DsloConfig>()
            .is_err());
    }

    #[test]
    fn runtime_mode_parses_kebab_case() {
        assert_eq!("admin-only".parse(), Ok(RuntimeMode::AdminOnly));
        assert_eq!("BOOTSTRAP".parse(), Ok(RuntimeMode::Bootstrap));
        assert!("offline".parse::<RuntimeMode>().is_err());
        assert_eq!(RuntimeMode::AdminOnly.to_string(), "admin-only");
    }

    #[test]
    fn loads_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dslo.toml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let missing = dir.path().join("missing.toml");
        let loaded = DsloConfig::load_with_source(&[missing, path.clone()]).unwrap();
        assert_eq!(loaded.source, path);
        assert_eq!(loaded.config.datasources.len(), 2);
    }

    #[test]
    fn reports_inspected_candidates_when_none_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        if std::env::var(DsloConfig::ENV_CONFIG_PATH).is_ok() {
            return;
        }
        let err = DsloConfig::load(&[missing]).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn resource_types_map_to_variants() {
        assert_eq!(
            DataSourceKind::from_resource_type("xa-data-source"),
            Some(DataSourceKind::Xa)
        );
        assert_eq!(DataSourceKind::Plain.resource_type(), "data-source");
        assert_eq!(DataSourceKind::from_resource_type("subsystem"), None);
    }
}
