//! ---
//! dslo_section: "05-operator-interfaces"
//! dslo_subsection: "binary"
//! dslo_type: "source"
//! dslo_scope: "code"
//! dslo_description: "Operator CLI for the datasource lifecycle orchestrator."
//! dslo_version: "v0.0.0-prealpha"
//! dslo_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use dslo_common::{init_tracing, DsloConfig, LoadedConfig, RuntimeMode};
use tracing::info;

mod lifecycle;
mod names;

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Datasource lifecycle control utility",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, help = "Override the runtime mode")]
    mode: Option<CliMode>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print version information and exit"
    )]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    Normal,
    AdminOnly,
    Bootstrap,
}

impl From<CliMode> for RuntimeMode {
    fn from(value: CliMode) -> Self {
        match value {
            CliMode::Normal => RuntimeMode::Normal,
            CliMode::AdminOnly => RuntimeMode::AdminOnly,
            CliMode::Bootstrap => RuntimeMode::Bootstrap,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Print the service names derived for a datasource")]
    Names(names::NamesCommand),
    #[command(about = "Add every configured datasource and print the directory")]
    Apply(lifecycle::ApplyCommand),
    #[command(about = "Apply, disable one datasource, roll back and compare")]
    Cycle(lifecycle::CycleCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("dsloctl {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let Some(command) = cli.command else {
        println!("no command given, see `dsloctl --help`");
        return Ok(());
    };

    match command {
        Commands::Names(cmd) => {
            dslo_logging::init();
            names::run(cmd)
        }
        Commands::Apply(cmd) => {
            let loaded = load_config(cli.config.as_ref(), cli.mode)?;
            let _guard = init_tracing("dsloctl", &loaded.config.logging)?;
            announce(&loaded);
            lifecycle::apply(cmd, &loaded.config)
        }
        Commands::Cycle(cmd) => {
            let loaded = load_config(cli.config.as_ref(), cli.mode)?;
            let _guard = init_tracing("dsloctl", &loaded.config.logging)?;
            announce(&loaded);
            lifecycle::cycle(cmd, &loaded.config)
        }
    }
}

fn load_config(explicit: Option<&PathBuf>, mode: Option<CliMode>) -> Result<LoadedConfig> {
    let mut candidates = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("dslo.toml"));
    candidates.push(PathBuf::from("configs/dslo.toml"));

    let mut loaded = DsloConfig::load_with_source(&candidates)?;
    if let Some(mode) = mode {
        loaded.config.runtime.mode = mode.into();
    }
    Ok(loaded)
}

fn announce(loaded: &LoadedConfig) {
    info!(
        config_path = %loaded.source.display(),
        mode = %loaded.config.runtime.mode,
        datasources = loaded.config.datasources.len(),
        "configuration loaded"
    );
}
