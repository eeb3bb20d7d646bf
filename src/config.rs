//! Command line and layered settings for the `streamql` binary.

use crate::stream::{OutputFormat, DEFAULT_POLL_INTERVAL};
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config files, first existing one wins.
pub const CONFIG_PATHS: &[&str] = &["./streamql.toml", "/etc/streamql/streamql.toml"];

/// Perpetual incremental SELECT over append-only rowtime tables
#[derive(Parser, Debug)]
#[command(name = "streamql", version)]
#[command(about = "Run a SELECT forever, emitting newly inserted matching rows as JSON lines", long_about = None)]
pub struct Args {
    /// SQL statement; SELECTs stream until Ctrl-C, anything else runs once
    #[arg(short = 'q', long)]
    pub query: String,

    /// Data directory holding the WAL
    #[arg(short = 'd', long)]
    pub data_dir: Option<PathBuf>,

    /// Pause between re-checks when nothing changed, in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Output record shape
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Effective settings after layering.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> PathBuf { PathBuf::from("./data") }
fn default_poll_interval_ms() -> u64 { u64::try_from(DEFAULT_POLL_INTERVAL.as_millis()).unwrap_or(1000) }
fn default_log_level() -> String { "info".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            format: OutputFormat::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Priority: CLI args > ENV (`STREAMQL_*`) > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let paths: Vec<&Path> = CONFIG_PATHS.iter().map(Path::new).collect();
        Self::load_from(args, &paths)
    }

    pub fn load_from(args: &Args, config_paths: &[&Path]) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // 1. Optional config file
        if let Some(path) = config_paths.iter().find(|p| p.exists()) {
            builder = builder.add_source(File::from(*path));
        }

        // 2. Environment variables
        builder = builder.add_source(Environment::with_prefix("STREAMQL").try_parsing(true));

        let base: Self = builder.build()?.try_deserialize()?;

        // 3. CLI args override everything
        Ok(Self {
            data_dir: args.data_dir.clone().unwrap_or(base.data_dir),
            poll_interval_ms: args.poll_interval_ms.unwrap_or(base.poll_interval_ms),
            format: args.format.unwrap_or(base.format),
            log_level: args.log_level.clone().unwrap_or(base.log_level),
        })
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
