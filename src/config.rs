//! Collector settings.
//!
//! Layered with the `config` crate, later layers winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. `TELEMATICS_*` environment variables (`TELEMATICS_ROSTER__ARITY` for
//!    nested keys)
//! 4. command-line flags

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::duration::parse_duration;
use crate::data::AveragingProfile;
use crate::roster::RosterLayout;
use crate::source::SchemaMode;

/// Shortest accepted polling interval. Store timestamps have one-second
/// resolution.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

const ENV_PREFIX: &str = "TELEMATICS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Polling and aggregation interval, e.g. "1", "2s", "1m".
    pub interval: String,
    /// Rows retained per series store.
    pub duration: usize,
    pub nodes_file: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Overrides `roster.snapshot_path` when set.
    pub snapshot_path: Option<String>,
    pub schema: SchemaMode,
    pub averaging: AveragingProfile,
    /// Use the plain dashboard instead of the full-screen one.
    pub plain: bool,
    pub log_level: String,
    /// Diagnostics file; defaults to `<log_dir>/telematics.log`.
    pub log_file: Option<PathBuf>,
    pub roster: RosterLayout,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval: "1".to_string(),
            duration: 3600,
            nodes_file: PathBuf::from("./nodes.txt"),
            data_dir: PathBuf::from("./seriesData"),
            log_dir: PathBuf::from("./logData"),
            snapshot_path: None,
            schema: SchemaMode::default(),
            averaging: AveragingProfile::default(),
            plain: false,
            log_level: "info".to_string(),
            log_file: None,
            roster: RosterLayout::default(),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub interval: Option<String>,
    pub duration: Option<usize>,
    pub nodes_file: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub plain: bool,
    pub strict: bool,
    pub log_level: Option<String>,
}

impl Settings {
    /// Load settings from all layers and validate them.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::load_with_env(file, overrides, None)
    }

    fn load_with_env(
        file: Option<&Path>,
        overrides: &Overrides,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        builder = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .set_override_option("interval", overrides.interval.clone())?
            .set_override_option("duration", overrides.duration.map(|d| d as i64))?
            .set_override_option("nodes_file", path_value(&overrides.nodes_file))?
            .set_override_option("data_dir", path_value(&overrides.data_dir))?
            .set_override_option("log_dir", path_value(&overrides.log_dir))?
            .set_override_option("log_level", overrides.log_level.clone())?
            .set_override_option("plain", overrides.plain.then_some(true))?
            .set_override_option("schema", overrides.strict.then_some("strict"))?;

        let mut settings: Settings = builder
            .build()
            .context("failed to load configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        if let Some(path) = settings.snapshot_path.clone() {
            settings.roster.snapshot_path = path;
        }
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let interval = self.poll_interval()?;
        if interval < MIN_INTERVAL {
            bail!(
                "interval {:?} is below the minimum of {:?}",
                interval,
                MIN_INTERVAL
            );
        }
        if self.duration == 0 {
            bail!("duration must be at least one row");
        }
        if self.roster.arity == 0 {
            bail!("roster arity must be positive");
        }
        for (column, index) in [
            ("name", self.roster.name),
            ("host", self.roster.host),
            ("port", self.roster.port),
            ("class", self.roster.class),
        ] {
            if index >= self.roster.arity {
                bail!(
                    "roster column '{}' at index {} is outside arity {}",
                    column,
                    index,
                    self.roster.arity
                );
            }
        }
        Ok(())
    }

    /// Parsed polling interval.
    pub fn poll_interval(&self) -> Result<Duration> {
        parse_duration(&self.interval)
            .with_context(|| format!("invalid interval '{}'", self.interval))
    }

    /// Where diagnostics are written.
    pub fn log_file_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.log_dir.join("telematics.log"))
    }
}

fn path_value(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.display().to_string())
}
