//! Server configuration, loaded from a TOML file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::TimeDelta;
use serde::Deserialize;
use tracing::info;
use wall_core::BlockSchedule;

/// Top-level configuration. Every section and key is optional.
#[derive(Debug, Default, Deserialize)]
pub struct WallConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database location.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Where embedded images are stored.
    #[serde(default)]
    pub media: MediaConfig,
    /// Block cadence.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl WallConfig {
    /// Reads `path`, or returns defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// `[server]`
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Largest accepted webhook body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Shut down when this file appears. It is removed on shutdown.
    pub shutdown_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            max_body_bytes: default_max_body_bytes(),
            shutdown_file: None,
        }
    }
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_owned()
}

const fn default_max_body_bytes() -> usize {
    25 * 1024 * 1024
}

/// `[database]`
#[derive(Debug, Default, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` file. Defaults to `wall/wall.db` in the user data directory.
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// The database file to open.
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("wall")
                .join("wall.db")
        })
    }
}

/// `[media]`
#[derive(Debug, Deserialize)]
pub struct MediaConfig {
    /// Directory served at `/images`.
    #[serde(default = "default_media_dir")]
    pub dir: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: default_media_dir(),
        }
    }
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("images")
}

/// `[schedule]`
#[derive(Debug, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between block openings.
    #[serde(default = "default_frequency_secs")]
    pub frequency_secs: u64,
    /// Seconds a closed block stays hidden.
    #[serde(default = "default_release_offset_secs")]
    pub release_offset_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            frequency_secs: default_frequency_secs(),
            release_offset_secs: default_release_offset_secs(),
        }
    }
}

const fn default_frequency_secs() -> u64 {
    24 * 60 * 60
}

const fn default_release_offset_secs() -> u64 {
    8 * 60 * 60
}

impl ScheduleConfig {
    /// Builds the block schedule.
    ///
    /// # Errors
    ///
    /// Returns an error if the frequency is zero or either value is too large.
    pub fn to_schedule(&self) -> anyhow::Result<BlockSchedule> {
        let frequency = seconds(self.frequency_secs).context("schedule.frequency_secs")?;
        let offset = seconds(self.release_offset_secs).context("schedule.release_offset_secs")?;
        Ok(BlockSchedule::new(frequency, offset)?)
    }
}

fn seconds(secs: u64) -> anyhow::Result<TimeDelta> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .with_context(|| format!("{secs} seconds is out of range"))
}
