//! Typed configuration for the database updater core, loaded the way
//! `ScannerConfig::load_from_env` loads scanner settings: an env-pointed
//! file, then inline JSON in an env var, then defaults.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};

/// Where a loaded [`UpdateConfig`] came from, for logging at startup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
}

/// Settings governing one database updater core instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Root of the music tree. There is no sensible default; callers that
    /// load from defaults must set this before starting a job.
    pub music_directory: PathBuf,
    /// Follow symlinks that resolve inside `music_directory`.
    pub follow_inside_symlinks: bool,
    /// Follow symlinks that resolve outside `music_directory`.
    pub follow_outside_symlinks: bool,
    /// Enable the archive-interior scan branch. Has no effect unless this
    /// crate's `archive` feature is also compiled in.
    pub archive_support: bool,
    /// Fixed capacity of the pending-path FIFO (§4.8). Exposed as a knob so
    /// tests can exercise queue-full behavior without 32 real paths.
    pub pending_queue_capacity: usize,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            music_directory: PathBuf::new(),
            follow_inside_symlinks: true,
            follow_outside_symlinks: true,
            archive_support: true,
            pending_queue_capacity: 32,
        }
    }
}

impl UpdateConfig {
    /// Load configuration overrides using environment variables.
    /// Evaluation order:
    /// 1) `$UPDATE_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$UPDATE_CONFIG_JSON` (inline JSON),
    /// 3) defaults, with `music_directory` left empty.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        if let Ok(path_str) = env::var("UPDATE_CONFIG_PATH") {
            if !path_str.trim().is_empty() {
                let path = PathBuf::from(path_str);
                let config = Self::load_from_file(&path)?;
                return Ok((config, ConfigSource::EnvPath(path)));
            }
        }

        if let Ok(raw) = env::var("UPDATE_CONFIG_JSON") {
            if !raw.trim().is_empty() {
                let parsed = Self::parse_json(&raw).context("failed to parse UPDATE_CONFIG_JSON")?;
                return Ok((parsed, ConfigSource::EnvInline));
            }
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read update config from {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                Self::parse_json(&contents).with_context(|| format!("invalid update config {}", path.display()))
            }
            _ => toml::from_str(&contents)
                .map_err(|err| anyhow!("invalid update config {}: {err}", path.display())),
        }
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).map_err(|err| anyhow!("invalid update config json: {err}"))
    }

    /// `Err` naming the first unset-or-invalid field, otherwise `Ok(())`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.music_directory.as_os_str().is_empty() {
            return Err(anyhow!("music_directory must be set"));
        }
        if self.pending_queue_capacity == 0 {
            return Err(anyhow!("pending_queue_capacity must be nonzero"));
        }
        Ok(())
    }
}
