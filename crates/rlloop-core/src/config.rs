//! Loop configuration.
//!
//! Values come from built-in defaults, an optional TOML file and command-line
//! overrides, in increasing precedence. The result is validated once and is
//! immutable afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LoopError, Result};

/// Default self-play worker binary, relative to the working directory.
pub const DEFAULT_SELFPLAY_EXECUTABLE: &str = "./external/com_google_minigo/cc/main";

/// Contents of a TOML configuration file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub base_dir: Option<PathBuf>,
    pub max_games_per_generation: Option<u32>,
    pub selfplay_readouts: Option<u32>,
    pub holdout_pct: Option<f64>,
    pub selfplay_executable: Option<PathBuf>,
    pub selfplay_timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LoopError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            LoopError::Configuration(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Overlay `other` onto `self`; keys set in `other` win.
    pub fn merge(self, other: ConfigFile) -> Self {
        Self {
            base_dir: other.base_dir.or(self.base_dir),
            max_games_per_generation: other
                .max_games_per_generation
                .or(self.max_games_per_generation),
            selfplay_readouts: other.selfplay_readouts.or(self.selfplay_readouts),
            holdout_pct: other.holdout_pct.or(self.holdout_pct),
            selfplay_executable: other.selfplay_executable.or(self.selfplay_executable),
            selfplay_timeout_secs: other.selfplay_timeout_secs.or(self.selfplay_timeout_secs),
        }
    }
}

/// Validated configuration for one loop process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopConfig {
    /// Root of all storage locations.
    pub base_dir: PathBuf,

    /// Games each self-play worker plays in parallel for one generation.
    pub max_games_per_generation: u32,

    /// Tree-search readouts per move.
    pub selfplay_readouts: u32,

    /// Percentage of games routed to the holdout directory.
    pub holdout_pct: f64,

    /// Self-play worker binary.
    pub selfplay_executable: PathBuf,

    /// Kill the worker after this many seconds. `None` blocks until it exits.
    pub selfplay_timeout_secs: Option<u64>,
}

impl LoopConfig {
    pub const DEFAULT_MAX_GAMES_PER_GENERATION: u32 = 10_000;
    pub const DEFAULT_SELFPLAY_READOUTS: u32 = 800;
    pub const DEFAULT_HOLDOUT_PCT: f64 = 0.05;

    /// Config with defaults for everything but the base directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_games_per_generation: Self::DEFAULT_MAX_GAMES_PER_GENERATION,
            selfplay_readouts: Self::DEFAULT_SELFPLAY_READOUTS,
            holdout_pct: Self::DEFAULT_HOLDOUT_PCT,
            selfplay_executable: PathBuf::from(DEFAULT_SELFPLAY_EXECUTABLE),
            selfplay_timeout_secs: None,
        }
    }

    /// Fill defaults into `file` and validate the result.
    pub fn from_file(file: ConfigFile) -> Result<Self> {
        let base_dir = file
            .base_dir
            .ok_or_else(|| LoopError::Configuration("base_dir is required".to_string()))?;
        let mut config = Self::new(base_dir);
        if let Some(v) = file.max_games_per_generation {
            config.max_games_per_generation = v;
        }
        if let Some(v) = file.selfplay_readouts {
            config.selfplay_readouts = v;
        }
        if let Some(v) = file.holdout_pct {
            config.holdout_pct = v;
        }
        if let Some(v) = file.selfplay_executable {
            config.selfplay_executable = v;
        }
        config.selfplay_timeout_secs = file.selfplay_timeout_secs;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(LoopError::Configuration("base_dir must not be empty".into()));
        }
        if self.max_games_per_generation == 0 {
            return Err(LoopError::Configuration(
                "max_games_per_generation must be > 0".into(),
            ));
        }
        if self.selfplay_readouts == 0 {
            return Err(LoopError::Configuration(
                "selfplay_readouts must be > 0".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.holdout_pct) {
            return Err(LoopError::Configuration(
                "holdout_pct must be in [0, 100]".into(),
            ));
        }
        if self.selfplay_executable.as_os_str().is_empty() {
            return Err(LoopError::Configuration(
                "selfplay_executable must not be empty".into(),
            ));
        }
        if self.selfplay_timeout_secs == Some(0) {
            return Err(LoopError::Configuration(
                "selfplay_timeout_secs must be > 0 when set".into(),
            ));
        }
        Ok(())
    }
}
