//! Self-play job definition and its command-line rendering.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::LoopConfig;
use crate::paths::LoopPaths;

/// Leaves evaluated concurrently per search, passed as `--virtual_losses`.
pub const VIRTUAL_LOSSES: u32 = 8;

/// Everything needed to launch one self-play worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfplayJobSpec {
    /// Worker binary.
    pub executable: PathBuf,

    /// Model to play with (no extension).
    pub model_path: PathBuf,

    /// Games played in parallel.
    pub parallel_games: u32,

    /// Tree-search readouts per move.
    pub num_readouts: u32,

    /// Training examples destination.
    pub output_dir: PathBuf,

    /// Holdout examples destination.
    pub holdout_dir: PathBuf,

    /// Percentage of games routed to `holdout_dir`.
    pub holdout_pct: f64,

    /// SGF game records destination.
    pub sgf_dir: PathBuf,

    pub virtual_losses: u32,
}

impl SelfplayJobSpec {
    /// Build the job for `model_name` from configuration and the path layout.
    pub fn from_config(config: &LoopConfig, paths: &LoopPaths, model_name: &str) -> Self {
        let generation = paths.generation(model_name);
        Self {
            executable: config.selfplay_executable.clone(),
            model_path: paths.model_path(model_name),
            parallel_games: config.max_games_per_generation,
            num_readouts: config.selfplay_readouts,
            output_dir: generation.selfplay_output_dir,
            holdout_dir: generation.holdout_dir,
            holdout_pct: config.holdout_pct,
            sgf_dir: generation.sgf_dir,
            virtual_losses: VIRTUAL_LOSSES,
        }
    }

    /// Worker flags, in the order the worker documents them.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--mode=selfplay".to_string(),
            format!("--model={}", self.model_path.display()),
            format!("--parallel_games={}", self.parallel_games),
            format!("--num_readouts={}", self.num_readouts),
            format!("--output_dir={}", self.output_dir.display()),
            format!("--holdout_dir={}", self.holdout_dir.display()),
            format!("--holdout_pct={:.6}", self.holdout_pct),
            format!("--sgf_dir={}", self.sgf_dir.display()),
            "--subdir_format=".to_string(),
            format!("--virtual_losses={}", self.virtual_losses),
        ]
    }

    /// Executable followed by its flags, space-joined.
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.display().to_string())
            .chain(self.args())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
