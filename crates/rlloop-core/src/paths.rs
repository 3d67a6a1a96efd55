//! Storage layout derived from a single base directory.
//!
//! Every location the loop touches hangs off the base directory at a fixed
//! relative path. Generation-scoped locations add the model name as the last
//! component, so distinct model names never share an output directory.

use std::path::{Path, PathBuf};

/// Fixed storage roles under one base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopPaths {
    base_dir: PathBuf,
}

/// Output locations for one model generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenerationPaths {
    pub selfplay_output_dir: PathBuf,
    pub holdout_dir: PathBuf,
    pub sgf_dir: PathBuf,
}

impl LoopPaths {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn models_dir(&self) -> PathBuf {
        self.base_dir.join("models")
    }

    pub fn selfplay_dir(&self) -> PathBuf {
        self.base_dir.join("data").join("selfplay")
    }

    pub fn bury_models_dir(&self) -> PathBuf {
        self.base_dir.join("bury_models")
    }

    pub fn holdout_dir(&self) -> PathBuf {
        self.base_dir.join("data").join("holdout")
    }

    pub fn sgf_dir(&self) -> PathBuf {
        self.base_dir.join("sgf")
    }

    pub fn training_chunks_dir(&self) -> PathBuf {
        self.base_dir.join("data").join("training_chunks")
    }

    pub fn estimator_working_dir(&self) -> PathBuf {
        self.base_dir.join("estimator_working_dir")
    }

    /// Root of the timing statistics sink.
    pub fn stats_dir(&self) -> PathBuf {
        self.base_dir.join("stats")
    }

    /// Model path handed to the self-play worker (no extension).
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.models_dir().join(model_name)
    }

    /// Output, holdout and SGF directories for `model_name`.
    pub fn generation(&self, model_name: &str) -> GenerationPaths {
        GenerationPaths {
            selfplay_output_dir: self.selfplay_dir().join(model_name),
            holdout_dir: self.holdout_dir().join(model_name),
            sgf_dir: self.sgf_dir().join(model_name),
        }
    }

    /// Computed directories as ordered `(flag, value)` pairs.
    pub fn flags(&self) -> Vec<(&'static str, PathBuf)> {
        vec![
            ("BASE_DIR", self.base_dir.clone()),
            ("MODELS_DIR", self.models_dir()),
            ("SELFPLAY_DIR", self.selfplay_dir()),
            ("HOLDOUT_DIR", self.holdout_dir()),
            ("SGF_DIR", self.sgf_dir()),
            ("TRAINING_CHUNK_DIR", self.training_chunks_dir()),
            ("ESTIMATOR_WORKING_DIR", self.estimator_working_dir()),
        ]
    }
}
