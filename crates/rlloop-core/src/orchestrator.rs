//! Self-play launch orchestration for one loop iteration.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::config::LoopConfig;
use crate::error::{LoopError, Result};
use crate::job::SelfplayJobSpec;
use crate::obs::{emit_selfplay_finished, emit_selfplay_started};
use crate::paths::LoopPaths;
use crate::registry::{ModelGeneration, ModelRegistry};
use crate::runner::{JobLauncher, ProcessLauncher};
use crate::stats::StatsRecorder;

/// Timer bracketing one self-play generation.
pub const SELFPLAY_TIMER: &str = "selfplay_wait";

/// A self-play generation that was produced.
#[derive(Debug, Clone)]
pub struct SelfplayOutcome {
    /// Model the games were played with.
    pub model: ModelGeneration,

    /// Command line the worker was started with.
    pub command_line: String,

    /// Worker wall-clock time.
    pub duration: Duration,
}

/// Picks the latest model and runs one self-play worker for it.
pub struct SelfplayOrchestrator {
    config: LoopConfig,
    paths: LoopPaths,
    registry: ModelRegistry,
    launcher: Arc<dyn JobLauncher>,
}

impl SelfplayOrchestrator {
    /// Orchestrator that runs the worker as a child process.
    pub fn new(config: LoopConfig) -> Self {
        let launcher = ProcessLauncher::with_timeout(
            config.selfplay_timeout_secs.map(Duration::from_secs),
        );
        Self::with_launcher(config, Arc::new(launcher))
    }

    pub fn with_launcher(config: LoopConfig, launcher: Arc<dyn JobLauncher>) -> Self {
        let paths = LoopPaths::new(config.base_dir.clone());
        let registry = ModelRegistry::new(paths.models_dir());
        Self {
            config,
            paths,
            registry,
            launcher,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn paths(&self) -> &LoopPaths {
        &self.paths
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Job that would be launched for the current latest model.
    pub fn plan(&self) -> Result<(ModelGeneration, SelfplayJobSpec)> {
        let model = self.registry.get_latest_model()?;
        let job = SelfplayJobSpec::from_config(&self.config, &self.paths, &model.name);
        Ok((model, job))
    }

    /// Run one self-play generation for the latest model.
    ///
    /// The [`SELFPLAY_TIMER`] timer is stopped whether or not the run
    /// succeeds. A non-zero worker exit is
    /// [`LoopError::ExternalProcessFailure`] and is not retried.
    pub async fn run_selfplay_once(&self, stats: &mut StatsRecorder) -> Result<SelfplayOutcome> {
        info!("Starting self play loop");
        stats.start_timer(SELFPLAY_TIMER)?;

        let result = self.launch_latest().await;

        match (result, stats.stop_timer(SELFPLAY_TIMER)) {
            (Ok(outcome), stopped) => {
                stopped?;
                Ok(outcome)
            }
            (Err(e), stopped) => {
                if let Err(stop_err) = stopped {
                    error!(error = %stop_err, "failed to record timer stop");
                }
                Err(e)
            }
        }
    }

    async fn launch_latest(&self) -> Result<SelfplayOutcome> {
        let (model, job) = self.plan()?;
        let command_line = job.command_line();

        info!("Running {}", command_line);
        emit_selfplay_started(&model.name, &command_line);

        let exit = self.launcher.launch(&job).await?;
        emit_selfplay_finished(&model.name, exit.duration.as_millis() as u64, exit.success());

        if !exit.success() {
            return Err(LoopError::ExternalProcessFailure {
                exit_code: exit.exit_code,
                command: command_line,
            });
        }

        Ok(SelfplayOutcome {
            model,
            command_line,
            duration: exit.duration,
        })
    }
}
