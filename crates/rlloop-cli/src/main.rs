//! rlloop - self-play stage of the reinforcement-learning loop
//!
//! ## Commands
//!
//! - `selfplay`: Run one self-play generation with the latest model
//! - `flags`: Show the computed storage directories
//! - `models`: List model generations in order
//! - `latest`: Show the model self-play would use

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};

use rlloop_core::{
    emit_flag_computed, ConfigFile, LoopConfig, LoopSpan, SelfplayOrchestrator, SelfplayOutcome,
    StatsRecorder,
};

#[derive(Parser)]
#[command(name = "rlloop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Self-play launcher for a reinforcement-learning loop", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Also write debug logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "RLLOOP_CONFIG")]
    config: Option<PathBuf>,

    /// Base storage directory (overrides the config file)
    #[arg(long, global = true, env = "RLLOOP_BASE_DIR")]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one self-play generation with the latest model
    Selfplay {
        /// Random seed for this loop run
        #[arg(allow_negative_numbers = true)]
        seed: i64,

        /// Loop iteration index
        #[arg(allow_negative_numbers = true)]
        iteration: i64,
    },

    /// Show the computed storage directories
    Flags,

    /// List model generations, oldest first
    Models,

    /// Show the model the next self-play run would use
    Latest,
}

fn load_config(cli: &Cli) -> Result<LoopConfig> {
    let file = match &cli.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let overrides = ConfigFile {
        base_dir: cli.base_dir.clone(),
        ..Default::default()
    };
    let config = LoopConfig::from_file(file.merge(overrides))?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    rlloop_core::init_tracing(cli.json, level, cli.log_file.as_deref())
        .context("Failed to open log file")?;

    let config = load_config(&cli).context("Invalid configuration")?;

    match cli.command {
        Commands::Selfplay { seed, iteration } => cmd_selfplay(config, seed, iteration).await,
        Commands::Flags => cmd_flags(config),
        Commands::Models => cmd_models(config),
        Commands::Latest => cmd_latest(config),
    }
}

async fn cmd_selfplay(config: LoopConfig, seed: i64, iteration: i64) -> Result<()> {
    let _span = LoopSpan::enter(seed, iteration);
    let orchestrator = SelfplayOrchestrator::new(config);

    let stats_dir = orchestrator.paths().stats_dir();
    let mut stats = StatsRecorder::open(&stats_dir)
        .with_context(|| format!("Failed to open stats sink at {}", stats_dir.display()))?;

    let result = orchestrator.run_selfplay_once(&mut stats).await;
    let outcome = settle_selfplay(result, stats.close())?;
    info!(
        model = %outcome.model,
        duration_secs = outcome.duration.as_secs_f64(),
        "Self-play generation complete"
    );
    Ok(())
}

/// Combine the run result with the stats close result. A failed run wins
/// over a failed close.
fn settle_selfplay(
    result: rlloop_core::Result<SelfplayOutcome>,
    closed: rlloop_core::Result<()>,
) -> Result<SelfplayOutcome> {
    match (result, closed) {
        (Ok(outcome), closed) => {
            closed.context("Failed to close stats sink")?;
            Ok(outcome)
        }
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                error!(error = %close_err, "failed to close stats sink");
            }
            Err(e).context("Self-play failed")
        }
    }
}

fn cmd_flags(config: LoopConfig) -> Result<()> {
    let orchestrator = SelfplayOrchestrator::new(config);
    println!("Computed variables are:");
    for (flag, value) in orchestrator.paths().flags() {
        emit_flag_computed(flag, &value);
        println!("--{}={}", flag, value.display());
    }
    Ok(())
}

fn cmd_models(config: LoopConfig) -> Result<()> {
    let orchestrator = SelfplayOrchestrator::new(config);
    let models = orchestrator
        .registry()
        .list_models()
        .context("Failed to scan models directory")?;
    if models.is_empty() {
        println!("No models in {}", orchestrator.registry().models_dir().display());
    }
    for model in models {
        println!("{:>6}  {}", model.number, model.name);
    }
    Ok(())
}

fn cmd_latest(config: LoopConfig) -> Result<()> {
    let orchestrator = SelfplayOrchestrator::new(config);
    let (model, job) = orchestrator
        .plan()
        .context("Failed to resolve latest model")?;
    println!("{:>6}  {}", model.number, model.name);
    println!("{}", job.command_line());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rlloop_core::LoopError;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn selfplay_takes_seed_and_iteration() {
        let cli = Cli::try_parse_from(["rlloop", "--base-dir", "/data", "selfplay", "7", "3"])
            .expect("parse failed");
        match cli.command {
            Commands::Selfplay { seed, iteration } => {
                assert_eq!(seed, 7);
                assert_eq!(iteration, 3);
            }
            _ => panic!("expected selfplay"),
        }
        assert_eq!(cli.base_dir, Some(PathBuf::from("/data")));
    }

    #[test]
    fn selfplay_accepts_negative_seed() {
        let cli = Cli::try_parse_from(["rlloop", "--base-dir", "/data", "selfplay", "-5", "-1"])
            .expect("parse failed");
        match cli.command {
            Commands::Selfplay { seed, iteration } => {
                assert_eq!(seed, -5);
                assert_eq!(iteration, -1);
            }
            _ => panic!("expected selfplay"),
        }
    }

    fn sample_outcome() -> SelfplayOutcome {
        SelfplayOutcome {
            model: rlloop_core::ModelGeneration::bootstrap(),
            command_line: "./main --mode=selfplay".to_string(),
            duration: std::time::Duration::from_secs(1),
        }
    }

    fn close_failure() -> rlloop_core::Result<()> {
        Err(std::io::Error::other("flush failed").into())
    }

    #[test]
    fn run_failure_wins_over_close_failure() {
        let run = Err(LoopError::ExternalProcessFailure {
            exit_code: 1,
            command: "./main --mode=selfplay".to_string(),
        });
        let err = settle_selfplay(run, close_failure()).unwrap_err();
        match err.downcast_ref::<LoopError>() {
            Some(LoopError::ExternalProcessFailure { exit_code, .. }) => assert_eq!(*exit_code, 1),
            other => panic!("expected ExternalProcessFailure, got {other:?}"),
        }
    }

    #[test]
    fn close_failure_after_success_is_reported() {
        let err = settle_selfplay(Ok(sample_outcome()), close_failure()).unwrap_err();
        assert!(matches!(err.downcast_ref::<LoopError>(), Some(LoopError::Io(_))));
        assert!(err.to_string().contains("Failed to close stats sink"));
    }

    #[test]
    fn clean_run_settles_ok() {
        let outcome = settle_selfplay(Ok(sample_outcome()), Ok(())).unwrap();
        assert_eq!(outcome.model.name, "000000-bootstrap");
    }

    #[test]
    fn selfplay_rejects_non_numeric_seed() {
        assert!(Cli::try_parse_from(["rlloop", "selfplay", "abc", "3"]).is_err());
    }

    #[test]
    fn base_dir_flag_overrides_config_file() {
        let cli = Cli::try_parse_from(["rlloop", "--base-dir", "/cli", "flags"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.base_dir, PathBuf::from("/cli"));
    }
}
