//! rlloop core library
//!
//! One iteration of a self-play reinforcement-learning loop:
//! - Resolves the storage layout from a base directory
//! - Finds the latest trained model generation
//! - Launches the external self-play worker for it
//! - Times the run into a statistics sink

pub mod config;
pub mod error;
pub mod job;
pub mod obs;
pub mod orchestrator;
pub mod paths;
pub mod registry;
pub mod runner;
pub mod stats;
pub mod telemetry;

pub use config::{ConfigFile, LoopConfig, DEFAULT_SELFPLAY_EXECUTABLE};
pub use error::{LoopError, Result};
pub use job::{SelfplayJobSpec, VIRTUAL_LOSSES};
pub use obs::{emit_flag_computed, LoopSpan};
pub use orchestrator::{SelfplayOrchestrator, SelfplayOutcome, SELFPLAY_TIMER};
pub use paths::{GenerationPaths, LoopPaths};
pub use registry::{ModelGeneration, ModelRegistry, BOOTSTRAP_MODEL_NAME};
pub use runner::{JobExit, JobLauncher, ProcessLauncher};
pub use stats::{
    JsonlStatsSink, MemoryStatsSink, StatsRecorder, StatsSink, TimerEvent, TimerEventKind,
    TimerSpan,
};
pub use telemetry::init_tracing;

/// rlloop version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
