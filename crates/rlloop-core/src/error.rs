//! Error taxonomy for the self-play loop.

use std::path::PathBuf;

/// Errors produced while resolving models, building or running a self-play job.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("corrupt model registry entry {}: {reason}", .path.display())]
    CorruptRegistry { path: PathBuf, reason: String },

    #[error("self-play process exited with code {exit_code}: {command}")]
    ExternalProcessFailure { exit_code: i32, command: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("self-play process timed out after {timeout_secs} seconds: {command}")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for loop operations.
pub type Result<T> = std::result::Result<T, LoopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_process_failure_display() {
        let err = LoopError::ExternalProcessFailure {
            exit_code: 1,
            command: "./main --mode=selfplay".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exited with code 1"));
        assert!(msg.contains("--mode=selfplay"));
    }

    #[test]
    fn test_corrupt_registry_display() {
        let err = LoopError::CorruptRegistry {
            path: PathBuf::from("/data/models/garbage.meta"),
            reason: "missing generation prefix".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "corrupt model registry entry /data/models/garbage.meta: missing generation prefix"
        );
    }

    #[test]
    fn test_configuration_error_display() {
        let err = LoopError::Configuration("base_dir is required".to_string());
        assert_eq!(err.to_string(), "configuration error: base_dir is required");
    }
}
