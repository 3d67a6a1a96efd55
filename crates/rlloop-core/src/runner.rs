//! External self-play process execution.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{LoopError, Result};
use crate::job::SelfplayJobSpec;

/// Outcome of a worker process that ran to completion.
#[derive(Debug, Clone)]
pub struct JobExit {
    /// Exit code (0 = success, -1 if terminated by a signal).
    pub exit_code: i32,

    /// Wall-clock time from spawn to exit.
    pub duration: Duration,
}

impl JobExit {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Launches a self-play job and waits for it.
#[async_trait]
pub trait JobLauncher: Send + Sync {
    /// Run `job` to completion. A non-zero exit is reported in [`JobExit`],
    /// not as an error.
    async fn launch(&self, job: &SelfplayJobSpec) -> Result<JobExit>;
}

/// Runs the job as a child process with inherited stdio.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    timeout: Option<Duration>,
}

impl ProcessLauncher {
    /// Block until the child exits, however long it takes.
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Kill the child if it has not exited after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl JobLauncher for ProcessLauncher {
    async fn launch(&self, job: &SelfplayJobSpec) -> Result<JobExit> {
        let start = Instant::now();
        let command_line = job.command_line();

        let mut child = Command::new(&job.executable)
            .args(job.args())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LoopError::Spawn {
                command: command_line.clone(),
                source,
            })?;
        debug!(pid = ?child.id(), "self-play process spawned");

        let status = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(
                        timeout_secs = timeout.as_secs(),
                        "self-play process timed out, killing"
                    );
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "failed to kill timed out self-play process");
                    }
                    return Err(LoopError::Timeout {
                        command: command_line,
                        timeout_secs: timeout.as_secs(),
                    });
                }
            },
            None => child.wait().await?,
        };

        Ok(JobExit {
            exit_code: status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::LoopConfig;
    use crate::paths::LoopPaths;
    use std::path::PathBuf;

    fn job_with(executable: &str) -> SelfplayJobSpec {
        let mut config = LoopConfig::new("/data");
        config.selfplay_executable = PathBuf::from(executable);
        SelfplayJobSpec::from_config(&config, &LoopPaths::new("/data"), "000001-test")
    }

    #[test]
    fn test_job_exit_success() {
        let exit = JobExit {
            exit_code: 0,
            duration: Duration::from_millis(5),
        };
        assert!(exit.success());
        let exit = JobExit {
            exit_code: 1,
            duration: Duration::from_millis(5),
        };
        assert!(!exit.success());
    }

    #[tokio::test]
    async fn test_launch_succeeding_command() {
        let exit = ProcessLauncher::new()
            .launch(&job_with("true"))
            .await
            .expect("launch failed");
        assert!(exit.success());
    }

    #[tokio::test]
    async fn test_launch_failing_command() {
        let exit = ProcessLauncher::new()
            .launch(&job_with("false"))
            .await
            .expect("launch failed");
        assert!(!exit.success());
        assert_eq!(exit.exit_code, 1);
    }

    #[tokio::test]
    async fn test_launch_missing_executable() {
        let err = ProcessLauncher::new()
            .launch(&job_with("/nonexistent/selfplay-worker"))
            .await
            .unwrap_err();
        match err {
            LoopError::Spawn { command, .. } => {
                assert!(command.starts_with("/nonexistent/selfplay-worker --mode=selfplay"));
            }
            other => panic!("expected Spawn, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_launch_timeout_kills_worker() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("hung-selfplay");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let start = Instant::now();
        let err = ProcessLauncher::with_timeout(Some(Duration::from_secs(1)))
            .launch(&job_with(script.to_str().unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, LoopError::Timeout { timeout_secs: 1, .. }));
        assert!(start.elapsed() < Duration::from_secs(30));
    }
}
