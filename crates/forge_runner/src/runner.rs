//! Fuzz runner trait and the process-backed implementation.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use forge_core::TestOutcome;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::error::{RunnerError, RunnerResult};

/// Longest stderr tail handed back as error detail.
const MAX_ERROR_DETAIL: usize = 4000;

/// Grace period for draining stderr after the process is gone.
const STDERR_GRACE: Duration = Duration::from_secs(2);

/// Dynamic-safety check for a generated program.
///
/// Implementations run the entry point for a bounded time and report whether
/// it survived. They must not modify the file.
#[async_trait]
pub trait FuzzRunner: Send + Sync {
    /// Check if the runtime needed to execute games is present.
    async fn is_available(&self) -> bool;

    /// Run `entry` for at most `duration` and judge the result.
    async fn run_fuzz_test(&self, entry: &Path, duration: Duration) -> RunnerResult<TestOutcome>;
}

/// Runs the game as a child process with headless drivers.
///
/// - exits non-zero before the deadline: fail, stderr as detail
/// - exits zero before the deadline: pass
/// - still running at the deadline: killed, then pass unless stderr
///   carries a crash marker
#[derive(Debug, Clone, Default)]
pub struct ProcessFuzzRunner {
    config: RunnerConfig,
}

impl ProcessFuzzRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    fn command(&self, entry: &Path) -> RunnerResult<Command> {
        let file_name = entry
            .file_name()
            .ok_or_else(|| RunnerError::EntryPointNotFound(entry.to_path_buf()))?;
        let work_dir = entry
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut cmd = Command::new(&self.config.interpreter);
        cmd.args(&self.config.args)
            .arg(file_name)
            .current_dir(work_dir)
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }
}

#[async_trait]
impl FuzzRunner for ProcessFuzzRunner {
    async fn is_available(&self) -> bool {
        let status = Command::new(&self.config.interpreter)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(_) => true,
            Err(e) => {
                warn!("Interpreter '{}' not available: {}", self.config.interpreter, e);
                false
            }
        }
    }

    async fn run_fuzz_test(&self, entry: &Path, duration: Duration) -> RunnerResult<TestOutcome> {
        if !entry.is_file() {
            return Err(RunnerError::EntryPointNotFound(entry.to_path_buf()));
        }

        info!("Running {} for {:?}", entry.display(), duration);
        let mut child = self.command(entry)?.spawn().map_err(|e| {
            RunnerError::SpawnFailed(format!("{}: {}", self.config.interpreter, e))
        })?;

        let stderr = child.stderr.take();
        let reader: JoinHandle<String> = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut pipe) = stderr {
                let mut bytes = Vec::new();
                if pipe.read_to_end(&mut bytes).await.is_ok() {
                    buf = String::from_utf8_lossy(&bytes).into_owned();
                }
            }
            buf
        });

        match tokio::time::timeout(duration, child.wait()).await {
            Ok(status) => {
                let status = status?;
                let stderr = drain(reader).await;
                debug!("Game exited early with {}", status);
                Ok(judge_exit(status, &stderr))
            }
            Err(_) => {
                // Survived the window; stop it and look for a logged crash.
                if let Err(e) = child.kill().await {
                    warn!("Failed to stop game process: {}", e);
                }
                let stderr = drain(reader).await;
                if self.config.is_crash(&stderr) {
                    Ok(TestOutcome::fail(tail(&stderr)))
                } else {
                    Ok(TestOutcome::pass())
                }
            }
        }
    }
}

async fn drain(reader: JoinHandle<String>) -> String {
    match tokio::time::timeout(STDERR_GRACE, reader).await {
        Ok(Ok(text)) => text,
        _ => String::new(),
    }
}

fn judge_exit(status: ExitStatus, stderr: &str) -> TestOutcome {
    if status.success() {
        return TestOutcome::pass();
    }
    if stderr.trim().is_empty() {
        TestOutcome::fail(format!("Process exited with {}", status))
    } else {
        TestOutcome::fail(tail(stderr))
    }
}

// Keep the end of the log; tracebacks put the actual error last.
fn tail(text: &str) -> String {
    let text = text.trim();
    if text.len() <= MAX_ERROR_DETAIL {
        return text.to_string();
    }
    let mut start = text.len() - MAX_ERROR_DETAIL;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
