//! Mock fuzz runner for testing.
//!
//! Returns scripted outcomes in order and records every call together with
//! the entry point's content at the time of the call, so tests can check
//! which version of the code was exercised.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use forge_core::TestOutcome;
use parking_lot::RwLock;

use crate::error::{RunnerError, RunnerResult};
use crate::runner::FuzzRunner;

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedRun {
    pub entry: PathBuf,
    pub duration: Duration,
    /// Entry point content when the check ran (`None` if unreadable)
    pub content: Option<String>,
}

/// Mock fuzz runner for testing.
#[derive(Clone)]
pub struct MockFuzzRunner {
    available: Arc<RwLock<bool>>,
    outcomes: Arc<RwLock<Vec<TestOutcome>>>,
    outcome_index: Arc<AtomicUsize>,
    captured_runs: Arc<RwLock<Vec<CapturedRun>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockFuzzRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFuzzRunner {
    /// Create a runner that passes every check.
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            outcomes: Arc::new(RwLock::new(Vec::new())),
            outcome_index: Arc::new(AtomicUsize::new(0)),
            captured_runs: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Set whether the runner is available.
    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    /// Queue an outcome. Once the queue is used up the last outcome repeats.
    pub fn add_outcome(self, outcome: TestOutcome) -> Self {
        self.outcomes.write().push(outcome);
        self
    }

    /// Fail every check with a fixed error detail.
    pub fn always_fail(self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        *self.outcomes.write() = vec![TestOutcome::fail(detail)];
        self
    }

    /// Make every call return a runner error.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured runs.
    pub fn get_runs(&self) -> Vec<CapturedRun> {
        self.captured_runs.read().clone()
    }

    /// Get the number of checks performed.
    pub fn run_count(&self) -> usize {
        self.captured_runs.read().len()
    }

    fn next_outcome(&self) -> TestOutcome {
        let outcomes = self.outcomes.read();
        if outcomes.is_empty() {
            return TestOutcome::pass();
        }
        let index = self.outcome_index.fetch_add(1, Ordering::SeqCst);
        outcomes
            .get(index.min(outcomes.len() - 1))
            .cloned()
            .unwrap_or_else(TestOutcome::pass)
    }
}

#[async_trait]
impl FuzzRunner for MockFuzzRunner {
    async fn is_available(&self) -> bool {
        *self.available.read()
    }

    async fn run_fuzz_test(&self, entry: &Path, duration: Duration) -> RunnerResult<TestOutcome> {
        let content = tokio::fs::read_to_string(entry).await.ok();
        self.captured_runs.write().push(CapturedRun {
            entry: entry.to_path_buf(),
            duration,
            content,
        });

        if let Some(message) = self.simulate_failure.read().clone() {
            return Err(RunnerError::SpawnFailed(message));
        }
        Ok(self.next_outcome())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outcomes_in_order_then_repeat_last() {
        let runner = MockFuzzRunner::new()
            .add_outcome(TestOutcome::fail("AttributeError"))
            .add_outcome(TestOutcome::pass());
        let entry = Path::new("main.py");
        let window = Duration::from_secs(5);

        assert!(!runner.run_fuzz_test(entry, window).await.unwrap().passed);
        assert!(runner.run_fuzz_test(entry, window).await.unwrap().passed);
        assert!(runner.run_fuzz_test(entry, window).await.unwrap().passed);
        assert_eq!(runner.run_count(), 3);
    }

    #[tokio::test]
    async fn test_captures_entry_content() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("main.py");
        std::fs::write(&entry, "print('v1')").unwrap();

        let runner = MockFuzzRunner::new();
        runner.run_fuzz_test(&entry, Duration::from_secs(1)).await.unwrap();

        let runs = runner.get_runs();
        assert_eq!(runs[0].content.as_deref(), Some("print('v1')"));
        assert_eq!(runs[0].duration, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unavailable() {
        let runner = MockFuzzRunner::new().set_available(false);
        assert!(!runner.is_available().await);
    }
}
