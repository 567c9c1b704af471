//! Self-healing test stage.
//!
//! Turns a freshly produced file set into the best version the repair
//! operations can reach within fixed bounds:
//!
//! ```text
//! Materialized ──► DynamicTesting ──┐
//!        │                          ├──► StaticReviewing ──► Done
//!        └───────► Skipped ─────────┘
//! ```
//!
//! - **Materialized**: every file is written to the work directory.
//! - **DynamicTesting**: the entry point is fuzz tested; each crash is
//!   repaired from the on-disk code and the check repeats, up to
//!   `max_attempts` checks. Exhaustion is not an error.
//! - **Skipped**: no entry point was produced, or no runner is available.
//! - **StaticReviewing**: the entry point and the logic file are reviewed
//!   once each, in that order; a failing verdict gets exactly one fix.
//!
//! Repaired code is always sanitized before it replaces a file, and each
//! repair is written to disk and to the in-memory set. Any operation or
//! fuzz runner failure aborts the stage.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use forge_agents::AgentOperations;
use forge_core::{CodeSanitizer, NullProgress, ProgressSink, ProjectFileSet};
use forge_runner::FuzzRunner;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::persistence::{write_files, write_project_file};

/// Bounds and file roles for the stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealingConfig {
    /// File the fuzz runner launches
    pub entry_point: String,
    /// Second file under static review
    pub logic_file: String,
    /// Fuzz checks per run
    pub max_attempts: u32,
    pub fuzz_duration: Duration,
}

impl Default for HealingConfig {
    fn default() -> Self {
        Self {
            entry_point: "main.py".to_string(),
            logic_file: "logic.py".to_string(),
            max_attempts: 3,
            fuzz_duration: Duration::from_secs(5),
        }
    }
}

/// States the stage passes through, recorded in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealingPhase {
    Materialized,
    DynamicTesting,
    Skipped,
    StaticReviewing,
    Done,
}

/// How the dynamic-safety loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DynamicResult {
    /// Not run yet
    Pending,
    /// The check passed on this attempt
    Passed { attempt: u32 },
    /// Every attempt crashed
    Exhausted,
    /// The loop never ran
    Skipped { reason: String },
}

/// One fuzz check and the repair that followed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicAttempt {
    pub attempt: u32,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub repaired: bool,
}

/// Static review of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub filename: String,
    pub verdict: String,
    pub failed: bool,
    pub repaired: bool,
}

/// What the stage did and the files it ended with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingReport {
    #[serde(skip)]
    pub files: ProjectFileSet,
    pub phases: Vec<HealingPhase>,
    pub dynamic: DynamicResult,
    pub attempts: Vec<DynamicAttempt>,
    pub reviews: Vec<ReviewRecord>,
}

impl HealingReport {
    pub fn new(files: ProjectFileSet) -> Self {
        Self {
            files,
            phases: Vec::new(),
            dynamic: DynamicResult::Pending,
            attempts: Vec::new(),
            reviews: Vec::new(),
        }
    }

    pub fn dynamic_passed(&self) -> bool {
        matches!(self.dynamic, DynamicResult::Passed { .. })
    }

    pub fn dynamic_skipped(&self) -> bool {
        matches!(self.dynamic, DynamicResult::Skipped { .. })
    }

    /// Number of fuzz checks that ran.
    pub fn fuzz_runs(&self) -> usize {
        self.attempts.len()
    }

    /// Runtime and logic repairs applied.
    pub fn repairs(&self) -> usize {
        self.attempts.iter().filter(|a| a.repaired).count()
            + self.reviews.iter().filter(|r| r.repaired).count()
    }
}

/// Runs materialization, the dynamic-safety loop and the static review.
pub struct SelfHealingStage {
    agents: Arc<dyn AgentOperations>,
    runner: Arc<dyn FuzzRunner>,
    progress: Arc<dyn ProgressSink>,
    config: HealingConfig,
    sanitizer: CodeSanitizer,
}

impl SelfHealingStage {
    pub fn new(agents: Arc<dyn AgentOperations>, runner: Arc<dyn FuzzRunner>, config: HealingConfig) -> Self {
        Self {
            agents,
            runner,
            progress: Arc::new(NullProgress),
            config,
            sanitizer: CodeSanitizer::default(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: CodeSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn config(&self) -> &HealingConfig {
        &self.config
    }

    /// Run every phase over `files`, using `work_dir` as the on-disk copy.
    pub async fn run(&self, files: ProjectFileSet, work_dir: &Path) -> PipelineResult<HealingReport> {
        let mut report = HealingReport::new(files);

        self.progress
            .notify(&format!("[Test] Writing {} file(s) for testing...", report.files.len()));
        self.materialize(&report.files, work_dir).await?;
        report.phases.push(HealingPhase::Materialized);

        match self.skip_reason(&report.files).await {
            Some(reason) => {
                warn!("Skipping runtime checks: {}", reason);
                self.progress
                    .notify(&format!("[Test] Skipping runtime checks: {}", reason));
                report.phases.push(HealingPhase::Skipped);
                report.dynamic = DynamicResult::Skipped { reason };
            }
            None => {
                report.phases.push(HealingPhase::DynamicTesting);
                let result = self.dynamic_loop(&mut report, work_dir).await?;
                report.dynamic = result;
            }
        }

        report.phases.push(HealingPhase::StaticReviewing);
        self.static_review(&mut report, work_dir).await?;

        report.phases.push(HealingPhase::Done);
        info!(
            "Self-healing finished: {} fuzz run(s), {} repair(s)",
            report.fuzz_runs(),
            report.repairs()
        );
        Ok(report)
    }

    async fn materialize(&self, files: &ProjectFileSet, work_dir: &Path) -> PipelineResult<()> {
        write_files(work_dir, files).await?;
        debug!("Materialized {} file(s) in {}", files.len(), work_dir.display());
        Ok(())
    }

    async fn skip_reason(&self, files: &ProjectFileSet) -> Option<String> {
        if !files.contains(&self.config.entry_point) {
            return Some(format!("{} was not produced", self.config.entry_point));
        }
        if !self.runner.is_available().await {
            return Some("fuzz runner is not available".to_string());
        }
        None
    }

    async fn dynamic_loop(&self, report: &mut HealingReport, work_dir: &Path) -> PipelineResult<DynamicResult> {
        let entry = self.config.entry_point.as_str();
        let entry_path = work_dir.join(entry);
        let max = self.config.max_attempts;

        for attempt in 1..=max {
            self.progress.notify(&format!(
                "[Test] Fuzz testing {} (attempt {}/{})...",
                entry, attempt, max
            ));

            let outcome = self
                .runner
                .run_fuzz_test(&entry_path, self.config.fuzz_duration)
                .await?;

            if outcome.passed {
                info!("{} passed the fuzz test on attempt {}", entry, attempt);
                self.progress
                    .notify(&format!("[Test] {} survived the fuzz test", entry));
                report.attempts.push(DynamicAttempt {
                    attempt,
                    passed: true,
                    error_detail: None,
                    repaired: false,
                });
                return Ok(DynamicResult::Passed { attempt });
            }

            let detail = outcome.error_text().to_string();
            warn!("{} crashed on attempt {}", entry, attempt);
            self.progress
                .notify("[Test] Crash detected, requesting a runtime fix...");

            let code = tokio::fs::read_to_string(&entry_path)
                .await
                .map_err(|e| PipelineError::read(&entry_path, e))?;
            let raw = self.agents.fix_runtime(&code, &detail).await?;
            let fixed = self.sanitizer.clean_repair(&raw);

            write_project_file(work_dir, entry, &fixed).await?;
            report.files.replace(entry, fixed)?;
            report.attempts.push(DynamicAttempt {
                attempt,
                passed: false,
                error_detail: Some(detail),
                repaired: true,
            });
        }

        warn!("{} still crashes after {} attempt(s)", entry, max);
        self.progress
            .notify("[Test] Runtime fixes exhausted, continuing with logic review");
        Ok(DynamicResult::Exhausted)
    }

    async fn static_review(&self, report: &mut HealingReport, work_dir: &Path) -> PipelineResult<()> {
        let mut targets = vec![self.config.entry_point.as_str(), self.config.logic_file.as_str()];
        targets.dedup();

        for filename in targets {
            let code = match report.files.get(filename) {
                Some(code) => code.to_string(),
                None => {
                    debug!("{} not in project, skipping review", filename);
                    continue;
                }
            };

            self.progress
                .notify(&format!("[Review] Reviewing {} logic...", filename));
            let verdict = self.agents.review_logic(&code).await?;
            let failed = verdict.is_fail();

            if failed {
                self.progress
                    .notify(&format!("[Review] Logic issues in {}, applying fix...", filename));
                let raw = self.agents.fix_logic(&code, verdict.as_str()).await?;
                let fixed = self.sanitizer.clean_repair(&raw);
                write_project_file(work_dir, filename, &fixed).await?;
                report.files.replace(filename, fixed)?;
            }

            report.reviews.push(ReviewRecord {
                filename: filename.to_string(),
                verdict: verdict.as_str().to_string(),
                failed,
                repaired: failed,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_agents::{MockAgents, OperationKind};
    use forge_core::TestOutcome;
    use forge_runner::MockFuzzRunner;
    use tempfile::TempDir;

    fn files(entries: &[(&str, &str)]) -> ProjectFileSet {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_phase_trace_on_first_pass() {
        let temp = TempDir::new().unwrap();
        let agents = MockAgents::new();
        let runner = MockFuzzRunner::new();
        let stage = SelfHealingStage::new(Arc::new(agents.clone()), Arc::new(runner.clone()), HealingConfig::default());

        let report = stage
            .run(files(&[("main.py", "import arcade")]), temp.path())
            .await
            .unwrap();

        assert_eq!(
            report.phases,
            vec![
                HealingPhase::Materialized,
                HealingPhase::DynamicTesting,
                HealingPhase::StaticReviewing,
                HealingPhase::Done,
            ]
        );
        assert_eq!(report.dynamic, DynamicResult::Passed { attempt: 1 });
        assert_eq!(agents.call_count(OperationKind::FixRuntime), 0);
        assert_eq!(runner.run_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_runner_skips_dynamic_loop() {
        let temp = TempDir::new().unwrap();
        let agents = MockAgents::new();
        let runner = MockFuzzRunner::new().set_available(false);
        let stage = SelfHealingStage::new(Arc::new(agents.clone()), Arc::new(runner.clone()), HealingConfig::default());

        let report = stage
            .run(files(&[("main.py", "import arcade")]), temp.path())
            .await
            .unwrap();

        assert!(report.dynamic_skipped());
        assert!(report.phases.contains(&HealingPhase::Skipped));
        assert_eq!(runner.run_count(), 0);
        assert_eq!(agents.call_count(OperationKind::ReviewLogic), 1);
    }

    #[tokio::test]
    async fn test_runner_error_aborts_stage() {
        let temp = TempDir::new().unwrap();
        let agents = MockAgents::new();
        let runner = MockFuzzRunner::new().simulate_failure("harness crashed");
        let stage = SelfHealingStage::new(Arc::new(agents.clone()), Arc::new(runner.clone()), HealingConfig::default());

        let result = stage
            .run(files(&[("main.py", "import arcade")]), temp.path())
            .await;

        assert!(matches!(result, Err(PipelineError::Runner(_))));
        assert_eq!(runner.run_count(), 1);
        assert_eq!(agents.call_count(OperationKind::FixRuntime), 0);
        assert_eq!(agents.call_count(OperationKind::ReviewLogic), 0);
    }

    #[tokio::test]
    async fn test_zero_attempts_exhausts_without_checks() {
        let temp = TempDir::new().unwrap();
        let runner = MockFuzzRunner::new().add_outcome(TestOutcome::fail("boom"));
        let config = HealingConfig {
            max_attempts: 0,
            ..HealingConfig::default()
        };
        let stage = SelfHealingStage::new(Arc::new(MockAgents::new()), Arc::new(runner.clone()), config);

        let report = stage
            .run(files(&[("main.py", "import arcade")]), temp.path())
            .await
            .unwrap();

        assert_eq!(report.dynamic, DynamicResult::Exhausted);
        assert_eq!(runner.run_count(), 0);
    }

    #[tokio::test]
    async fn test_same_entry_and_logic_file_reviewed_once() {
        let temp = TempDir::new().unwrap();
        let agents = MockAgents::new();
        let config = HealingConfig {
            entry_point: "game.py".to_string(),
            logic_file: "game.py".to_string(),
            ..HealingConfig::default()
        };
        let stage = SelfHealingStage::new(Arc::new(agents.clone()), Arc::new(MockFuzzRunner::new()), config);

        let report = stage
            .run(files(&[("game.py", "import arcade")]), temp.path())
            .await
            .unwrap();

        assert_eq!(report.reviews.len(), 1);
        assert_eq!(agents.call_count(OperationKind::ReviewLogic), 1);
    }

    #[tokio::test]
    async fn test_invalid_filename_is_fatal() {
        let temp = TempDir::new().unwrap();
        let stage = SelfHealingStage::new(
            Arc::new(MockAgents::new()),
            Arc::new(MockFuzzRunner::new()),
            HealingConfig::default(),
        );

        let result = stage
            .run(files(&[("../escape.py", "x = 1")]), temp.path())
            .await;
        assert!(matches!(result, Err(PipelineError::Core(_))));
    }

    #[test]
    fn test_report_serializes_without_files() {
        let mut report = HealingReport::new(files(&[("main.py", "secret source")]));
        report.dynamic = DynamicResult::Skipped {
            reason: "main.py was not produced".to_string(),
        };
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["dynamic"]["status"], "skipped");
        assert!(!json.to_string().contains("secret source"));
    }
}
