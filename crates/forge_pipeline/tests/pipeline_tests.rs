//! End-to-end tests for `GamePipeline` with scripted operations.

use std::sync::Arc;

use forge_agents::{AgentError, AgentFactory, AgentOperations, AgentResult, MockAgents, OperationKind};
use forge_core::{FileSkeleton, GenerationRequest, Provider, RecordingProgress, TechnicalPlan, TestOutcome};
use forge_pipeline::{
    GamePipeline, GenerationStatus, ModeSetting, PipelineConfig, RunManifest, MANIFEST_FILE,
};
use forge_runner::MockFuzzRunner;
use parking_lot::Mutex;
use tempfile::TempDir;

/// Hands out the same scripted operations for every request.
struct ScriptedFactory {
    agents: MockAgents,
    requests: Mutex<Vec<(Provider, Option<String>)>>,
}

impl ScriptedFactory {
    fn new(agents: MockAgents) -> Self {
        Self {
            agents,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl AgentFactory for ScriptedFactory {
    fn agents_for(&self, provider: Provider, model: Option<&str>) -> AgentResult<Arc<dyn AgentOperations>> {
        self.requests.lock().push((provider, model.map(str::to_string)));
        Ok(Arc::new(self.agents.clone()))
    }
}

struct UnconfiguredFactory;

impl AgentFactory for UnconfiguredFactory {
    fn agents_for(&self, provider: Provider, _model: Option<&str>) -> AgentResult<Arc<dyn AgentOperations>> {
        Err(AgentError::LlmUnavailable(provider.to_string()))
    }
}

fn two_file_plan() -> TechnicalPlan {
    TechnicalPlan {
        architecture: "Window subclass drives a Board model".to_string(),
        files: vec![
            FileSkeleton {
                filename: "logic.py".to_string(),
                purpose: "board rules".to_string(),
                skeleton_code: "class Board: ...".to_string(),
            },
            FileSkeleton {
                filename: "main.py".to_string(),
                purpose: "entry point".to_string(),
                skeleton_code: "def main(): ...".to_string(),
            },
        ],
        constraints: vec!["Use arcade 2.6 APIs only".to_string()],
    }
}

fn config_in(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        output_dir: dir.path().to_path_buf(),
        ..PipelineConfig::default()
    }
}

#[tokio::test]
async fn test_full_run_writes_files_and_manifest() {
    let temp = TempDir::new().unwrap();
    let agents = MockAgents::new()
        .with_plan(&two_file_plan())
        .reply(OperationKind::DesignAssets, "Assets:\n{\"background_color\": [0, 0, 0]}")
        .reply(OperationKind::ImplementFile, "```python\nclass Board:\n    pass\n```")
        .reply(OperationKind::ImplementFile, "```python\nimport arcade\nimport logic\n```");
    let factory = Arc::new(ScriptedFactory::new(agents.clone()));
    let runner = MockFuzzRunner::new()
        .add_outcome(TestOutcome::fail("ModuleNotFoundError: No module named 'logc'"))
        .add_outcome(TestOutcome::pass());
    let progress = RecordingProgress::new();

    let pipeline = GamePipeline::new(factory.clone(), Arc::new(runner.clone()), config_in(&temp))
        .with_progress(Arc::new(progress.clone()));
    let request = GenerationRequest::new("Tetris with bombs", Provider::Anthropic).with_model("claude-test");

    let outcome = pipeline.generate(&request).await;

    assert_eq!(outcome.status, GenerationStatus::Success);
    let path = outcome.path.clone().unwrap();
    assert!(path.starts_with(temp.path()));
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("tetris-with-bombs-"));
    assert_eq!(outcome.files, vec!["logic.py", "main.py"]);

    assert_eq!(std::fs::read_to_string(path.join("logic.py")).unwrap(), "class Board:\n    pass");
    assert!(path.join(MANIFEST_FILE).exists());

    let manifest = RunManifest::load(&path).await.unwrap();
    assert_eq!(manifest.request, request);
    assert_eq!(manifest.mode, "multi");
    assert_eq!(manifest.healing.fuzz_runs(), 2);

    assert_eq!(
        factory.requests.lock().as_slice(),
        &[(Provider::Anthropic, Some("claude-test".to_string()))]
    );
    assert_eq!(
        agents.call_sequence(),
        vec![
            OperationKind::Analyze,
            OperationKind::Draft,
            OperationKind::Critique,
            OperationKind::Draft,
            OperationKind::Critique,
            OperationKind::DesignAssets,
            OperationKind::Plan,
            OperationKind::ImplementFile,
            OperationKind::ImplementFile,
            OperationKind::FixRuntime,
            OperationKind::ReviewLogic,
            OperationKind::ReviewLogic,
        ]
    );

    let plan_call = &agents.calls_to(OperationKind::Plan)[0];
    assert_eq!(plan_call.inputs[1], "{\"background_color\": [0, 0, 0]}");
    assert!(progress.contains("Done! Game saved at"));
}

#[tokio::test]
async fn test_asset_failure_is_not_fatal() {
    let temp = TempDir::new().unwrap();
    let agents = MockAgents::new()
        .with_plan(&two_file_plan())
        .fail(OperationKind::DesignAssets, "quota exceeded");
    let pipeline = GamePipeline::new(
        Arc::new(ScriptedFactory::new(agents.clone())),
        Arc::new(MockFuzzRunner::new()),
        config_in(&temp),
    );

    let outcome = pipeline
        .generate(&GenerationRequest::new("pong", Provider::OpenAi))
        .await;

    assert!(outcome.is_success());
    assert_eq!(agents.calls_to(OperationKind::Plan)[0].inputs[1], "{}");
}

#[tokio::test]
async fn test_single_file_mode() {
    let temp = TempDir::new().unwrap();
    let agents = MockAgents::new()
        .with_plan(&two_file_plan())
        .reply(OperationKind::ImplementConsolidated, "```python\nimport arcade\narcade.run()\n```");
    let runner = MockFuzzRunner::new();
    let config = PipelineConfig {
        mode: ModeSetting::Single,
        ..config_in(&temp)
    };
    let pipeline = GamePipeline::new(
        Arc::new(ScriptedFactory::new(agents.clone())),
        Arc::new(runner.clone()),
        config,
    );

    let outcome = pipeline
        .generate(&GenerationRequest::new("breakout", Provider::Ollama))
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.files, vec!["game.py"]);
    assert_eq!(runner.run_count(), 1);
    assert!(runner.get_runs()[0].entry.ends_with("game.py"));
    assert_eq!(agents.call_count(OperationKind::ImplementFile), 0);
}

#[tokio::test]
async fn test_unusable_plan_saves_empty_run() {
    let temp = TempDir::new().unwrap();
    let agents = MockAgents::new().reply(OperationKind::Plan, "Sorry, I can't help with that.");
    let runner = MockFuzzRunner::new();
    let progress = RecordingProgress::new();
    let pipeline = GamePipeline::new(
        Arc::new(ScriptedFactory::new(agents.clone())),
        Arc::new(runner.clone()),
        config_in(&temp),
    )
    .with_progress(Arc::new(progress.clone()));

    let outcome = pipeline
        .generate(&GenerationRequest::new("chess", Provider::OpenAi))
        .await;

    assert!(outcome.is_success());
    assert!(outcome.files.is_empty());
    assert_eq!(runner.run_count(), 0);
    assert_eq!(agents.call_count(OperationKind::ReviewLogic), 0);
    assert!(progress.contains("No files were produced"));

    let manifest = RunManifest::load(&outcome.path.unwrap()).await.unwrap();
    assert!(manifest.files.is_empty());
    assert!(manifest.healing.dynamic_skipped());
}

#[tokio::test]
async fn test_unconfigured_provider_fails_without_output() {
    let temp = TempDir::new().unwrap();
    let pipeline = GamePipeline::new(
        Arc::new(UnconfiguredFactory),
        Arc::new(MockFuzzRunner::new()),
        config_in(&temp),
    );

    let outcome = pipeline
        .generate(&GenerationRequest::new("snake", Provider::OpenAi))
        .await;

    assert_eq!(outcome.status, GenerationStatus::Failure);
    assert!(outcome.error.unwrap().contains("openai"));
    assert!(outcome.path.is_none());
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_design_failure_becomes_failure_outcome() {
    let temp = TempDir::new().unwrap();
    let agents = MockAgents::new().fail(OperationKind::Draft, "connection reset");
    let pipeline = GamePipeline::new(
        Arc::new(ScriptedFactory::new(agents.clone())),
        Arc::new(MockFuzzRunner::new()),
        config_in(&temp),
    );

    let outcome = pipeline
        .generate(&GenerationRequest::new("snake", Provider::Ollama))
        .await;

    assert!(!outcome.is_success());
    assert!(outcome.error.unwrap().contains("connection reset"));
    assert_eq!(agents.call_count(OperationKind::Plan), 0);
}

#[tokio::test]
async fn test_runner_failure_becomes_failure_outcome() {
    let temp = TempDir::new().unwrap();
    let agents = MockAgents::new().with_plan(&two_file_plan());
    let runner = MockFuzzRunner::new().simulate_failure("python3 exited before the harness started");
    let pipeline = GamePipeline::new(
        Arc::new(ScriptedFactory::new(agents.clone())),
        Arc::new(runner.clone()),
        config_in(&temp),
    );

    let outcome = pipeline
        .generate(&GenerationRequest::new("asteroids", Provider::OpenAi))
        .await;

    assert_eq!(outcome.status, GenerationStatus::Failure);
    assert!(outcome.error.unwrap().contains("harness started"));
    assert_eq!(runner.run_count(), 1);
    assert_eq!(agents.call_count(OperationKind::FixRuntime), 0);
    assert_eq!(agents.call_count(OperationKind::ReviewLogic), 0);
}

#[tokio::test]
async fn test_planned_manifest_name_is_rejected() {
    let temp = TempDir::new().unwrap();
    let mut plan = two_file_plan();
    plan.files.push(FileSkeleton {
        filename: MANIFEST_FILE.to_string(),
        purpose: "level data".to_string(),
        skeleton_code: "{}".to_string(),
    });
    let agents = MockAgents::new().with_plan(&plan);
    let runner = MockFuzzRunner::new();
    let pipeline = GamePipeline::new(
        Arc::new(ScriptedFactory::new(agents.clone())),
        Arc::new(runner.clone()),
        config_in(&temp),
    );

    let outcome = pipeline
        .generate(&GenerationRequest::new("platformer", Provider::Ollama))
        .await;

    assert_eq!(outcome.status, GenerationStatus::Failure);
    assert!(outcome.error.unwrap().contains(MANIFEST_FILE));
    assert_eq!(runner.run_count(), 0);
}
