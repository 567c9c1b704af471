//! Design stage: analysis followed by a fixed draft/critique loop.

use forge_agents::AgentOperations;
use forge_core::{DesignDocument, ProgressSink};
use tracing::{debug, info};

use crate::error::PipelineResult;

/// Draft/critique rounds per run.
pub const DESIGN_ROUNDS: usize = 2;

/// Feedback handed to the first draft.
pub const NO_FEEDBACK: &str = "None";

/// Produce a design document for `idea`.
///
/// The director analyzes the idea once. Each round drafts a document with the
/// previous critique as feedback and then critiques it; the final critique is
/// not applied. Any operation failure propagates.
pub async fn run_design(
    agents: &dyn AgentOperations,
    idea: &str,
    progress: &dyn ProgressSink,
) -> PipelineResult<DesignDocument> {
    info!("Design stage started");
    progress.notify(&format!("[Design] Director analyzing idea: {}", idea));
    let analysis = agents.analyze(idea).await?;

    let mut feedback = NO_FEEDBACK.to_string();
    let mut document = String::new();

    for round in 1..=DESIGN_ROUNDS {
        progress.notify(&format!(
            "[Design] Drafting design document (round {}/{})...",
            round, DESIGN_ROUNDS
        ));
        document = agents.draft(idea, &analysis, &feedback).await?;

        progress.notify(&format!("[Design] Reviewer critiquing round {}...", round));
        feedback = agents.critique(&document).await?;
        debug!("Critique round {}: {} chars", round, feedback.len());
    }

    info!("Design stage finished ({} chars)", document.len());
    Ok(DesignDocument::new(document))
}
