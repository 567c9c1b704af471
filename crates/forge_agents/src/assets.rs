//! Asset metadata generation.

use regex::Regex;
use tracing::warn;

use crate::traits::AgentOperations;

/// Returned when asset generation fails.
pub const EMPTY_ASSETS: &str = "{}";

/// Ask for asset metadata and pull out the outermost `{...}` span.
///
/// Falls back to the raw response when it contains no braces and to
/// [`EMPTY_ASSETS`] when the operation fails. Never returns an error.
pub async fn generate_assets(agents: &dyn AgentOperations, design: &str) -> String {
    match agents.design_assets(design).await {
        Ok(response) => extract_json_span(&response).unwrap_or(response),
        Err(e) => {
            warn!("Asset generation failed: {}", e);
            EMPTY_ASSETS.to_string()
        }
    }
}

/// Greedy match from the first `{` to the last `}`.
pub fn extract_json_span(text: &str) -> Option<String> {
    let re = Regex::new(r"(?s)\{.*\}").ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}
