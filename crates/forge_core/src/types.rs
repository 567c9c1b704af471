//! Core data model for the generation pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Marker a logic reviewer places in its verdict when the code has problems.
pub const FAIL_MARKER: &str = "FAIL";

/// LLM provider a generation run is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Anthropic,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    /// All supported providers.
    pub fn all() -> &'static [Provider] {
        &[Self::OpenAi, Self::Anthropic, Self::Ollama]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(CoreError::UnknownProvider(other.to_string())),
        }
    }
}

/// Immutable input to a whole generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Natural-language game idea
    pub idea: String,
    /// Provider used for every operation in the run
    pub provider: Provider,
    /// Model override; `None` selects the provider default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl GenerationRequest {
    pub fn new(idea: impl Into<String>, provider: Provider) -> Self {
        Self {
            idea: idea.into(),
            provider,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Design document produced by the design stage. Treated as an opaque blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesignDocument(String);

impl DesignDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DesignDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One file the architect plans to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSkeleton {
    /// File name, unique within a plan (e.g. `main.py`)
    pub filename: String,
    /// Short description of the file's role
    pub purpose: String,
    /// Class/function skeleton with docstrings
    pub skeleton_code: String,
}

/// Structured plan returned by the planning operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalPlan {
    pub architecture: String,
    #[serde(default)]
    pub files: Vec<FileSkeleton>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl TechnicalPlan {
    /// Constraints with duplicates removed, first occurrence wins.
    pub fn unique_constraints(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.constraints
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty() && seen.insert(c.to_string()))
            .map(str::to_string)
            .collect()
    }

    /// Constraints rendered one per line, as handed to the programmer.
    pub fn constraints_text(&self) -> String {
        self.unique_constraints().join("\n")
    }

    /// Full plan rendered as context for a single consolidated implementation.
    pub fn context(&self) -> String {
        let mut out = format!("## Architecture\n{}\n", self.architecture.trim());
        for file in &self.files {
            out.push_str(&format!(
                "\n## {}\nPurpose: {}\n{}\n",
                file.filename,
                file.purpose.trim(),
                file.skeleton_code.trim_end()
            ));
        }
        out
    }
}

/// Mapping from file name to source text for one generated project.
///
/// Keys are fixed once production completes: later stages may only
/// [`replace`](Self::replace) the content of files that already exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectFileSet {
    files: BTreeMap<String, String>,
}

impl ProjectFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite a file. Only the production stage should call this.
    pub fn insert(&mut self, filename: impl Into<String>, content: impl Into<String>) {
        self.files.insert(filename.into(), content.into());
    }

    /// Replace the content of an existing file.
    pub fn replace(&mut self, filename: &str, content: impl Into<String>) -> CoreResult<()> {
        match self.files.get_mut(filename) {
            Some(slot) => {
                *slot = content.into();
                Ok(())
            }
            None => Err(CoreError::UnknownFile(filename.to_string())),
        }
    }

    pub fn get(&self, filename: &str) -> Option<&str> {
        self.files.get(filename).map(String::as_str)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.files.contains_key(filename)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for ProjectFileSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// Reject file names that would escape the run directory.
pub fn validate_filename(filename: &str) -> CoreResult<()> {
    let path = Path::new(filename);
    if filename.trim().is_empty() || path.is_absolute() {
        return Err(CoreError::InvalidFileName(filename.to_string()));
    }
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(CoreError::InvalidFileName(filename.to_string()));
    }
    Ok(())
}

/// Result of one dynamic-safety check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl TestOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            error_detail: None,
        }
    }

    pub fn fail(error_detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            error_detail: Some(error_detail.into()),
        }
    }

    /// Error text handed to the fixer; empty when the harness gave none.
    pub fn error_text(&self) -> &str {
        self.error_detail.as_deref().unwrap_or("")
    }
}

/// Verdict text from the static logic reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewVerdict(String);

impl ReviewVerdict {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// True when the verdict carries the fail marker anywhere in its text.
    pub fn is_fail(&self) -> bool {
        self.0.contains(FAIL_MARKER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReviewVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
