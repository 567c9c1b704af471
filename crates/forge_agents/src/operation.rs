//! Operation catalogue.
//!
//! Every named operation is described by an [`OperationSpec`]: its system
//! prompt, sampling temperature and the tools it may call. Specs are built
//! once when the registry is created and never change afterwards.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::prompts;

/// Sampling temperature for asset design.
pub const ASSET_TEMPERATURE: f32 = 0.5;

/// Default sampling temperature for every other operation.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Named operations the pipeline can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Analyze,
    Draft,
    Critique,
    Plan,
    ImplementFile,
    ImplementConsolidated,
    FixRuntime,
    ReviewLogic,
    FixLogic,
    DesignAssets,
}

impl OperationKind {
    pub fn all() -> &'static [OperationKind] {
        &[
            Self::Analyze,
            Self::Draft,
            Self::Critique,
            Self::Plan,
            Self::ImplementFile,
            Self::ImplementConsolidated,
            Self::FixRuntime,
            Self::ReviewLogic,
            Self::FixLogic,
            Self::DesignAssets,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Draft => "draft",
            Self::Critique => "critique",
            Self::Plan => "plan",
            Self::ImplementFile => "implement_file",
            Self::ImplementConsolidated => "implement_consolidated",
            Self::FixRuntime => "fix_runtime",
            Self::ReviewLogic => "review_logic",
            Self::FixLogic => "fix_logic",
            Self::DesignAssets => "design_assets",
        }
    }

    /// Role name used in logs and progress messages.
    pub fn role(&self) -> &'static str {
        match self {
            Self::Analyze => "Director",
            Self::Draft => "Designer",
            Self::Critique => "Reviewer",
            Self::Plan => "Architect",
            Self::ImplementFile | Self::ImplementConsolidated => "Programmer",
            Self::FixRuntime => "Runtime Fixer",
            Self::ReviewLogic => "Logic Reviewer",
            Self::FixLogic => "Logic Fixer",
            Self::DesignAssets => "Asset Designer",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool an operation may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Static engine API conventions
    ApiConventions,
    /// Documentation lookup through the retrieval service
    KnowledgeBaseSearch,
}

impl ToolKind {
    /// Function name exposed to the model.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ApiConventions => "get_api_conventions",
            Self::KnowledgeBaseSearch => "search_knowledge_base",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "get_api_conventions" => Some(Self::ApiConventions),
            "search_knowledge_base" => Some(Self::KnowledgeBaseSearch),
            _ => None,
        }
    }
}

/// Set of tools declared for an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSet(BTreeSet<ToolKind>);

impl ToolSet {
    pub fn none() -> Self {
        Self::default()
    }

    /// Tools available to code-writing operations.
    pub fn implementation() -> Self {
        [ToolKind::ApiConventions, ToolKind::KnowledgeBaseSearch]
            .into_iter()
            .collect()
    }

    pub fn contains(&self, tool: ToolKind) -> bool {
        self.0.contains(&tool)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ToolKind> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ToolKind> for ToolSet {
    fn from_iter<I: IntoIterator<Item = ToolKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// How one operation talks to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSpec {
    pub kind: OperationKind,
    pub system_prompt: &'static str,
    pub temperature: f32,
    pub tools: ToolSet,
}

impl OperationSpec {
    /// Default spec for `kind`, with `temperature` for every operation except asset design.
    pub fn for_kind(kind: OperationKind, temperature: f32) -> Self {
        let (system_prompt, tools) = match kind {
            OperationKind::Analyze => (prompts::DIRECTOR_SYSTEM_PROMPT, ToolSet::none()),
            OperationKind::Draft => (prompts::DESIGNER_SYSTEM_PROMPT, ToolSet::none()),
            OperationKind::Critique => (prompts::DESIGN_REVIEWER_SYSTEM_PROMPT, ToolSet::none()),
            OperationKind::Plan => (prompts::ARCHITECT_SYSTEM_PROMPT, ToolSet::none()),
            OperationKind::ImplementFile | OperationKind::ImplementConsolidated => {
                (prompts::PROGRAMMER_SYSTEM_PROMPT, ToolSet::implementation())
            }
            OperationKind::FixRuntime => (prompts::RUNTIME_FIXER_SYSTEM_PROMPT, ToolSet::none()),
            OperationKind::ReviewLogic => (prompts::LOGIC_REVIEWER_SYSTEM_PROMPT, ToolSet::none()),
            OperationKind::FixLogic => (prompts::LOGIC_FIXER_SYSTEM_PROMPT, ToolSet::none()),
            OperationKind::DesignAssets => (prompts::ASSET_DESIGNER_SYSTEM_PROMPT, ToolSet::none()),
        };
        let temperature = match kind {
            OperationKind::DesignAssets => ASSET_TEMPERATURE,
            _ => temperature,
        };

        Self {
            kind,
            system_prompt,
            temperature,
            tools,
        }
    }
}
