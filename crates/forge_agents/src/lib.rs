//! # forge_agents
//!
//! Named generation, review and repair operations.
//!
//! The pipeline depends only on [`AgentOperations`]. The production
//! implementation, [`AgentChainRegistry`], binds every [`OperationKind`] to a
//! system prompt, a temperature and a declared [`ToolSet`], and resolves
//! tool calls against a [`ToolBox`] holding the injected retrieval service.
//! [`MockAgents`] scripts replies for tests.

pub mod assets;
pub mod chains;
pub mod error;
pub mod mock;
pub mod operation;
pub mod prompts;
pub mod tools;
pub mod traits;

pub use assets::{extract_json_span, generate_assets, EMPTY_ASSETS};
pub use chains::{parse_plan, AgentChainRegistry, ChainFactory, MAX_TOOL_ROUNDS};
pub use error::{AgentError, AgentResult};
pub use mock::{MockAgents, MockCall, MockReply};
pub use operation::{OperationKind, OperationSpec, ToolKind, ToolSet};
pub use tools::ToolBox;
pub use traits::{AgentFactory, AgentOperations};
