//! # forge_core
//!
//! Shared building blocks for the GameForge generation pipeline.
//!
//! - [`types`]: the data model threaded between stages (requests, plans,
//!   project file sets, test outcomes and review verdicts)
//! - [`sanitizer`]: extraction of clean source code from free-form model output
//! - [`progress`]: the fire-and-forget progress side channel
//!
//! Nothing in this crate performs network or process I/O.

pub mod error;
pub mod progress;
pub mod sanitizer;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use progress::{ChannelProgress, NullProgress, ProgressSink, RecordingProgress, TracingProgress};
pub use sanitizer::{sanitize, strip_fences, CodeSanitizer};
pub use types::{
    DesignDocument, FileSkeleton, GenerationRequest, ProjectFileSet, Provider, ReviewVerdict,
    TechnicalPlan, TestOutcome, validate_filename, FAIL_MARKER,
};
