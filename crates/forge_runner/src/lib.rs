//! # forge_runner
//!
//! Dynamic-safety checks for generated games.
//!
//! A check runs the game's entry point headless for a short window and
//! reports whether it survived. The self-healing stage uses the result to
//! decide whether a runtime repair is needed.
//!
//! # Example
//!
//! ```rust,no_run
//! use forge_runner::{FuzzRunner, ProcessFuzzRunner, RunnerConfig};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = ProcessFuzzRunner::new(RunnerConfig::default());
//!
//!     if runner.is_available().await {
//!         let outcome = runner
//!             .run_fuzz_test(Path::new("out/main.py"), Duration::from_secs(5))
//!             .await?;
//!         println!("Passed: {}", outcome.passed);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod runner;

pub use config::{RunnerConfig, PYTHON_TRACEBACK};
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedRun, MockFuzzRunner};
pub use runner::{FuzzRunner, ProcessFuzzRunner};
