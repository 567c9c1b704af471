//! CLI command definitions.
//!
//! Each subcommand maps to one entry point of the generation pipeline or
//! the knowledge base.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub mod generate;
pub mod rag;

/// GameForge - iterative self-healing game generation
#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "GameForge - generate small games from an idea")]
#[command(long_about = r#"
GameForge turns a natural-language game idea into source code through staged
LLM calls, then runs and repairs the result until it survives a headless
fuzz test.

WORKFLOWS:
  generate      → Design, produce, test and repair a game
  rag ingest    → Add documentation to the knowledge base
  rag query     → Search the knowledge base

CONFIGURATION:
  forge.toml (or --config FILE), then environment variables, then flags.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - Generation failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (default: ./forge.toml when present)
    #[arg(short, long, global = true, env = "FORGE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a game from an idea
    Generate(generate::GenerateArgs),

    /// Manage the documentation knowledge base
    Rag(rag::RagArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_flags() {
        let cli = Cli::try_parse_from([
            "forge", "generate", "--idea", "snake", "--provider", "ollama", "--mode", "single", "--json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Generate(_)));

        let bad = Cli::try_parse_from(["forge", "generate", "--idea", "snake", "--provider", "gemini"]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_rag_query_with_global_flags() {
        let cli = Cli::try_parse_from(["forge", "rag", "query", "collision", "-k", "3", "-v", "--config", "f.toml"]).unwrap();
        assert!(cli.global.verbose);
        assert_eq!(cli.global.config, Some(PathBuf::from("f.toml")));
    }
}
