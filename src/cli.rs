//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sisu static site build engine CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Perform one build pass, incremental when the last build manifest allows it
    Build {
        /// Site config file (YAML)
        config: PathBuf,

        /// Pass `full` to force a full rescan
        #[arg(value_enum)]
        mode: Option<RunMode>,
    },

    /// Build once, then serve the output and rebuild on change
    Serve {
        /// Site config file (YAML)
        config: PathBuf,

        /// Pass `full` to force a full rescan
        #[arg(value_enum)]
        mode: Option<RunMode>,
    },
}

/// Build mode override.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Rebuild everything regardless of the manifest
    Full,
}

impl Commands {
    /// Whether a full rebuild was requested.
    pub const fn is_full(&self) -> bool {
        matches!(
            self,
            Commands::Build {
                mode: Some(RunMode::Full),
                ..
            } | Commands::Serve {
                mode: Some(RunMode::Full),
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let cli = Cli::try_parse_from(["sisu", "build", "site.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Build { .. }));
        assert!(!cli.command.is_full());
    }

    #[test]
    fn test_parse_build_full() {
        let cli = Cli::try_parse_from(["sisu", "build", "site.yaml", "full"]).unwrap();
        assert!(cli.command.is_full());
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["sisu", "serve", "site.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { .. }));
    }

    #[test]
    fn test_missing_config_is_an_error() {
        assert!(Cli::try_parse_from(["sisu", "build"]).is_err());
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        assert!(Cli::try_parse_from(["sisu", "build", "site.yaml", "partial"]).is_err());
    }
}
