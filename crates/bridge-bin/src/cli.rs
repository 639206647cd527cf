// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: Start the bridge (default)
//! - `validate`: Validate the configuration file
//! - `tree`: Print the address space built from the configuration
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// OPC bridge
///
/// Connects to OPC Classic and OPC UA sources, projects their values into a
/// configured address space and serves it over OPC UA.
#[derive(Parser, Debug)]
#[command(
    name = "opc-bridge",
    author = "Sylvex <contact@sylvex.io>",
    version = bridge_core::VERSION,
    about = "OPC Classic / OPC UA bridge",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = bridge_config::DEFAULT_CONFIG_FILE,
        env = "BRIDGE_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); defaults to the
    /// configured `logging.level`
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format; defaults to the configured `logging.format`
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the bridge
    ///
    /// This is the default command when no subcommand is specified.
    Run(RunArgs),

    /// Validate the configuration file
    ///
    /// Parses and validates the configuration without connecting to any source.
    Validate(ValidateArgs),

    /// Print the address space built from the configuration
    Tree(TreeArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Serve every source from the simulated stack
    #[arg(long, env = "BRIDGE_SIMULATE")]
    pub simulate: bool,

    /// Run headless even if the UA server is enabled in the configuration
    #[arg(long)]
    pub headless: bool,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `tree` command.
#[derive(Args, Debug, Clone, Default)]
pub struct TreeArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<bridge_config::LogFormat> for LogFormat {
    fn from(format: bridge_config::LogFormat) -> Self {
        match format {
            bridge_config::LogFormat::Text => LogFormat::Text,
            bridge_config::LogFormat::Compact => LogFormat::Compact,
            bridge_config::LogFormat::Json => LogFormat::Json,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Returns the level requested on the command line, if any.
    ///
    /// `--quiet` wins over `--verbose`, both win over `--log-level`.
    pub fn cli_log_level(&self) -> Option<&str> {
        if self.quiet {
            Some("warn")
        } else if self.verbose {
            Some("debug")
        } else {
            self.log_level.as_deref()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let cli = Cli::parse_from(["opc-bridge"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Run(_)));
    }

    #[test]
    fn test_run_simulate() {
        let cli = Cli::parse_from(["opc-bridge", "run", "--simulate"]);
        match cli.command {
            Some(Commands::Run(args)) => assert!(args.simulate),
            other => panic!("Expected Run command, got {other:?}"),
        }
    }

    #[test]
    fn test_tree_json() {
        let cli = Cli::parse_from(["opc-bridge", "tree", "-f", "json"]);
        match cli.command {
            Some(Commands::Tree(args)) => assert_eq!(args.format, OutputFormat::Json),
            other => panic!("Expected Tree command, got {other:?}"),
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["opc-bridge", "-c", "/etc/opc-bridge/plant.toml", "validate"]);
        assert_eq!(cli.config, PathBuf::from("/etc/opc-bridge/plant.toml"));
    }

    #[test]
    fn test_log_level_precedence() {
        let cli = Cli::parse_from(["opc-bridge"]);
        assert_eq!(cli.cli_log_level(), None);

        let cli = Cli::parse_from(["opc-bridge", "-l", "trace"]);
        assert_eq!(cli.cli_log_level(), Some("trace"));

        let cli = Cli::parse_from(["opc-bridge", "-l", "trace", "-v"]);
        assert_eq!(cli.cli_log_level(), Some("debug"));

        let cli = Cli::parse_from(["opc-bridge", "-q", "-v"]);
        assert_eq!(cli.cli_log_level(), Some("warn"));
    }

    #[test]
    fn test_log_format() {
        let cli = Cli::parse_from(["opc-bridge", "--log-format", "json"]);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }
}
