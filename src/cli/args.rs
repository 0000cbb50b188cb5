//! Command line argument parsing for the hoplite CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Hoplite - translate instant-search batches into engine queries and back
#[derive(Parser, Debug, Clone)]
#[command(name = "hoplite")]
#[command(about = "Translate instant-search request batches into search engine queries and back")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct HopliteArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl HopliteArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compile a request batch into engine queries
    Compile(CompileArgs),

    /// Transform recorded engine responses for a request batch
    Transform(TransformArgs),

    /// Run a request batch end to end against recorded responses
    Run(TransformArgs),

    /// Show the query rules matched by each request
    Rules(CompileArgs),

    /// Load and validate a settings file
    Validate(ValidateArgs),
}

/// Arguments for commands that read settings and a request batch
#[derive(Parser, Debug, Clone)]
pub struct CompileArgs {
    /// Search settings file (JSON)
    #[arg(short, long, value_name = "SETTINGS_FILE", env = "HOPLITE_SETTINGS")]
    pub settings: PathBuf,

    /// Request batch file (JSON array or {"requests": [...]})
    #[arg(short, long, value_name = "REQUESTS_FILE")]
    pub requests: PathBuf,
}

/// Arguments for commands that also read recorded engine responses
#[derive(Parser, Debug, Clone)]
pub struct TransformArgs {
    /// Search settings file (JSON)
    #[arg(short, long, value_name = "SETTINGS_FILE", env = "HOPLITE_SETTINGS")]
    pub settings: PathBuf,

    /// Request batch file (JSON array or {"requests": [...]})
    #[arg(short, long, value_name = "REQUESTS_FILE")]
    pub requests: PathBuf,

    /// Engine responses file (JSON array or {"responses": [...]})
    #[arg(long, value_name = "RESPONSES_FILE")]
    pub responses: PathBuf,
}

/// Arguments for validating settings
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Search settings file (JSON)
    #[arg(value_name = "SETTINGS_FILE")]
    pub settings: PathBuf,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
