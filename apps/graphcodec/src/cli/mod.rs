//! # graphcodec CLI Module
//!
//! This module implements the CLI interface for graphcodec.
//!
//! ## Available Commands
//!
//! - `inspect` - Summarize a structural document
//! - `verify` - Check that a document survives a round trip
//! - `flatten` - Re-encode a structural document in the flat format
//! - `normalize` - Decode and re-encode a structural document

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use graphcodec_core::CodecError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// graphcodec - structural object-graph codec
///
/// Encodes rooted, possibly cyclic object graphs as self-describing JSON
/// documents, and inspects or converts documents already on disk.
#[derive(Parser, Debug)]
#[command(name = "graphcodec")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize a structural document
    Inspect {
        /// Path to the document
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Check that a document decodes and re-encodes to the same structure
    Verify {
        /// Path to the document
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Convert a structural document to the flat format
    Flatten {
        /// Path to the document
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode and re-encode a structural document
    Normalize {
        /// Path to the document
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command did what was asked.
    Success,
    /// `verify` ran but the document is not stable.
    Unstable,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<Outcome, CodecError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let json_mode = cli.json_mode;
    if cli.verbose {
        tracing::info!(?config, "effective configuration");
    }

    match cli.command {
        Commands::Inspect { input } => cmd_inspect(&config, &input, json_mode),
        Commands::Verify { input } => cmd_verify(&config, &input, json_mode),
        Commands::Flatten { input, output } => {
            cmd_flatten(&config, &input, output.as_deref(), cli.quiet)
        }
        Commands::Normalize { input, output } => {
            cmd_normalize(&config, &input, output.as_deref(), cli.quiet)
        }
    }
}
