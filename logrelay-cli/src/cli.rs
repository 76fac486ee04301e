//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's
//! derive macros. It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Logrelay -- log event field extraction relay.
///
/// Use `logrelay <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logrelay", version, about, long_about = None)]
pub struct Cli {
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage extraction rules.
    Rules(RulesArgs),
}

// ---- rules ----

/// Manage extraction rules.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// Validate a pattern file (one regex per line) without uploading.
    Validate {
        /// Pattern file to validate.
        file: PathBuf,
    },
    /// Validate and upload a pattern file to the rule repository.
    ///
    /// Each line becomes one rule; the line number (0-based) is used as
    /// the rule class. Stops at the first repository rejection.
    Upload {
        /// Pattern file to upload.
        file: PathBuf,

        /// Target sourcetype for the uploaded rules.
        #[arg(long)]
        sourcetype: String,

        /// Rule repository base URL.
        #[arg(long)]
        repository_url: String,
    },
    /// Fetch and display the assembled rule set for a sourcetype.
    List {
        /// Sourcetype to query.
        #[arg(long)]
        sourcetype: String,

        /// Rule repository base URL.
        #[arg(long)]
        repository_url: String,
    },
}
