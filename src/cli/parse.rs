//! CLI parse: clap types for coursegen. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// coursegen - resumable batch generation of study material
#[derive(Parser, Debug)]
#[command(name = "coursegen")]
#[command(about = "Generate, import and validate study content for a subject catalog")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides layered config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Generate, import and validate content for groups
    Run {
        /// Group slug to process (repeatable, processed in the order given)
        #[arg(long = "group", required_unless_present = "all")]
        groups: Vec<String>,

        /// Process every group in catalog order
        #[arg(long, conflicts_with = "groups")]
        all: bool,

        /// Continue from the saved progress state
        #[arg(long)]
        resume: bool,

        /// Regenerate even when content already meets every threshold
        #[arg(long)]
        force: bool,

        /// Only validate stored content
        #[arg(long, conflicts_with = "import_only")]
        validate_only: bool,

        /// Skip generation and import spooled bundles
        #[arg(long)]
        import_only: bool,

        /// Also write a SQL script per group into this directory
        #[arg(long = "export", value_name = "DIR")]
        export: Option<PathBuf>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Audit stored content for completeness and placeholders
    Validate {
        /// Group slug to validate (repeatable); all groups when omitted
        #[arg(long = "group")]
        groups: Vec<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Upsert groups and units from a curriculum file (.json or .toml)
    Seed {
        curriculum: PathBuf,
    },
    /// Write a group's stored content as a portable SQL script
    Export {
        #[arg(long)]
        group: String,

        /// Target directory (defaults to storage.export_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show the saved progress state
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}
