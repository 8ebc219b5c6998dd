//! CLI argument parsing for Vigia

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for audit reports
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "vigia")]
#[command(version)]
#[command(about = "Memory-protection audit over captured page-table and firmware maps", long_about = None)]
pub struct Cli {
    /// Run the audit rule set (the default when no mode flag is given)
    #[arg(short = 'r', long = "run")]
    pub run: bool,

    /// Dump the captured snapshots to files instead of auditing
    #[arg(short = 'd', long = "dump", conflicts_with = "run")]
    pub dump: bool,

    /// Platform capture file to audit
    #[arg(short = 'c', long = "capture", value_name = "FILE")]
    pub capture: PathBuf,

    /// Report format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Write the report to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory for dumped snapshot files
    #[arg(long = "dump-dir", value_name = "DIR", default_value = ".")]
    pub dump_dir: PathBuf,

    /// Enable verbose engine logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
