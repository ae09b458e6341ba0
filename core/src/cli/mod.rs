pub mod report;

use crate::types::{ExtractConfig, DEFAULT_MAX_DEPTH};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for mricat
#[derive(Parser, Debug)]
#[command(name = "mricat")]
#[command(about = "Per-series MR DICOM metadata extraction tool")]
#[command(version)]
pub struct Cli {
    /// Directory containing DICOM files
    #[arg(value_name = "DIRECTORY")]
    pub directory: PathBuf,

    /// Output file (CSV format only; defaults to <DIRECTORY>_CSV/<name>_summary.csv)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "csv")]
    pub format: OutputFormat,

    /// Resolve series one at a time
    #[arg(long)]
    pub no_parallel: bool,

    /// Worker pool size (defaults to all cores but one)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// dcm2niix output root searched for .bval sidecars
    #[arg(long, value_name = "DIR")]
    pub sidecars: Option<PathBuf>,

    /// Maximum directory recursion depth
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Extraction settings described by the arguments
    pub fn config(&self) -> ExtractConfig {
        let mut config = ExtractConfig::new(&self.directory)
            .parallel(!self.no_parallel)
            .max_depth(self.max_depth);
        if let Some(workers) = self.workers {
            config = config.workers(workers);
        }
        if let Some(root) = &self.sidecars {
            config = config.sidecar_root(root);
        }
        config
    }
}

/// Output format options
#[derive(Debug, Clone, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Summary CSV file
    Csv,
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}
