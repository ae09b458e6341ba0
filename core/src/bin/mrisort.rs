use clap::Parser;
use log::{error, info, warn};
use mricat_core::extraction::cache::absolute;
use mricat_core::output::{
    apply_moves, convert_all, default_summary_path, plan_moves, write_summary_file,
    ConverterConfig, PlannedMove,
};
use mricat_core::{ExtractConfig, SeriesExtractor};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process;

/// CLI tool for sorting a DICOM directory into per-series folders
#[derive(Parser, Debug)]
#[command(name = "mrisort")]
#[command(about = "Sort MR DICOM files into <SeriesNumber>_<SeriesDescription> folders")]
#[command(version)]
struct Cli {
    /// Directory containing DICOM files
    #[arg(value_name = "DIRECTORY")]
    directory: PathBuf,

    /// Print the planned moves without touching any file
    #[arg(long)]
    dry_run: bool,

    /// Convert every series folder to NIfTI with dcm2niix
    #[arg(long)]
    dcm2niix: bool,

    /// dcm2niix executable
    #[arg(long, value_name = "PATH", default_value = "dcm2niix")]
    dcm2niix_path: PathBuf,

    /// Write the summary CSV after sorting (and converting)
    #[arg(long)]
    summary: bool,

    /// Process one item at a time
    #[arg(long)]
    no_parallel: bool,

    /// Worker pool size (defaults to all cores but one)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn extract_config(&self, base: &Path) -> ExtractConfig {
        let config = ExtractConfig::new(base).parallel(!self.no_parallel);
        match self.workers {
            Some(workers) => config.workers(workers),
            None => config,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    if !cli.directory.is_dir() {
        eprintln!("Error: {} is not a directory", cli.directory.display());
        process::exit(1);
    }

    let base = absolute(&cli.directory);
    info!("Processing directory: {}", base.display());

    let extractor = SeriesExtractor::new(cli.extract_config(&base));
    let classification = match extractor.classify() {
        Ok(classification) => classification,
        Err(e) => {
            error!("Classification failed: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if classification.series.is_empty() {
        eprintln!("Error: No DICOM series found in directory");
        process::exit(1);
    }

    info!(
        "Found {} files in {} series",
        classification.file_count(),
        classification.series.len()
    );

    let folders = extractor.folder_names(&classification);
    let moves = plan_moves(&base, &classification.series, &folders);

    if cli.dry_run {
        print_plan(&base, &moves);
        return;
    }

    let report = apply_moves(&moves);
    for (path, reason) in &report.failed {
        warn!("Left in place: {} ({})", path.display(), reason);
    }
    println!(
        "Moved {} files into {} series folders ({} failed)",
        report.moved,
        folders.len(),
        report.failed.len()
    );

    let series_dirs = series_folders(&base, folders.values());
    let mut sidecar_root = None;

    if cli.dcm2niix {
        let mut converter = ConverterConfig::new(&base)
            .executable(&cli.dcm2niix_path)
            .parallel(!cli.no_parallel);
        if let Some(workers) = cli.workers {
            converter = converter.workers(workers);
        }

        match convert_all(&converter, &series_dirs) {
            Ok(conversions) => {
                let failed = conversions.iter().filter(|c| c.result.is_err()).count();
                println!(
                    "Converted {} of {} series folders into {}",
                    conversions.len() - failed,
                    conversions.len(),
                    converter.output_root.display()
                );
                sidecar_root = Some(converter.output_root);
            }
            Err(e) => {
                error!("Conversion failed: {}", e);
                eprintln!("Error: {}", e);
            }
        }
    }

    if cli.summary {
        write_summary(&cli, &base, sidecar_root);
    }
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

/// Distinct series folders under `base`, in name order
fn series_folders<'a>(base: &Path, folders: impl Iterator<Item = &'a String>) -> Vec<PathBuf> {
    folders
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|folder| base.join(folder))
        .filter(|dir| dir.is_dir())
        .collect()
}

fn print_plan(base: &Path, moves: &[PlannedMove]) {
    for planned in moves {
        let from = planned.from.strip_prefix(base).unwrap_or(&planned.from);
        let to = planned.to.strip_prefix(base).unwrap_or(&planned.to);
        println!("{} -> {}", from.display(), to.display());
    }
    println!("{} files would be moved", moves.len());
}

fn write_summary(cli: &Cli, base: &Path, sidecar_root: Option<PathBuf>) {
    let mut config = cli.extract_config(base);
    config.sidecar_root = sidecar_root;

    // the sort moved every file, so the tree is classified again
    let extraction = match SeriesExtractor::new(config).extract() {
        Ok(extraction) => extraction,
        Err(e) => {
            error!("Extraction failed: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let path = default_summary_path(base);
    match write_summary_file(&path, extraction.outcomes) {
        Ok(rows) => println!("Wrote {} rows to {}", rows, path.display()),
        Err(e) => {
            error!("Failed to write summary: {}", e);
            eprintln!("Error: Failed to write {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_series_folders_distinct_and_existing() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir(base.join("2_bold")).unwrap();
        fs::create_dir(base.join("1_t1")).unwrap();

        let names = vec![
            "2_bold".to_string(),
            "1_t1".to_string(),
            "2_bold".to_string(),
            "3_missing".to_string(),
        ];
        let dirs = series_folders(base, names.iter());

        assert_eq!(dirs, vec![base.join("1_t1"), base.join("2_bold")]);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "mrisort",
            "/data/session01",
            "--dry-run",
            "--dcm2niix",
            "--dcm2niix-path",
            "/opt/bin/dcm2niix",
            "--workers",
            "2",
        ]);
        assert!(cli.dry_run);
        assert!(cli.dcm2niix);
        assert!(!cli.summary);
        assert_eq!(cli.dcm2niix_path, PathBuf::from("/opt/bin/dcm2niix"));

        let config = cli.extract_config(Path::new("/data/session01"));
        assert!(config.parallel);
        assert_eq!(config.workers, Some(2));
    }
}
