use clap::Parser;
use log::{error, info, warn};
use mricat_core::cli::{Cli, OutputFormat};
use mricat_core::output::{default_summary_path, write_summary_file};
use mricat_core::{Extraction, SeriesExtractor, TextReport};
use std::process;

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    if !cli.directory.is_dir() {
        eprintln!("Error: {} is not a directory", cli.directory.display());
        process::exit(1);
    }

    info!("Processing directory: {}", cli.directory.display());

    let extractor = SeriesExtractor::new(cli.config());
    let extraction = match extractor.extract() {
        Ok(extraction) => extraction,
        Err(e) => {
            error!("Extraction failed: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    for skipped in &extraction.skipped {
        warn!("Skipped {}: {}", skipped.path.display(), skipped.reason);
    }

    if extraction.outcomes.is_empty() {
        eprintln!("Error: No DICOM series found in directory");
        process::exit(1);
    }

    output_extraction(&cli, extraction);
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

fn output_extraction(cli: &Cli, extraction: Extraction) {
    match cli.format {
        OutputFormat::Csv => {
            let path = cli
                .output
                .clone()
                .unwrap_or_else(|| default_summary_path(&cli.directory));
            let failed = extraction.failed_count();
            match write_summary_file(&path, extraction.outcomes) {
                Ok(rows) => {
                    println!("Wrote {} rows ({} failed) to {}", rows, failed, path.display())
                }
                Err(e) => {
                    error!("Failed to write summary: {}", e);
                    eprintln!("Error: Failed to write {}: {}", path.display(), e);
                    process::exit(1);
                }
            }
        }
        OutputFormat::Text => {
            let report = TextReport::new(&extraction.outcomes);
            println!("{}", report);
        }
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                match serde_json::to_string_pretty(&extraction.outcomes) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("Failed to serialize to JSON: {}", e);
                        eprintln!("Error: Failed to serialize to JSON: {}", e);
                        process::exit(1);
                    }
                }
            }
            #[cfg(not(feature = "json"))]
            {
                eprintln!("Error: JSON output requires the 'json' feature");
                eprintln!("Rebuild with: cargo build --features json");
                process::exit(1);
            }
        }
    }
}
