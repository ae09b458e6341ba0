//! File classification: directory scan, signature probe and series grouping

use crate::error::{MricatError, Result};
use crate::extraction::cache::absolute;
use crate::extraction::HeaderCache;
use crate::types::{ExtractConfig, ImageRecord, SeriesNumber};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

/// Why a file did not make it into any series
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No `DICM` signature after the preamble
    NotDicom,
    /// The file or directory entry could not be read or parsed
    Unreadable(String),
    /// The header carries no series number
    MissingSeriesNumber,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotDicom => write!(f, "not a DICOM file"),
            SkipReason::Unreadable(reason) => write!(f, "unreadable: {}", reason),
            SkipReason::MissingSeriesNumber => write!(f, "missing series number"),
        }
    }
}

/// A file excluded from classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Files of a directory tree grouped by series number
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Absolute paths per series, ordered by instance number then path
    pub series: BTreeMap<SeriesNumber, Vec<PathBuf>>,
    pub skipped: Vec<SkippedFile>,
}

impl Classification {
    /// Total number of classified files
    pub fn file_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }
}

/// Scans `config.input_dir` and groups every DICOM file by series number
///
/// Headers are parsed through `cache`, so later resolution never reads a
/// file twice.
///
/// # Errors
///
/// Returns [`MricatError::DirectoryNotFound`] when the input directory does
/// not exist, and [`MricatError::ThreadPool`] when the worker pool cannot be
/// built. Per-file problems are reported in [`Classification::skipped`].
pub fn classify(config: &ExtractConfig, cache: &HeaderCache) -> Result<Classification> {
    if !config.input_dir.is_dir() {
        return Err(MricatError::DirectoryNotFound(config.input_dir.clone()));
    }

    let (candidates, mut skipped) = collect_candidates(&config.input_dir, config.max_depth);
    debug!("{} candidate files under {}", candidates.len(), config.input_dir.display());

    let parse_one = |path: &PathBuf| -> std::result::Result<Arc<ImageRecord>, SkippedFile> {
        if !is_dicom_file(path) {
            return Err(SkippedFile {
                path: path.clone(),
                reason: SkipReason::NotDicom,
            });
        }
        cache.get_or_parse(path).map_err(|e| SkippedFile {
            path: path.clone(),
            reason: SkipReason::Unreadable(e.to_string()),
        })
    };

    let parsed: Vec<_> = if config.parallel {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.effective_workers())
            .build()?;
        pool.install(|| candidates.par_iter().map(parse_one).collect())
    } else {
        candidates.iter().map(parse_one).collect()
    };

    let mut grouped: BTreeMap<SeriesNumber, Vec<Arc<ImageRecord>>> = BTreeMap::new();
    for result in parsed {
        match result {
            Ok(record) => match record.series_number {
                Some(series) => grouped.entry(series).or_default().push(record),
                None => skipped.push(SkippedFile {
                    path: record.file_path.clone(),
                    reason: SkipReason::MissingSeriesNumber,
                }),
            },
            Err(skip) => skipped.push(skip),
        }
    }

    for skip in &skipped {
        match skip.reason {
            SkipReason::NotDicom => debug!("Skipping {}: {}", skip.path.display(), skip.reason),
            _ => warn!("Skipping {}: {}", skip.path.display(), skip.reason),
        }
    }

    let series: BTreeMap<_, _> = grouped
        .into_iter()
        .map(|(number, mut records)| {
            records.sort_by(|a, b| instance_order(a, b));
            let paths = records.iter().map(|r| absolute(&r.file_path)).collect();
            (number, paths)
        })
        .collect();

    let classification = Classification { series, skipped };
    info!(
        "Classified {} files into {} series ({} skipped)",
        classification.file_count(),
        classification.series.len(),
        classification.skipped.len()
    );
    Ok(classification)
}

/// Ordering used for every per-series record list: instance number, then path
///
/// Records without an instance number sort last.
pub fn instance_order(a: &ImageRecord, b: &ImageRecord) -> std::cmp::Ordering {
    let key = |r: &ImageRecord| (r.instance_number.is_none(), r.instance_number);
    key(a)
        .cmp(&key(b))
        .then_with(|| a.file_path.cmp(&b.file_path))
}

/// Walks the tree and returns deduplicated absolute file paths
///
/// Entries that cannot be read are reported as skipped and never abort the
/// walk.
pub fn collect_candidates(root: &Path, max_depth: usize) -> (Vec<PathBuf>, Vec<SkippedFile>) {
    let mut files = BTreeSet::new();
    let mut skipped = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).max_depth(max_depth) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                files.insert(absolute(entry.path()));
            }
            Ok(_) => {}
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                skipped.push(SkippedFile {
                    path,
                    reason: SkipReason::Unreadable(e.to_string()),
                });
            }
        }
    }

    (files.into_iter().collect(), skipped)
}

/// Checks for the 128-byte preamble followed by the `DICM` magic
///
/// Extensions are never consulted.
pub fn is_dicom_file(path: &Path) -> bool {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    let mut buffer = [0u8; PREAMBLE_LEN + 4];
    match file.read_exact(&mut buffer) {
        Ok(()) => &buffer[PREAMBLE_LEN..] == MAGIC,
        Err(_) => false,
    }
}
