//! Diffusion volume counting
//!
//! Evidence tiers, strictly non-overriding:
//! 1. external b-value list written next to converter output
//! 2. volume-index grouping (temporal index, or one volume per mosaic file)
//! 3. grouping derived from instance numbers and positions
//! 4. per-file b-values without any grouping (a single volume)

use super::consensus::{most_frequent, most_frequent_where};
use super::dimensions::VolumeGrouping;
use crate::error::{MricatError, Result};
use crate::types::{DiffusionSummary, ImageRecord};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Derives volume count, b0 count and representative b-value
pub fn count(
    records: &[&ImageRecord],
    grouping: Option<&VolumeGrouping>,
    external_bvals: Option<&[f64]>,
) -> DiffusionSummary {
    if let Some(bvals) = external_bvals.filter(|b| !b.is_empty()) {
        debug!("Diffusion summary from external list of {} entries", bvals.len());
        return DiffusionSummary {
            b_value: Some(representative_b(bvals.iter().copied().map(Some))),
            number_of_volumes: u32::try_from(bvals.len()).ok(),
            number_of_b0s: u32::try_from(bvals.iter().filter(|b| is_b0(**b)).count()).ok(),
        };
    }

    let has_b_values = records.iter().any(|r| r.diffusion_b_value.is_some());
    let b_value = has_b_values
        .then(|| representative_b(records.iter().map(|r| r.diffusion_b_value)));

    if let Some(grouping) = grouping {
        let tier = if grouping.kind.is_volume_index() { 2 } else { 3 };
        debug!(
            "Diffusion summary (tier {}) from {:?} grouping of {} volumes",
            tier,
            grouping.kind,
            grouping.volume_count()
        );
        let b0s = has_b_values.then(|| {
            grouping
                .groups
                .iter()
                .filter(|group| {
                    most_frequent(group.iter().map(|&i| records[i].diffusion_b_value))
                        .map_or(false, is_b0)
                })
                .count()
        });
        return DiffusionSummary {
            b_value,
            number_of_volumes: u32::try_from(grouping.volume_count()).ok(),
            number_of_b0s: b0s.and_then(|n| u32::try_from(n).ok()),
        };
    }

    if has_b_values {
        let majority = most_frequent(records.iter().map(|r| r.diffusion_b_value));
        return DiffusionSummary {
            b_value,
            number_of_volumes: Some(1),
            number_of_b0s: Some(u32::from(majority.map_or(false, is_b0))),
        };
    }

    DiffusionSummary::default()
}

/// Most frequent non-zero b-value, or zero when every value is zero
fn representative_b(values: impl IntoIterator<Item = Option<f64>>) -> f64 {
    most_frequent_where(values, |b| !is_b0(*b)).unwrap_or(0.0)
}

fn is_b0(b: f64) -> bool {
    b == 0.0
}

/// Finds the `.bval` sidecar of a series
///
/// Looks in `<sidecar_root>/<folder_name>/` first, then in the series'
/// own directory when that directory is already named after the folder.
/// The first match in file name order wins.
pub fn locate_bval(
    sidecar_root: Option<&Path>,
    folder_name: &str,
    series_dir: Option<&Path>,
) -> Option<PathBuf> {
    let converted = sidecar_root.map(|root| root.join(folder_name));
    let own = series_dir
        .filter(|dir| dir.file_name().map_or(false, |name| name == folder_name))
        .map(Path::to_path_buf);

    converted
        .into_iter()
        .chain(own)
        .find_map(|dir| first_bval_in(&dir))
}

fn first_bval_in(dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut bvals: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("bval"))
        })
        .collect();
    bvals.sort();
    bvals.into_iter().next()
}

/// Reads a whitespace-separated b-value list
///
/// # Errors
///
/// Returns [`MricatError::ExternalToolFailure`] when the file cannot be read
/// or holds a non-numeric entry.
pub fn read_bval(path: &Path) -> Result<Vec<f64>> {
    let failure = |reason: String| MricatError::ExternalToolFailure {
        tool: "bval sidecar".to_string(),
        reason: format!("{}: {}", path.display(), reason),
    };

    let content = fs::read_to_string(path).map_err(|e| failure(e.to_string()))?;
    content
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| failure(format!("invalid entry '{}'", token)))
        })
        .collect()
}

/// Locates and reads the sidecar list, treating any failure as absent
pub fn external_bvals(
    sidecar_root: Option<&Path>,
    folder_name: &str,
    series_dir: Option<&Path>,
) -> Option<Vec<f64>> {
    let path = locate_bval(sidecar_root, folder_name, series_dir)?;
    match read_bval(&path) {
        Ok(values) if !values.is_empty() => Some(values),
        Ok(_) => {
            debug!("Empty b-value list {}", path.display());
            None
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}
