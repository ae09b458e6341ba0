//! Per-series dispatch onto a bounded worker pool

use crate::error::Result;
use crate::extraction::HeaderCache;
use crate::resolve::{self, diffusion};
use crate::types::{ExtractConfig, ImageRecord, SeriesNumber, SeriesOutcome};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between the caller and the workers
///
/// Once set, no further series are started and series still in flight drop
/// their result instead of publishing it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a run dispatches its series
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub parallel: bool,
    pub workers: usize,
    /// Converter output root searched for `.bval` sidecars
    pub sidecar_root: Option<PathBuf>,
}

impl From<&ExtractConfig> for RunOptions {
    fn from(config: &ExtractConfig) -> Self {
        Self {
            parallel: config.parallel,
            workers: config.effective_workers(),
            sidecar_root: config.sidecar_root.clone(),
        }
    }
}

/// Resolves every series and returns the outcomes sorted by series number
///
/// A failing series yields [`SeriesOutcome::Failed`] and never affects the
/// others. Cancelled series are absent from the output.
///
/// # Errors
///
/// Returns [`crate::MricatError::ThreadPool`] when the worker pool cannot be
/// built.
pub fn run(
    series: &BTreeMap<SeriesNumber, Vec<PathBuf>>,
    cache: &HeaderCache,
    options: &RunOptions,
    cancel: &CancelToken,
) -> Result<Vec<SeriesOutcome>> {
    let sidecar_root = options.sidecar_root.as_deref();
    let task = |(number, paths): (&SeriesNumber, &Vec<PathBuf>)| {
        resolve_series(*number, paths, cache, sidecar_root, cancel)
    };

    let mut outcomes: Vec<SeriesOutcome> = if options.parallel {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers.max(1))
            .build()?;
        debug!("Resolving {} series on {} workers", series.len(), pool.current_num_threads());
        pool.install(|| series.par_iter().filter_map(task).collect())
    } else {
        debug!("Resolving {} series sequentially", series.len());
        series.iter().map_while(task).collect()
    };

    outcomes.sort_by_key(SeriesOutcome::series_number);

    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, SeriesOutcome::Failed { .. }))
        .count();
    if cancel.is_cancelled() {
        warn!(
            "Run cancelled: {} of {} series completed",
            outcomes.len(),
            series.len()
        );
    }
    info!("Resolved {} series ({} failed)", outcomes.len() - failed, failed);
    Ok(outcomes)
}

/// Resolves one series; `None` means the run was cancelled
fn resolve_series(
    number: SeriesNumber,
    paths: &[PathBuf],
    cache: &HeaderCache,
    sidecar_root: Option<&Path>,
    cancel: &CancelToken,
) -> Option<SeriesOutcome> {
    guarded(number, cancel, || {
        resolve_paths(number, paths, cache, sidecar_root)
    })
}

/// Runs `work` for one series, turning a panic into a failed outcome
///
/// Nothing runs once the token is set, and a result finished after the
/// token was set is dropped.
fn guarded(
    number: SeriesNumber,
    cancel: &CancelToken,
    work: impl FnOnce() -> SeriesOutcome,
) -> Option<SeriesOutcome> {
    if cancel.is_cancelled() {
        return None;
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "worker panicked".to_string());
        SeriesOutcome::Failed {
            series_number: number,
            folder_name: None,
            reason,
        }
    });

    if let SeriesOutcome::Failed { reason, .. } = &outcome {
        warn!("Series {} failed: {}", number, reason);
    }

    if cancel.is_cancelled() {
        return None;
    }
    Some(outcome)
}

fn resolve_paths(
    number: SeriesNumber,
    paths: &[PathBuf],
    cache: &HeaderCache,
    sidecar_root: Option<&Path>,
) -> SeriesOutcome {
    let records: Vec<Arc<ImageRecord>> = paths
        .iter()
        .filter_map(|path| match cache.get_or_parse(path) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Series {}: {}", number, e);
                None
            }
        })
        .collect();

    let folder_name = resolve::series_folder_name(number, &records);
    let bvals = diffusion::external_bvals(sidecar_root, &folder_name, common_parent(paths));

    match resolve::resolve(number, &records, bvals.as_deref()) {
        Ok(descriptor) => SeriesOutcome::Resolved(descriptor),
        Err(e) => SeriesOutcome::Failed {
            series_number: number,
            folder_name: (!records.is_empty()).then_some(folder_name),
            reason: e.to_string(),
        },
    }
}

/// Directory holding every file of the series, if they share one
fn common_parent(paths: &[PathBuf]) -> Option<&Path> {
    let first = paths.first()?.parent()?;
    paths
        .iter()
        .all(|p| p.parent() == Some(first))
        .then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SeriesDescriptor;

    fn cached(cache: &HeaderCache, series: i32, instance: i32) -> PathBuf {
        let path = PathBuf::from(format!("/virtual/{}/IM_{:04}", series, instance));
        cache.insert(
            path.clone(),
            Arc::new(ImageRecord {
                file_path: path.clone(),
                series_number: Some(series),
                instance_number: Some(instance),
                sop_instance_uid: Some(format!("1.2.{}.{}", series, instance)),
                echo_time: Some(series as f64),
                ..Default::default()
            }),
        );
        path
    }

    fn series_map(cache: &HeaderCache, series: &[(i32, i32)]) -> BTreeMap<SeriesNumber, Vec<PathBuf>> {
        series
            .iter()
            .map(|&(number, files)| {
                (number, (1..=files).map(|i| cached(cache, number, i)).collect())
            })
            .collect()
    }

    fn options(parallel: bool) -> RunOptions {
        RunOptions {
            parallel,
            workers: 4,
            sidecar_root: None,
        }
    }

    fn descriptors(outcomes: &[SeriesOutcome]) -> Vec<&SeriesDescriptor> {
        outcomes.iter().filter_map(SeriesOutcome::descriptor).collect()
    }

    #[test]
    fn test_parallel_output_sorted_and_matches_sequential() {
        let cache = HeaderCache::new();
        let map = series_map(&cache, &[(12, 3), (2, 5), (7, 1), (30, 2), (1, 4)]);

        let parallel = run(&map, &cache, &options(true), &CancelToken::new()).unwrap();
        let sequential = run(&map, &cache, &options(false), &CancelToken::new()).unwrap();

        let numbers: Vec<_> = parallel.iter().map(SeriesOutcome::series_number).collect();
        assert_eq!(numbers, vec![1, 2, 7, 12, 30]);
        assert_eq!(parallel, sequential);
        assert_eq!(descriptors(&parallel)[1].dimensions.z, Some(5));
    }

    #[test]
    fn test_failed_series_isolated() {
        let cache = HeaderCache::new();
        let mut map = series_map(&cache, &[(1, 2), (3, 2)]);
        map.insert(2, vec![PathBuf::from("/nonexistent/mricat/IM_0001")]);

        let outcomes = run(&map, &cache, &options(true), &CancelToken::new()).unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(
            &outcomes[1],
            SeriesOutcome::Failed { series_number: 2, folder_name: None, .. }
        ));
        assert_eq!(descriptors(&outcomes).len(), 2);
    }

    #[test]
    fn test_cancelled_run_publishes_nothing() {
        let cache = HeaderCache::new();
        let map = series_map(&cache, &[(1, 2), (2, 2)]);
        let cancel = CancelToken::new();
        cancel.cancel();

        assert!(run(&map, &cache, &options(true), &cancel).unwrap().is_empty());
        assert!(run(&map, &cache, &options(false), &cancel).unwrap().is_empty());
    }

    #[test]
    fn test_cancel_during_resolution_drops_result() {
        let cache = HeaderCache::new();
        let path = cached(&cache, 4, 1);
        let cancel = CancelToken::new();

        let outcome = guarded(4, &cancel, || {
            let outcome = resolve_paths(4, &[path], &cache, None);
            cancel.cancel();
            outcome
        });

        assert_eq!(outcome, None);
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_cancel_mid_run_stops_later_series() {
        let cache = HeaderCache::new();
        let map = series_map(&cache, &[(1, 1), (2, 1), (3, 1)]);
        let cancel = CancelToken::new();

        // sequential run: series 1 publishes, series 2 cancels while in flight
        let outcomes: Vec<_> = map
            .iter()
            .map_while(|(number, paths)| {
                guarded(*number, &cancel, || {
                    let outcome = resolve_paths(*number, paths, &cache, None);
                    if *number == 2 {
                        cancel.cancel();
                    }
                    outcome
                })
            })
            .collect();

        let numbers: Vec<_> = outcomes.iter().map(SeriesOutcome::series_number).collect();
        assert_eq!(numbers, vec![1]);
    }

    #[test]
    fn test_panicking_series_becomes_failed() {
        let outcome = guarded(6, &CancelToken::new(), || panic!("corrupt tile table"));

        assert_eq!(
            outcome,
            Some(SeriesOutcome::Failed {
                series_number: 6,
                folder_name: None,
                reason: "corrupt tile table".to_string(),
            })
        );
    }

    #[test]
    fn test_run_options_from_config() {
        let config = ExtractConfig::new("/in").parallel(false).workers(3).sidecar_root("/nii");
        let options = RunOptions::from(&config);
        assert!(!options.parallel);
        assert_eq!(options.workers, 3);
        assert_eq!(options.sidecar_root, Some(PathBuf::from("/nii")));
    }

    #[test]
    fn test_common_parent() {
        let same = vec![PathBuf::from("/a/b/1"), PathBuf::from("/a/b/2")];
        let mixed = vec![PathBuf::from("/a/b/1"), PathBuf::from("/a/c/2")];
        assert_eq!(common_parent(&same), Some(Path::new("/a/b")));
        assert_eq!(common_parent(&mixed), None);
        assert_eq!(common_parent(&[]), None);
    }
}
