use std::path::{Path, PathBuf};

/// Default recursion depth when scanning the input directory
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Configuration for one extraction run
///
/// Passed explicitly into every component; nothing depends on the process
/// working directory.
///
/// # Example
///
/// ```
/// use mricat_core::ExtractConfig;
///
/// let config = ExtractConfig::new("/data/session01")
///     .parallel(true)
///     .workers(4)
///     .sidecar_root("/data/session01_nii");
///
/// assert_eq!(config.effective_workers(), 4);
/// assert!(config.sidecar_root.is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractConfig {
    /// Directory scanned for DICOM files
    pub input_dir: PathBuf,

    /// Resolve series on a worker pool instead of sequentially
    pub parallel: bool,

    /// Worker pool size; `None` uses all cores but one
    pub workers: Option<usize>,

    /// Maximum directory recursion depth
    pub max_depth: usize,

    /// Root of converter output holding `<folder_name>/*.bval` sidecars
    pub sidecar_root: Option<PathBuf>,
}

impl ExtractConfig {
    /// Creates a configuration with parallel resolution enabled
    pub fn new(input_dir: impl AsRef<Path>) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            parallel: true,
            workers: None,
            max_depth: DEFAULT_MAX_DEPTH,
            sidecar_root: None,
        }
    }

    /// Builder: Enable or disable parallel resolution
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Builder: Set the worker pool size (values below 1 are raised to 1)
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Builder: Set the maximum recursion depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder: Set the converter output root used for `.bval` lookup
    pub fn sidecar_root(mut self, root: impl AsRef<Path>) -> Self {
        self.sidecar_root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Number of worker threads the pool will use
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(default_workers)
    }
}

/// All available cores but one, at least one
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExtractConfig::new("/tmp/input");
        assert_eq!(config.input_dir, PathBuf::from("/tmp/input"));
        assert!(config.parallel);
        assert_eq!(config.workers, None);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(config.sidecar_root.is_none());
        assert!(config.effective_workers() >= 1);
    }

    #[test]
    fn test_builder_chain() {
        let config = ExtractConfig::new("in")
            .parallel(false)
            .workers(0)
            .max_depth(2)
            .sidecar_root("nii");

        assert!(!config.parallel);
        assert_eq!(config.workers, Some(1));
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.sidecar_root, Some(PathBuf::from("nii")));
    }
}
