//! dcm2niix invocation, one process per series folder

use crate::error::{MricatError, Result};
use crate::types::default_workers;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_EXECUTABLE: &str = "dcm2niix";

/// Converter settings
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterConfig {
    /// dcm2niix executable (name on PATH or full path)
    pub executable: PathBuf,
    /// Root receiving one output folder per series folder
    pub output_root: PathBuf,
    pub parallel: bool,
    pub workers: usize,
}

impl ConverterConfig {
    /// Converter writing to `<input>_nii` next to the organized input
    pub fn new(input_dir: &Path) -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            output_root: default_output_root(input_dir),
            parallel: true,
            workers: default_workers(),
        }
    }

    /// Builder: Set the executable
    pub fn executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Builder: Enable or disable parallel conversion
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Builder: Set the worker count (at least one)
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

/// Result of converting one folder
#[derive(Debug)]
pub struct Conversion {
    pub folder: PathBuf,
    /// Output directory on success
    pub result: Result<PathBuf>,
}

/// `<input>_nii` next to the input directory
pub fn default_output_root(input_dir: &Path) -> PathBuf {
    let name = input_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dicom".to_string());
    input_dir.with_file_name(format!("{}_nii", name))
}

/// Arguments for one folder: compressed NIfTI, BIDS sidecar, merged 2D
/// slices, non-anonymized sidecar, `<date>_<time>_<series>` file names
pub fn converter_args(folder: &Path, output_dir: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-z", "y", "-b", "y", "-s", "y", "-m", "y", "-ba", "n", "-f", "%d_%t_%3s", "-o",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(output_dir.as_os_str().to_os_string());
    args.push(folder.as_os_str().to_os_string());
    args
}

/// Converts one series folder into `<output_root>/<folder name>/`
///
/// # Errors
///
/// Returns [`MricatError::ExternalToolFailure`] when the converter cannot
/// be started or exits unsuccessfully.
pub fn convert_folder(config: &ConverterConfig, folder: &Path) -> Result<PathBuf> {
    let name = folder
        .file_name()
        .ok_or_else(|| MricatError::ExtractionError(format!("{} has no folder name", folder.display())))?;
    let output_dir = config.output_root.join(name);
    fs::create_dir_all(&output_dir)?;

    let failure = |reason: String| MricatError::ExternalToolFailure {
        tool: config.executable.display().to_string(),
        reason: format!("{}: {}", folder.display(), reason),
    };

    debug!("Converting {}", folder.display());
    let output = Command::new(&config.executable)
        .args(converter_args(folder, &output_dir))
        .output()
        .map_err(|e| failure(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr.lines().last().unwrap_or("").trim().to_string();
        return Err(failure(format!("exit status {}: {}", output.status, reason)));
    }

    info!("Converted {} -> {}", folder.display(), output_dir.display());
    Ok(output_dir)
}

/// Converts every folder; one folder's failure never affects the others
pub fn convert_all(config: &ConverterConfig, folders: &[PathBuf]) -> Result<Vec<Conversion>> {
    let convert = |folder: &PathBuf| {
        let result = convert_folder(config, folder);
        if let Err(e) = &result {
            warn!("{}", e);
        }
        Conversion {
            folder: folder.clone(),
            result,
        }
    };

    if config.parallel {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()?;
        Ok(pool.install(|| folders.par_iter().map(convert).collect()))
    } else {
        Ok(folders.iter().map(convert).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_converter_args() {
        let args = converter_args(Path::new("/data/s/5_dwi"), Path::new("/data/s_nii/5_dwi"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "-z", "y", "-b", "y", "-s", "y", "-m", "y", "-ba", "n", "-f", "%d_%t_%3s", "-o",
                "/data/s_nii/5_dwi", "/data/s/5_dwi",
            ]
        );
    }

    #[test]
    fn test_default_output_root() {
        let config = ConverterConfig::new(Path::new("/data/session01"));
        assert_eq!(config.output_root, PathBuf::from("/data/session01_nii"));
        assert_eq!(config.executable, PathBuf::from("dcm2niix"));
    }

    #[test]
    fn test_missing_converter_is_external_failure() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("in").join("3_t1");
        fs::create_dir_all(&folder).unwrap();

        let mut config = ConverterConfig::new(&temp_dir.path().join("in"))
            .executable("/nonexistent/dcm2niix-missing")
            .parallel(false);
        config.output_root = temp_dir.path().join("out");

        let conversions = convert_all(&config, &[folder.clone(), folder]).unwrap();
        assert_eq!(conversions.len(), 2);
        assert!(conversions.iter().all(|c| matches!(
            c.result,
            Err(MricatError::ExternalToolFailure { .. })
        )));
        assert!(temp_dir.path().join("out").join("3_t1").is_dir());
    }
}
