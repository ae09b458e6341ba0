use std::path::PathBuf;
use thiserror::Error;

/// Result type for mricat operations
pub type Result<T> = std::result::Result<T, MricatError>;

/// Error types for mricat operations
///
/// Recovery is scoped to the smallest failing unit. Only
/// [`MricatError::DirectoryNotFound`] aborts a whole run; the other variants
/// are reported and skipped at field, file or series level.
#[derive(Error, Debug)]
pub enum MricatError {
    /// DICOM reading error
    #[error("DICOM error: {0}")]
    DicomError(String),

    /// File could not be read or is not a DICOM file
    #[error("Unreadable file {path}: {reason}")]
    UnreadableFile { path: PathBuf, reason: String },

    /// A header field is present but cannot be interpreted
    #[error("Malformed header field {field}: {reason}")]
    MalformedHeader { field: String, reason: String },

    /// The vendor CSA sub-block is present but yields no protocol tokens
    #[error("Malformed vendor sub-block: {0}")]
    MalformedVendorSubBlock(String),

    /// A series could not be resolved into a descriptor
    #[error("Series {series} could not be resolved: {reason}")]
    SeriesResolutionFailure { series: i32, reason: String },

    /// An external tool (converter, sidecar reader) failed
    #[error("{tool} failed: {reason}")]
    ExternalToolFailure { tool: String, reason: String },

    /// Input directory is missing or unreadable
    #[error("Directory not found or unreadable: {0}")]
    DirectoryNotFound(PathBuf),

    /// Worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Generic extraction error
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// Helper conversions
impl From<String> for MricatError {
    fn from(s: String) -> Self {
        MricatError::ExtractionError(s)
    }
}

impl From<&str> for MricatError {
    fn from(s: &str) -> Self {
        MricatError::ExtractionError(s.to_string())
    }
}

// Convert dicom-object errors
impl From<dicom_object::ReadError> for MricatError {
    fn from(e: dicom_object::ReadError) -> Self {
        MricatError::DicomError(format!("{}", e))
    }
}

impl From<rayon::ThreadPoolBuildError> for MricatError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        MricatError::ThreadPool(format!("{}", e))
    }
}
