use crate::classify::{classify, Classification, SkippedFile};
use crate::coordinator::{self, CancelToken, RunOptions};
use crate::error::Result;
use crate::extraction::HeaderCache;
use crate::resolve::series_folder_name;
use crate::types::{ExtractConfig, ImageRecord, SeriesNumber, SeriesOutcome};
use log::info;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Main extractor for per-series MR metadata
///
/// Provides a high-level API that classifies a directory tree and resolves
/// every series it finds. Headers are parsed once per run and shared
/// between both steps.
///
/// # Example
///
/// ```no_run
/// use mricat_core::{ExtractConfig, SeriesExtractor};
///
/// let config = ExtractConfig::new("/data/session01").workers(4);
/// let extraction = SeriesExtractor::new(config).extract().unwrap();
///
/// for descriptor in extraction.descriptors() {
///     println!(
///         "{}: {:?}x{:?}x{:?}",
///         descriptor.folder_name,
///         descriptor.dimensions.x,
///         descriptor.dimensions.y,
///         descriptor.dimensions.z
///     );
/// }
/// ```
pub struct SeriesExtractor {
    config: ExtractConfig,
    cache: HeaderCache,
    cancel: CancelToken,
}

impl SeriesExtractor {
    /// Creates an extractor with an empty header cache
    pub fn new(config: ExtractConfig) -> Self {
        Self {
            config,
            cache: HeaderCache::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Token that stops the run from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Groups the input files by series without resolving them
    ///
    /// # Errors
    ///
    /// Returns an error if the input directory does not exist or the worker
    /// pool cannot be built.
    pub fn classify(&self) -> Result<Classification> {
        classify(&self.config, &self.cache)
    }

    /// Folder name of every classified series
    ///
    /// Uses the headers cached by [`SeriesExtractor::classify`]; files
    /// that cannot be read again are left out of the vote.
    pub fn folder_names(&self, classification: &Classification) -> BTreeMap<SeriesNumber, String> {
        classification
            .series
            .iter()
            .map(|(number, paths)| {
                let records: Vec<Arc<ImageRecord>> = paths
                    .iter()
                    .filter_map(|path| self.cache.get_or_parse(path).ok())
                    .collect();
                (*number, series_folder_name(*number, &records))
            })
            .collect()
    }

    /// Classifies the input and resolves every series
    ///
    /// # Errors
    ///
    /// Same as [`SeriesExtractor::classify`]. Per-file and per-series
    /// failures are reported inside the returned [`Extraction`].
    pub fn extract(&self) -> Result<Extraction> {
        let classification = self.classify()?;
        let outcomes = coordinator::run(
            &classification.series,
            &self.cache,
            &RunOptions::from(&self.config),
            &self.cancel,
        )?;
        info!(
            "Extracted {} series from {}",
            outcomes.len(),
            self.config.input_dir.display()
        );
        Ok(Extraction {
            outcomes,
            skipped: classification.skipped,
        })
    }
}

/// Result of one extraction run
#[derive(Debug, Clone)]
pub struct Extraction {
    /// One outcome per series, sorted by series number
    pub outcomes: Vec<SeriesOutcome>,
    /// Files left out of every series
    pub skipped: Vec<SkippedFile>,
}

impl Extraction {
    /// Successfully resolved series
    pub fn descriptors(&self) -> impl Iterator<Item = &crate::types::SeriesDescriptor> {
        self.outcomes.iter().filter_map(SeriesOutcome::descriptor)
    }

    /// Number of series that failed to resolve
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.descriptors().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MricatError;
    use crate::extraction::tags::*;
    use dicom_core::{DataElement, PrimitiveValue, Tag, VR};
    use dicom_object::meta::FileMetaTableBuilder;
    use dicom_object::InMemDicomObject;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_slice(dir: &Path, series: i32, instance: i32, extra: &[(Tag, VR, &str)]) {
        let uid = format!("1.2.826.0.1.3680043.{}.{}", series, instance);
        let mut obj = InMemDicomObject::new_empty();
        let mut put = |tag, vr, value: &str| {
            obj.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
        };
        put(SERIES_NUMBER, VR::IS, &series.to_string());
        put(INSTANCE_NUMBER, VR::IS, &instance.to_string());
        put(SOP_INSTANCE_UID, VR::UI, &uid);
        put(SERIES_DESCRIPTION, VR::LO, "t1_mprage");
        put(ECHO_TIME, VR::DS, "2.98");
        put(REPETITION_TIME, VR::DS, "2300");
        for (tag, vr, value) in extra {
            put(*tag, *vr, *value);
        }
        obj.with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax("1.2.840.10008.1.2.1")
                .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.4")
                .media_storage_sop_instance_uid(uid.as_str()),
        )
        .unwrap()
        .write_to_file(dir.join(format!("s{}_{}", series, instance)))
        .unwrap();
    }

    #[test]
    fn test_extract_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        for i in 1..=3 {
            write_slice(temp_dir.path(), 5, i, &[]);
        }
        // malformed optional field in one file of series 5
        write_slice(temp_dir.path(), 5, 4, &[(INVERSION_TIME, VR::DS, "n/a")]);
        write_slice(temp_dir.path(), 2, 1, &[]);
        std::fs::write(temp_dir.path().join("README.txt"), b"not dicom").unwrap();

        let extraction = SeriesExtractor::new(ExtractConfig::new(temp_dir.path()).workers(2))
            .extract()
            .unwrap();

        let numbers: Vec<_> = extraction
            .outcomes
            .iter()
            .map(SeriesOutcome::series_number)
            .collect();
        assert_eq!(numbers, vec![2, 5]);
        assert_eq!(extraction.failed_count(), 0);
        assert_eq!(extraction.skipped.len(), 1);

        let series5 = extraction.descriptors().nth(1).unwrap();
        assert_eq!(series5.folder_name, "5_t1_mprage");
        assert_eq!(series5.file_count, 4);
        assert_eq!(series5.dimensions.z, Some(4));
        assert_eq!(series5.echo_time, Some(2.98));
        assert_eq!(series5.repetition_time, Some(2300.0));
        assert_eq!(series5.inversion_time, None);
    }

    #[test]
    fn test_folder_names_from_classification() {
        let temp_dir = TempDir::new().unwrap();
        write_slice(temp_dir.path(), 3, 1, &[]);
        write_slice(temp_dir.path(), 3, 2, &[]);
        write_slice(temp_dir.path(), 8, 1, &[(SERIES_DESCRIPTION, VR::LO, "ep2d diff/b1000")]);

        let extractor = SeriesExtractor::new(ExtractConfig::new(temp_dir.path()).parallel(false));
        let classification = extractor.classify().unwrap();
        let names = extractor.folder_names(&classification);

        assert_eq!(names.len(), 2);
        assert_eq!(names[&3], "3_t1_mprage");
        assert_eq!(names[&8], "8_ep2d diff_b1000");
    }

    #[test]
    fn test_extract_missing_directory() {
        let result = SeriesExtractor::new(ExtractConfig::new("/nonexistent/mricat")).extract();
        assert!(matches!(result, Err(MricatError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_cancelled_extraction_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        write_slice(temp_dir.path(), 1, 1, &[]);

        let extractor = SeriesExtractor::new(ExtractConfig::new(temp_dir.path()));
        extractor.cancel_token().cancel();
        let extraction = extractor.extract().unwrap();

        assert!(extraction.outcomes.is_empty());
    }
}
