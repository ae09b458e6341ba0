use crate::error::{MricatError, Result};
use crate::extraction::csa::{ProtocolBlock, ACCEL_FACTOR_PE, MULTIBAND_FACTOR, MULTI_SLICE_MODE};
use crate::extraction::tags::*;
use crate::types::{
    AccelerationMode, AcquisitionType, ImageRecord, ImageType, PhaseEncodingDirection,
    PixelSpacing, TileMatrix, VendorFields,
};
use dicom::object::OpenFileOptions;
use dicom_core::Tag;
use dicom_dictionary_std::tags::PIXEL_DATA;
use dicom_object::InMemDicomObject;
use log::debug;
use std::path::{Path, PathBuf};

/// Parses the header of one DICOM file into a flat record
///
/// Reading stops before the pixel data.
///
/// # Errors
///
/// Returns [`MricatError::UnreadableFile`] when the file cannot be opened or
/// is not a parseable DICOM file. Missing or malformed optional fields never
/// fail the record.
pub fn parse(path: &Path) -> Result<ImageRecord> {
    ImageRecord::from_file(path)
}

impl ImageRecord {
    /// Creates a record from a DICOM file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let dcm = OpenFileOptions::new()
            .read_until(PIXEL_DATA)
            .open_file(path)
            .map_err(|e| MricatError::UnreadableFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self::from_dicom(path.to_path_buf(), &dcm))
    }

    /// Creates a record from an already-opened DICOM object
    pub fn from_dicom(path: PathBuf, dcm: &InMemDicomObject) -> Self {
        let mut fields = FieldReader::new(dcm);

        let image_type = get_multi_string_value(dcm, IMAGE_TYPE)
            .map(|values| ImageType::from_values(&values))
            .unwrap_or_default();

        let diffusion_b_value = fields
            .f64("DiffusionBValue", DIFFUSION_B_VALUE)
            .or_else(|| get_private_f64(dcm, SIEMENS_B_VALUE));

        let record = ImageRecord {
            series_number: fields.i32("SeriesNumber", SERIES_NUMBER),
            sop_instance_uid: get_string_value(dcm, SOP_INSTANCE_UID).filter(|s| !s.is_empty()),
            instance_number: fields.i32("InstanceNumber", INSTANCE_NUMBER),
            temporal_position_index: fields.i32("TemporalPositionIndex", TEMPORAL_POSITION_INDEX),
            image_position: fields
                .f64_array::<3>("ImagePositionPatient", IMAGE_POSITION_PATIENT),
            image_orientation: fields
                .f64_array::<6>("ImageOrientationPatient", IMAGE_ORIENTATION_PATIENT),
            image_type,
            rows: fields.u16("Rows", ROWS),
            columns: fields.u16("Columns", COLUMNS),
            pixel_spacing: fields.pixel_spacing(),
            slice_thickness: fields.f64("SliceThickness", SLICE_THICKNESS),
            spacing_between_slices: fields.f64("SpacingBetweenSlices", SPACING_BETWEEN_SLICES),
            acquisition_matrix: fields.u32_list("AcquisitionMatrix", ACQUISITION_MATRIX),
            acquisition_type: fields
                .text(MR_ACQUISITION_TYPE)
                .map(|s| AcquisitionType::from_str(&s)),
            repetition_time: fields.f64("RepetitionTime", REPETITION_TIME),
            echo_time: fields.f64("EchoTime", ECHO_TIME),
            inversion_time: fields.f64("InversionTime", INVERSION_TIME),
            flip_angle: fields.f64("FlipAngle", FLIP_ANGLE),
            magnetic_field_strength: fields.f64("MagneticFieldStrength", MAGNETIC_FIELD_STRENGTH),
            pixel_bandwidth: fields.f64("PixelBandwidth", PIXEL_BANDWIDTH),
            number_of_averages: fields.f64("NumberOfAverages", NUMBER_OF_AVERAGES),
            percent_phase_fov: fields.f64("PercentPhaseFieldOfView", PERCENT_PHASE_FIELD_OF_VIEW),
            percent_sampling: fields.f64("PercentSampling", PERCENT_SAMPLING),
            coil_name: fields.text(RECEIVE_COIL_NAME),
            patient_position: fields.text(PATIENT_POSITION),
            phase_encoding_direction: fields
                .text(IN_PLANE_PHASE_ENCODING_DIRECTION)
                .map(|s| PhaseEncodingDirection::from_str(&s)),
            parallel_reduction_in_plane: fields
                .f64("ParallelReductionFactorInPlane", PARALLEL_REDUCTION_FACTOR_IN_PLANE),
            parallel_reduction_out_of_plane: fields.f64(
                "ParallelReductionFactorOutOfPlane",
                PARALLEL_REDUCTION_FACTOR_OUT_OF_PLANE,
            ),
            series_description: fields.text(SERIES_DESCRIPTION),
            study_description: fields.text(STUDY_DESCRIPTION),
            series_date: fields.text(SERIES_DATE),
            series_time: fields.text(SERIES_TIME),
            study_date: fields.text(STUDY_DATE),
            study_time: fields.text(STUDY_TIME),
            diffusion_b_value,
            vendor: extract_vendor_fields(&path, dcm),
            malformed_fields: fields.malformed,
            file_path: path,
        };

        if !record.malformed_fields.is_empty() {
            debug!(
                "{}: malformed fields {:?}",
                record.file_path.display(),
                record.malformed_fields
            );
        }

        record
    }
}

/// Extracts the vendor-private fields, including the protocol sub-block
pub fn extract_vendor_fields(path: &Path, dcm: &InMemDicomObject) -> VendorFields {
    let protocol = get_bytes_value(dcm, SIEMENS_CSA_SERIES_HEADER).and_then(|bytes| {
        ProtocolBlock::parse(&bytes)
            .map_err(|e| debug!("{}: {}", path.display(), e))
            .ok()
    });

    VendorFields {
        multi_slice_mode: protocol.as_ref().and_then(|p| p.get_u32(MULTI_SLICE_MODE)),
        multiband_factor: protocol.as_ref().and_then(|p| p.get_u32(MULTIBAND_FACTOR)),
        accel_factor_pe: protocol.as_ref().and_then(|p| p.get_u32(ACCEL_FACTOR_PE)),
        acceleration_mode: get_text_value(dcm, SIEMENS_PAT_MODE_TEXT)
            .and_then(|text| AccelerationMode::parse(&text)),
        tile_matrix: get_text_value(dcm, SIEMENS_MATRIX_SIZE)
            .and_then(|text| TileMatrix::parse(&text)),
        images_in_mosaic: get_private_u32(dcm, SIEMENS_IMAGES_IN_MOSAIC),
        ge_multiband: get_private_f64(dcm, GE_MULTIBAND_PARAMETERS),
        ge_asset_factor: get_private_f64(dcm, GE_ASSET_FACTOR),
        philips_sense_factor: get_private_f64(dcm, PHILIPS_SENSE_FACTOR),
    }
}

/// Reads typed standard fields, remembering which ones were present but
/// could not be interpreted
struct FieldReader<'a> {
    dcm: &'a InMemDicomObject,
    malformed: Vec<&'static str>,
}

impl<'a> FieldReader<'a> {
    fn new(dcm: &'a InMemDicomObject) -> Self {
        Self {
            dcm,
            malformed: Vec::new(),
        }
    }

    /// Runs `read` on a present, non-blank element
    fn read<T, E>(
        &mut self,
        name: &'static str,
        tag: Tag,
        read: impl FnOnce(&dicom_object::mem::InMemElement) -> std::result::Result<T, E>,
    ) -> Option<T> {
        let elem = self.dcm.element(tag).ok()?;
        if is_blank(elem) {
            return None;
        }
        match read(elem) {
            Ok(value) => Some(value),
            Err(_) => {
                self.malformed.push(name);
                None
            }
        }
    }

    fn f64(&mut self, name: &'static str, tag: Tag) -> Option<f64> {
        self.read(name, tag, |e| e.to_float64())
            .and_then(|v| self.finite(name, v))
    }

    fn i32(&mut self, name: &'static str, tag: Tag) -> Option<i32> {
        self.read(name, tag, |e| e.to_int::<i32>())
    }

    fn u16(&mut self, name: &'static str, tag: Tag) -> Option<u16> {
        self.read(name, tag, |e| e.to_int::<u16>())
    }

    fn u32_list(&mut self, name: &'static str, tag: Tag) -> Option<Vec<u32>> {
        self.read(name, tag, |e| e.to_multi_int::<u32>())
    }

    fn f64_array<const N: usize>(&mut self, name: &'static str, tag: Tag) -> Option<[f64; N]> {
        let values = self.read(name, tag, |e| e.to_multi_float64())?;
        let array = values
            .get(..N)
            .and_then(|head| <[f64; N]>::try_from(head).ok());
        if array.is_none() {
            self.malformed.push(name);
        }
        array
    }

    fn pixel_spacing(&mut self) -> Option<PixelSpacing> {
        let elem = self.dcm.element(PIXEL_SPACING).ok()?;
        if is_blank(elem) {
            return None;
        }
        let spacing = elem
            .to_multi_float64()
            .ok()
            .and_then(|values| PixelSpacing::from_values(&values))
            .or_else(|| {
                elem.to_str()
                    .ok()
                    .and_then(|s| PixelSpacing::parse(&s).ok())
            });
        if spacing.is_none() {
            self.malformed.push("PixelSpacing");
        }
        spacing
    }

    fn text(&self, tag: Tag) -> Option<String> {
        get_string_value(self.dcm, tag).filter(|s| !s.is_empty())
    }

    fn finite(&mut self, name: &'static str, value: f64) -> Option<f64> {
        if value.is_finite() {
            Some(value)
        } else {
            self.malformed.push(name);
            None
        }
    }
}

fn is_blank(elem: &dicom_object::mem::InMemElement) -> bool {
    elem.value().primitive().is_some_and(|v| v.multiplicity() == 0)
        || elem
            .to_str()
            .map(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).is_empty())
            .unwrap_or(false)
}
