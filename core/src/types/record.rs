use super::{
    AccelerationMode, AcquisitionType, ImageType, PhaseEncodingDirection, PixelSpacing, TileMatrix,
};
use std::path::PathBuf;

/// Series identifier (DICOM SeriesNumber)
pub type SeriesNumber = i32;

/// Vendor-private fields of one file
///
/// The first three come from the ASCCONV protocol text embedded in the
/// Siemens CSA series header; the rest are individual private elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorFields {
    /// `sKSpace.ucMultiSliceMode`
    pub multi_slice_mode: Option<u32>,
    /// `sSliceAcceleration.lMultiBandFactor`
    pub multiband_factor: Option<u32>,
    /// `sPat.lAccelFactPE`
    pub accel_factor_pe: Option<u32>,
    /// Parsed PATModeText (0051,1011)
    pub acceleration_mode: Option<AccelerationMode>,
    /// Parsed mosaic tile matrix text (0051,100B)
    pub tile_matrix: Option<TileMatrix>,
    /// NumberOfImagesInMosaic (0019,100A)
    pub images_in_mosaic: Option<u32>,
    /// GE multiband parameters (0043,10B6), first value
    pub ge_multiband: Option<f64>,
    /// GE ASSET/ARC factor (0043,1083), first value
    pub ge_asset_factor: Option<f64>,
    /// Philips SENSE factor (2001,1008)
    pub philips_sense_factor: Option<f64>,
}

/// Flat header record of one DICOM file
///
/// Every optional field is `None` when the element is missing. A field that
/// is present but cannot be interpreted is also `None`, and its name is
/// listed in `malformed_fields`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageRecord {
    /// Path to the DICOM file
    pub file_path: PathBuf,

    pub series_number: Option<SeriesNumber>,
    pub sop_instance_uid: Option<String>,
    pub instance_number: Option<i32>,
    pub temporal_position_index: Option<i32>,

    /// ImagePositionPatient (x, y, z) in mm
    pub image_position: Option<[f64; 3]>,
    /// ImageOrientationPatient row and column cosines
    pub image_orientation: Option<[f64; 6]>,

    /// Parsed ImageType field
    pub image_type: ImageType,

    pub rows: Option<u16>,
    pub columns: Option<u16>,
    pub pixel_spacing: Option<PixelSpacing>,
    pub slice_thickness: Option<f64>,
    pub spacing_between_slices: Option<f64>,
    pub acquisition_matrix: Option<Vec<u32>>,

    pub acquisition_type: Option<AcquisitionType>,
    pub repetition_time: Option<f64>,
    pub echo_time: Option<f64>,
    pub inversion_time: Option<f64>,
    pub flip_angle: Option<f64>,
    pub magnetic_field_strength: Option<f64>,
    pub pixel_bandwidth: Option<f64>,
    pub number_of_averages: Option<f64>,
    pub percent_phase_fov: Option<f64>,
    pub percent_sampling: Option<f64>,
    pub coil_name: Option<String>,
    pub patient_position: Option<String>,
    pub phase_encoding_direction: Option<PhaseEncodingDirection>,
    pub parallel_reduction_in_plane: Option<f64>,
    pub parallel_reduction_out_of_plane: Option<f64>,

    pub series_description: Option<String>,
    pub study_description: Option<String>,
    pub series_date: Option<String>,
    pub series_time: Option<String>,
    pub study_date: Option<String>,
    pub study_time: Option<String>,

    /// Diffusion b-value in s/mm²
    pub diffusion_b_value: Option<f64>,

    pub vendor: VendorFields,

    /// Names of fields that were present but unparseable
    pub malformed_fields: Vec<&'static str>,
}

impl ImageRecord {
    /// Checks whether this file uses the mosaic tiling
    pub fn is_mosaic(&self) -> bool {
        self.image_type.is_mosaic()
    }

    /// Image position rounded to 0.01 mm, usable as a grouping key
    pub fn position_key(&self) -> Option<[i64; 3]> {
        self.image_position
            .map(|p| [p[0], p[1], p[2]].map(|v| (v * 100.0).round() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record_is_absent() {
        let record = ImageRecord::default();
        assert_eq!(record.series_number, None);
        assert_eq!(record.repetition_time, None);
        assert_eq!(record.vendor, VendorFields::default());
        assert!(record.malformed_fields.is_empty());
        assert!(!record.is_mosaic());
    }

    #[test]
    fn test_position_key_rounds() {
        let a = ImageRecord {
            image_position: Some([-120.0, 95.5, 10.001]),
            ..Default::default()
        };
        let b = ImageRecord {
            image_position: Some([-120.0, 95.5, 9.999]),
            ..Default::default()
        };
        assert_eq!(a.position_key(), b.position_key());
        assert_eq!(a.position_key(), Some([-12000, 9550, 1000]));
    }
}
