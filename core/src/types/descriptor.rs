use super::{AcquisitionType, ImagePlane, PhaseEncodingDirection, SeriesNumber};

/// Image matrix of a series in voxels
///
/// `z` is slices per volume, never the raw file count of a multi-volume
/// series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Dimensions {
    pub x: Option<u32>,
    pub y: Option<u32>,
    pub z: Option<u32>,
}

/// Physical extent triple in millimeters (voxel size or field of view)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Extent {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

/// Diffusion / multi-volume summary of a series
///
/// Each field is independently absent; all three absent means no volume
/// evidence was found, which is distinct from a count of zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct DiffusionSummary {
    /// Representative b-value in s/mm²
    pub b_value: Option<f64>,
    pub number_of_volumes: Option<u32>,
    pub number_of_b0s: Option<u32>,
}

impl DiffusionSummary {
    /// Returns whether no tier produced any evidence
    pub fn is_empty(&self) -> bool {
        self.b_value.is_none() && self.number_of_volumes.is_none() && self.number_of_b0s.is_none()
    }
}

/// Canonical description of one imaging series
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SeriesDescriptor {
    pub series_number: SeriesNumber,
    /// `<SeriesNumber>_<SeriesDescription>`, sanitized for file systems
    pub folder_name: String,
    pub series_description: Option<String>,

    pub dimensions: Dimensions,
    pub voxel_size: Extent,
    /// Spacing between slices in mm
    pub slice_gap: Option<f64>,
    pub field_of_view: Extent,

    pub repetition_time: Option<f64>,
    pub echo_time: Option<f64>,
    pub inversion_time: Option<f64>,
    pub flip_angle: Option<f64>,
    pub magnetic_field_strength: Option<f64>,
    pub bandwidth: Option<f64>,

    pub multiband_factor: Option<f64>,
    pub inplane_accel_factor: Option<f64>,
    pub diffusion: DiffusionSummary,

    pub phase_encoding_direction: Option<PhaseEncodingDirection>,
    pub acquisition_type: Option<AcquisitionType>,
    pub patient_position: Option<String>,
    pub image_plane: Option<ImagePlane>,
    pub coil_name: Option<String>,
    pub number_of_averages: Option<f64>,
    pub percent_phase_fov: Option<f64>,
    pub percent_sampling: Option<f64>,
    /// Position of the first slice, "x,y,z" with four decimals
    pub position: Option<String>,

    pub study_description: Option<String>,
    /// Series date and time as `YYYY-MM-DD-HH:MM`
    pub series_acq_time: Option<String>,
    /// Study date and time as `YYYY-MM-DD-HH:MM`
    pub study_acq_time: Option<String>,

    pub is_mosaic: bool,
    /// Number of distinct files folded into this descriptor
    pub file_count: usize,
}

/// Result of resolving one series
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(tag = "status", rename_all = "lowercase"))]
pub enum SeriesOutcome {
    Resolved(SeriesDescriptor),
    Failed {
        series_number: SeriesNumber,
        folder_name: Option<String>,
        reason: String,
    },
}

impl SeriesOutcome {
    /// Series number of either variant
    pub fn series_number(&self) -> SeriesNumber {
        match self {
            SeriesOutcome::Resolved(d) => d.series_number,
            SeriesOutcome::Failed { series_number, .. } => *series_number,
        }
    }

    /// Returns the descriptor when resolution succeeded
    pub fn descriptor(&self) -> Option<&SeriesDescriptor> {
        match self {
            SeriesOutcome::Resolved(d) => Some(d),
            SeriesOutcome::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diffusion_summary_empty() {
        assert!(DiffusionSummary::default().is_empty());
        let summary = DiffusionSummary {
            number_of_b0s: Some(0),
            ..Default::default()
        };
        assert!(!summary.is_empty());
    }

    #[test]
    fn test_outcome_accessors() {
        let failed = SeriesOutcome::Failed {
            series_number: 7,
            folder_name: None,
            reason: "no readable files".to_string(),
        };
        assert_eq!(failed.series_number(), 7);
        assert!(failed.descriptor().is_none());
    }
}
