use std::fmt;

/// MR acquisition type (0018,0023)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum AcquisitionType {
    #[cfg_attr(feature = "json", serde(rename = "2D"))]
    TwoD,
    #[cfg_attr(feature = "json", serde(rename = "3D"))]
    ThreeD,
    #[cfg_attr(feature = "json", serde(rename = "unknown"))]
    Unknown,
}

impl AcquisitionType {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            AcquisitionType::TwoD => "2D",
            AcquisitionType::ThreeD => "3D",
            AcquisitionType::Unknown => "unknown",
        }
    }

    /// Parses acquisition type from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "2D" => AcquisitionType::TwoD,
            "3D" => AcquisitionType::ThreeD,
            _ => AcquisitionType::Unknown,
        }
    }
}

impl fmt::Display for AcquisitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// In-plane phase encoding direction (0018,1312)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "UPPERCASE"))]
pub enum PhaseEncodingDirection {
    Row,
    Col,
    Unknown,
}

impl PhaseEncodingDirection {
    /// Returns the DICOM code string
    pub fn simple_name(&self) -> &'static str {
        match self {
            PhaseEncodingDirection::Row => "ROW",
            PhaseEncodingDirection::Col => "COL",
            PhaseEncodingDirection::Unknown => "unknown",
        }
    }

    /// Parses phase encoding direction from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ROW" => PhaseEncodingDirection::Row,
            "COL" | "COLUMN" => PhaseEncodingDirection::Col,
            _ => PhaseEncodingDirection::Unknown,
        }
    }
}

impl fmt::Display for PhaseEncodingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Anatomical plane of the image, derived from the orientation cosines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum ImagePlane {
    Axial,
    Coronal,
    Sagittal,
    Oblique,
}

impl ImagePlane {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            ImagePlane::Axial => "axial",
            ImagePlane::Coronal => "coronal",
            ImagePlane::Sagittal => "sagittal",
            ImagePlane::Oblique => "oblique",
        }
    }

    /// Classifies ImageOrientationPatient (row cosines then column cosines)
    ///
    /// The slice normal is the cross product of the two direction vectors;
    /// its dominant axis names the plane. A normal with no component above
    /// 0.8 is reported as oblique.
    pub fn from_orientation(cosines: &[f64]) -> Option<Self> {
        if cosines.len() < 6 {
            return None;
        }
        let (r, c) = (&cosines[0..3], &cosines[3..6]);
        let normal = [
            r[1] * c[2] - r[2] * c[1],
            r[2] * c[0] - r[0] * c[2],
            r[0] * c[1] - r[1] * c[0],
        ];
        let abs: Vec<f64> = normal.iter().map(|v| v.abs()).collect();
        let (axis, max) = abs
            .iter()
            .enumerate()
            .fold((0, 0.0_f64), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });

        if max < 0.8 {
            return Some(ImagePlane::Oblique);
        }
        Some(match axis {
            0 => ImagePlane::Sagittal,
            1 => ImagePlane::Coronal,
            _ => ImagePlane::Axial,
        })
    }
}

impl fmt::Display for ImagePlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2D", AcquisitionType::TwoD)]
    #[case(" 3d ", AcquisitionType::ThreeD)]
    #[case("", AcquisitionType::Unknown)]
    fn test_acquisition_type_from_str(#[case] input: &str, #[case] expected: AcquisitionType) {
        assert_eq!(AcquisitionType::from_str(input), expected);
    }

    #[rstest]
    #[case("ROW", PhaseEncodingDirection::Row)]
    #[case("COL", PhaseEncodingDirection::Col)]
    #[case("col ", PhaseEncodingDirection::Col)]
    #[case("other", PhaseEncodingDirection::Unknown)]
    fn test_phase_encoding_from_str(
        #[case] input: &str,
        #[case] expected: PhaseEncodingDirection,
    ) {
        assert_eq!(PhaseEncodingDirection::from_str(input), expected);
        assert_eq!(PhaseEncodingDirection::Col.to_string(), "COL");
    }

    #[rstest]
    #[case([1.0, 0.0, 0.0, 0.0, 1.0, 0.0], ImagePlane::Axial)]
    #[case([1.0, 0.0, 0.0, 0.0, 0.0, -1.0], ImagePlane::Coronal)]
    #[case([0.0, 1.0, 0.0, 0.0, 0.0, -1.0], ImagePlane::Sagittal)]
    #[case([1.0, 0.0, 0.0, 0.0, 0.7071, 0.7071], ImagePlane::Oblique)]
    fn test_image_plane_from_orientation(#[case] cosines: [f64; 6], #[case] expected: ImagePlane) {
        assert_eq!(ImagePlane::from_orientation(&cosines), Some(expected));
    }

    #[test]
    fn test_image_plane_short_input() {
        assert_eq!(ImagePlane::from_orientation(&[1.0, 0.0, 0.0]), None);
    }
}
