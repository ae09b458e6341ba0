use std::fmt;

/// DICOM ImageType (0008,0008) values in file order
///
/// MR series typically carry `ORIGINAL\PRIMARY\M\ND` plus vendor markers
/// such as `MOSAIC` or `DIFFUSION` further down the list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(transparent))]
pub struct ImageType {
    values: Vec<String>,
}

impl ImageType {
    /// Builds an ImageType from the raw multi-valued field, trimming padding
    pub fn from_values(values: &[String]) -> Self {
        Self {
            values: values.iter().map(|v| v.trim().to_string()).collect(),
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Checks whether any value carries the vendor mosaic marker
    ///
    /// Matching is case-insensitive and on substrings, so values such as
    /// "MOSAIC" and "mosaic_dwi" both qualify.
    pub fn is_mosaic(&self) -> bool {
        self.values
            .iter()
            .any(|v| v.to_ascii_uppercase().contains("MOSAIC"))
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.values.join("\\"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn image_type(values: &[&str]) -> ImageType {
        let values: Vec<String> = values.iter().map(|s| s.to_string()).collect();
        ImageType::from_values(&values)
    }

    #[rstest]
    #[case(&["ORIGINAL", "PRIMARY", "DIFFUSION", "NONE", "ND", "MOSAIC"], true)]
    #[case(&["ORIGINAL", "PRIMARY", "mosaic_dwi"], true)]
    #[case(&["ORIGINAL", "PRIMARY", "M", "ND", "NORM"], false)]
    #[case(&[], false)]
    fn test_is_mosaic(#[case] values: &[&str], #[case] expected: bool) {
        assert_eq!(image_type(values).is_mosaic(), expected);
    }

    #[test]
    fn test_display_trims_padding() {
        let adc = image_type(&["DERIVED ", "PRIMARY", "DIFFUSION", "ADC"]);
        assert_eq!(adc.values()[0], "DERIVED");
        assert_eq!(adc.to_string(), "DERIVED\\PRIMARY\\DIFFUSION\\ADC");
    }
}
