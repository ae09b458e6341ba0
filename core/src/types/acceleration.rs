use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Parsed acceleration-mode text token (Siemens PATModeText, 0051,1011)
///
/// The text carries `p<N>` for in-plane (iPAT/GRAPPA) acceleration and
/// `s<N>` for slice (multiband/SMS) acceleration, e.g. "p2", "s3" or
/// "p2 s3". The two factors are kept strictly apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct AccelerationMode {
    /// Factor from the `p<N>` token
    pub in_plane: Option<u32>,
    /// Factor from the `s<N>` token
    pub slice: Option<u32>,
}

impl AccelerationMode {
    /// Parses the acceleration-mode text
    ///
    /// Returns `None` when the text contains neither token.
    pub fn parse(text: &str) -> Option<Self> {
        static REGEX: OnceLock<Regex> = OnceLock::new();
        let re = REGEX.get_or_init(|| {
            Regex::new(r"(?i)([ps])(\d+)").expect("Failed to compile regex")
        });

        let mut mode = AccelerationMode::default();
        for caps in re.captures_iter(text) {
            let value: u32 = match caps[2].parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            match caps[1].to_ascii_lowercase().as_str() {
                "p" if mode.in_plane.is_none() => mode.in_plane = Some(value),
                "s" if mode.slice.is_none() => mode.slice = Some(value),
                _ => {}
            }
        }

        if mode.in_plane.is_none() && mode.slice.is_none() {
            None
        } else {
            Some(mode)
        }
    }
}

impl fmt::Display for AccelerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [("p", self.in_plane), ("s", self.slice)]
            .iter()
            .filter_map(|(prefix, v)| v.map(|v| format!("{}{}", prefix, v)))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Acquired matrix of one mosaic tile, parsed from the vendor matrix text
///
/// Siemens writes it as "<rows>p*<cols>" (e.g. "160p*160"), sometimes
/// without the `p` or with a trailing `s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct TileMatrix {
    pub rows: u32,
    pub cols: u32,
}

impl TileMatrix {
    /// Parses the matrix text
    pub fn parse(text: &str) -> Option<Self> {
        static REGEX: OnceLock<Regex> = OnceLock::new();
        let re = REGEX.get_or_init(|| {
            Regex::new(r"(\d+)\s*[a-zA-Z]?\s*\*\s*(\d+)").expect("Failed to compile regex")
        });

        let caps = re.captures(text)?;
        let rows = caps[1].parse().ok()?;
        let cols = caps[2].parse().ok()?;
        if rows == 0 || cols == 0 {
            return None;
        }
        Some(TileMatrix { rows, cols })
    }

    /// Derives the tile matrix from AcquisitionMatrix (0018,1310)
    ///
    /// The four values are frequency rows, frequency columns, phase rows and
    /// phase columns; exactly one of each pair is non-zero.
    pub fn from_acquisition_matrix(values: &[u32]) -> Option<Self> {
        let [f_rows, f_cols, p_rows, p_cols] = match values {
            [a, b, c, d, ..] => [*a, *b, *c, *d],
            _ => return None,
        };

        if f_rows > 0 {
            Some(TileMatrix {
                rows: f_rows,
                cols: if p_cols > 0 { p_cols } else { f_rows },
            })
        } else if f_cols > 0 {
            Some(TileMatrix {
                rows: if p_rows > 0 { p_rows } else { f_cols },
                cols: f_cols,
            })
        } else {
            None
        }
    }
}

impl fmt::Display for TileMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("p2", Some(2), None)]
    #[case("s3", None, Some(3))]
    #[case("p3 s2", Some(3), Some(2))]
    #[case("s2p3", Some(3), Some(2))]
    #[case("P4", Some(4), None)]
    fn test_acceleration_mode_parse(
        #[case] text: &str,
        #[case] in_plane: Option<u32>,
        #[case] slice: Option<u32>,
    ) {
        let mode = AccelerationMode::parse(text).unwrap();
        assert_eq!(mode.in_plane, in_plane);
        assert_eq!(mode.slice, slice);
    }

    #[test]
    fn test_acceleration_mode_no_tokens() {
        assert_eq!(AccelerationMode::parse(""), None);
        assert_eq!(AccelerationMode::parse("none"), None);
    }

    #[test]
    fn test_acceleration_mode_display() {
        let mode = AccelerationMode {
            in_plane: Some(2),
            slice: Some(3),
        };
        assert_eq!(mode.to_string(), "p2 s3");
    }

    #[rstest]
    #[case("160p*160", 160, 160)]
    #[case("96*96", 96, 96)]
    #[case("128p*104s", 128, 104)]
    fn test_tile_matrix_parse(#[case] text: &str, #[case] rows: u32, #[case] cols: u32) {
        assert_eq!(TileMatrix::parse(text), Some(TileMatrix { rows, cols }));
    }

    #[test]
    fn test_tile_matrix_parse_invalid() {
        assert_eq!(TileMatrix::parse("160"), None);
        assert_eq!(TileMatrix::parse("0*0"), None);
    }

    #[test]
    fn test_tile_matrix_from_acquisition_matrix() {
        assert_eq!(
            TileMatrix::from_acquisition_matrix(&[160, 0, 0, 160]),
            Some(TileMatrix { rows: 160, cols: 160 })
        );
        assert_eq!(
            TileMatrix::from_acquisition_matrix(&[0, 128, 96, 0]),
            Some(TileMatrix { rows: 96, cols: 128 })
        );
        assert_eq!(TileMatrix::from_acquisition_matrix(&[0, 0, 0, 0]), None);
        assert_eq!(TileMatrix::from_acquisition_matrix(&[160, 0]), None);
    }
}
