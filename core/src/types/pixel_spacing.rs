use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// In-plane pixel spacing (0028,0030) in millimeters
///
/// `row` is the distance between adjacent rows (the Y voxel size) and
/// `col` the distance between adjacent columns (the X voxel size).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct PixelSpacing {
    pub row: f64,
    pub col: f64,
}

fn number_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"[-+]?\d*\.?\d+(?:[eE][-+]?\d+)?").expect("Failed to compile regex")
    })
}

impl PixelSpacing {
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    /// Builds spacing from decoded DS values; the first two must be positive
    pub fn from_values(values: &[f64]) -> Option<Self> {
        match values {
            [row, col, ..] if *row > 0.0 && *col > 0.0 => Some(Self::new(*row, *col)),
            _ => None,
        }
    }

    /// Parses the raw field text when the DS decoder rejected it
    ///
    /// Tolerates the usual vendor deviations: space or comma separators,
    /// brackets and exponent notation (`"0.9375 0.9375"`, `"[2.0, 2.5]"`).
    ///
    /// # Errors
    ///
    /// Returns a message when fewer than two positive numbers are found.
    pub fn parse(s: &str) -> Result<Self, String> {
        let values: Vec<f64> = number_regex()
            .find_iter(s)
            .take(2)
            .map(|m| m.as_str().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("Invalid PixelSpacing '{}': {}", s, e))?;

        Self::from_values(&values).ok_or_else(|| format!("Invalid PixelSpacing '{}'", s))
    }
}

impl fmt::Display for PixelSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {} mm", self.col, self.row)
    }
}
