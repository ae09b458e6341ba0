use crate::types::SeriesNumber;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Characters replaced by `_` in folder names
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

pub const MAX_FOLDER_NAME_LEN: usize = 200;

/// Makes a name safe to use as a single path component on common file systems
pub fn sanitize_folder_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    replaced
        .trim_matches(|c| c == ' ' || c == '.')
        .chars()
        .take(MAX_FOLDER_NAME_LEN)
        .collect()
}

/// `<SeriesNumber>_<SeriesDescription>`, sanitized
pub fn folder_name(series_number: SeriesNumber, description: Option<&str>) -> String {
    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or("Unknown");
    sanitize_folder_name(&format!("{}_{}", series_number, description))
}

/// Formats a DICOM date (`YYYYMMDD`) and time (`HHMMSS.frac`) as
/// `YYYY-MM-DD-HH:MM`
pub fn format_timestamp(date: Option<&str>, time: Option<&str>) -> Option<String> {
    let date = NaiveDate::parse_from_str(date?.trim(), "%Y%m%d").ok()?;
    let time = time?.trim();
    let time = NaiveTime::parse_from_str(time.get(..4)?, "%H%M").ok()?;
    Some(
        NaiveDateTime::new(date, time)
            .format("%Y-%m-%d-%H:%M")
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("5_ep2d_diff", "5_ep2d_diff")]
    #[case("3_t1/mprage:sag", "3_t1_mprage_sag")]
    #[case(" 7_localizer.. ", "7_localizer")]
    #[case("2_a<b>c\"d|e?f*g\\h", "2_a_b_c_d_e_f_g_h")]
    fn test_sanitize_folder_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_folder_name(input), expected);
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(300);
        assert_eq!(sanitize_folder_name(&long).len(), MAX_FOLDER_NAME_LEN);
    }

    #[test]
    fn test_folder_name_unknown_description() {
        assert_eq!(folder_name(12, None), "12_Unknown");
        assert_eq!(folder_name(12, Some("  ")), "12_Unknown");
        assert_eq!(folder_name(4, Some("ep2d_bold")), "4_ep2d_bold");
    }

    #[rstest]
    #[case(Some("20240315"), Some("143012.500000"), Some("2024-03-15-14:30"))]
    #[case(Some("20240315"), Some("0905"), Some("2024-03-15-09:05"))]
    #[case(Some("20240315"), None, None)]
    #[case(None, Some("143012"), None)]
    #[case(Some("2024-03-15"), Some("143012"), None)]
    #[case(Some("20240315"), Some("99"), None)]
    fn test_format_timestamp(
        #[case] date: Option<&str>,
        #[case] time: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(format_timestamp(date, time).as_deref(), expected);
    }
}
