use dicom_core::{PrimitiveValue, Tag};
use dicom_object::InMemDicomObject;

// Core Image Tags
pub const IMAGE_TYPE: Tag = Tag(0x0008, 0x0008);
pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);

// Image Geometry Tags
pub const ROWS: Tag = Tag(0x0028, 0x0010);
pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
pub const PIXEL_SPACING: Tag = Tag(0x0028, 0x0030);
pub const SLICE_THICKNESS: Tag = Tag(0x0018, 0x0050);
pub const SPACING_BETWEEN_SLICES: Tag = Tag(0x0018, 0x0088);
pub const ACQUISITION_MATRIX: Tag = Tag(0x0018, 0x1310);
pub const IMAGE_POSITION_PATIENT: Tag = Tag(0x0020, 0x0032);
pub const IMAGE_ORIENTATION_PATIENT: Tag = Tag(0x0020, 0x0037);
pub const PATIENT_POSITION: Tag = Tag(0x0018, 0x5100);

// Series / Instance Identification Tags
pub const SERIES_NUMBER: Tag = Tag(0x0020, 0x0011);
pub const INSTANCE_NUMBER: Tag = Tag(0x0020, 0x0013);
pub const TEMPORAL_POSITION_INDEX: Tag = Tag(0x0020, 0x9128);
pub const SERIES_DESCRIPTION: Tag = Tag(0x0008, 0x103E);
pub const STUDY_DESCRIPTION: Tag = Tag(0x0008, 0x1030);
pub const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
pub const SERIES_DATE: Tag = Tag(0x0008, 0x0021);
pub const STUDY_TIME: Tag = Tag(0x0008, 0x0030);
pub const SERIES_TIME: Tag = Tag(0x0008, 0x0031);

// MR Acquisition Tags
pub const MR_ACQUISITION_TYPE: Tag = Tag(0x0018, 0x0023);
pub const REPETITION_TIME: Tag = Tag(0x0018, 0x0080);
pub const ECHO_TIME: Tag = Tag(0x0018, 0x0081);
pub const INVERSION_TIME: Tag = Tag(0x0018, 0x0082);
pub const NUMBER_OF_AVERAGES: Tag = Tag(0x0018, 0x0083);
pub const MAGNETIC_FIELD_STRENGTH: Tag = Tag(0x0018, 0x0087);
pub const PERCENT_SAMPLING: Tag = Tag(0x0018, 0x0093);
pub const PERCENT_PHASE_FIELD_OF_VIEW: Tag = Tag(0x0018, 0x0094);
pub const PIXEL_BANDWIDTH: Tag = Tag(0x0018, 0x0095);
pub const RECEIVE_COIL_NAME: Tag = Tag(0x0018, 0x1250);
pub const IN_PLANE_PHASE_ENCODING_DIRECTION: Tag = Tag(0x0018, 0x1312);
pub const FLIP_ANGLE: Tag = Tag(0x0018, 0x1314);
pub const PARALLEL_REDUCTION_FACTOR_IN_PLANE: Tag = Tag(0x0018, 0x9158);
pub const PARALLEL_REDUCTION_FACTOR_OUT_OF_PLANE: Tag = Tag(0x0018, 0x9159);
pub const DIFFUSION_B_VALUE: Tag = Tag(0x0018, 0x9087);

// Siemens private Tags
pub const SIEMENS_IMAGES_IN_MOSAIC: Tag = Tag(0x0019, 0x100A);
pub const SIEMENS_B_VALUE: Tag = Tag(0x0019, 0x100C);
pub const SIEMENS_CSA_SERIES_HEADER: Tag = Tag(0x0029, 0x1020);
pub const SIEMENS_MATRIX_SIZE: Tag = Tag(0x0051, 0x100B);
pub const SIEMENS_PAT_MODE_TEXT: Tag = Tag(0x0051, 0x1011);

// GE / Philips private Tags
pub const GE_ASSET_FACTOR: Tag = Tag(0x0043, 0x1083);
pub const GE_MULTIBAND_PARAMETERS: Tag = Tag(0x0043, 0x10B6);
pub const PHILIPS_SENSE_FACTOR: Tag = Tag(0x2001, 0x1008);

/// Helper to get string value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to string
pub fn get_string_value(dcm: &InMemDicomObject, tag: Tag) -> Option<String> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim().to_string())
}

/// Helper to get multi-string value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to Vec<String>
pub fn get_multi_string_value(dcm: &InMemDicomObject, tag: Tag) -> Option<Vec<String>> {
    dcm.element(tag).ok().and_then(|elem| {
        // Try to get as multi-string
        if let Ok(strs) = elem.to_multi_str() {
            Some(strs.iter().map(|s| s.trim().to_string()).collect())
        } else {
            // Fallback: try to get as single string and split by backslash
            elem.to_str()
                .ok()
                .map(|s| s.split('\\').map(|part| part.trim().to_string()).collect())
        }
    })
}

/// Helper to get text from a private tag
///
/// Private elements read from implicit VR files arrive as raw bytes (UN),
/// so byte values are decoded as Latin-1 instead of being formatted as numbers.
pub fn get_text_value(dcm: &InMemDicomObject, tag: Tag) -> Option<String> {
    let elem = dcm.element(tag).ok()?;
    let text = match elem.value().primitive() {
        Some(PrimitiveValue::U8(bytes)) => decode_latin1(bytes),
        _ => elem.to_str().ok()?.into_owned(),
    };
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Helper to get the raw bytes of a (usually binary) element
pub fn get_bytes_value(dcm: &InMemDicomObject, tag: Tag) -> Option<Vec<u8>> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_bytes().ok())
        .map(|bytes| bytes.into_owned())
}

/// Helper to get a small unsigned number from a private tag
///
/// Handles typed values, little-endian raw bytes (UN) and numeric text.
pub fn get_private_u32(dcm: &InMemDicomObject, tag: Tag) -> Option<u32> {
    let elem = dcm.element(tag).ok()?;
    match elem.value().primitive() {
        Some(PrimitiveValue::U8(bytes)) if is_numeric_text(bytes) => decode_latin1(bytes)
            .trim_matches(|c: char| c == '\0' || c.is_whitespace())
            .parse()
            .ok(),
        Some(PrimitiveValue::U8(bytes)) => match bytes.len() {
            2 => Some(u16::from_le_bytes([bytes[0], bytes[1]]) as u32),
            4 => Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            _ => None,
        },
        _ => elem.to_int::<u32>().ok(),
    }
}

/// Helper to get a floating-point factor from a private tag
///
/// Multi-valued elements yield their first value.
pub fn get_private_f64(dcm: &InMemDicomObject, tag: Tag) -> Option<f64> {
    let elem = dcm.element(tag).ok()?;
    match elem.value().primitive() {
        Some(PrimitiveValue::U8(bytes)) => decode_latin1(bytes)
            .split('\\')
            .next()
            .and_then(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse().ok()),
        _ => elem
            .to_multi_float64()
            .ok()
            .and_then(|values| values.first().copied()),
    }
}

// IS text pads with spaces; a NUL byte means a binary US/UL value
fn is_numeric_text(bytes: &[u8]) -> bool {
    bytes.iter().any(|b| b.is_ascii_digit())
        && bytes
            .iter()
            .all(|&b| b.is_ascii_digit() || b == b' ' || b == b'+')
}

/// Decodes bytes as Latin-1, where every byte maps to one char
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
