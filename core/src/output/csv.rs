//! Summary CSV rows and the merged summary file

use crate::error::Result;
use crate::types::{SeriesNumber, SeriesOutcome};
use log::{info, warn};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Column headers, in row order
pub const HEADER: [&str; 37] = [
    "SeriesNumber",
    "FolderName",
    "SeriesDescription",
    "MRAcquisitionType",
    "X_Dim (pixels)",
    "Y_Dim (pixels)",
    "Z_Dim (slices per volume)",
    "X_Voxel (mm)",
    "Y_Voxel (mm)",
    "Z_Voxel (mm)",
    "SliceGap (mm)",
    "X_Fov (mm)",
    "Y_Fov (mm)",
    "Z_Fov (mm)",
    "TI (ms)",
    "TE (ms)",
    "TR (ms)",
    "FlipAngle (deg)",
    "Position",
    "StudyDescription",
    "SeriesAcqTime",
    "StudyAcqTime",
    "DiffusionBValue (s/mm²)",
    "NumberOfVolumes",
    "NumberOfB0s",
    "MultibandFactor",
    "InplaneAccelFactor",
    "PhaseEncodingDirection",
    "NumberOfAverages",
    "Bandwidth (Hz/pixel)",
    "CoilName",
    "SliceOrientation",
    "ImagePlane",
    "MagneticFieldStrength (T)",
    "PercentPhaseFOV (%)",
    "PercentSampling (%)",
    "Status",
];

/// Cells of one summary row; absent values are empty
pub fn row(outcome: &SeriesOutcome) -> Vec<String> {
    let d = match outcome {
        SeriesOutcome::Resolved(d) => d,
        SeriesOutcome::Failed {
            series_number,
            folder_name,
            reason,
        } => {
            let mut cells = vec![String::new(); HEADER.len()];
            cells[0] = series_number.to_string();
            cells[1] = folder_name.clone().unwrap_or_default();
            cells[HEADER.len() - 1] = format!("error: {}", reason);
            return cells;
        }
    };

    vec![
        d.series_number.to_string(),
        d.folder_name.clone(),
        text(d.series_description.as_deref()),
        display(d.acquisition_type.as_ref()),
        display(d.dimensions.x.as_ref()),
        display(d.dimensions.y.as_ref()),
        display(d.dimensions.z.as_ref()),
        number(d.voxel_size.x),
        number(d.voxel_size.y),
        number(d.voxel_size.z),
        number(d.slice_gap),
        number(d.field_of_view.x),
        number(d.field_of_view.y),
        number(d.field_of_view.z),
        number(d.inversion_time),
        number(d.echo_time),
        number(d.repetition_time),
        number(d.flip_angle),
        text(d.position.as_deref()),
        text(d.study_description.as_deref()),
        text(d.series_acq_time.as_deref()),
        text(d.study_acq_time.as_deref()),
        number(d.diffusion.b_value),
        display(d.diffusion.number_of_volumes.as_ref()),
        display(d.diffusion.number_of_b0s.as_ref()),
        number(d.multiband_factor),
        number(d.inplane_accel_factor),
        display(d.phase_encoding_direction.as_ref()),
        number(d.number_of_averages),
        number(d.bandwidth),
        text(d.coil_name.as_deref()),
        text(d.patient_position.as_deref()),
        display(d.image_plane.as_ref()),
        number(d.magnetic_field_strength),
        number(d.percent_phase_fov),
        number(d.percent_sampling),
        "ok".to_string(),
    ]
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn display<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

/// Formats a number with at most four decimals and no trailing zeros
fn number(value: Option<f64>) -> String {
    value
        .map(|v| {
            let rounded = (v * 10_000.0).round() / 10_000.0;
            // avoid "-0"
            if rounded == 0.0 {
                "0".to_string()
            } else {
                rounded.to_string()
            }
        })
        .unwrap_or_default()
}

/// Quotes a cell when it holds a separator, quote or line break
pub fn escape(cell: &str) -> Cow<'_, str> {
    if cell.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

/// Keeps one outcome per series number, sorted ascending
///
/// The first outcome seen for a series number wins; later ones are dropped
/// with a warning.
pub fn merge_outcomes(outcomes: impl IntoIterator<Item = SeriesOutcome>) -> Vec<SeriesOutcome> {
    let mut merged: BTreeMap<SeriesNumber, SeriesOutcome> = BTreeMap::new();
    for outcome in outcomes {
        let number = outcome.series_number();
        if merged.contains_key(&number) {
            warn!("Dropping duplicate summary row for series {}", number);
            continue;
        }
        merged.insert(number, outcome);
    }
    merged.into_values().collect()
}

/// Writes the header and one row per outcome
pub fn write_summary<W: Write>(mut writer: W, outcomes: &[SeriesOutcome]) -> Result<()> {
    write_line(&mut writer, HEADER.iter().copied())?;
    for outcome in outcomes {
        let cells = row(outcome);
        write_line(&mut writer, cells.iter().map(String::as_str))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_line<'a, W: Write>(writer: &mut W, cells: impl Iterator<Item = &'a str>) -> Result<()> {
    let line = cells.map(escape).collect::<Vec<_>>().join(",");
    writeln!(writer, "{}", line)?;
    Ok(())
}

/// Merges the outcomes and writes them to `path`, creating parent folders
pub fn write_summary_file(path: &Path, outcomes: Vec<SeriesOutcome>) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let merged = merge_outcomes(outcomes);
    let file = File::create(path)?;
    write_summary(BufWriter::new(file), &merged)?;
    info!("Wrote {} summary rows to {}", merged.len(), path.display());
    Ok(merged.len())
}

/// `<input>_CSV/<input-name>_summary.csv`, next to the input directory
pub fn default_summary_path(input_dir: &Path) -> PathBuf {
    let name = input_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dicom".to_string());
    let csv_dir = input_dir.with_file_name(format!("{}_CSV", name));
    csv_dir.join(format!("{}_summary.csv", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AcquisitionType, Dimensions, DiffusionSummary, Extent, ImagePlane, SeriesDescriptor,
    };

    fn descriptor(series_number: SeriesNumber, description: &str) -> SeriesDescriptor {
        SeriesDescriptor {
            series_number,
            folder_name: format!("{}_{}", series_number, description),
            series_description: Some(description.to_string()),
            dimensions: Dimensions {
                x: Some(160),
                y: Some(160),
                z: Some(60),
            },
            voxel_size: Extent {
                x: Some(1.5),
                y: Some(1.5),
                z: Some(2.0),
            },
            slice_gap: None,
            field_of_view: Extent {
                x: Some(240.0),
                y: Some(240.0),
                z: Some(120.0),
            },
            repetition_time: Some(3200.0),
            echo_time: Some(0.1 + 0.2),
            inversion_time: None,
            flip_angle: Some(90.0),
            magnetic_field_strength: Some(3.0),
            bandwidth: None,
            multiband_factor: Some(3.0),
            inplane_accel_factor: Some(2.0),
            diffusion: DiffusionSummary {
                b_value: Some(1000.0),
                number_of_volumes: Some(10),
                number_of_b0s: Some(2),
            },
            phase_encoding_direction: None,
            acquisition_type: Some(AcquisitionType::TwoD),
            patient_position: Some("HFS".to_string()),
            image_plane: Some(ImagePlane::Axial),
            coil_name: None,
            number_of_averages: None,
            percent_phase_fov: None,
            percent_sampling: None,
            position: Some("-120.0000,95.0000,-40.0000".to_string()),
            study_description: Some("Brain, research".to_string()),
            series_acq_time: None,
            study_acq_time: None,
            is_mosaic: true,
            file_count: 10,
        }
    }

    #[test]
    fn test_row_matches_header() {
        let cells = row(&SeriesOutcome::Resolved(descriptor(5, "ep2d_diff")));
        assert_eq!(cells.len(), HEADER.len());

        let cell = |name: &str| {
            let i = HEADER.iter().position(|h| h.starts_with(name)).unwrap();
            cells[i].clone()
        };
        assert_eq!(cell("SeriesNumber"), "5");
        assert_eq!(cell("Z_Dim"), "60");
        assert_eq!(cell("TE"), "0.3");
        assert_eq!(cell("TR"), "3200");
        assert_eq!(cell("TI"), "");
        assert_eq!(cell("NumberOfB0s"), "2");
        assert_eq!(cell("MRAcquisitionType"), "2D");
        assert_eq!(cell("SliceOrientation"), "HFS");
        assert_eq!(cell("ImagePlane"), "axial");
        assert_eq!(cell("Status"), "ok");
    }

    #[test]
    fn test_failed_row() {
        let cells = row(&SeriesOutcome::Failed {
            series_number: 8,
            folder_name: Some("8_Unknown".to_string()),
            reason: "no readable files".to_string(),
        });
        assert_eq!(cells.len(), HEADER.len());
        assert_eq!(cells[0], "8");
        assert_eq!(cells[1], "8_Unknown");
        assert_eq!(cells[HEADER.len() - 1], "error: no readable files");
        assert!(cells[2..HEADER.len() - 1].iter().all(String::is_empty));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_merge_outcomes_dedupes_and_sorts() {
        let merged = merge_outcomes(vec![
            SeriesOutcome::Resolved(descriptor(7, "b")),
            SeriesOutcome::Resolved(descriptor(2, "a")),
            SeriesOutcome::Resolved(descriptor(7, "duplicate")),
        ]);
        let numbers: Vec<_> = merged.iter().map(SeriesOutcome::series_number).collect();
        assert_eq!(numbers, vec![2, 7]);
        assert_eq!(merged[1].descriptor().unwrap().folder_name, "7_b");
    }

    #[test]
    fn test_write_summary_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("session_CSV").join("session_summary.csv");

        let written = write_summary_file(
            &path,
            vec![
                SeriesOutcome::Resolved(descriptor(3, "t1")),
                SeriesOutcome::Resolved(descriptor(3, "t1")),
            ],
        )
        .unwrap();
        assert_eq!(written, 1);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("SeriesNumber,FolderName,"));
        assert!(lines[1].starts_with("3,3_t1,t1,2D,160,160,60,"));
        assert!(lines[1].contains("\"-120.0000,95.0000,-40.0000\""));
        assert!(lines[1].contains("\"Brain, research\""));
    }

    #[test]
    fn test_default_summary_path() {
        assert_eq!(
            default_summary_path(Path::new("/data/session01")),
            PathBuf::from("/data/session01_CSV/session01_summary.csv")
        );
    }
}
