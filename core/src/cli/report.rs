use crate::types::{SeriesDescriptor, SeriesOutcome};
use std::fmt;

/// Text report formatter for resolved series
pub struct TextReport<'a> {
    outcomes: &'a [SeriesOutcome],
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(outcomes: &'a [SeriesOutcome]) -> Self {
        Self { outcomes }
    }
}

fn or_unknown<T: fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn write_descriptor(f: &mut fmt::Formatter<'_>, d: &SeriesDescriptor) -> fmt::Result {
    writeln!(
        f,
        "Description:    {}",
        d.series_description.as_deref().unwrap_or("unknown")
    )?;
    writeln!(
        f,
        "Acquisition:    {}",
        or_unknown(d.acquisition_type.as_ref().map(|a| a.simple_name()))
    )?;
    writeln!(
        f,
        "Dimensions:     {} x {} x {}",
        or_unknown(d.dimensions.x),
        or_unknown(d.dimensions.y),
        or_unknown(d.dimensions.z)
    )?;
    writeln!(
        f,
        "Voxel (mm):     {} x {} x {}",
        or_unknown(d.voxel_size.x),
        or_unknown(d.voxel_size.y),
        or_unknown(d.voxel_size.z)
    )?;
    writeln!(
        f,
        "TR/TE/TI (ms):  {} / {} / {}",
        or_unknown(d.repetition_time),
        or_unknown(d.echo_time),
        or_unknown(d.inversion_time)
    )?;
    writeln!(f, "Flip Angle:     {}", or_unknown(d.flip_angle))?;
    writeln!(
        f,
        "Plane:          {}",
        or_unknown(d.image_plane.as_ref().map(|p| p.simple_name()))
    )?;
    writeln!(f, "Mosaic:         {}", d.is_mosaic)?;
    writeln!(f, "Files:          {}", d.file_count)?;

    if !d.diffusion.is_empty() {
        writeln!(
            f,
            "Diffusion:      b={} volumes={} b0s={}",
            or_unknown(d.diffusion.b_value),
            or_unknown(d.diffusion.number_of_volumes),
            or_unknown(d.diffusion.number_of_b0s)
        )?;
    }
    if let Some(factor) = d.multiband_factor {
        writeln!(f, "Multiband:      {}", factor)?;
    }
    if let Some(factor) = d.inplane_accel_factor {
        writeln!(f, "In-plane Accel: {}", factor)?;
    }
    Ok(())
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MR Series Summary")?;
        writeln!(f, "=================")?;
        writeln!(f)?;

        for outcome in self.outcomes {
            match outcome {
                SeriesOutcome::Resolved(d) => {
                    writeln!(f, "Series {}: {}", d.series_number, d.folder_name)?;
                    write_descriptor(f, d)?;
                }
                SeriesOutcome::Failed {
                    series_number,
                    folder_name,
                    reason,
                } => {
                    writeln!(
                        f,
                        "Series {}: {}",
                        series_number,
                        folder_name.as_deref().unwrap_or("unknown")
                    )?;
                    writeln!(f, "Error:          {}", reason)?;
                }
            }
            writeln!(f)?;
        }

        let failed = self
            .outcomes
            .iter()
            .filter(|o| o.descriptor().is_none())
            .count();
        writeln!(f, "Series: {} ({} failed)", self.outcomes.len(), failed)?;

        Ok(())
    }
}
