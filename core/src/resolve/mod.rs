//! Series consensus resolution
//!
//! Folds the header records of one series into a single
//! [`SeriesDescriptor`]. Every field has a defined merge rule: a priority
//! chain of sources, a majority vote across records, or both. No field is
//! ever taken from whichever record happened to be read last.

pub mod acceleration;
pub mod consensus;
pub mod diffusion;
pub mod dimensions;
pub mod naming;

use crate::classify::instance_order;
use crate::error::{MricatError, Result};
use crate::extraction::cache::absolute;
use crate::types::{Extent, ImagePlane, ImageRecord, SeriesDescriptor, SeriesNumber};
use consensus::most_frequent;
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

pub use naming::{folder_name, format_timestamp, sanitize_folder_name};

/// Resolves one series into its canonical descriptor
///
/// `external_bvals` is the converter's b-value list for this series, when
/// one was found.
///
/// # Errors
///
/// Returns [`MricatError::SeriesResolutionFailure`] when no record is left
/// after deduplication.
pub fn resolve(
    series_number: SeriesNumber,
    records: &[Arc<ImageRecord>],
    external_bvals: Option<&[f64]>,
) -> Result<SeriesDescriptor> {
    let records = prepare(records);
    if records.is_empty() {
        return Err(MricatError::SeriesResolutionFailure {
            series: series_number,
            reason: "no readable files".to_string(),
        });
    }

    let vote = |read: fn(&ImageRecord) -> Option<f64>| most_frequent(records.iter().map(|r| read(r)));
    let text = |read: fn(&ImageRecord) -> Option<&str>| most_frequent(records.iter().map(|r| read(r)));

    let is_mosaic = records.iter().any(|r| r.is_mosaic());
    let grouping = dimensions::group_volumes(&records, is_mosaic);
    let diffusion = diffusion::count(&records, grouping.as_ref(), external_bvals);
    let dimensions = dimensions::resolve_dimensions(
        &records,
        is_mosaic,
        grouping.as_ref(),
        external_bvals.map(<[f64]>::len),
    );

    let pixel_spacing = most_frequent(records.iter().map(|r| r.pixel_spacing));
    let voxel_size = Extent {
        x: pixel_spacing.map(|ps| ps.col),
        y: pixel_spacing.map(|ps| ps.row),
        z: vote(|r| r.slice_thickness),
    };
    let field_of_view = Extent {
        x: extent(dimensions.x, voxel_size.x),
        y: extent(dimensions.y, voxel_size.y),
        z: extent(dimensions.z, voxel_size.z),
    };

    let series_description = text(|r| r.series_description.as_deref()).map(str::to_string);
    let orientation = most_frequent(records.iter().map(|r| r.image_orientation));
    let position = records
        .iter()
        .find_map(|r| r.image_position)
        .map(|p| format!("{:.4},{:.4},{:.4}", p[0], p[1], p[2]));

    let descriptor = SeriesDescriptor {
        series_number,
        folder_name: folder_name(series_number, series_description.as_deref()),
        series_description,
        dimensions,
        voxel_size,
        slice_gap: vote(|r| r.spacing_between_slices),
        field_of_view,
        repetition_time: vote(|r| r.repetition_time),
        echo_time: vote(|r| r.echo_time),
        inversion_time: vote(|r| r.inversion_time),
        flip_angle: vote(|r| r.flip_angle),
        magnetic_field_strength: vote(|r| r.magnetic_field_strength),
        bandwidth: vote(|r| r.pixel_bandwidth),
        multiband_factor: acceleration::multiband_factor(&records),
        inplane_accel_factor: acceleration::inplane_factor(&records),
        diffusion,
        phase_encoding_direction: most_frequent(records.iter().map(|r| r.phase_encoding_direction)),
        acquisition_type: most_frequent(records.iter().map(|r| r.acquisition_type)),
        patient_position: text(|r| r.patient_position.as_deref()).map(str::to_string),
        image_plane: orientation.and_then(|o| ImagePlane::from_orientation(&o)),
        coil_name: text(|r| r.coil_name.as_deref()).map(str::to_string),
        number_of_averages: vote(|r| r.number_of_averages),
        percent_phase_fov: vote(|r| r.percent_phase_fov),
        percent_sampling: vote(|r| r.percent_sampling),
        position,
        study_description: text(|r| r.study_description.as_deref()).map(str::to_string),
        series_acq_time: format_timestamp(
            text(|r| r.series_date.as_deref()),
            text(|r| r.series_time.as_deref()),
        ),
        study_acq_time: format_timestamp(
            text(|r| r.study_date.as_deref()),
            text(|r| r.study_time.as_deref()),
        ),
        is_mosaic,
        file_count: records.len(),
    };

    debug!(
        "Series {} resolved: {} files, dims {:?}, mosaic {}",
        series_number, descriptor.file_count, descriptor.dimensions, is_mosaic
    );
    Ok(descriptor)
}

/// Folder name a series will resolve to, available before resolution
pub fn series_folder_name(series_number: SeriesNumber, records: &[Arc<ImageRecord>]) -> String {
    let records = prepare(records);
    let description = most_frequent(records.iter().map(|r| r.series_description.as_deref()));
    folder_name(series_number, description)
}

/// Orders records by instance number then path and drops duplicates
///
/// A record is a duplicate when its path or its SOP instance UID was
/// already seen; the first one in order is kept.
pub fn prepare(records: &[Arc<ImageRecord>]) -> Vec<&ImageRecord> {
    let mut ordered: Vec<&ImageRecord> = records.iter().map(Arc::as_ref).collect();
    ordered.sort_by(|a, b| instance_order(a, b));

    let mut paths = HashSet::new();
    let mut uids = HashSet::new();
    ordered
        .into_iter()
        .filter(|r| {
            let new_path = paths.insert(absolute(&r.file_path));
            let new_uid = match &r.sop_instance_uid {
                Some(uid) => uids.insert(uid.as_str()),
                None => true,
            };
            new_path && new_uid
        })
        .collect()
}

fn extent(count: Option<u32>, size: Option<f64>) -> Option<f64> {
    Some(f64::from(count?) * size?)
}
