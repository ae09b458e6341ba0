//! Multiband and in-plane acceleration factors
//!
//! Each factor is taken from the first source in its priority chain that
//! yields a valid value on any record; within one source the records vote.
//! The `s<N>` token only ever feeds the multiband factor and the `p<N>`
//! token only the in-plane factor. The slices-per-mosaic count feeds neither.

use super::consensus::most_frequent_where;
use crate::types::ImageRecord;
use log::debug;

type Source = (&'static str, fn(&ImageRecord) -> Option<f64>);

const MULTIBAND_SOURCES: [Source; 5] = [
    ("sKSpace.ucMultiSliceMode", |r| r.vendor.multi_slice_mode.map(f64::from)),
    ("sSliceAcceleration.lMultiBandFactor", |r| {
        r.vendor.multiband_factor.map(f64::from)
    }),
    ("ParallelReductionFactorOutOfPlane", |r| r.parallel_reduction_out_of_plane),
    ("PATModeText slice token", |r| {
        r.vendor
            .acceleration_mode
            .and_then(|mode| mode.slice)
            .map(f64::from)
    }),
    ("GE multiband parameters", |r| r.vendor.ge_multiband),
];

const INPLANE_SOURCES: [Source; 5] = [
    ("sPat.lAccelFactPE", |r| r.vendor.accel_factor_pe.map(f64::from)),
    ("ParallelReductionFactorInPlane", |r| r.parallel_reduction_in_plane),
    ("PATModeText in-plane token", |r| {
        r.vendor
            .acceleration_mode
            .and_then(|mode| mode.in_plane)
            .map(f64::from)
    }),
    ("GE ASSET factor", |r| r.vendor.ge_asset_factor),
    ("Philips SENSE factor", |r| r.vendor.philips_sense_factor),
];

/// Resolves the simultaneous multi-slice factor (values below 1 are ignored)
pub fn multiband_factor(records: &[&ImageRecord]) -> Option<f64> {
    first_source(records, &MULTIBAND_SOURCES, |v| *v >= 1.0)
}

/// Resolves the in-plane acceleration factor (accepted range 1 to 16)
pub fn inplane_factor(records: &[&ImageRecord]) -> Option<f64> {
    first_source(records, &INPLANE_SOURCES, |v| (1.0..=16.0).contains(v))
}

fn first_source(
    records: &[&ImageRecord],
    sources: &[Source],
    valid: impl Fn(&f64) -> bool + Copy,
) -> Option<f64> {
    sources.iter().find_map(|(name, read)| {
        let value = most_frequent_where(records.iter().map(|r| read(r)), valid)?;
        debug!("Acceleration factor {} from {}", value, name);
        Some(value)
    })
}
