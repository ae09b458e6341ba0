//! Image matrix resolution and volume grouping

use super::consensus::{most_frequent, most_frequent_where};
use crate::types::{Dimensions, ImageRecord, TileMatrix};
use log::warn;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Plausible range for a declared in-plane matrix size
const PLAUSIBLE_MATRIX: std::ops::RangeInclusive<u32> = 32..=8192;

/// Evidence a volume grouping was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingKind {
    /// Every mosaic file is one volume
    Mosaic,
    /// One group per distinct temporal position index
    TemporalIndex,
    /// Instance-ordered records cut into groups of one spatial sweep
    InstanceDerived,
}

impl GroupingKind {
    /// Returns whether the groups come from a per-file volume index
    pub fn is_volume_index(&self) -> bool {
        matches!(self, GroupingKind::Mosaic | GroupingKind::TemporalIndex)
    }
}

/// Partition of a series' records into volumes
///
/// Groups hold indices into the record slice the grouping was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeGrouping {
    pub kind: GroupingKind,
    pub groups: Vec<Vec<usize>>,
}

impl VolumeGrouping {
    pub fn volume_count(&self) -> usize {
        self.groups.len()
    }

    pub fn largest_group(&self) -> usize {
        self.groups.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Groups instance-ordered records into volumes
///
/// Returns `None` when no evidence for more than a single volume exists
/// (mosaic series always group, one volume per file).
pub fn group_volumes(records: &[&ImageRecord], is_mosaic: bool) -> Option<VolumeGrouping> {
    if records.is_empty() {
        return None;
    }

    if is_mosaic {
        return Some(VolumeGrouping {
            kind: GroupingKind::Mosaic,
            groups: (0..records.len()).map(|i| vec![i]).collect(),
        });
    }

    let mut by_index: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        if let Some(index) = record.temporal_position_index {
            by_index.entry(index).or_default().push(i);
        }
    }
    if by_index.len() > 1 {
        return Some(VolumeGrouping {
            kind: GroupingKind::TemporalIndex,
            groups: by_index.into_values().collect(),
        });
    }

    group_by_position(records).map(|groups| VolumeGrouping {
        kind: GroupingKind::InstanceDerived,
        groups,
    })
}

/// Splits instance-ordered records into volumes of one spatial sweep each
///
/// Consecutive runs of S records (S distinct positions) are used when every
/// run covers each position once. Otherwise records are assigned by
/// occurrence: the k-th record at a position belongs to volume k. Slice-major
/// numbering takes the second path.
fn group_by_position(records: &[&ImageRecord]) -> Option<Vec<Vec<usize>>> {
    let n = records.len();
    let keys: Vec<[i64; 3]> = records.iter().map(|r| r.position_key()).collect::<Option<_>>()?;
    let s = keys.iter().collect::<HashSet<_>>().len();
    if s < 2 || s >= n || n % s != 0 {
        return None;
    }

    let indices: Vec<usize> = (0..n).collect();
    let runs: Vec<Vec<usize>> = indices.chunks(s).map(<[usize]>::to_vec).collect();
    let sweeps = runs
        .iter()
        .all(|run| run.iter().map(|&i| keys[i]).collect::<HashSet<_>>().len() == s);
    if sweeps {
        return Some(runs);
    }

    let mut seen: HashMap<[i64; 3], usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); n / s];
    for (i, key) in keys.iter().enumerate() {
        let occurrence = seen.entry(*key).or_default();
        groups.get_mut(*occurrence)?.push(i);
        *occurrence += 1;
    }
    groups.iter().all(|g| g.len() == s).then_some(groups)
}

/// Resolves the in-plane matrix (X = columns, Y = rows)
pub fn resolve_in_plane(records: &[&ImageRecord], is_mosaic: bool) -> (Option<u32>, Option<u32>) {
    if is_mosaic {
        return match mosaic_tile(records) {
            Some(tile) => (Some(tile.cols), Some(tile.rows)),
            None => {
                warn!("Mosaic series without acquisition matrix or tile text; X/Y unknown");
                (None, None)
            }
        };
    }

    let pairs = || {
        records.iter().map(|r| match (r.columns, r.rows) {
            (Some(c), Some(r)) => Some((c as u32, r as u32)),
            _ => None,
        })
    };
    let plausible = most_frequent_where(pairs(), |(c, r)| {
        PLAUSIBLE_MATRIX.contains(c) && PLAUSIBLE_MATRIX.contains(r)
    });
    match plausible.or_else(|| most_frequent(pairs())) {
        Some((x, y)) => (Some(x), Some(y)),
        None => (None, None),
    }
}

/// True tile size of a mosaic series
///
/// The acquisition matrix wins over the vendor matrix text.
pub fn mosaic_tile(records: &[&ImageRecord]) -> Option<TileMatrix> {
    most_frequent(records.iter().map(|r| {
        r.acquisition_matrix
            .as_deref()
            .and_then(TileMatrix::from_acquisition_matrix)
    }))
    .or_else(|| most_frequent(records.iter().map(|r| r.vendor.tile_matrix)))
}

/// Resolves slices per volume
///
/// `external_volumes` is the length of an external b-value list, used only
/// when it splits the file count evenly.
pub fn resolve_slices(
    records: &[&ImageRecord],
    is_mosaic: bool,
    grouping: Option<&VolumeGrouping>,
    external_volumes: Option<usize>,
) -> Option<u32> {
    let n = records.len();

    if is_mosaic {
        let slices = most_frequent_where(
            records.iter().map(|r| r.vendor.images_in_mosaic),
            |v| *v > 0,
        );
        if slices.is_none() {
            warn!("Mosaic series without slices-per-mosaic count; Z unknown");
        }
        return slices;
    }

    let external = external_volumes.filter(|&v| v > 1 && n % v == 0);
    let volumes = external
        .or_else(|| grouping.map(VolumeGrouping::volume_count))
        .unwrap_or(1);

    let z = if volumes > 1 && n % volumes == 0 {
        n / volumes
    } else if volumes > 1 {
        let largest = grouping.map(VolumeGrouping::largest_group).unwrap_or(n);
        warn!(
            "{} files do not split into {} volumes; using largest group of {}",
            n, volumes, largest
        );
        largest
    } else {
        n
    };
    u32::try_from(z).ok()
}

/// Resolves the full image matrix
pub fn resolve_dimensions(
    records: &[&ImageRecord],
    is_mosaic: bool,
    grouping: Option<&VolumeGrouping>,
    external_volumes: Option<usize>,
) -> Dimensions {
    let (x, y) = resolve_in_plane(records, is_mosaic);
    Dimensions {
        x,
        y,
        z: resolve_slices(records, is_mosaic, grouping, external_volumes),
    }
}
