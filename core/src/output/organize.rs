//! Reorganization of files into `<SeriesNumber>_<SeriesDescription>` folders
//!
//! Planning is pure; nothing touches the file system until
//! [`apply_moves`] runs the plan.

use crate::resolve::folder_name;
use crate::types::SeriesNumber;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One file relocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Outcome of applying a plan
#[derive(Debug, Default)]
pub struct MoveReport {
    pub moved: usize,
    pub failed: Vec<(PathBuf, String)>,
}

/// Plans moving every series file into `<base>/<folder>/`
///
/// `folders` maps series numbers to their resolved folder names; a series
/// without one gets `<SeriesNumber>_Unknown`. Files already in place are
/// left out. Clashing file names within one folder get a numeric suffix.
pub fn plan_moves(
    base: &Path,
    series: &BTreeMap<SeriesNumber, Vec<PathBuf>>,
    folders: &BTreeMap<SeriesNumber, String>,
) -> Vec<PlannedMove> {
    let mut taken: HashSet<PathBuf> = HashSet::new();
    let mut moves = Vec::new();

    for (number, paths) in series {
        let folder = folders
            .get(number)
            .cloned()
            .unwrap_or_else(|| folder_name(*number, None));
        let target_dir = base.join(&folder);

        for path in paths {
            if path.parent() == Some(target_dir.as_path()) {
                taken.insert(path.clone());
                continue;
            }
            let Some(file_name) = path.file_name() else {
                continue;
            };

            let mut target = target_dir.join(file_name);
            let mut suffix = 1;
            while taken.contains(&target) {
                let mut name = file_name.to_os_string();
                name.push(format!("_{}", suffix));
                target = target_dir.join(name);
                suffix += 1;
            }
            taken.insert(target.clone());
            moves.push(PlannedMove {
                from: path.clone(),
                to: target,
            });
        }
    }

    moves
}

/// Executes a plan, skipping (and logging) files that cannot be moved
///
/// Existing targets are never overwritten.
pub fn apply_moves(moves: &[PlannedMove]) -> MoveReport {
    let mut report = MoveReport::default();
    for planned in moves {
        match move_file(&planned.from, &planned.to) {
            Ok(()) => {
                debug!("Moved {} -> {}", planned.from.display(), planned.to.display());
                report.moved += 1;
            }
            Err(e) => {
                warn!("Could not move {}: {}", planned.from.display(), e);
                report.failed.push((planned.from.clone(), e.to_string()));
            }
        }
    }
    info!(
        "Moved {} files ({} failed)",
        report.moved,
        report.failed.len()
    );
    report
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        ));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        // rename fails across file systems
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plan_moves_is_pure_and_complete() {
        let base = Path::new("/data/session");
        let series = BTreeMap::from([
            (1, vec![base.join("raw/a.dcm"), base.join("raw/b.dcm")]),
            (2, vec![base.join("raw/c.dcm"), base.join("2_bold/d.dcm")]),
            (3, vec![base.join("x/e.dcm")]),
        ]);
        let folders = BTreeMap::from([
            (1, "1_localizer".to_string()),
            (2, "2_bold".to_string()),
        ]);

        let moves = plan_moves(base, &series, &folders);

        assert_eq!(moves.len(), 4);
        assert_eq!(moves[0].to, base.join("1_localizer/a.dcm"));
        assert_eq!(moves[2].to, base.join("2_bold/c.dcm"));
        assert_eq!(moves[3].to, base.join("3_Unknown/e.dcm"));
    }

    #[test]
    fn test_plan_moves_suffixes_clashing_names() {
        let base = Path::new("/data");
        let series = BTreeMap::from([(4, vec![base.join("a/IM_0001"), base.join("b/IM_0001")])]);
        let folders = BTreeMap::from([(4, "4_dwi".to_string())]);

        let moves = plan_moves(base, &series, &folders);

        assert_eq!(moves[0].to, base.join("4_dwi/IM_0001"));
        assert_eq!(moves[1].to, base.join("4_dwi/IM_0001_1"));
    }

    #[test]
    fn test_apply_moves() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir_all(base.join("raw")).unwrap();
        fs::write(base.join("raw/a.dcm"), b"a").unwrap();
        fs::write(base.join("raw/b.dcm"), b"b").unwrap();
        fs::create_dir_all(base.join("1_t1")).unwrap();
        fs::write(base.join("1_t1/b.dcm"), b"existing").unwrap();

        let moves = vec![
            PlannedMove {
                from: base.join("raw/a.dcm"),
                to: base.join("1_t1/a.dcm"),
            },
            PlannedMove {
                from: base.join("raw/b.dcm"),
                to: base.join("1_t1/b.dcm"),
            },
            PlannedMove {
                from: base.join("raw/missing.dcm"),
                to: base.join("1_t1/missing.dcm"),
            },
        ];

        let report = apply_moves(&moves);

        assert_eq!(report.moved, 1);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(fs::read(base.join("1_t1/a.dcm")).unwrap(), b"a");
        assert_eq!(fs::read(base.join("1_t1/b.dcm")).unwrap(), b"existing");
        assert!(base.join("raw/b.dcm").exists());
    }
}
