//! Write-side sinks: summary CSV, folder reorganization and NIfTI conversion
//!
//! Nothing here feeds back into resolution.

pub mod convert;
pub mod csv;
pub mod organize;

pub use convert::{convert_all, convert_folder, Conversion, ConverterConfig};
pub use csv::{default_summary_path, merge_outcomes, write_summary, write_summary_file};
pub use organize::{apply_moves, plan_moves, MoveReport, PlannedMove};
