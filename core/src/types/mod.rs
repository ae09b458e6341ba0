//! Core type definitions for MR series metadata
//!
//! This module provides the fundamental types used throughout the mricat library:
//! - [`ImageRecord`]: Flat per-file header record, including [`VendorFields`]
//! - [`SeriesDescriptor`]: Canonical per-series description
//! - [`SeriesOutcome`]: Resolved descriptor or isolated per-series failure
//! - [`ImageType`]: Decomposed DICOM ImageType field
//! - [`AccelerationMode`] and [`TileMatrix`]: Parsed vendor text tokens
//! - [`ExtractConfig`]: Explicit configuration for one extraction run

mod acceleration;
mod config;
mod descriptor;
mod enums;
mod image_type;
mod pixel_spacing;
mod record;

pub use acceleration::{AccelerationMode, TileMatrix};
pub use config::{default_workers, ExtractConfig, DEFAULT_MAX_DEPTH};
pub use descriptor::{Dimensions, DiffusionSummary, Extent, SeriesDescriptor, SeriesOutcome};
pub use enums::{AcquisitionType, ImagePlane, PhaseEncodingDirection};
pub use image_type::ImageType;
pub use pixel_spacing::PixelSpacing;
pub use record::{ImageRecord, SeriesNumber, VendorFields};
