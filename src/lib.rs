//! Convert a directory of DICOM slices into volumetric, mesh and image
//! artifacts: VTI, legacy VTK, NIfTI-1, NRRD, an STL isosurface, per-slice
//! JPEG renders and multi-planar reconstructions.

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod dicom;
pub mod encoders;
pub mod error;
pub mod image;
pub mod mpr;
pub mod pipeline;
pub mod render;
pub mod slice_index;
pub mod types;
pub mod volume;
pub mod window;

// Re-export commonly used items
pub use config::PipelineConfig;
pub use error::{ConvertError, ErrorEntry, Result};
pub use pipeline::{ProcessingReport, process_directory};
