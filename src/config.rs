//! Pipeline configuration
//!
//! Every option is resolved once before the pipeline starts; nothing is probed
//! again at individual call sites.

use serde::Deserialize;
use std::path::PathBuf;

/// Where the assembled voxels live between assembly and encoding
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScratchStorage {
    /// One `Vec<f32>` for the whole volume
    Memory,
    /// A temporary raw file, deleted when the volume is dropped
    Disk { dir: Option<PathBuf> },
}

impl Default for ScratchStorage {
    fn default() -> Self {
        Self::Disk { dir: None }
    }
}

/// How the display window is derived from the volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStrategy {
    /// Scan at most `max_samples` evenly spaced slices
    Sampled { max_samples: usize },
    /// Scan every slice
    Exact,
}

impl Default for WindowStrategy {
    fn default() -> Self {
        Self::Sampled { max_samples: 5 }
    }
}

/// What to do with slices whose rows/columns differ from the first slice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionPolicy {
    /// Drop the slice and record an error entry
    #[default]
    Skip,
    /// Abort the run
    Reject,
}

/// Checkpoint interval per heavy loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub indexing_every: usize,
    pub assembly_every: usize,
    pub encoder_every: usize,
    pub mpr_every: usize,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            indexing_every: 50,
            assembly_every: 10,
            encoder_every: 10,
            mpr_every: 10,
        }
    }
}

/// Which volume writers run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormatSet {
    pub vti: bool,
    pub nrrd: bool,
    pub nifti: bool,
    pub stl: bool,
    pub vtk_legacy: bool,
}

impl FormatSet {
    #[must_use]
    pub fn none() -> Self {
        Self {
            vti: false,
            nrrd: false,
            nifti: false,
            stl: false,
            vtk_legacy: false,
        }
    }
}

impl Default for FormatSet {
    fn default() -> Self {
        Self {
            vti: true,
            nrrd: true,
            nifti: true,
            stl: true,
            vtk_legacy: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Defaults to the input directory
    pub output_dir: Option<PathBuf>,
    pub scratch: ScratchStorage,
    pub window: WindowStrategy,
    pub dimension_policy: DimensionPolicy,
    pub checkpoints: CheckpointConfig,
    pub enable_memory_hints: bool,
    pub formats: FormatSet,
    pub render_slices: bool,
    pub generate_mpr: bool,
    pub slice_jpeg_quality: u8,
    pub mpr_jpeg_quality: u8,
    /// STL threshold; Otsu over the sampled slices when unset
    pub iso_level: Option<f32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            scratch: ScratchStorage::default(),
            window: WindowStrategy::default(),
            dimension_policy: DimensionPolicy::default(),
            checkpoints: CheckpointConfig::default(),
            enable_memory_hints: true,
            formats: FormatSet::default(),
            render_slices: true,
            generate_mpr: true,
            slice_jpeg_quality: 90,
            mpr_jpeg_quality: 85,
            iso_level: None,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_scratch(mut self, scratch: ScratchStorage) -> Self {
        self.scratch = scratch;
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: WindowStrategy) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn with_dimension_policy(mut self, policy: DimensionPolicy) -> Self {
        self.dimension_policy = policy;
        self
    }

    #[must_use]
    pub fn with_formats(mut self, formats: FormatSet) -> Self {
        self.formats = formats;
        self
    }

    #[must_use]
    pub fn with_mpr(mut self, enabled: bool) -> Self {
        self.generate_mpr = enabled;
        self
    }

    #[must_use]
    pub fn with_slice_renders(mut self, enabled: bool) -> Self {
        self.render_slices = enabled;
        self
    }

    #[must_use]
    pub fn with_iso_level(mut self, level: f32) -> Self {
        self.iso_level = Some(level);
        self
    }

    /// Load from a JSON document; missing fields keep their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
