use crate::config::{DimensionPolicy, PipelineConfig, ScratchStorage, WindowStrategy};
use clap::Parser;
use std::path::PathBuf;

/// Convert a directory of DICOM slices into volume, mesh and image files
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory searched recursively for .dcm files
    #[arg(value_name = "DIR")]
    pub input: PathBuf,

    /// Output directory (defaults to the input directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON pipeline configuration; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep the whole volume in memory instead of a scratch file
    #[arg(long, conflicts_with = "scratch_dir")]
    pub in_memory: bool,

    /// Directory for the scratch volume file
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Scan every slice for the display window instead of sampling
    #[arg(long)]
    pub exact_window: bool,

    /// Abort when a slice's rows/columns differ from the first slice
    #[arg(long)]
    pub strict_dimensions: bool,

    /// Fixed STL isosurface threshold (Otsu when omitted)
    #[arg(long)]
    pub iso_level: Option<f32>,

    /// Skip per-slice JPEG and bump-map renders
    #[arg(long)]
    pub no_slices: bool,

    /// Skip multi-planar reconstruction
    #[arg(long)]
    pub no_mpr: bool,

    /// Disable periodic checkpoints in the heavy loops
    #[arg(long)]
    pub no_memory_hints: bool,
}

impl Args {
    /// Overlay the command-line flags onto `base`
    #[must_use]
    pub fn apply(&self, mut base: PipelineConfig) -> PipelineConfig {
        if let Some(output) = &self.output {
            base.output_dir = Some(output.clone());
        }
        if self.in_memory {
            base.scratch = ScratchStorage::Memory;
        } else if let Some(dir) = &self.scratch_dir {
            base.scratch = ScratchStorage::Disk {
                dir: Some(dir.clone()),
            };
        }
        if self.exact_window {
            base.window = WindowStrategy::Exact;
        }
        if self.strict_dimensions {
            base.dimension_policy = DimensionPolicy::Reject;
        }
        if let Some(level) = self.iso_level {
            base.iso_level = Some(level);
        }
        if self.no_slices {
            base.render_slices = false;
        }
        if self.no_mpr {
            base.generate_mpr = false;
        }
        if self.no_memory_hints {
            base.enable_memory_hints = false;
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "dicom-volumize",
            "/data/series",
            "--output",
            "/out",
            "--in-memory",
            "--exact-window",
            "--iso-level",
            "250",
            "--no-mpr",
        ]);
        let config = args.apply(PipelineConfig::default());

        assert_eq!(config.output_dir, Some(PathBuf::from("/out")));
        assert_eq!(config.scratch, ScratchStorage::Memory);
        assert_eq!(config.window, WindowStrategy::Exact);
        assert_eq!(config.iso_level, Some(250.0));
        assert!(!config.generate_mpr);
        assert!(config.render_slices);
    }

    #[test]
    fn test_no_flags_keep_base() {
        let args = Args::parse_from(["dicom-volumize", "in"]);
        let base = PipelineConfig::default().with_mpr(false);
        assert_eq!(args.apply(base.clone()), base);
    }

    #[test]
    fn test_memory_and_scratch_dir_conflict() {
        let parsed = Args::try_parse_from([
            "dicom-volumize",
            "in",
            "--in-memory",
            "--scratch-dir",
            "/tmp",
        ]);
        assert!(parsed.is_err());
    }
}
