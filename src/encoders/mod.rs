//! Volume file writers
//!
//! Every writer consumes the same finished [`Volume`] read-only and produces
//! one file. Writers are isolated: a failure is logged, its partial file
//! removed, and the remaining writers still run.

mod isosurface;
mod nifti;
mod nrrd;
mod stl;
mod vti;
mod vtk;

pub use isosurface::{extract_isosurface, otsu_threshold};
pub use nifti::{NIFTI_HEADER_SIZE, NiftiEncoder, nifti_header};
pub use nrrd::NrrdEncoder;
pub use stl::StlEncoder;
pub use vti::VtiEncoder;
pub use vtk::VtkLegacyEncoder;

use crate::checkpoint::{Checkpoint, Stage};
use crate::config::{FormatSet, WindowStrategy};
use crate::error::{ErrorEntry, Result};
use crate::volume::Volume;
use log::{info, warn};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub trait VolumeEncoder {
    /// Converter name used in error entries
    fn name(&self) -> &'static str;

    /// Output file name inside the output directory
    fn file_name(&self) -> &'static str;

    fn encode(&self, volume: &Volume, writer: &mut dyn Write, checkpoint: &Checkpoint) -> Result<()>;

    /// Encode into `path`, creating or truncating it
    fn write_file(&self, volume: &Volume, path: &Path, checkpoint: &Checkpoint) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.encode(volume, &mut writer, checkpoint)?;
        writer.flush()?;
        Ok(())
    }
}

/// Paths of the volume files that were written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeArtifacts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vti: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nrrd: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nifti: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stl: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vtk_legacy: Option<PathBuf>,
}

impl VolumeArtifacts {
    fn slot(&mut self, name: &str) -> Option<&mut Option<PathBuf>> {
        match name {
            vti::NAME => Some(&mut self.vti),
            nrrd::NAME => Some(&mut self.nrrd),
            nifti::NAME => Some(&mut self.nifti),
            stl::NAME => Some(&mut self.stl),
            vtk::NAME => Some(&mut self.vtk_legacy),
            _ => None,
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        [&self.vti, &self.nrrd, &self.nifti, &self.stl, &self.vtk_legacy]
            .iter()
            .filter(|p| p.is_some())
            .count()
    }
}

/// The writers `formats` enables, in output order
#[must_use]
pub fn encoders_for(
    formats: &FormatSet,
    iso_level: Option<f32>,
    window: WindowStrategy,
) -> Vec<Box<dyn VolumeEncoder>> {
    let mut encoders: Vec<Box<dyn VolumeEncoder>> = Vec::new();
    if formats.vti {
        encoders.push(Box::new(VtiEncoder));
    }
    if formats.nrrd {
        encoders.push(Box::new(NrrdEncoder));
    }
    if formats.nifti {
        encoders.push(Box::new(NiftiEncoder));
    }
    if formats.stl {
        encoders.push(Box::new(StlEncoder::new(iso_level, window)));
    }
    if formats.vtk_legacy {
        encoders.push(Box::new(VtkLegacyEncoder));
    }
    encoders
}

/// Run every encoder against `volume`, isolating failures
pub fn encode_all(
    volume: &Volume,
    output_dir: &Path,
    encoders: &[Box<dyn VolumeEncoder>],
    checkpoint: &Checkpoint,
) -> (VolumeArtifacts, Vec<ErrorEntry>) {
    let mut artifacts = VolumeArtifacts::default();
    let mut errors = Vec::new();

    for encoder in encoders {
        let path = output_dir.join(encoder.file_name());
        let stage_checkpoint =
            checkpoint.for_stage(Stage::Encoding(encoder.name()), checkpoint.interval());
        info!("Writing {} to {}", encoder.name(), path.display());

        match encoder.write_file(volume, &path, &stage_checkpoint) {
            Ok(()) => {
                if let Some(slot) = artifacts.slot(encoder.name()) {
                    *slot = Some(path);
                }
            }
            Err(e) => {
                warn!("{} writer failed: {e}", encoder.name());
                if path.exists() {
                    if let Err(remove_err) = std::fs::remove_file(&path) {
                        warn!("Could not remove partial {}: {remove_err}", path.display());
                    }
                }
                errors.push(ErrorEntry::new(encoder.name(), &e));
            }
        }
    }

    (artifacts, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::testing::volume_from_fn;

    #[test]
    fn test_failing_writer_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        // Constant volume: every writer succeeds except the mesh
        let volume = volume_from_fn(3, 3, 3, |_, _, _| 1.0);
        let encoders = encoders_for(&FormatSet::default(), None, WindowStrategy::default());

        let (artifacts, errors) = encode_all(
            &volume,
            dir.path(),
            &encoders,
            &Checkpoint::disabled(Stage::Encoding("all")),
        );

        assert_eq!(artifacts.count(), 4);
        assert_eq!(artifacts.vti, Some(dir.path().join("volume.vti")));
        assert_eq!(artifacts.vtk_legacy, Some(dir.path().join("volume.vtk")));
        assert_eq!(artifacts.stl, None);
        assert!(!dir.path().join("model.stl").exists());

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].converter, "stl");
        assert!(errors[0].file.is_none());
    }

    #[test]
    fn test_format_selection() {
        let formats = FormatSet {
            nifti: true,
            ..FormatSet::none()
        };
        let encoders = encoders_for(&formats, Some(1.0), WindowStrategy::Exact);
        let names: Vec<_> = encoders.iter().map(|e| e.file_name()).collect();
        assert_eq!(names, ["volume.nii"]);
    }

    #[test]
    fn test_artifacts_serialize_camel_case() {
        let artifacts = VolumeArtifacts {
            vtk_legacy: Some(PathBuf::from("/out/volume.vtk")),
            ..VolumeArtifacts::default()
        };
        assert_eq!(
            serde_json::to_string(&artifacts).unwrap(),
            r#"{"vtkLegacy":"/out/volume.vtk"}"#
        );
    }
}
