//! Per-slice JPEG and bump-map renders, piggybacked on volume assembly

use crate::dicom::{DicomInfo, ImageAttributes, PixelSamples};
use crate::error::{ConvertError, ErrorEntry, Result};
use crate::image::{bump_map, render_slice, slice_window, write_jpeg};
use crate::slice_index::Slice;
use crate::volume::{SliceEvent, SliceObserver};
use image::DynamicImage;
use log::{debug, warn};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Artifacts rendered for one source slice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFile {
    pub source: PathBuf,
    pub jpg_path: PathBuf,
    pub bump_map_path: PathBuf,
    pub dicom_info: DicomInfo,
}

/// `<source>.jpg` next to the source file
#[must_use]
pub fn jpeg_path_for(source: &Path) -> PathBuf {
    with_suffix(source, ".jpg")
}

/// `<source>_bump.jpg` next to the source file
#[must_use]
pub fn bump_path_for(source: &Path) -> PathBuf {
    with_suffix(source, "_bump.jpg")
}

fn with_suffix(source: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(source.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Renders every assembled slice to `<source>.jpg` and `<source>_bump.jpg`
#[derive(Debug)]
pub struct SliceRenderer {
    quality: u8,
    processed: Vec<ProcessedFile>,
    errors: Vec<ErrorEntry>,
}

impl SliceRenderer {
    #[must_use]
    pub fn new(quality: u8) -> Self {
        Self {
            quality,
            processed: Vec::new(),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<ProcessedFile>, Vec<ErrorEntry>) {
        (self.processed, self.errors)
    }

    fn render(
        &self,
        slice: &Slice,
        attributes: &ImageAttributes,
        samples: &PixelSamples,
    ) -> Result<ProcessedFile> {
        let source = slice.file_path.as_path();
        let window = slice_window(attributes, samples);
        let rendered = render_slice(attributes, samples, &window);

        let jpg_path = jpeg_path_for(source);
        write_jpeg(&rendered, &jpg_path, self.quality)?;

        let gray = DynamicImage::ImageRgb8(rendered).into_luma8();
        let bump_map_path = bump_path_for(source);
        write_jpeg(&bump_map(&gray), &bump_map_path, self.quality)?;

        debug!("Rendered {} with window {window}", jpg_path.display());
        Ok(ProcessedFile {
            source: slice.file_path.clone(),
            jpg_path,
            bump_map_path,
            dicom_info: DicomInfo::new(attributes, slice.position, slice.spacing),
        })
    }

    fn record_failure(&mut self, source: &Path, err: &ConvertError) {
        warn!("Failed to render {}: {err}", source.display());
        self.errors
            .push(ErrorEntry::new("jpg", err).with_file(source.display().to_string()));
    }
}

impl SliceObserver for SliceRenderer {
    fn on_slice(&mut self, event: &SliceEvent<'_>) {
        let source = &event.slice.file_path;
        let rendered = match event.decoded {
            Ok((attributes, samples)) => self.render(event.slice, attributes, samples),
            Err(e) => {
                self.record_failure(source, e);
                return;
            }
        };

        match rendered {
            Ok(file) => self.processed.push(file),
            Err(e) => self.record_failure(source, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{Checkpoint, Stage};
    use crate::config::{DimensionPolicy, ScratchStorage};
    use crate::dicom::testing::{Pixels, SliceFixture};
    use crate::slice_index::{discover_dicom_files, index_slices};
    use crate::volume::VolumeAssembler;

    #[test]
    fn test_artifact_paths() {
        let source = Path::new("/data/series/IM0001.dcm");
        assert_eq!(jpeg_path_for(source), Path::new("/data/series/IM0001.dcm.jpg"));
        assert_eq!(bump_path_for(source), Path::new("/data/series/IM0001.dcm_bump.jpg"));
    }

    #[test]
    fn test_renders_during_assembly_and_records_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = SliceFixture::u16(4, 4, (0..16).map(|v| v * 100).collect())
            .at_z(0.0)
            .write_to(&dir.path().join("good.dcm"));
        let mut odd = SliceFixture::u16(4, 4, Vec::new()).at_z(1.0);
        odd.pixels = Pixels::Float(vec![0.0; 16]);
        let odd = odd.write_to(&dir.path().join("odd.dcm"));

        let files = discover_dicom_files(dir.path());
        let index =
            index_slices(&files, DimensionPolicy::Skip, &Checkpoint::disabled(Stage::Indexing))
                .unwrap();

        let mut renderer = SliceRenderer::new(90);
        VolumeAssembler::new(ScratchStorage::Memory, Checkpoint::disabled(Stage::Assembly))
            .assemble(&index.slices, Some(&mut renderer))
            .unwrap();
        let (processed, errors) = renderer.into_parts();

        assert_eq!(processed.len(), 1);
        assert_eq!(processed[0].source, good);
        assert!(processed[0].jpg_path.exists());
        assert!(processed[0].bump_map_path.exists());
        assert_eq!(processed[0].dicom_info.image_position, [0.0, 0.0, 0.0]);
        assert_eq!((processed[0].dicom_info.rows, processed[0].dicom_info.columns), (4, 4));

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].converter, "jpg");
        assert_eq!(errors[0].file.as_deref(), Some(odd.display().to_string().as_str()));
        assert!(!jpeg_path_for(&odd).exists());
    }
}
