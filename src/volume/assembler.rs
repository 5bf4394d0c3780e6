use super::Volume;
use crate::checkpoint::Checkpoint;
use crate::config::ScratchStorage;
use crate::dicom::{self, DicomFile, ImageAttributes, PixelSamples};
use crate::error::{ConvertError, ErrorEntry, Result};
use crate::slice_index::Slice;
use crate::types::{VolumeDimensions, VolumeGeometry};
use log::{debug, info, warn};

/// Everything known about one slice at the moment it was assembled
pub struct SliceEvent<'a> {
    /// Depth index after sorting
    pub index: usize,
    pub slice: &'a Slice,
    /// The file's bytes; empty if the file could not be read
    pub raw: &'a [u8],
    /// `None` if the bytes did not parse as DICOM
    pub dataset: Option<&'a DicomFile>,
    pub decoded: std::result::Result<(&'a ImageAttributes, &'a PixelSamples), &'a ConvertError>,
}

/// Per-slice work piggybacked on the assembly pass
///
/// Called once per slice, in depth order, including slices whose extraction
/// failed.
pub trait SliceObserver {
    fn on_slice(&mut self, event: &SliceEvent<'_>);
}

/// The assembled volume plus recoverable per-slice failures
#[derive(Debug)]
pub struct Assembly {
    pub volume: Volume,
    pub errors: Vec<ErrorEntry>,
}

/// Streams the sorted slices into a scratch volume, one slice resident at a time
#[derive(Debug)]
pub struct VolumeAssembler {
    storage: ScratchStorage,
    checkpoint: Checkpoint,
}

impl VolumeAssembler {
    #[must_use]
    pub fn new(storage: ScratchStorage, checkpoint: Checkpoint) -> Self {
        Self {
            storage,
            checkpoint,
        }
    }

    /// Build the volume in a single pass over `slices`
    ///
    /// The first slice defines rows, columns, spacing and origin. A slice
    /// whose pixels cannot be extracted is written as zeros.
    ///
    /// # Errors
    ///
    /// `NoSlicesFound` for an empty list; I/O errors from the scratch store
    pub fn assemble(
        &self,
        slices: &[Slice],
        mut observer: Option<&mut dyn SliceObserver>,
    ) -> Result<Assembly> {
        let first = slices.first().ok_or(ConvertError::NoSlicesFound)?;
        let geometry = VolumeGeometry {
            dimensions: VolumeDimensions::new(
                first.rows as usize,
                first.columns as usize,
                slices.len(),
            ),
            spacing: first.spacing,
            origin: first.position,
        };
        info!("Assembling {} volume", geometry.dimensions);
        self.checkpoint.mark("volume-start");

        let mut volume = Volume::allocate(geometry, &self.storage)?;
        let slice_len = geometry.dimensions.slice_len();
        let mut buffer = vec![0.0f32; slice_len];
        let mut errors = Vec::new();

        for (z, slice) in slices.iter().enumerate() {
            buffer.fill(0.0);

            let raw = match std::fs::read(&slice.file_path) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Failed to read {}: {e}", slice.file_path.display());
                    Vec::new()
                }
            };
            let dataset = dicom::parse_dicom_bytes(&raw);
            let decoded = dataset
                .as_ref()
                .map_err(|e| ConvertError::UnparseableSlice {
                    path: slice.file_path.clone(),
                    reason: e.to_string(),
                })
                .and_then(dicom::extract_slice_samples);

            if let Ok((attributes, samples)) = &decoded {
                let n = samples.len().min(slice_len);
                for (i, value) in buffer[..n].iter_mut().enumerate() {
                    *value = attributes.rescale.apply(samples.get(i)) as f32;
                }
                debug!("Slice {z}: {n} samples from {}", slice.file_path.display());
            }

            volume.write_slice(z, &buffer)?;

            if let Some(observer) = observer.as_deref_mut() {
                let event = SliceEvent {
                    index: z,
                    slice,
                    raw: &raw,
                    dataset: dataset.as_ref().ok(),
                    decoded: decoded.as_ref().map(|(a, s)| (a, s)),
                };
                observer.on_slice(&event);
            }

            if let Err(source) = decoded {
                let err = ConvertError::SliceExtractionFailed {
                    index: z,
                    source: Box::new(source),
                };
                warn!("{err}; substituting zeros");
                errors.push(
                    ErrorEntry::new("volume", &err).with_file(slice.file_path.display().to_string()),
                );
            }

            self.checkpoint.tick(z);
        }

        self.checkpoint.mark("volume-done");
        info!(
            "Assembled {} slices ({} zero-filled)",
            slices.len(),
            errors.len()
        );
        Ok(Assembly { volume, errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{CheckpointHook, Stage};
    use crate::config::DimensionPolicy;
    use crate::dicom::testing::{Pixels, SliceFixture, write_ramp_series};
    use crate::slice_index::{discover_dicom_files, index_slices};
    use std::sync::{Arc, Mutex};

    fn index(dir: &std::path::Path) -> Vec<Slice> {
        let files = discover_dicom_files(dir);
        index_slices(&files, DimensionPolicy::Skip, &Checkpoint::disabled(Stage::Indexing))
            .unwrap()
            .slices
    }

    #[derive(Default)]
    struct Recorder {
        seen: Vec<(usize, bool, usize)>,
    }

    impl SliceObserver for Recorder {
        fn on_slice(&mut self, event: &SliceEvent<'_>) {
            self.seen
                .push((event.index, event.decoded.is_ok(), event.raw.len()));
        }
    }

    #[test]
    fn test_depth_equals_indexed_slices() {
        let dir = tempfile::tempdir().unwrap();
        write_ramp_series(dir.path(), 4);
        let slices = index(dir.path());

        for storage in [ScratchStorage::Memory, ScratchStorage::default()] {
            let assembler = VolumeAssembler::new(storage, Checkpoint::disabled(Stage::Assembly));
            let assembly = assembler.assemble(&slices, None).unwrap();
            let volume = &assembly.volume;

            assert_eq!(volume.dimensions(), VolumeDimensions::new(4, 4, 4));
            assert!(assembly.errors.is_empty());
            let slice = volume.read_slice(3).unwrap();
            assert_eq!(slice[15], 60.0);
            assert_eq!(slice[1], 4.0);
        }
    }

    #[test]
    fn test_rescale_and_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = SliceFixture::u16(1, 2, vec![10, 20]).at_z(-4.0);
        fixture.rescale = Some((2.0, -1024.0));
        fixture.pixel_spacing = Some([0.5, 0.25]);
        fixture.slice_thickness = Some(3.0);
        fixture.write_to(&dir.path().join("a.dcm"));

        let slices = index(dir.path());
        let assembler =
            VolumeAssembler::new(ScratchStorage::Memory, Checkpoint::disabled(Stage::Assembly));
        let volume = assembler.assemble(&slices, None).unwrap().volume;

        assert_eq!(volume.read_slice(0).unwrap(), [-1004.0, -984.0]);
        assert_eq!(volume.geometry().spacing, [0.5, 0.25, 3.0]);
        assert_eq!(volume.geometry().origin, [0.0, 0.0, -4.0]);
    }

    #[test]
    fn test_failed_slice_is_zero_filled_and_observed() {
        let dir = tempfile::tempdir().unwrap();
        SliceFixture::u16(2, 2, vec![1, 2, 3, 4]).at_z(0.0).write_to(&dir.path().join("a.dcm"));
        let mut broken = SliceFixture::u16(2, 2, Vec::new()).at_z(1.0);
        broken.pixels = Pixels::Float(vec![1.0, 2.0, 3.0, 4.0]);
        broken.write_to(&dir.path().join("b.dcm"));
        SliceFixture::u16(2, 2, vec![5, 6, 7, 8]).at_z(2.0).write_to(&dir.path().join("c.dcm"));

        let slices = index(dir.path());
        let mut recorder = Recorder::default();
        let assembler =
            VolumeAssembler::new(ScratchStorage::Memory, Checkpoint::disabled(Stage::Assembly));
        let assembly = assembler.assemble(&slices, Some(&mut recorder)).unwrap();

        assert_eq!(assembly.volume.dimensions().depth, 3);
        assert_eq!(assembly.volume.read_slice(1).unwrap(), [0.0; 4]);
        assert_eq!(assembly.volume.read_slice(2).unwrap(), [5.0, 6.0, 7.0, 8.0]);
        assert_eq!(assembly.errors.len(), 1);
        assert_eq!(assembly.errors[0].converter, "volume");

        let outcomes: Vec<_> = recorder.seen.iter().map(|&(i, ok, _)| (i, ok)).collect();
        assert_eq!(outcomes, [(0, true), (1, false), (2, true)]);
        assert!(recorder.seen.iter().all(|&(_, _, len)| len > 0));
    }

    #[test]
    fn test_long_payload_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        SliceFixture::u16(1, 2, vec![7, 8, 9, 10]).write_to(&dir.path().join("a.dcm"));

        let slices = index(dir.path());
        let assembler =
            VolumeAssembler::new(ScratchStorage::Memory, Checkpoint::disabled(Stage::Assembly));
        let volume = assembler.assemble(&slices, None).unwrap().volume;
        assert_eq!(volume.read_slice(0).unwrap(), [7.0, 8.0]);
    }

    #[test]
    fn test_checkpoint_every_interval() {
        let dir = tempfile::tempdir().unwrap();
        write_ramp_series(dir.path(), 12);
        let slices = index(dir.path());

        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&ticks);
        let hook: CheckpointHook = Arc::new(move |_, i| sink.lock().unwrap().push(i));
        let checkpoint = Checkpoint::new(Stage::Assembly, 10, true, Some(hook));

        VolumeAssembler::new(ScratchStorage::Memory, checkpoint)
            .assemble(&slices, None)
            .unwrap();

        // Two stage markers bracket the per-slice ticks
        assert_eq!(*ticks.lock().unwrap(), [usize::MAX, 0, 10, usize::MAX]);
    }
}
