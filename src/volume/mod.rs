//! Assembled scalar volume
//!
//! A [`Volume`] owns its geometry and its scratch voxel store. It has one
//! writer (the assembler) and, once assembly returns, only readers. Dropping it
//! frees the buffer or deletes the scratch file.

mod assembler;
mod store;

pub use assembler::{Assembly, SliceEvent, SliceObserver, VolumeAssembler};
pub use store::{ByteOrder, VoxelStore};

use crate::checkpoint::Checkpoint;
use crate::config::ScratchStorage;
use crate::error::Result;
use crate::types::{VolumeDimensions, VolumeGeometry};
use std::io::Write;

/// Raw stream buffer size used by the binary writers
pub const STREAM_CHUNK_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug)]
pub struct Volume {
    geometry: VolumeGeometry,
    store: VoxelStore,
}

impl Volume {
    /// Zero-filled volume backed by `storage`
    pub fn allocate(geometry: VolumeGeometry, storage: &ScratchStorage) -> Result<Self> {
        let store = VoxelStore::create(storage, geometry.dimensions.voxel_count())?;
        Ok(Self { geometry, store })
    }

    /// In-memory volume from a prepared buffer, truncated or zero-padded to fit
    #[must_use]
    pub fn from_voxels(geometry: VolumeGeometry, mut voxels: Vec<f32>) -> Self {
        voxels.resize(geometry.dimensions.voxel_count(), 0.0);
        Self {
            geometry,
            store: VoxelStore::Memory(voxels),
        }
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> VolumeDimensions {
        self.geometry.dimensions
    }

    #[inline]
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        (self.geometry.dimensions.voxel_count() * std::mem::size_of::<f32>()) as u64
    }

    pub(crate) fn write_slice(&mut self, z: usize, data: &[f32]) -> Result<()> {
        let slice_len = self.geometry.dimensions.slice_len();
        self.store.write_slice(slice_len, z, data)
    }

    /// Read slice `z` into a caller-owned buffer of `rows*columns` floats
    pub fn read_slice_into(&self, z: usize, out: &mut [f32]) -> Result<()> {
        self.store.read_slice(z, out)
    }

    pub fn read_slice(&self, z: usize) -> Result<Vec<f32>> {
        let mut out = vec![0.0; self.geometry.dimensions.slice_len()];
        self.read_slice_into(z, &mut out)?;
        Ok(out)
    }

    /// Stream the raw float32 voxels without loading them whole
    ///
    /// `checkpoint` ticks once per chunk.
    pub fn copy_raw<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        order: ByteOrder,
        chunk_bytes: usize,
        checkpoint: &Checkpoint,
    ) -> Result<u64> {
        self.store.copy_raw(
            self.geometry.dimensions.voxel_count(),
            writer,
            order,
            chunk_bytes,
            |i| {
                checkpoint.tick(i);
            },
        )
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory volume whose voxel at `(x, y, z)` is `f(x, y, z)`
    pub fn volume_from_fn(
        columns: usize,
        rows: usize,
        depth: usize,
        f: impl Fn(usize, usize, usize) -> f32,
    ) -> Volume {
        let dimensions = VolumeDimensions::new(rows, columns, depth);
        let mut voxels = vec![0.0; dimensions.voxel_count()];
        for z in 0..depth {
            for y in 0..rows {
                for x in 0..columns {
                    voxels[dimensions.index(x, y, z)] = f(x, y, z);
                }
            }
        }
        let geometry = VolumeGeometry {
            dimensions,
            spacing: [1.0, 1.0, 1.0],
            origin: [0.0, 0.0, 0.0],
        };
        Volume::from_voxels(geometry, voxels)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::volume_from_fn;
    use super::*;

    #[test]
    fn test_read_slice_matches_layout() {
        let volume = volume_from_fn(3, 2, 2, |x, y, z| (100 * z + 10 * y + x) as f32);
        assert_eq!(volume.read_slice(1).unwrap(), [100.0, 101.0, 102.0, 110.0, 111.0, 112.0]);
        assert_eq!(volume.byte_len(), 48);
    }

    #[test]
    fn test_from_voxels_pads_short_buffer() {
        let geometry = VolumeGeometry {
            dimensions: VolumeDimensions::new(2, 2, 1),
            spacing: [1.0; 3],
            origin: [0.0; 3],
        };
        let volume = Volume::from_voxels(geometry, vec![1.0]);
        assert_eq!(volume.read_slice(0).unwrap(), [1.0, 0.0, 0.0, 0.0]);
    }
}
