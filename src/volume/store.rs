//! Scratch voxel storage
//!
//! Slice `z` occupies floats `[z*slice_len, (z+1)*slice_len)` in both
//! variants. The disk variant keeps them little-endian in a temporary file
//! that is deleted when the store is dropped.

use crate::config::ScratchStorage;
use crate::error::Result;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

const FLOAT_BYTES: usize = std::mem::size_of::<f32>();

#[derive(Debug)]
pub enum VoxelStore {
    Memory(Vec<f32>),
    Disk(NamedTempFile),
}

/// Byte order for raw float streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    #[inline(always)]
    fn encode(self, value: f32) -> [u8; 4] {
        match self {
            Self::Little => value.to_le_bytes(),
            Self::Big => value.to_be_bytes(),
        }
    }
}

impl VoxelStore {
    /// Zero-initialized store for `voxel_count` floats
    pub fn create(storage: &ScratchStorage, voxel_count: usize) -> Result<Self> {
        match storage {
            ScratchStorage::Memory => Ok(Self::Memory(vec![0.0; voxel_count])),
            ScratchStorage::Disk { dir } => {
                let file = match dir {
                    Some(dir) => tempfile::Builder::new()
                        .prefix("volume_")
                        .suffix(".raw")
                        .tempfile_in(dir)?,
                    None => tempfile::Builder::new()
                        .prefix("volume_")
                        .suffix(".raw")
                        .tempfile()?,
                };
                file.as_file().set_len((voxel_count * FLOAT_BYTES) as u64)?;
                Ok(Self::Disk(file))
            }
        }
    }

    pub fn write_slice(&mut self, slice_len: usize, z: usize, data: &[f32]) -> Result<()> {
        debug_assert_eq!(data.len(), slice_len);
        match self {
            Self::Memory(voxels) => {
                let start = z * slice_len;
                voxels[start..start + slice_len].copy_from_slice(data);
            }
            Self::Disk(file) => {
                let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
                let file = file.as_file_mut();
                file.seek(SeekFrom::Start((z * slice_len * FLOAT_BYTES) as u64))?;
                file.write_all(&bytes)?;
            }
        }
        Ok(())
    }

    /// Fill `out` with slice `z`; `out.len()` is the slice length
    pub fn read_slice(&self, z: usize, out: &mut [f32]) -> Result<()> {
        let slice_len = out.len();
        match self {
            Self::Memory(voxels) => {
                let start = z * slice_len;
                out.copy_from_slice(&voxels[start..start + slice_len]);
            }
            Self::Disk(file) => {
                let mut bytes = vec![0u8; slice_len * FLOAT_BYTES];
                let mut reader: &File = file.as_file();
                reader.seek(SeekFrom::Start((z * slice_len * FLOAT_BYTES) as u64))?;
                reader.read_exact(&mut bytes)?;
                for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(FLOAT_BYTES)) {
                    *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                }
            }
        }
        Ok(())
    }

    /// Stream all voxels to `writer` in `order`, `chunk_bytes` at a time
    ///
    /// `on_chunk` runs after each chunk with its index. Returns the number of
    /// bytes written.
    pub fn copy_raw<W: Write + ?Sized>(
        &self,
        voxel_count: usize,
        writer: &mut W,
        order: ByteOrder,
        chunk_bytes: usize,
        mut on_chunk: impl FnMut(usize),
    ) -> Result<u64> {
        let chunk_floats = (chunk_bytes / FLOAT_BYTES).max(1);
        let mut buffer = Vec::with_capacity(chunk_floats * FLOAT_BYTES);

        match self {
            Self::Memory(voxels) => {
                for (i, chunk) in voxels[..voxel_count].chunks(chunk_floats).enumerate() {
                    buffer.clear();
                    buffer.extend(chunk.iter().flat_map(|&v| order.encode(v)));
                    writer.write_all(&buffer)?;
                    on_chunk(i);
                }
            }
            Self::Disk(file) => {
                let mut reader: &File = file.as_file();
                reader.seek(SeekFrom::Start(0))?;
                let mut remaining = voxel_count * FLOAT_BYTES;
                let mut i = 0;
                while remaining > 0 {
                    let n = remaining.min(chunk_floats * FLOAT_BYTES);
                    buffer.resize(n, 0);
                    reader.read_exact(&mut buffer)?;
                    if order == ByteOrder::Big {
                        for word in buffer.chunks_exact_mut(FLOAT_BYTES) {
                            word.reverse();
                        }
                    }
                    writer.write_all(&buffer)?;
                    remaining -= n;
                    on_chunk(i);
                    i += 1;
                }
            }
        }

        Ok((voxel_count * FLOAT_BYTES) as u64)
    }
}
