//! Single-file NIfTI-1 (`.nii`)

use super::VolumeEncoder;
use crate::checkpoint::Checkpoint;
use crate::error::{ConvertError, Result};
use crate::types::VolumeGeometry;
use crate::volume::{ByteOrder, STREAM_CHUNK_BYTES, Volume};
use std::io::Write;

pub(super) const NAME: &str = "nifti";

pub const NIFTI_HEADER_SIZE: usize = 348;
const VOX_OFFSET: f32 = 352.0;
const DT_FLOAT32: i16 = 16;
const NIFTI_UNITS_MM: u8 = 2;
const DESCRIPTION: &[u8] = b"DICOM to NIfTI conversion";

#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiEncoder;

fn put_i16(header: &mut [u8], offset: usize, value: i16) {
    header[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_f32(header: &mut [u8], offset: usize, value: f32) {
    header[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_f32s(header: &mut [u8], offset: usize, values: &[f32]) {
    for (i, &value) in values.iter().enumerate() {
        put_f32(header, offset + 4 * i, value);
    }
}

fn dim(value: usize, axis: &str) -> Result<i16> {
    i16::try_from(value).map_err(|_| ConvertError::VolumeTooLarge {
        format: NAME,
        reason: format!("{axis} of {value} exceeds the int16 dim field"),
    })
}

/// Build the 348-byte little-endian header
///
/// # Errors
///
/// `VolumeTooLarge` if any dimension does not fit an int16
pub fn nifti_header(geometry: &VolumeGeometry) -> Result<[u8; NIFTI_HEADER_SIZE]> {
    let dims = geometry.dimensions;
    let columns = dim(dims.columns, "columns")?;
    let rows = dim(dims.rows, "rows")?;
    let depth = dim(dims.depth, "depth")?;
    let [sx, sy, sz] = geometry.spacing.map(|v| v as f32);
    let [ox, oy, oz] = geometry.origin.map(|v| v as f32);

    let mut header = [0u8; NIFTI_HEADER_SIZE];
    header[0..4].copy_from_slice(&(NIFTI_HEADER_SIZE as i32).to_le_bytes());
    header[38] = b'r';

    for (i, value) in [3, columns, rows, depth, 1, 1, 1, 1].into_iter().enumerate() {
        put_i16(&mut header, 40 + 2 * i, value);
    }
    put_i16(&mut header, 70, DT_FLOAT32);
    put_i16(&mut header, 72, 32);
    put_f32s(&mut header, 76, &[1.0, sx, sy, sz, 1.0, 0.0, 0.0, 0.0]);
    put_f32(&mut header, 108, VOX_OFFSET);
    put_f32(&mut header, 112, 1.0);
    put_f32(&mut header, 116, 0.0);
    header[123] = NIFTI_UNITS_MM;
    header[148..148 + DESCRIPTION.len()].copy_from_slice(DESCRIPTION);

    // qform and sform both scanner-anatomical
    put_i16(&mut header, 252, 1);
    put_i16(&mut header, 254, 1);
    put_f32s(&mut header, 268, &[ox, oy, oz]);
    put_f32s(&mut header, 280, &[sx, 0.0, 0.0, ox]);
    put_f32s(&mut header, 296, &[0.0, sy, 0.0, oy]);
    put_f32s(&mut header, 312, &[0.0, 0.0, sz, oz]);

    header[344..348].copy_from_slice(b"n+1\0");
    Ok(header)
}

impl VolumeEncoder for NiftiEncoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn file_name(&self) -> &'static str {
        "volume.nii"
    }

    fn encode(&self, volume: &Volume, writer: &mut dyn Write, checkpoint: &Checkpoint) -> Result<()> {
        let header = nifti_header(volume.geometry())?;
        writer.write_all(&header)?;
        // Empty extension block, pads the data to vox_offset
        writer.write_all(&[0u8; 4])?;
        volume.copy_raw(writer, ByteOrder::Little, STREAM_CHUNK_BYTES, checkpoint)?;
        Ok(())
    }
}
