//! Attached-header NRRD (`.nrrd`)

use super::VolumeEncoder;
use crate::checkpoint::Checkpoint;
use crate::error::Result;
use crate::volume::{ByteOrder, STREAM_CHUNK_BYTES, Volume};
use std::io::Write;

pub(super) const NAME: &str = "nrrd";

#[derive(Debug, Clone, Copy, Default)]
pub struct NrrdEncoder;

fn header(volume: &Volume) -> String {
    let geometry = volume.geometry();
    let dims = geometry.dimensions;
    let [sx, sy, sz] = geometry.spacing;
    let [ox, oy, oz] = geometry.origin;

    // The blank line terminates the header
    format!(
        "NRRD0004\n\
         # Complete NRRD file format specification at:\n\
         # http://teem.sourceforge.net/nrrd/format.html\n\
         type: float\n\
         dimension: 3\n\
         space: left-posterior-superior\n\
         sizes: {} {} {}\n\
         space directions: ({sx},0,0) (0,{sy},0) (0,0,{sz})\n\
         kinds: domain domain domain\n\
         endian: little\n\
         encoding: raw\n\
         space origin: ({ox},{oy},{oz})\n\
         \n",
        dims.columns, dims.rows, dims.depth
    )
}

impl VolumeEncoder for NrrdEncoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn file_name(&self) -> &'static str {
        "volume.nrrd"
    }

    fn encode(&self, volume: &Volume, writer: &mut dyn Write, checkpoint: &Checkpoint) -> Result<()> {
        writer.write_all(header(volume).as_bytes())?;
        volume.copy_raw(writer, ByteOrder::Little, STREAM_CHUNK_BYTES, checkpoint)?;
        Ok(())
    }
}
