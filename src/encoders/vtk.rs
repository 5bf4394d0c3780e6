//! Legacy VTK structured points
//!
//! Legacy `BINARY` payloads are big-endian, so the little-endian scratch
//! data is swapped while it streams through.

use super::VolumeEncoder;
use crate::checkpoint::Checkpoint;
use crate::error::Result;
use crate::volume::{ByteOrder, STREAM_CHUNK_BYTES, Volume};
use std::io::Write;

pub(super) const NAME: &str = "vtk";

#[derive(Debug, Clone, Copy, Default)]
pub struct VtkLegacyEncoder;

fn join(values: &[f64; 3]) -> String {
    format!("{} {} {}", values[0], values[1], values[2])
}

fn header(volume: &Volume) -> String {
    let geometry = volume.geometry();
    let dims = geometry.dimensions;
    format!(
        "# vtk DataFile Version 3.0\n\
         converted from DICOM\n\
         BINARY\n\
         DATASET STRUCTURED_POINTS\n\
         DIMENSIONS {} {} {}\n\
         ORIGIN {}\n\
         SPACING {}\n\
         POINT_DATA {}\n\
         SCALARS intensity float\n\
         LOOKUP_TABLE default\n",
        dims.columns,
        dims.rows,
        dims.depth,
        join(&geometry.origin),
        join(&geometry.spacing),
        dims.voxel_count()
    )
}

impl VolumeEncoder for VtkLegacyEncoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn file_name(&self) -> &'static str {
        "volume.vtk"
    }

    fn encode(&self, volume: &Volume, writer: &mut dyn Write, checkpoint: &Checkpoint) -> Result<()> {
        writer.write_all(header(volume).as_bytes())?;
        volume.copy_raw(writer, ByteOrder::Big, STREAM_CHUNK_BYTES, checkpoint)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Stage;
    use crate::volume::testing::volume_from_fn;

    #[test]
    fn test_header_then_big_endian_floats() {
        let volume = volume_from_fn(2, 3, 4, |x, y, z| (x + 2 * y + 6 * z) as f32);
        let mut out = Vec::new();
        VtkLegacyEncoder
            .encode(&volume, &mut out, &Checkpoint::disabled(Stage::Encoding(NAME)))
            .unwrap();

        let expected_header = "# vtk DataFile Version 3.0\n\
                               converted from DICOM\n\
                               BINARY\n\
                               DATASET STRUCTURED_POINTS\n\
                               DIMENSIONS 2 3 4\n\
                               ORIGIN 0 0 0\n\
                               SPACING 1 1 1\n\
                               POINT_DATA 24\n\
                               SCALARS intensity float\n\
                               LOOKUP_TABLE default\n";
        assert!(out.starts_with(expected_header.as_bytes()));

        let data = &out[expected_header.len()..];
        assert_eq!(data.len(), 24 * 4);
        let values: Vec<f32> = data
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(values, (0..24).map(|v| v as f32).collect::<Vec<_>>());
    }
}
