//! VTK XML ImageData (`.vti`) with an inline base64 payload

use super::VolumeEncoder;
use crate::checkpoint::Checkpoint;
use crate::error::{ConvertError, Result};
use crate::volume::{ByteOrder, Volume};
use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderWriter;
use std::io::Write;

pub(super) const NAME: &str = "vti";

/// Raw bytes per streamed chunk; a multiple of 3 so chunks encode cleanly
pub const RAW_CHUNK_BYTES: usize = 3 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct VtiEncoder;

fn header(volume: &Volume) -> String {
    let geometry = volume.geometry();
    let dims = geometry.dimensions;
    let [sx, sy, sz] = geometry.spacing;
    let [ox, oy, oz] = geometry.origin;
    let extent = format!(
        "0 {} 0 {} 0 {}",
        dims.columns.saturating_sub(1),
        dims.rows.saturating_sub(1),
        dims.depth.saturating_sub(1)
    );

    format!(
        r#"<?xml version="1.0"?>
<VTKFile type="ImageData" version="1.0" byte_order="LittleEndian" header_type="UInt32">
  <ImageData WholeExtent="{extent}" Origin="{ox} {oy} {oz}" Spacing="{sx} {sy} {sz}">
    <Piece Extent="{extent}">
      <PointData Scalars="Scalars">
        <DataArray type="Float32" Name="Scalars" format="binary" NumberOfTuples="{tuples}">
"#,
        tuples = dims.voxel_count()
    )
}

const FOOTER: &str = r"
        </DataArray>
      </PointData>
    </Piece>
  </ImageData>
</VTKFile>";

impl VolumeEncoder for VtiEncoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn file_name(&self) -> &'static str {
        "volume.vti"
    }

    fn encode(&self, volume: &Volume, writer: &mut dyn Write, checkpoint: &Checkpoint) -> Result<()> {
        let byte_count = u32::try_from(volume.byte_len()).map_err(|_| ConvertError::VolumeTooLarge {
            format: NAME,
            reason: format!("{} data bytes exceed the UInt32 header", volume.byte_len()),
        })?;

        writer.write_all(header(volume).as_bytes())?;
        {
            let mut encoder = EncoderWriter::new(&mut *writer, &STANDARD);
            encoder.write_all(&byte_count.to_le_bytes())?;
            volume.copy_raw(&mut encoder, ByteOrder::Little, RAW_CHUNK_BYTES, checkpoint)?;
            encoder.finish()?;
        }
        writer.write_all(FOOTER.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Stage;
    use crate::volume::testing::volume_from_fn;
    use base64::Engine;

    fn encode(volume: &Volume) -> String {
        let mut out = Vec::new();
        VtiEncoder
            .encode(volume, &mut out, &Checkpoint::disabled(Stage::Encoding(NAME)))
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn payload(document: &str) -> &str {
        let start = document.find("NumberOfTuples").unwrap();
        let start = start + document[start..].find(">\n").unwrap() + 2;
        let end = document.find("\n        </DataArray>").unwrap();
        &document[start..end]
    }

    #[test]
    fn test_payload_decodes_to_length_prefix_and_data() {
        let volume = volume_from_fn(3, 2, 5, |x, y, z| x as f32 - 0.25 * y as f32 + 100.0 * z as f32);
        let document = encode(&volume);

        let bytes = STANDARD.decode(payload(&document)).unwrap();
        let byte_count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(byte_count, 3 * 2 * 5 * 4);
        assert_eq!(bytes.len(), 4 + byte_count);

        let mut expected = Vec::new();
        for z in 0..5 {
            for value in volume.read_slice(z).unwrap() {
                expected.extend_from_slice(&value.to_le_bytes());
            }
        }
        assert_eq!(&bytes[4..], expected.as_slice());
    }

    #[test]
    fn test_header_geometry() {
        let mut volume = volume_from_fn(4, 3, 2, |_, _, _| 0.0);
        let geometry = crate::types::VolumeGeometry {
            spacing: [0.5, 0.5, 2.5],
            origin: [-10.0, 4.25, 0.0],
            ..*volume.geometry()
        };
        volume = Volume::from_voxels(geometry, Vec::new());
        let document = encode(&volume);

        assert!(document.starts_with("<?xml version=\"1.0\"?>\n<VTKFile type=\"ImageData\""));
        assert!(document.contains(r#"WholeExtent="0 3 0 2 0 1" Origin="-10 4.25 0" Spacing="0.5 0.5 2.5""#));
        assert!(document.contains(r#"NumberOfTuples="24""#));
        assert!(document.ends_with("</VTKFile>"));
    }
}
