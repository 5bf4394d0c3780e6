mod bump;
mod grayscale;
mod normalization;

pub use bump::bump_map;
pub use grayscale::{FALLBACK_GREY, render_slice, slice_window};

use crate::error::Result;
use image::codecs::jpeg::JpegEncoder;
use image::{GenericImageView, PixelWithColorType};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Encode an image buffer as a JPEG file
///
/// # Errors
///
/// Returns an error if the file cannot be created or encoding fails
pub fn write_jpeg<I>(img: &I, path: &Path, quality: u8) -> Result<()>
where
    I: GenericImageView,
    I::Pixel: PixelWithColorType,
{
    let mut writer = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(&mut writer, quality).encode_image(img)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_write_jpeg_produces_decodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.jpg");
        let gray = GrayImage::from_fn(16, 8, |x, _| Luma([(x * 16) as u8]));

        write_jpeg(&gray, &path, 85).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
