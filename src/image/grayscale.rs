//! Windowed rendering of a single slice
//!
//! Grayscale slices are rescaled, windowed and (for MONOCHROME1) inverted.
//! Three-sample slices are copied through. Anything else degrades to a flat
//! mid-grey image rather than failing.

use crate::dicom::{ImageAttributes, PixelSamples};
use crate::window::WindowSpec;
use image::{ImageBuffer, Rgb, RgbImage};

/// Fill value for slices whose color payload is too short
pub const FALLBACK_GREY: u8 = 100;

/// Window for a single-slice render
///
/// Uses the dataset's own WindowCenter/WindowWidth when both are present and
/// non-zero, otherwise the rescaled range of the slice's first frame.
#[must_use]
pub fn slice_window(attributes: &ImageAttributes, samples: &PixelSamples) -> WindowSpec {
    if let Some((center, width)) = attributes.window {
        return WindowSpec::new(center, width);
    }

    let n = samples.len().min(attributes.dimensions.pixel_count());
    WindowSpec::from_values((0..n).map(|i| attributes.rescale.apply(samples.get(i))))
}

/// Render one slice as an RGB image
#[must_use]
pub fn render_slice(
    attributes: &ImageAttributes,
    samples: &PixelSamples,
    window: &WindowSpec,
) -> RgbImage {
    let width = attributes.cols();
    let height = attributes.rows();
    let pixel_count = attributes.dimensions.pixel_count();

    if attributes.samples_per_pixel == 3 {
        if samples.len() < attributes.sample_count() {
            return RgbImage::from_pixel(width, height, Rgb([FALLBACK_GREY; 3]));
        }
        return ImageBuffer::from_fn(width, height, |x, y| {
            let base = (y as usize * width as usize + x as usize) * 3;
            let channel = |offset: usize| samples.get(base + offset).clamp(0.0, 255.0) as u8;
            Rgb([channel(0), channel(1), channel(2)])
        });
    }

    let should_invert = attributes.photometric_interpretation.should_invert();
    let n = samples.len().min(pixel_count);
    let mut out = RgbImage::new(width, height);
    for (i, pixel) in out.pixels_mut().take(n).enumerate() {
        let gray = window.apply(attributes.rescale.apply(samples.get(i)));
        let gray = if should_invert { 255 - gray } else { gray };
        *pixel = Rgb([gray, gray, gray]);
    }
    out
}
