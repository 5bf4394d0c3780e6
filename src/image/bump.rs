//! Gradient-derived pseudo normal maps

use super::normalization::{find_min_max, stretch_u8};
use image::{GrayImage, Rgb, RgbImage};

/// Encode one central-difference gradient as a normal component
#[inline(always)]
fn normal_component(gradient: i16) -> u8 {
    ((f32::from(gradient) / 255.0 + 1.0) * 127.5).floor() as u8
}

/// Build a bump map from a windowed grayscale image
///
/// Interior pixels get `x` gradient in red, `y` gradient in green and 255 in
/// blue; red and green are then each stretched to the full range over the
/// interior. The one-pixel border stays black.
#[must_use]
pub fn bump_map(gray: &GrayImage) -> RgbImage {
    let (width, height) = gray.dimensions();
    let mut out = RgbImage::new(width, height);
    if width < 3 || height < 3 {
        return out;
    }

    let at = |x: u32, y: u32| i16::from(gray.get_pixel(x, y).0[0]);
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let gx = at(x + 1, y) - at(x - 1, y);
            let gy = at(x, y + 1) - at(x, y - 1);
            out.put_pixel(x, y, Rgb([normal_component(gx), normal_component(gy), 255]));
        }
    }

    let interior = move || (1..height - 1).flat_map(move |y| (1..width - 1).map(move |x| (x, y)));
    for channel in 0..2 {
        let Some((min, max)) = find_min_max(interior().map(|(x, y)| out.get_pixel(x, y).0[channel]))
        else {
            continue;
        };
        if max <= min {
            continue;
        }
        for (x, y) in interior() {
            let pixel = out.get_pixel_mut(x, y);
            pixel.0[channel] = stretch_u8(pixel.0[channel], min, max);
        }
    }

    out
}
