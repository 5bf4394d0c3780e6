use super::Dataset;
use super::photometric::PhotometricInterpretation;
use crate::types::{BitDepth, Dimensions, RescaleParams};
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use std::str::FromStr;

pub const DEFAULT_POSITION: [f64; 3] = [0.0, 0.0, 0.0];
pub const DEFAULT_PIXEL_SPACING: [f64; 2] = [1.0, 1.0];
pub const DEFAULT_SLICE_THICKNESS: f64 = 1.0;

/// Rows/Columns, zero when absent so callers can report the bad value
pub fn extract_dimensions(obj: &Dataset) -> Dimensions {
    let rows = obj
        .get(tags::ROWS)
        .and_then(|e| e.to_int::<u32>().ok())
        .unwrap_or(0);

    let cols = obj
        .get(tags::COLUMNS)
        .and_then(|e| e.to_int::<u32>().ok())
        .unwrap_or(0);

    Dimensions::new(rows, cols)
}

/// ImagePositionPatient, `[0, 0, 0]` when absent or short
pub fn extract_position(obj: &Dataset) -> [f64; 3] {
    obj.get(tags::IMAGE_POSITION_PATIENT)
        .and_then(|e| e.to_multi_float64().ok())
        .and_then(|v| <[f64; 3]>::try_from(v.get(..3)?).ok())
        .unwrap_or(DEFAULT_POSITION)
}

/// PixelSpacing (row, column), `[1, 1]` when absent or short
pub fn extract_pixel_spacing(obj: &Dataset) -> [f64; 2] {
    obj.get(tags::PIXEL_SPACING)
        .and_then(|e| e.to_multi_float64().ok())
        .and_then(|v| <[f64; 2]>::try_from(v.get(..2)?).ok())
        .unwrap_or(DEFAULT_PIXEL_SPACING)
}

#[inline]
pub fn extract_slice_thickness(obj: &Dataset) -> f64 {
    obj.get(tags::SLICE_THICKNESS)
        .and_then(|e| e.to_float64().ok())
        .unwrap_or(DEFAULT_SLICE_THICKNESS)
}

pub fn extract_rescale_params(obj: &Dataset) -> RescaleParams {
    // Present for CT/PET; MR and CR usually omit them
    let slope = obj
        .get(tags::RESCALE_SLOPE)
        .and_then(|e| e.to_float64().ok())
        .unwrap_or(1.0);

    let intercept = obj
        .get(tags::RESCALE_INTERCEPT)
        .and_then(|e| e.to_float64().ok())
        .unwrap_or(0.0);

    RescaleParams::new(slope, intercept)
}

pub fn extract_bit_depth(obj: &Dataset) -> BitDepth {
    let allocated = obj
        .get(tags::BITS_ALLOCATED)
        .and_then(|e| e.to_int::<u16>().ok())
        .unwrap_or(16);

    let pixel_representation = obj
        .get(tags::PIXEL_REPRESENTATION)
        .and_then(|e| e.to_int::<u16>().ok())
        .unwrap_or(0);

    BitDepth::new(allocated, pixel_representation)
}

#[inline]
pub fn extract_samples_per_pixel(obj: &Dataset) -> u16 {
    obj.get(tags::SAMPLES_PER_PIXEL)
        .and_then(|e| e.to_int::<u16>().ok())
        .unwrap_or(1)
}

pub fn extract_photometric_interpretation(obj: &Dataset) -> PhotometricInterpretation {
    obj.get(tags::PHOTOMETRIC_INTERPRETATION)
        .and_then(|e| e.to_str().ok())
        .and_then(|s| PhotometricInterpretation::from_str(&s).ok())
        .unwrap_or_default()
}

/// First WindowCenter/WindowWidth pair; `None` unless both are present and non-zero
pub fn extract_window(obj: &Dataset) -> Option<(f64, f64)> {
    let first = |tag: Tag| {
        obj.get(tag)
            .and_then(|e| e.to_multi_float64().ok())
            .and_then(|v| v.first().copied())
    };

    let center = first(tags::WINDOW_CENTER)?;
    let width = first(tags::WINDOW_WIDTH)?;

    (center != 0.0 && width != 0.0).then_some((center, width))
}
