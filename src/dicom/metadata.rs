//! Image attributes read from one slice

use super::photometric::PhotometricInterpretation;
use super::validation::{EXPLICIT_VR_BIG_ENDIAN, EXPLICIT_VR_LITTLE_ENDIAN, IMPLICIT_VR_LITTLE_ENDIAN};
use crate::types::{BitDepth, Dimensions, RescaleParams};
use serde::Serialize;

/// Everything needed to turn one slice's payload into samples or pixels
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttributes {
    pub dimensions: Dimensions,
    pub bit_depth: BitDepth,
    pub samples_per_pixel: u16,
    pub photometric_interpretation: PhotometricInterpretation,
    pub rescale: RescaleParams,
    /// Explicit (center, width) from the dataset, if any
    pub window: Option<(f64, f64)>,
    pub transfer_syntax: String,
}

impl ImageAttributes {
    #[inline(always)]
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.dimensions.rows
    }

    #[inline(always)]
    #[must_use]
    pub fn cols(&self) -> u32 {
        self.dimensions.cols
    }

    /// Number of samples a full frame carries
    #[inline]
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.dimensions.pixel_count() * usize::from(self.samples_per_pixel)
    }

    #[inline]
    #[must_use]
    pub fn is_big_endian(&self) -> bool {
        self.transfer_syntax == EXPLICIT_VR_BIG_ENDIAN
    }
}

/// Per-file summary reported next to each rendered slice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DicomInfo {
    pub image_position: [f64; 3],
    /// `[row spacing, column spacing, slice thickness]`
    pub spacing: [f64; 3],
    pub rows: u32,
    pub columns: u32,
    pub bits_allocated: u16,
    pub pixel_representation: u16,
    pub samples_per_pixel: u16,
    pub photometric_interpretation: String,
    pub rescale_slope: f64,
    pub rescale_intercept: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_center: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_width: Option<f64>,
    pub transfer_syntax: String,
    /// Set for any transfer syntax other than the three native ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl DicomInfo {
    #[must_use]
    pub fn new(attributes: &ImageAttributes, position: [f64; 3], spacing: [f64; 3]) -> Self {
        let native = [
            IMPLICIT_VR_LITTLE_ENDIAN,
            EXPLICIT_VR_LITTLE_ENDIAN,
            EXPLICIT_VR_BIG_ENDIAN,
        ];
        let warning = (!native.contains(&attributes.transfer_syntax.as_str())).then(|| {
            format!(
                "Transfer syntax {} is not a native uncompressed encoding",
                attributes.transfer_syntax
            )
        });

        Self {
            image_position: position,
            spacing,
            rows: attributes.rows(),
            columns: attributes.cols(),
            bits_allocated: attributes.bit_depth.allocated,
            pixel_representation: attributes.bit_depth.pixel_representation,
            samples_per_pixel: attributes.samples_per_pixel,
            photometric_interpretation: attributes.photometric_interpretation.to_string(),
            rescale_slope: attributes.rescale.slope,
            rescale_intercept: attributes.rescale.intercept,
            window_center: attributes.window.map(|(center, _)| center),
            window_width: attributes.window.map(|(_, width)| width),
            transfer_syntax: attributes.transfer_syntax.clone(),
            warning,
        }
    }
}
