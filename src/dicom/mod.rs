//! DICOM file parsing and attribute extraction
//!
//! This module opens DICOM files (fully, header-only, or from bytes already in
//! memory) and reads the attributes the pipeline needs.

mod metadata;
pub(crate) mod parser;
mod photometric;
pub mod pixel_data;
pub mod validation;

pub use metadata::{DicomInfo, ImageAttributes};
pub use photometric::PhotometricInterpretation;
pub use pixel_data::{PixelSamples, RawPixelData, extract_pixel_samples};

use crate::error::Result;
use dicom::dictionary_std::tags;
use dicom::object::{
    FileDicomObject, InMemDicomObject, OpenFileOptions, StandardDataDictionary, from_reader,
    open_file,
};
use std::path::Path;

pub type Dataset = InMemDicomObject<StandardDataDictionary>;
pub type DicomFile = FileDicomObject<Dataset>;

const PREAMBLE_LEN: usize = 128;

/// Open and parse a whole DICOM file
pub fn open_dicom_file(file_path: &Path) -> Result<DicomFile> {
    Ok(open_file(file_path)?)
}

/// Parse everything up to, but not including, the pixel data
pub fn open_dicom_header(file_path: &Path) -> Result<DicomFile> {
    Ok(OpenFileOptions::new()
        .read_until(tags::PIXEL_DATA)
        .open_file(file_path)?)
}

/// Parse a DICOM file already read into memory, with or without its preamble
pub fn parse_dicom_bytes(bytes: &[u8]) -> Result<DicomFile> {
    let body = match bytes.get(PREAMBLE_LEN..PREAMBLE_LEN + 4) {
        Some(b"DICM") => &bytes[PREAMBLE_LEN..],
        _ => bytes,
    };
    Ok(from_reader(body)?)
}

/// Read the image attributes without touching the pixel payload
pub fn extract_image_attributes(obj: &DicomFile) -> ImageAttributes {
    let transfer_syntax = obj
        .meta()
        .transfer_syntax()
        .trim_end_matches('\0')
        .to_string();

    ImageAttributes {
        dimensions: parser::extract_dimensions(obj),
        bit_depth: parser::extract_bit_depth(obj),
        samples_per_pixel: parser::extract_samples_per_pixel(obj),
        photometric_interpretation: parser::extract_photometric_interpretation(obj),
        rescale: parser::extract_rescale_params(obj),
        window: parser::extract_window(obj),
        transfer_syntax,
    }
}

/// Attributes plus decoded samples for one parsed slice
///
/// # Errors
///
/// Fails on compressed transfer syntaxes, unsupported bit depths, zero
/// dimensions, and missing or unrecognized pixel payloads
pub fn extract_slice_samples(obj: &DicomFile) -> Result<(ImageAttributes, PixelSamples)> {
    let attributes = extract_image_attributes(obj);
    validation::validate_attributes(
        &attributes.transfer_syntax,
        attributes.bit_depth,
        attributes.dimensions,
    )?;
    let samples = extract_pixel_samples(obj, attributes.bit_depth, attributes.is_big_endian())?;
    Ok((attributes, samples))
}
