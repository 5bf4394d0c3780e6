//! Error taxonomy for the conversion pipeline

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("No pixel data found in DICOM file")]
    MissingPixelData,

    #[error("Unknown PixelData format: {0}")]
    UnknownPixelDataFormat(String),

    #[error("Invalid image dimensions in DICOM file: {cols}x{rows}")]
    InvalidImageDimensions { rows: u32, cols: u32 },

    #[error("No DICOM slices found")]
    NoSlicesFound,

    #[error("Skipping unparseable DICOM {path}: {reason}")]
    UnparseableSlice { path: PathBuf, reason: String },

    #[error("Failed to extract pixel data for slice {index}: {source}")]
    SliceExtractionFailed {
        index: usize,
        #[source]
        source: Box<ConvertError>,
    },

    #[error("Transfer syntax {0} uses compressed pixel data")]
    UnsupportedTransferSyntax(String),

    #[error("Unsupported bits allocated: {0} (expected 1 to 16)")]
    UnsupportedBitsAllocated(u16),

    #[error("Inconsistent image dimensions: expected {expected}, got {found} in {path}")]
    InconsistentDimensions {
        expected: String,
        found: String,
        path: PathBuf,
    },

    #[error("Volume too large for {format}: {reason}")]
    VolumeTooLarge { format: &'static str, reason: String },

    #[error("Isosurface at level {0} produced no triangles")]
    EmptyMesh(f32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    /// Fatal errors abort the whole run; everything else is recorded and skipped
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoSlicesFound | Self::InconsistentDimensions { .. }
        )
    }
}

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;

/// One recoverable failure, reported alongside the partial artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub converter: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl ErrorEntry {
    #[must_use]
    pub fn new(converter: impl Into<String>, error: &ConvertError) -> Self {
        Self {
            converter: converter.into(),
            error: error.to_string(),
            file: None,
        }
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ConvertError::NoSlicesFound.is_fatal());
        assert!(!ConvertError::MissingPixelData.is_fatal());
        assert!(!ConvertError::EmptyMesh(10.0).is_fatal());
    }

    #[test]
    fn test_error_entry_serializes_without_empty_file() {
        let entry = ErrorEntry::new("vti", &ConvertError::MissingPixelData);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"converter":"vti","error":"No pixel data found in DICOM file"}"#
        );

        let entry = entry.with_file("a.dcm");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""file":"a.dcm""#));
    }
}
