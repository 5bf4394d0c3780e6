use crate::error::{ConvertError, Result};
use crate::types::{BitDepth, Dimensions};

pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.99";
pub const ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.98";

const NATIVE_TRANSFER_SYNTAXES: [&str; 5] = [
    IMPLICIT_VR_LITTLE_ENDIAN,
    EXPLICIT_VR_LITTLE_ENDIAN,
    EXPLICIT_VR_BIG_ENDIAN,
    DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
    ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN,
];

/// Only syntaxes whose pixel data is stored uncompressed are accepted
#[inline]
pub fn validate_transfer_syntax(uid: &str) -> Result<()> {
    if NATIVE_TRANSFER_SYNTAXES.contains(&uid) {
        Ok(())
    } else {
        Err(ConvertError::UnsupportedTransferSyntax(uid.to_string()))
    }
}

#[inline]
pub fn validate_bits_allocated(bit_depth: BitDepth) -> Result<()> {
    if !(1..=16).contains(&bit_depth.allocated) {
        return Err(ConvertError::UnsupportedBitsAllocated(bit_depth.allocated));
    }

    Ok(())
}

#[inline]
pub fn validate_dimensions(dimensions: Dimensions) -> Result<()> {
    if !dimensions.is_valid() {
        return Err(ConvertError::InvalidImageDimensions {
            rows: dimensions.rows,
            cols: dimensions.cols,
        });
    }

    Ok(())
}

pub fn validate_attributes(
    transfer_syntax: &str,
    bit_depth: BitDepth,
    dimensions: Dimensions,
) -> Result<()> {
    validate_transfer_syntax(transfer_syntax)?;
    validate_bits_allocated(bit_depth)?;
    validate_dimensions(dimensions)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_native_syntaxes_accepted() {
        for uid in NATIVE_TRANSFER_SYNTAXES {
            assert!(validate_transfer_syntax(uid).is_ok(), "{uid} should be accepted");
        }
    }

    #[test]
    fn test_compressed_syntaxes_rejected() {
        // JPEG baseline, JPEG 2000 lossless, RLE
        for uid in ["1.2.840.10008.1.2.4.50", "1.2.840.10008.1.2.4.90", "1.2.840.10008.1.2.5"] {
            assert_matches!(
                validate_transfer_syntax(uid),
                Err(ConvertError::UnsupportedTransferSyntax(u)) if u == uid
            );
        }
    }

    #[test]
    fn test_bits_allocated_range() {
        assert!(validate_bits_allocated(BitDepth::new(8, 0)).is_ok());
        assert!(validate_bits_allocated(BitDepth::new(12, 1)).is_ok());
        assert_matches!(
            validate_bits_allocated(BitDepth::new(32, 0)),
            Err(ConvertError::UnsupportedBitsAllocated(32))
        );
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert_matches!(
            validate_dimensions(Dimensions::new(0, 512)),
            Err(ConvertError::InvalidImageDimensions { rows: 0, cols: 512 })
        );
        assert!(validate_dimensions(Dimensions::new(1, 1)).is_ok());
    }
}
