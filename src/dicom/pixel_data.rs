//! Pixel payload normalization
//!
//! The PixelData element can reach us in several physical shapes depending on
//! the file's dialect. [`RawPixelData`] names each shape once, at parse time;
//! [`RawPixelData::into_samples`] then turns any of them into one typed
//! [`PixelSamples`] view chosen by bit depth and signedness.

use super::Dataset;
use crate::error::{ConvertError, Result};
use crate::types::BitDepth;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use dicom::core::value::{DicomValueType, PrimitiveValue, Value};
use dicom::dictionary_std::tags;

/// Physical shape of the PixelData payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPixelData {
    /// OW payload the parser already decoded into native 16-bit words
    Words(Vec<u16>),
    /// Encapsulated payload holding exactly one fragment
    SingleFragment(Vec<u8>),
    /// Payload carried as base64 text
    Base64(String),
    /// Plain byte array, in the file's byte order
    Bytes(Vec<u8>),
}

impl RawPixelData {
    /// Read and classify the PixelData element of a dataset
    ///
    /// # Errors
    ///
    /// `MissingPixelData` if the element is absent or empty,
    /// `UnknownPixelDataFormat` if its value has none of the known shapes
    pub fn from_dataset(obj: &Dataset) -> Result<Self> {
        let element = obj
            .get(tags::PIXEL_DATA)
            .ok_or(ConvertError::MissingPixelData)?;
        Self::from_value(element.value())
    }

    pub fn from_value<I, P: AsRef<[u8]>>(value: &Value<I, P>) -> Result<Self> {
        match value {
            Value::Primitive(PrimitiveValue::Empty) => Err(ConvertError::MissingPixelData),
            Value::Primitive(PrimitiveValue::U8(bytes)) => Ok(Self::Bytes(bytes.to_vec())),
            Value::Primitive(PrimitiveValue::U16(words)) => Ok(Self::Words(words.to_vec())),
            Value::Primitive(PrimitiveValue::I16(words)) => {
                Ok(Self::Words(words.iter().map(|&w| w as u16).collect()))
            }
            Value::Primitive(PrimitiveValue::Str(text)) => Ok(Self::Base64(text.clone())),
            Value::PixelSequence(sequence) => match sequence.fragments() {
                [single] => Ok(Self::SingleFragment(single.as_ref().to_vec())),
                fragments => Err(ConvertError::UnknownPixelDataFormat(format!(
                    "encapsulated pixel data with {} fragments",
                    fragments.len()
                ))),
            },
            other => Err(ConvertError::UnknownPixelDataFormat(format!(
                "{:?} value",
                other.value_type()
            ))),
        }
    }

    /// Normalize to little-endian bytes
    fn into_le_bytes(self, bit_depth: BitDepth, big_endian: bool) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::Words(words) => return Ok(words.iter().flat_map(|w| w.to_le_bytes()).collect()),
            Self::SingleFragment(bytes) | Self::Bytes(bytes) => bytes,
            Self::Base64(text) => STANDARD
                .decode(text.trim_end_matches(['\0', ' ']))
                .map_err(|e| ConvertError::UnknownPixelDataFormat(format!("invalid base64: {e}")))?,
        };

        if big_endian && bit_depth.bytes_per_sample() == 2 {
            return Ok(bytes
                .chunks_exact(2)
                .flat_map(|chunk| [chunk[1], chunk[0]])
                .collect());
        }

        Ok(bytes)
    }

    /// Dispatch on bit depth into a typed sample view
    ///
    /// A trailing odd byte of a 16-bit payload is dropped rather than failing.
    pub fn into_samples(self, bit_depth: BitDepth, big_endian: bool) -> Result<PixelSamples> {
        super::validation::validate_bits_allocated(bit_depth)?;
        let bytes = self.into_le_bytes(bit_depth, big_endian)?;

        if bit_depth.bytes_per_sample() == 1 {
            return Ok(PixelSamples::U8(bytes));
        }

        let words = bytes.chunks_exact(2).map(|chunk| [chunk[0], chunk[1]]);
        if bit_depth.is_signed() {
            Ok(PixelSamples::I16(words.map(i16::from_le_bytes).collect()))
        } else {
            Ok(PixelSamples::U16(words.map(u16::from_le_bytes).collect()))
        }
    }
}

/// One slice's samples; scoped to a single processing step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelSamples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
}

impl PixelSamples {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::I16(v) => v.len(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    #[must_use]
    pub fn get(&self, index: usize) -> f64 {
        match self {
            Self::U8(v) => f64::from(v[index]),
            Self::U16(v) => f64::from(v[index]),
            Self::I16(v) => f64::from(v[index]),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(|i| self.get(i))
    }
}

/// Extract a slice's samples given its declared layout
///
/// # Errors
///
/// See [`RawPixelData::from_dataset`] and [`RawPixelData::into_samples`]
pub fn extract_pixel_samples(
    obj: &Dataset,
    bit_depth: BitDepth,
    big_endian: bool,
) -> Result<PixelSamples> {
    RawPixelData::from_dataset(obj)?.into_samples(bit_depth, big_endian)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use dicom::core::value::PixelFragmentSequence;
    use dicom::core::{DataElement, VR, dicom_value};
    use dicom::object::InMemDicomObject;

    type InMemValue = Value<InMemDicomObject, Vec<u8>>;

    #[test]
    fn test_missing_pixel_data() {
        let obj = InMemDicomObject::new_empty();
        assert_matches!(
            RawPixelData::from_dataset(&obj),
            Err(ConvertError::MissingPixelData)
        );
    }

    #[test]
    fn test_typed_words() {
        let value: InMemValue = dicom_value!(U16, [1, 2, 65535]).into();
        let raw = RawPixelData::from_value(&value).unwrap();
        assert_eq!(raw, RawPixelData::Words(vec![1, 2, 65535]));

        let samples = raw.into_samples(BitDepth::new(16, 0), false).unwrap();
        assert_eq!(samples, PixelSamples::U16(vec![1, 2, 65535]));
    }

    #[test]
    fn test_signed_words() {
        let raw = RawPixelData::Words(vec![0xFFFF, 0x0001, 0x8000]);
        let samples = raw.into_samples(BitDepth::new(16, 1), false).unwrap();
        assert_eq!(samples, PixelSamples::I16(vec![-1, 1, i16::MIN]));
    }

    #[test]
    fn test_single_fragment() {
        let sequence = PixelFragmentSequence::new(Vec::<u32>::new(), vec![vec![10u8, 20, 30]]);
        let value: InMemValue = Value::PixelSequence(sequence);
        let raw = RawPixelData::from_value(&value).unwrap();
        assert_eq!(raw, RawPixelData::SingleFragment(vec![10, 20, 30]));
        assert_eq!(
            raw.into_samples(BitDepth::new(8, 0), false).unwrap(),
            PixelSamples::U8(vec![10, 20, 30])
        );
    }

    #[test]
    fn test_multi_fragment_is_unknown() {
        let sequence = PixelFragmentSequence::new(Vec::<u32>::new(), vec![vec![1u8], vec![2u8]]);
        let value: InMemValue = Value::PixelSequence(sequence);
        assert_matches!(
            RawPixelData::from_value(&value),
            Err(ConvertError::UnknownPixelDataFormat(_))
        );
    }

    #[test]
    fn test_base64_string() {
        // [0x0100, 0x0200] little-endian
        let encoded = STANDARD.encode([0x00u8, 0x01, 0x00, 0x02]);
        let value: InMemValue = PrimitiveValue::from(encoded.as_str()).into();
        let raw = RawPixelData::from_value(&value).unwrap();
        assert_matches!(raw, RawPixelData::Base64(_));
        assert_eq!(
            raw.into_samples(BitDepth::new(16, 0), false).unwrap(),
            PixelSamples::U16(vec![0x0100, 0x0200])
        );
    }

    #[test]
    fn test_invalid_base64() {
        let raw = RawPixelData::Base64("not base64 at all!".to_string());
        assert_matches!(
            raw.into_samples(BitDepth::new(8, 0), false),
            Err(ConvertError::UnknownPixelDataFormat(_))
        );
    }

    #[test]
    fn test_plain_bytes_big_endian_swap() {
        let raw = RawPixelData::Bytes(vec![0x01, 0x02, 0x03, 0x04]);
        assert_eq!(
            raw.clone().into_samples(BitDepth::new(16, 0), true).unwrap(),
            PixelSamples::U16(vec![0x0102, 0x0304])
        );
        assert_eq!(
            raw.into_samples(BitDepth::new(16, 0), false).unwrap(),
            PixelSamples::U16(vec![0x0201, 0x0403])
        );
    }

    #[test]
    fn test_odd_trailing_byte_is_truncated() {
        let raw = RawPixelData::Bytes(vec![1, 0, 2, 0, 9]);
        let samples = raw.into_samples(BitDepth::new(16, 0), false).unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_unrecognized_shape() {
        let value: InMemValue = dicom_value!(F32, [1.5, 2.5]).into();
        assert_matches!(
            RawPixelData::from_value(&value),
            Err(ConvertError::UnknownPixelDataFormat(_))
        );
    }

    #[test]
    fn test_32_bit_rejected() {
        let raw = RawPixelData::Bytes(vec![0; 8]);
        assert_matches!(
            raw.into_samples(BitDepth::new(32, 0), false),
            Err(ConvertError::UnsupportedBitsAllocated(32))
        );
    }

    #[test]
    fn test_extract_from_dataset() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            PrimitiveValue::from(vec![7u8, 8, 9]),
        ));
        let samples = extract_pixel_samples(&obj, BitDepth::new(8, 0), false).unwrap();
        assert_eq!(samples.iter().collect::<Vec<_>>(), vec![7.0, 8.0, 9.0]);
    }
}
