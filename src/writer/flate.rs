//! FlateDecode encoding for stream payloads.
//!
//! Wraps the `flate2` zlib encoder. Compression is only kept when it actually
//! shrinks the data; otherwise the caller gets its own bytes back.

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::borrow::Cow;
use std::io::Write;

/// Output of [`FlateEncoder::encode`]: either the input itself or a new buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded<'a> {
    data: Cow<'a, [u8]>,
}

impl<'a> Encoded<'a> {
    fn borrowed(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
        }
    }

    /// The bytes to write.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Output size.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the output is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when the data was deflated into a new buffer.
    pub fn used_new_buffer(&self) -> bool {
        matches!(self.data, Cow::Owned(_))
    }

    /// Take the underlying buffer.
    pub fn into_inner(self) -> Cow<'a, [u8]> {
        self.data
    }
}

/// Zlib encoder for stream payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlateEncoder;

impl FlateEncoder {
    /// Deflate `data` when `enable` is set and the result is strictly smaller.
    ///
    /// Raster sample data (`is_image`) is compressed at the best level.
    pub fn encode(data: &[u8], enable: bool, is_image: bool) -> Result<Encoded<'_>> {
        if !enable || data.is_empty() {
            return Ok(Encoded::borrowed(data));
        }

        let level = if is_image {
            Compression::best()
        } else {
            Compression::default()
        };
        let compressed = deflate(data, level)?;
        if compressed.len() < data.len() {
            Ok(Encoded {
                data: Cow::Owned(compressed),
            })
        } else {
            Ok(Encoded::borrowed(data))
        }
    }

    /// Encode a stream payload and fix up its dictionary.
    ///
    /// Payloads that already carry a `/Filter` are passed through. The
    /// returned dictionary always has `/Length` matching the returned bytes.
    pub fn encode_stream<'a>(
        dict: &Dictionary,
        data: &'a [u8],
        enable: bool,
    ) -> Result<(Dictionary, Encoded<'a>)> {
        let mut dict = dict.clone();
        let encoded = if dict.contains_key("Filter") {
            Encoded::borrowed(data)
        } else {
            let is_image = dict.get("Subtype").and_then(Object::as_name) == Some("Image");
            let encoded = Self::encode(data, enable, is_image)?;
            if encoded.used_new_buffer() {
                dict.insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
                dict.shift_remove("DecodeParms");
            }
            encoded
        };
        dict.insert("Length".to_string(), Object::Integer(encoded.len() as i64));
        Ok((dict, encoded))
    }

    /// Apply the PNG Up predictor (`/Predictor 12`) to rows of `columns`
    /// bytes, then deflate.
    ///
    /// A trailing partial row is treated as zero-padded by readers, so the
    /// input length should be a multiple of `columns`.
    pub fn encode_png_up(data: &[u8], columns: usize) -> Result<Vec<u8>> {
        let columns = columns.max(1);
        let rows = data.len().div_ceil(columns);
        let mut predicted = Vec::with_capacity(rows * (columns + 1));
        let mut prev: &[u8] = &[];

        for row in data.chunks(columns) {
            predicted.push(2);
            for (i, &byte) in row.iter().enumerate() {
                let above = prev.get(i).copied().unwrap_or(0);
                predicted.push(byte.wrapping_sub(above));
            }
            prev = row;
        }

        deflate(&predicted, Compression::default())
    }
}

fn deflate(data: &[u8], level: Compression) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), level);
    encoder
        .write_all(data)
        .map_err(|e| Error::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| Error::Compression(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_encode_compressible() {
        let data = b"BT /F1 12 Tf 72 720 Td (Hello) Tj ET\n".repeat(50);
        let encoded = FlateEncoder::encode(&data, true, false).unwrap();
        assert!(encoded.used_new_buffer());
        assert!(encoded.len() < data.len());
        assert_eq!(inflate(encoded.as_bytes()), data);
    }

    #[test]
    fn test_encode_disabled_borrows() {
        let data = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let encoded = FlateEncoder::encode(data, false, false).unwrap();
        assert!(!encoded.used_new_buffer());
        assert_eq!(encoded.as_bytes(), data);
    }

    #[test]
    fn test_encode_tiny_input_keeps_original() {
        // Zlib framing alone is larger than three bytes
        let encoded = FlateEncoder::encode(b"abc", true, false).unwrap();
        assert!(!encoded.used_new_buffer());
        assert_eq!(encoded.as_bytes(), b"abc");
    }

    #[test]
    fn test_encode_empty() {
        let encoded = FlateEncoder::encode(b"", true, true).unwrap();
        assert!(encoded.is_empty());
        assert!(!encoded.used_new_buffer());
    }

    #[test]
    fn test_encode_stream_sets_filter_and_length() {
        let mut dict = Dictionary::new();
        dict.insert("DecodeParms".to_string(), Object::Null);
        let data = vec![b'x'; 1000];
        let (dict, encoded) = FlateEncoder::encode_stream(&dict, &data, true).unwrap();
        assert_eq!(dict.get("Filter").and_then(Object::as_name), Some("FlateDecode"));
        assert!(!dict.contains_key("DecodeParms"));
        assert_eq!(
            dict.get("Length").and_then(Object::as_integer),
            Some(encoded.len() as i64)
        );
    }

    #[test]
    fn test_encode_stream_respects_existing_filter() {
        let mut dict = Dictionary::new();
        dict.insert("Filter".to_string(), Object::Name("DCTDecode".to_string()));
        let data = vec![0u8; 500];
        let (dict, encoded) = FlateEncoder::encode_stream(&dict, &data, true).unwrap();
        assert!(!encoded.used_new_buffer());
        assert_eq!(dict.get("Filter").and_then(Object::as_name), Some("DCTDecode"));
        assert_eq!(dict.get("Length").and_then(Object::as_integer), Some(500));
    }

    #[test]
    fn test_encode_stream_uncompressed_has_no_filter() {
        let (dict, encoded) = FlateEncoder::encode_stream(&Dictionary::new(), b"q Q", true).unwrap();
        assert!(!dict.contains_key("Filter"));
        assert_eq!(encoded.as_bytes(), b"q Q");
        assert_eq!(dict.get("Length").and_then(Object::as_integer), Some(3));
    }

    #[test]
    fn test_png_up_rows() {
        let data = [1u8, 0, 10, 0, 1, 0, 12, 0];
        let raw = inflate(&FlateEncoder::encode_png_up(&data, 4).unwrap());
        assert_eq!(raw, vec![2, 1, 0, 10, 0, 2, 0, 0, 2, 0]);
    }
}
