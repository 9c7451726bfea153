//! Compression collaborators for compressed-bytes fields
//!
//! The frame format never looks inside a compressed payload. It hands the
//! caller's bytes to a [`Compressor`] when encoding and asks the same codec to
//! reverse the transform when decoding. Decoding is always bounded: a codec
//! must refuse to produce more than the limit it is given.

use std::sync::Arc;

use crate::error::{Error, Result};

/// Byte-to-byte transform used for [`Tag::CompressedBytes`](crate::Tag::CompressedBytes) fields
pub trait Compressor: Send + Sync {
    /// Short codec name for diagnostics
    fn name(&self) -> &'static str;

    /// Compress `input` into a new buffer
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Reverse [`Compressor::compress`], producing at most `limit` bytes
    ///
    /// Output that would exceed `limit` fails with [`Error::FrameTooLarge`].
    fn decompress(&self, input: &[u8], limit: usize) -> Result<Vec<u8>>;
}

/// Identity codec, stores bytes as given
#[derive(Debug, Clone, Copy, Default)]
pub struct Stored;

impl Compressor for Stored {
    fn name(&self) -> &'static str {
        "stored"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn decompress(&self, input: &[u8], limit: usize) -> Result<Vec<u8>> {
        if input.len() > limit {
            return Err(output_too_large(self, input.len() as u64, limit));
        }
        Ok(input.to_vec())
    }
}

/// zlib-wrapped deflate via `flate2`
#[cfg(feature = "deflate")]
#[derive(Debug, Clone, Copy)]
pub struct Deflate {
    level: flate2::Compression,
}

#[cfg(feature = "deflate")]
impl Deflate {
    /// Codec with the given level; values outside 0..=9 select the default level
    pub fn new(level: i32) -> Self {
        let level = match level {
            0..=9 => flate2::Compression::new(level as u32),
            _ => flate2::Compression::default(),
        };
        Self { level }
    }
}

#[cfg(feature = "deflate")]
impl Default for Deflate {
    fn default() -> Self {
        Self {
            level: flate2::Compression::default(),
        }
    }
}

#[cfg(feature = "deflate")]
impl Compressor for Deflate {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        use std::io::Write;

        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), self.level);
        enc.write_all(input).map_err(|e| codec_failure(self, &e))?;
        enc.finish().map_err(|e| codec_failure(self, &e))
    }

    fn decompress(&self, input: &[u8], limit: usize) -> Result<Vec<u8>> {
        use std::io::Read;

        // one byte past the limit is enough to tell an oversized payload apart
        let mut dec = flate2::read::ZlibDecoder::new(input).take(limit as u64 + 1);
        let mut out = Vec::new();
        dec.read_to_end(&mut out).map_err(|e| codec_failure(self, &e))?;
        if out.len() > limit {
            return Err(output_too_large(self, out.len() as u64, limit));
        }
        Ok(out)
    }
}

/// LZ4 block format with a prepended uncompressed size, via `lz4_flex`
#[cfg(feature = "lz4")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4;

#[cfg(feature = "lz4")]
impl Compressor for Lz4 {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(lz4_flex::block::compress_prepend_size(input))
    }

    fn decompress(&self, input: &[u8], limit: usize) -> Result<Vec<u8>> {
        let prefix: [u8; 4] = input
            .get(..4)
            .and_then(|p| p.try_into().ok())
            .ok_or_else(|| codec_failure(self, &"missing size prefix"))?;
        let declared = u32::from_le_bytes(prefix);
        if declared as usize > limit {
            return Err(output_too_large(self, u64::from(declared), limit));
        }
        lz4_flex::block::decompress_size_prepended(input).map_err(|e| codec_failure(self, &e))
    }
}

fn codec_failure(codec: &dyn Compressor, err: &dyn std::fmt::Display) -> Error {
    tracing::warn!(codec = codec.name(), error = %err, "compression codec failed");
    Error::Compression
}

fn output_too_large(codec: &dyn Compressor, size: u64, limit: usize) -> Error {
    tracing::warn!(codec = codec.name(), size, limit, "decompressed payload over limit");
    Error::FrameTooLarge
}

/// Codec used when a [`FrameConfig`](crate::FrameConfig) does not name one
pub fn default_codec() -> Arc<dyn Compressor> {
    #[cfg(feature = "deflate")]
    {
        Arc::new(Deflate::default())
    }
    #[cfg(not(feature = "deflate"))]
    {
        Arc::new(Stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        b"tagframe tagframe tagframe tagframe tagframe".repeat(8)
    }

    #[test]
    fn test_stored_is_identity() {
        let data = sample();
        assert_eq!(Stored.compress(&data).unwrap(), data);
        assert_eq!(Stored.decompress(&data, data.len()).unwrap(), data);
        assert_eq!(
            Stored.decompress(&data, data.len() - 1),
            Err(Error::FrameTooLarge)
        );
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn test_deflate_roundtrip() {
        let codec = Deflate::new(6);
        let data = sample();
        let packed = codec.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(codec.decompress(&packed, data.len()).unwrap(), data);
        assert_eq!(
            codec.decompress(&codec.compress(&[]).unwrap(), 0).unwrap(),
            Vec::<u8>::new()
        );
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn test_deflate_output_is_bounded() {
        let codec = Deflate::default();
        let packed = codec.compress(&vec![0u8; 1 << 20]).unwrap();
        assert!(packed.len() < 4096);
        assert_eq!(codec.decompress(&packed, 1 << 16), Err(Error::FrameTooLarge));
        assert_eq!(codec.decompress(&packed, 1 << 20).unwrap().len(), 1 << 20);
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn test_deflate_rejects_garbage() {
        assert_eq!(
            Deflate::default().decompress(&[0xFF, 0x00, 0x12], 1024),
            Err(Error::Compression)
        );
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn test_lz4_roundtrip() {
        let data = sample();
        let packed = Lz4.compress(&data).unwrap();
        assert_eq!(Lz4.decompress(&packed, data.len()).unwrap(), data);
        assert_eq!(Lz4.decompress(&[10, 0, 0, 0, 0xF0], 1024), Err(Error::Compression));
        assert_eq!(Lz4.decompress(&[1, 2], 1024), Err(Error::Compression));
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn test_lz4_refuses_oversized_prefix() {
        let packed = Lz4.compress(&vec![7u8; 4096]).unwrap();
        assert_eq!(Lz4.decompress(&packed, 4095), Err(Error::FrameTooLarge));
        assert_eq!(Lz4.decompress(&[0xFF, 0xFF, 0xFF, 0x7F, 0], 1 << 20), Err(Error::FrameTooLarge));
    }

    #[test]
    fn test_default_codec_name() {
        let codec = default_codec();
        if cfg!(feature = "deflate") {
            assert_eq!(codec.name(), "deflate");
        } else {
            assert_eq!(codec.name(), "stored");
        }
    }
}
