//! Frame header and the owning [`Frame`] type
//!
//! A serialized frame is a 12-byte header followed by the packed field
//! section:
//!
//! ```text
//! +-------------+-------------+--------------+-------------+
//! | Magic [4]   | Fields u16  | Length u32   | TypeId u16  |
//! +-------------+-------------+--------------+-------------+
//! | Field section (Length - 12 bytes)                      |
//! +--------------------------------------------------------+
//! ```
//!
//! `Length` counts the header itself. All integers are little-endian.

use std::fmt;

use crate::buffer::FieldBuffer;
use crate::config::FrameConfig;
use crate::decoder;
use crate::error::{Error, Result};
use crate::value::Value;
use crate::{FRAME_MAGIC, HEADER_SIZE};

/// Frame header structure (12 bytes, little-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Magic prefix ([`FRAME_MAGIC`])
    pub magic: [u8; 4],
    /// Number of fields in the field section
    pub field_count: u16,
    /// Total frame length, header included
    pub len: u32,
    /// Application-defined frame kind
    pub type_id: u16,
}

impl FrameHeader {
    /// Header size in bytes (fixed)
    pub const SIZE: usize = HEADER_SIZE;

    /// Create a new frame header
    #[inline]
    pub fn new(type_id: u16, field_count: u16, len: u32) -> Self {
        Self {
            magic: FRAME_MAGIC,
            field_count,
            len,
            type_id,
        }
    }

    /// Encode header to bytes (little-endian)
    #[inline]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..6].copy_from_slice(&self.field_count.to_le_bytes());
        buf[6..10].copy_from_slice(&self.len.to_le_bytes());
        buf[10..12].copy_from_slice(&self.type_id.to_le_bytes());
        buf
    }

    /// Decode header from bytes (little-endian)
    ///
    /// The magic prefix is checked before anything else is interpreted.
    #[inline]
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::UnexpectedEof);
        }
        if buf[0..4] != FRAME_MAGIC {
            return Err(Error::NotAFrame);
        }

        let header = Self {
            magic: FRAME_MAGIC,
            field_count: u16::from_le_bytes([buf[4], buf[5]]),
            len: u32::from_le_bytes([buf[6], buf[7], buf[8], buf[9]]),
            type_id: u16::from_le_bytes([buf[10], buf[11]]),
        };

        header.validate()?;
        Ok(header)
    }

    /// Validate frame header
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.magic != FRAME_MAGIC {
            return Err(Error::NotAFrame);
        }
        if (self.len as usize) < Self::SIZE {
            return Err(Error::CorruptFormat);
        }
        Ok(())
    }

    /// Reject frames longer than `max_frame_size`
    #[inline]
    pub fn check_size(&self, max_frame_size: usize) -> Result<()> {
        if self.len as usize > max_frame_size {
            return Err(Error::FrameTooLarge);
        }
        Ok(())
    }

    /// Length of the field section
    #[inline]
    pub fn body_len(&self) -> usize {
        (self.len as usize).saturating_sub(Self::SIZE)
    }
}

/// One self-contained record: a type identifier and an ordered field sequence
///
/// Fields are appended with the `add*` methods and never updated or removed.
/// The serialized form and the decoded values are cached and rebuilt only
/// after the next mutation. Once [`Frame::release`] runs the frame owns no
/// buffer and every encode, decode or serialize call fails with
/// [`Error::UsedAfterRelease`].
#[derive(Clone)]
pub struct Frame {
    type_id: u16,
    field_count: u16,
    buf: Option<FieldBuffer>,
    config: FrameConfig,
    serialized: Option<Vec<u8>>,
    decoded: Vec<Value>,
    dirty: bool,
}

impl Frame {
    /// Create an empty frame with default settings
    pub fn new(type_id: u16) -> Self {
        Self::with_config(type_id, FrameConfig::default())
    }

    /// Create an empty frame with the given settings
    pub fn with_config(type_id: u16, config: FrameConfig) -> Self {
        let buf = FieldBuffer::with_capacity(config.initial_capacity(), config.max_body_size());
        Self {
            type_id,
            field_count: 0,
            buf: Some(buf),
            config,
            serialized: None,
            decoded: Vec::new(),
            dirty: false,
        }
    }

    /// Assemble a frame whose values were decoded from `buf`
    pub(crate) fn from_decoded(
        type_id: u16,
        field_count: u16,
        buf: FieldBuffer,
        config: FrameConfig,
        decoded: Vec<Value>,
    ) -> Self {
        Self {
            type_id,
            field_count,
            buf: Some(buf),
            config,
            serialized: None,
            decoded,
            dirty: false,
        }
    }

    /// Application-defined frame kind
    #[inline]
    pub fn type_id(&self) -> u16 {
        self.type_id
    }

    /// Number of fields added so far
    #[inline]
    pub fn field_count(&self) -> u16 {
        self.field_count
    }

    /// Settings this frame was built or decoded with
    #[inline]
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Encoded field section length in bytes
    pub fn len(&self) -> Result<usize> {
        Ok(self.buffer()?.position())
    }

    /// Whether the frame holds no fields; a released frame holds none
    pub fn is_empty(&self) -> bool {
        self.is_released() || self.field_count == 0
    }

    /// Allocated field buffer capacity, zero once released
    pub fn capacity(&self) -> usize {
        self.buf.as_ref().map_or(0, FieldBuffer::capacity)
    }

    /// Length of the serialized form, header included
    pub fn serialized_len(&self) -> Result<usize> {
        Ok(HEADER_SIZE + self.buffer()?.position())
    }

    /// Header describing the current contents
    pub fn header(&self) -> Result<FrameHeader> {
        let len = u32::try_from(self.serialized_len()?).map_err(|_| Error::FrameTooLarge)?;
        Ok(FrameHeader::new(self.type_id, self.field_count, len))
    }

    /// Flat serialized form, header included
    ///
    /// Built on first use and cached until the next added field.
    pub fn to_bytes(&mut self) -> Result<&[u8]> {
        if self.serialized.is_none() {
            let header = self.header()?;
            let body = self.buffer()?.as_slice();
            let mut out = Vec::with_capacity(header.len as usize);
            out.extend_from_slice(&header.to_bytes());
            out.extend_from_slice(body);
            self.serialized = Some(out);
        }
        match &self.serialized {
            Some(bytes) => Ok(bytes),
            None => Err(Error::UsedAfterRelease),
        }
    }

    /// Decoded field values in encounter order
    ///
    /// The first call after a mutation walks every field from offset 0; later
    /// calls return the cached sequence. A decode failure leaves the previous
    /// cache in place.
    pub fn values(&mut self) -> Result<&[Value]> {
        let body = self.buffer()?.as_slice();
        if self.dirty {
            let values = decoder::decode_fields(body, self.field_count, &self.config)?;
            self.decoded = values;
            self.dirty = false;
        }
        Ok(&self.decoded)
    }

    /// Consume the frame and return its decoded values
    pub fn into_values(mut self) -> Result<Vec<Value>> {
        self.values()?;
        Ok(std::mem::take(&mut self.decoded))
    }

    /// Independent copy with its own buffer and value cache
    pub fn deep_copy(&self) -> Result<Frame> {
        self.buffer()?;
        Ok(self.clone())
    }

    /// Drop the buffer and caches; later calls on this frame fail
    ///
    /// Calling it again is a no-op.
    pub fn release(&mut self) {
        if self.buf.take().is_some() {
            tracing::trace!(type_id = self.type_id, "frame released");
        }
        self.serialized = None;
        self.decoded = Vec::new();
        self.dirty = false;
    }

    /// Whether [`Frame::release`] has run
    #[inline]
    pub fn is_released(&self) -> bool {
        self.buf.is_none()
    }

    #[inline]
    pub(crate) fn buffer(&self) -> Result<&FieldBuffer> {
        self.buf.as_ref().ok_or(Error::UsedAfterRelease)
    }

    #[inline]
    pub(crate) fn buffer_mut(&mut self) -> Result<&mut FieldBuffer> {
        self.buf.as_mut().ok_or(Error::UsedAfterRelease)
    }

    /// Record one appended field and drop stale caches
    #[inline]
    pub(crate) fn field_added(&mut self) {
        self.field_count += 1;
        self.serialized = None;
        self.dirty = true;
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.release();
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
            && self.field_count == other.field_count
            && self.buf.as_ref().map(FieldBuffer::as_slice)
                == other.buf.as_ref().map(FieldBuffer::as_slice)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("type_id", &self.type_id)
            .field("field_count", &self.field_count)
            .field("len", &self.buf.as_ref().map(FieldBuffer::position))
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode() {
        let header = FrameHeader::new(42, 3, 100);
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &FRAME_MAGIC);
        assert_eq!(FrameHeader::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn test_header_layout() {
        let bytes = FrameHeader::new(0x0A0B, 0x0102, 0x0304_0506).to_bytes();
        assert_eq!(
            bytes,
            [0xFE, 0xED, 0xF0, 0x0D, 0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0x0B, 0x0A]
        );
    }

    #[test]
    fn test_header_validation() {
        let mut bytes = FrameHeader::new(1, 0, 12).to_bytes();
        assert!(FrameHeader::decode(&bytes).is_ok());
        assert_eq!(FrameHeader::decode(&bytes[..11]), Err(Error::UnexpectedEof));

        bytes[0] ^= 0xFF;
        assert_eq!(FrameHeader::decode(&bytes), Err(Error::NotAFrame));

        let short = FrameHeader::new(1, 0, 11).to_bytes();
        assert_eq!(FrameHeader::decode(&short), Err(Error::CorruptFormat));

        let big = FrameHeader::new(1, 0, 1000);
        assert_eq!(big.check_size(999), Err(Error::FrameTooLarge));
        assert!(big.check_size(1000).is_ok());
        assert_eq!(big.body_len(), 988);
    }

    #[test]
    fn test_empty_frame_serializes_header_only() {
        let mut frame = Frame::new(9);
        assert!(frame.is_empty());
        let bytes = frame.to_bytes().unwrap().to_vec();
        assert_eq!(bytes.len(), HEADER_SIZE);
        let header = FrameHeader::decode(&bytes).unwrap();
        assert_eq!(header.field_count, 0);
        assert_eq!(header.len, HEADER_SIZE as u32);
        assert_eq!(header.type_id, 9);
        assert!(frame.values().unwrap().is_empty());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut frame = Frame::new(1);
        frame.add(7u16).unwrap();
        assert!(!frame.is_empty());
        frame.release();
        frame.release();

        assert!(frame.is_released());
        assert!(frame.is_empty());
        assert_eq!(frame.capacity(), 0);
        assert_eq!(frame.to_bytes().err(), Some(Error::UsedAfterRelease));
        assert_eq!(frame.values().err(), Some(Error::UsedAfterRelease));
        assert_eq!(frame.len(), Err(Error::UsedAfterRelease));
        assert_eq!(frame.deep_copy().err(), Some(Error::UsedAfterRelease));
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let mut original = Frame::new(3);
        original.add(1i64).unwrap();
        original.values().unwrap();

        let mut copy = original.deep_copy().unwrap();
        assert_eq!(copy, original);
        assert_eq!(copy.type_id(), 3);
        assert_eq!(copy.field_count(), 1);

        copy.add(2i64).unwrap();
        assert_eq!(original.field_count(), 1);
        assert_eq!(original.values().unwrap(), &[Value::I64(1)]);
        assert_eq!(copy.values().unwrap(), &[Value::I64(1), Value::I64(2)]);

        original.release();
        assert_eq!(copy.len(), Ok(18));
    }
}
