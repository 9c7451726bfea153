//! Growable field buffer and the read cursor used to walk it
//!
//! [`FieldBuffer`] owns the encoded field section of a frame. Its capacity only
//! ever doubles and the bytes past the write position are zero-filled, so the
//! capacity is always at least the cursor. [`FieldCursor`] is the borrowed,
//! bounds-checked reader the decoder walks the same bytes with.

use crate::error::{Error, Result};
use crate::value::Scalar;

/// Smallest capacity the buffer grows from
pub const MIN_CAPACITY: usize = 16;

/// Exclusively owned, doubling byte buffer with a write cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBuffer {
    data: Vec<u8>,
    pos: usize,
    max_capacity: usize,
}

impl FieldBuffer {
    /// Create an empty buffer with `capacity` bytes reserved
    pub fn with_capacity(capacity: usize, max_capacity: usize) -> Self {
        Self {
            data: vec![0; capacity.min(max_capacity)],
            pos: 0,
            max_capacity,
        }
    }

    /// Adopt already encoded field bytes; the cursor sits at their end
    pub fn from_vec(bytes: Vec<u8>, max_capacity: usize) -> Result<Self> {
        if bytes.len() > max_capacity {
            return Err(Error::FrameTooLarge);
        }
        let pos = bytes.len();
        Ok(Self {
            data: bytes,
            pos,
            max_capacity,
        })
    }

    /// Bytes currently allocated
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Write position, which is the number of encoded bytes
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes available before the next growth
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Encoded bytes
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.pos]
    }

    /// Guarantee room for `additional` bytes past the cursor
    ///
    /// Capacity doubles until it covers the request. A request past the
    /// configured maximum, or an allocator refusal, is an
    /// [`Error::AllocationFailure`] and leaves the buffer unchanged.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let needed = self
            .pos
            .checked_add(additional)
            .ok_or(Error::AllocationFailure)?;
        if needed <= self.data.len() {
            return Ok(());
        }
        if needed > self.max_capacity {
            tracing::warn!(
                needed,
                max = self.max_capacity,
                "field buffer would exceed the maximum frame size"
            );
            return Err(Error::AllocationFailure);
        }

        let old_cap = self.data.len();
        let mut new_cap = old_cap.max(MIN_CAPACITY);
        while new_cap < needed {
            new_cap = new_cap.saturating_mul(2);
        }
        let new_cap = new_cap.min(self.max_capacity);

        self.data
            .try_reserve_exact(new_cap - old_cap)
            .map_err(|_| Error::AllocationFailure)?;
        self.data.resize(new_cap, 0);
        tracing::trace!(from = old_cap, to = new_cap, "field buffer grew");
        Ok(())
    }

    /// Write a u8 value
    #[inline]
    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.put_bytes(&[value])
    }

    /// Write a u16 value (little-endian)
    #[inline]
    pub fn put_u16(&mut self, value: u16) -> Result<()> {
        self.put_bytes(&value.to_le_bytes())
    }

    /// Write a u32 value (little-endian)
    #[inline]
    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        self.put_bytes(&value.to_le_bytes())
    }

    /// Write a fixed-width scalar without tag
    #[inline]
    pub fn put_scalar<T: Scalar>(&mut self, value: &T) -> Result<()> {
        self.reserve(T::WIDTH)?;
        value.write_le(&mut self.data[self.pos..self.pos + T::WIDTH]);
        self.pos += T::WIDTH;
        Ok(())
    }

    /// Write raw bytes without length prefix
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.data[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }
}

/// Bounds-checked reader over encoded field bytes
#[derive(Debug)]
pub struct FieldCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    /// Start reading at offset 0
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read offset
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get remaining bytes in cursor
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Check if cursor is at end
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Read a u8 value
    #[inline]
    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.get_bytes(1)?[0])
    }

    /// Read a u16 value (little-endian)
    #[inline]
    pub fn get_u16(&mut self) -> Result<u16> {
        let bytes = self.get_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a u32 value (little-endian)
    #[inline]
    pub fn get_u32(&mut self) -> Result<u32> {
        let bytes = self.get_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a fixed-width scalar without tag
    #[inline]
    pub fn get_scalar<T: Scalar>(&mut self) -> Result<T> {
        T::read_le(self.get_bytes(T::WIDTH)?)
    }

    /// Read raw bytes without length prefix, borrowing from the buffer
    #[inline]
    pub fn get_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::UnexpectedEof);
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }
}
