//! Field encoding
//!
//! Every add reserves room for the whole field before the first byte is
//! written, so a failed add leaves the frame exactly as it was.
//!
//! ```text
//! fixed     [tag][value: width]
//! variable  [tag][len: u32][payload: len]
//! list      [tag | 0x80][count: u16][value: width] * count
//! ```

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::tag::{Tag, LENGTH_PREFIX_SIZE, LIST_COUNT_SIZE};
use crate::value::{List, ListElement, Scalar, Value};
use crate::MAX_FIELDS;

impl Frame {
    /// Append a fixed-width scalar field
    pub fn add<T: Scalar>(&mut self, value: T) -> Result<()> {
        let buf = self.begin_field(1 + T::WIDTH)?;
        buf.put_u8(T::TAG.byte())?;
        buf.put_scalar(&value)?;
        self.field_added();
        Ok(())
    }

    /// Append a raw byte blob field
    pub fn add_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.add_variable(Tag::Bytes, bytes)
    }

    /// Append a UTF-8 text field
    pub fn add_str(&mut self, text: &str) -> Result<()> {
        self.add_variable(Tag::Text, text.as_bytes())
    }

    /// Append a byte blob stored through the configured codec
    ///
    /// The compressed bytes are what goes on the wire; decoding hands back the
    /// original bytes.
    pub fn add_compressed(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer()?;
        let packed = self.config().codec().compress(bytes)?;
        self.add_variable(Tag::CompressedBytes, &packed)
    }

    /// Append a nested frame
    ///
    /// The child is serialized with its own header and then owned by this
    /// frame's bytes; it is consumed so nothing else can keep mutating it.
    pub fn add_frame(&mut self, mut child: Frame) -> Result<()> {
        self.buffer()?;
        let bytes = child.to_bytes()?;
        self.add_variable(Tag::Frame, bytes)
    }

    /// Append a homogeneous list field
    ///
    /// Lists must hold between 1 and 65535 elements; anything else is
    /// rejected with [`Error::InvalidListInput`] before any byte is written.
    pub fn add_list<T: ListElement>(&mut self, items: &[T]) -> Result<()> {
        self.buffer()?;
        if items.is_empty() || items.len() > MAX_FIELDS {
            return Err(Error::InvalidListInput);
        }

        let size = 1 + LIST_COUNT_SIZE + items.len() * T::WIDTH;
        let buf = self.begin_field(size)?;
        buf.put_u8(T::TAG.list_byte())?;
        buf.put_u16(items.len() as u16)?;
        for item in items {
            buf.put_scalar(item)?;
        }
        self.field_added();
        Ok(())
    }

    /// Append a field carrying `value`
    ///
    /// Re-encodes a decoded value as the same kind of field it came from.
    /// Compressed values are compressed again with this frame's codec.
    pub fn add_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::I16(v) => self.add(*v),
            Value::U16(v) => self.add(*v),
            Value::I32(v) => self.add(*v),
            Value::U32(v) => self.add(*v),
            Value::I64(v) => self.add(*v),
            Value::U64(v) => self.add(*v),
            Value::F32(v) => self.add(*v),
            Value::F64(v) => self.add(*v),
            Value::Bool(v) => self.add(*v),
            Value::Decimal(v) => self.add(*v),
            Value::TimeSpan(v) => self.add(*v),
            Value::Timestamp(v) => self.add(*v),
            Value::Guid(v) => self.add(*v),
            Value::Bytes(bytes) => self.add_bytes(bytes),
            Value::Text(text) => self.add_str(text),
            Value::Compressed(bytes) => self.add_compressed(bytes),
            Value::Frame(child) => self.add_frame(child.deep_copy()?),
            Value::List(list) => match list {
                List::I16(items) => self.add_list(items),
                List::U16(items) => self.add_list(items),
                List::I32(items) => self.add_list(items),
                List::U32(items) => self.add_list(items),
                List::I64(items) => self.add_list(items),
                List::U64(items) => self.add_list(items),
                List::F32(items) => self.add_list(items),
                List::F64(items) => self.add_list(items),
                List::Bool(items) => self.add_list(items),
                List::Decimal(items) => self.add_list(items),
            },
        }
    }

    fn add_variable(&mut self, tag: Tag, payload: &[u8]) -> Result<()> {
        let len = u32::try_from(payload.len()).map_err(|_| Error::AllocationFailure)?;
        let buf = self.begin_field(1 + LENGTH_PREFIX_SIZE + payload.len())?;
        buf.put_u8(tag.byte())?;
        buf.put_u32(len)?;
        buf.put_bytes(payload)?;
        self.field_added();
        Ok(())
    }

    /// Check the field limit and reserve `size` bytes for the next field
    fn begin_field(&mut self, size: usize) -> Result<&mut crate::buffer::FieldBuffer> {
        let count = self.field_count() as usize;
        let buf = self.buffer_mut()?;
        if count >= MAX_FIELDS {
            return Err(Error::TooManyFields);
        }
        buf.reserve(size)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Stored;
    use crate::config::FrameConfig;
    use crate::frame::FrameHeader;
    use crate::value::{Decimal, Guid, TimeSpan, Timestamp};
    use crate::HEADER_SIZE;
    use std::sync::Arc;

    #[test]
    fn test_encoder_fixed_layout() {
        let mut frame = Frame::new(5);
        frame.add(42i32).unwrap();
        frame.add(7u16).unwrap();

        let bytes = frame.to_bytes().unwrap();
        assert_eq!(
            &bytes[HEADER_SIZE..],
            &[
                Tag::Int32.byte(), 42, 0, 0, 0, //
                Tag::UInt16.byte(), 7, 0,
            ]
        );
        let header = FrameHeader::decode(bytes).unwrap();
        assert_eq!(header.field_count, 2);
        assert_eq!(header.type_id, 5);
        assert_eq!(header.len as usize, HEADER_SIZE + 8);
    }

    #[test]
    fn test_encoder_variable_layout() {
        let mut frame = Frame::new(1);
        frame.add_str("hi").unwrap();
        frame.add_bytes(&[]).unwrap();

        let bytes = frame.to_bytes().unwrap();
        assert_eq!(
            &bytes[HEADER_SIZE..],
            &[
                Tag::Text.byte(), 2, 0, 0, 0, b'h', b'i', //
                Tag::Bytes.byte(), 0, 0, 0, 0,
            ]
        );
    }

    #[test]
    fn test_encoder_list_layout() {
        let mut frame = Frame::new(1);
        frame.add_list(&[1u16, 2, 3]).unwrap();

        let bytes = frame.to_bytes().unwrap();
        assert_eq!(
            &bytes[HEADER_SIZE..],
            &[0x80 | Tag::UInt16.byte(), 3, 0, 1, 0, 2, 0, 3, 0]
        );
    }

    #[test]
    fn test_encoder_nested_frame_layout() {
        let mut child = Frame::new(2);
        child.add(true).unwrap();
        let child_bytes = child.to_bytes().unwrap().to_vec();

        let mut parent = Frame::new(1);
        parent.add_frame(child).unwrap();
        let bytes = parent.to_bytes().unwrap();

        assert_eq!(bytes[HEADER_SIZE], Tag::Frame.byte());
        assert_eq!(&bytes[HEADER_SIZE + 1..HEADER_SIZE + 5], &(child_bytes.len() as u32).to_le_bytes());
        assert_eq!(&bytes[HEADER_SIZE + 5..], child_bytes.as_slice());
    }

    #[test]
    fn test_encoder_rejects_bad_lists() {
        let mut frame = Frame::new(1);
        frame.add(1u16).unwrap();
        let before = frame.to_bytes().unwrap().to_vec();

        assert_eq!(frame.add_list::<i32>(&[]), Err(Error::InvalidListInput));
        let too_long = vec![0u16; MAX_FIELDS + 1];
        assert_eq!(frame.add_list(&too_long), Err(Error::InvalidListInput));

        assert_eq!(frame.field_count(), 1);
        assert_eq!(frame.to_bytes().unwrap(), before.as_slice());

        let max_len = vec![true; MAX_FIELDS];
        frame.add_list(&max_len).unwrap();
        assert_eq!(frame.field_count(), 2);
    }

    #[test]
    fn test_encoder_field_limit() {
        let mut frame = Frame::new(1);
        for _ in 0..MAX_FIELDS {
            frame.add(false).unwrap();
        }
        let len = frame.len().unwrap();
        assert_eq!(frame.add(true), Err(Error::TooManyFields));
        assert_eq!(frame.add_str("x"), Err(Error::TooManyFields));
        assert_eq!(frame.field_count() as usize, MAX_FIELDS);
        assert_eq!(frame.len().unwrap(), len);
    }

    #[test]
    fn test_encoder_allocation_failure_leaves_frame_intact() {
        let config = FrameConfig::new()
            .with_initial_capacity(16)
            .with_max_frame_size(HEADER_SIZE + 32);
        let mut frame = Frame::with_config(1, config);
        frame.add(1u64).unwrap();
        frame.add(2u64).unwrap();

        assert_eq!(frame.add_bytes(&[0; 20]), Err(Error::AllocationFailure));
        assert_eq!(frame.field_count(), 2);
        assert_eq!(frame.len().unwrap(), 18);
        assert_eq!(frame.values().unwrap(), &[Value::U64(1), Value::U64(2)]);
    }

    #[test]
    fn test_encoder_compressed_goes_through_codec() {
        let config = FrameConfig::new().with_codec(Arc::new(Stored));
        let mut frame = Frame::with_config(1, config);
        frame.add_compressed(b"abc").unwrap();

        let bytes = frame.to_bytes().unwrap();
        assert_eq!(
            &bytes[HEADER_SIZE..],
            &[Tag::CompressedBytes.byte(), 3, 0, 0, 0, b'a', b'b', b'c']
        );
    }

    #[test]
    fn test_encoder_after_release() {
        let mut frame = Frame::new(1);
        frame.add(1i16).unwrap();
        frame.to_bytes().unwrap();
        frame.release();

        assert_eq!(frame.add(2i16), Err(Error::UsedAfterRelease));
        assert_eq!(frame.add_str("x"), Err(Error::UsedAfterRelease));
        assert_eq!(frame.add_compressed(b"x"), Err(Error::UsedAfterRelease));
        assert_eq!(frame.add_list::<u32>(&[]), Err(Error::UsedAfterRelease));
        assert_eq!(frame.add_frame(Frame::new(2)), Err(Error::UsedAfterRelease));
    }

    #[test]
    fn test_add_value_reencodes_every_kind() {
        let mut child = Frame::new(8);
        child.add(3u32).unwrap();

        let values = vec![
            Value::I16(-1),
            Value::U16(1),
            Value::I32(-2),
            Value::U32(2),
            Value::I64(-3),
            Value::U64(3),
            Value::F32(0.5),
            Value::F64(-0.25),
            Value::Bool(true),
            Value::Decimal(Decimal::new(12345, 2).unwrap()),
            Value::TimeSpan(TimeSpan(10)),
            Value::Timestamp(Timestamp(20)),
            Value::Guid(Guid([9; 16])),
            Value::Bytes(vec![1, 2]),
            Value::Text("text".into()),
            Value::Compressed(b"payload".to_vec()),
            Value::Frame(Box::new(child)),
            Value::List(List::I32(vec![1, -1])),
            Value::List(List::Decimal(vec![Decimal::ZERO])),
        ];

        let mut frame = Frame::new(1);
        for value in &values {
            frame.add_value(value).unwrap();
        }
        let bytes = frame.to_bytes().unwrap().to_vec();
        let mut decoded = Frame::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.values().unwrap(), values.as_slice());
    }
}
