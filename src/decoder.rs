//! Field decoding and the buffer-decode entry point
//!
//! Decoding walks the field section once from offset 0 and performs exactly
//! `field_count` dispatch steps. Nested frames go back through
//! [`Frame::from_bytes_with`], compressed payloads through the configured
//! codec. Anything unexpected stops the walk with an error; nothing is
//! skipped or guessed.
//!
//! A nested frame keeps its own copy of its bytes, and a compressed payload
//! expands on decode. Both count against one budget of `max_frame_size` bytes
//! per decode call, so a frame that passes the size check cannot grow past a
//! bounded multiple of it in memory.

use crate::buffer::{FieldBuffer, FieldCursor};
use crate::config::FrameConfig;
use crate::error::{Error, Result};
use crate::frame::{Frame, FrameHeader};
use crate::tag::Tag;
use crate::value::{Decimal, Guid, List, ListElement, TimeSpan, Timestamp, Value};
use crate::{HEADER_SIZE, MAX_NESTING_DEPTH};

impl Frame {
    /// Decode a complete serialized frame with default settings
    pub fn from_bytes(bytes: &[u8]) -> Result<Frame> {
        Self::from_bytes_with(bytes, &FrameConfig::default())
    }

    /// Decode a complete serialized frame
    ///
    /// `bytes` must hold exactly the length declared in the header. The
    /// returned frame is fully decoded: its values, nested frames included,
    /// are already materialized.
    pub fn from_bytes_with(bytes: &[u8], config: &FrameConfig) -> Result<Frame> {
        decode_frame(bytes, config, 0, &mut Budget::new(config))
    }
}

/// Bytes a single decode call may still materialize beyond its input
struct Budget {
    remaining: usize,
}

impl Budget {
    fn new(config: &FrameConfig) -> Self {
        Self {
            remaining: config.max_frame_size(),
        }
    }

    fn charge(&mut self, bytes: usize) -> Result<()> {
        match self.remaining.checked_sub(bytes) {
            Some(left) => {
                self.remaining = left;
                Ok(())
            }
            None => {
                tracing::warn!(bytes, remaining = self.remaining, "decode budget exhausted");
                Err(Error::FrameTooLarge)
            }
        }
    }
}

fn decode_frame(
    bytes: &[u8],
    config: &FrameConfig,
    depth: usize,
    budget: &mut Budget,
) -> Result<Frame> {
    let header = FrameHeader::decode(bytes)?;
    header.check_size(config.max_frame_size())?;

    let total = header.len as usize;
    if bytes.len() < total {
        return Err(Error::UnexpectedEof);
    }
    if bytes.len() > total {
        tracing::warn!(
            declared = total,
            actual = bytes.len(),
            "trailing bytes after frame"
        );
        return Err(Error::CorruptFormat);
    }

    let body = &bytes[HEADER_SIZE..total];
    let values = walk_fields(body, header.field_count, config, depth, budget)?;
    let buf = FieldBuffer::from_vec(body.to_vec(), config.max_body_size())?;

    tracing::debug!(
        type_id = header.type_id,
        fields = header.field_count,
        len = total,
        depth,
        "decoded frame"
    );
    Ok(Frame::from_decoded(
        header.type_id,
        header.field_count,
        buf,
        config.clone(),
        values,
    ))
}

/// Decode `count` fields that must exactly cover `body`
pub(crate) fn decode_fields(body: &[u8], count: u16, config: &FrameConfig) -> Result<Vec<Value>> {
    walk_fields(body, count, config, 0, &mut Budget::new(config))
}

fn walk_fields(
    body: &[u8],
    count: u16,
    config: &FrameConfig,
    depth: usize,
    budget: &mut Budget,
) -> Result<Vec<Value>> {
    let mut cursor = FieldCursor::new(body);
    let mut values = Vec::with_capacity(count as usize);

    for index in 0..count {
        let offset = cursor.position();
        let value = decode_field(&mut cursor, config, depth, budget).map_err(|err| {
            tracing::debug!(index, offset, error = %err, "field decode failed");
            err
        })?;
        values.push(value);
    }

    if !cursor.is_at_end() {
        tracing::warn!(
            fields = count,
            trailing = cursor.remaining(),
            "field section longer than its fields"
        );
        return Err(Error::CorruptFormat);
    }
    Ok(values)
}

fn decode_field(
    cursor: &mut FieldCursor<'_>,
    config: &FrameConfig,
    depth: usize,
    budget: &mut Budget,
) -> Result<Value> {
    let offset = cursor.position();
    let raw = cursor.get_u8()?;
    let (tag, is_list) = Tag::parse(raw).map_err(|err| {
        tracing::warn!(tag = raw, offset, "unknown field tag");
        err
    })?;

    if is_list {
        return decode_list(cursor, tag).map(Value::List);
    }

    let value = match tag {
        Tag::Int16 => Value::I16(cursor.get_scalar()?),
        Tag::UInt16 => Value::U16(cursor.get_scalar()?),
        Tag::Int32 => Value::I32(cursor.get_scalar()?),
        Tag::UInt32 => Value::U32(cursor.get_scalar()?),
        Tag::Int64 => Value::I64(cursor.get_scalar()?),
        Tag::UInt64 => Value::U64(cursor.get_scalar()?),
        Tag::Float32 => Value::F32(cursor.get_scalar()?),
        Tag::Float64 => Value::F64(cursor.get_scalar()?),
        Tag::Bool => Value::Bool(cursor.get_scalar()?),
        Tag::Decimal => Value::Decimal(cursor.get_scalar::<Decimal>()?),
        Tag::TimeSpan => Value::TimeSpan(cursor.get_scalar::<TimeSpan>()?),
        Tag::Timestamp => Value::Timestamp(cursor.get_scalar::<Timestamp>()?),
        Tag::Guid => Value::Guid(cursor.get_scalar::<Guid>()?),
        Tag::Bytes => Value::Bytes(read_payload(cursor)?.to_vec()),
        Tag::Text => {
            let text = std::str::from_utf8(read_payload(cursor)?).map_err(|_| {
                tracing::warn!(offset, "text field is not valid UTF-8");
                Error::CorruptFormat
            })?;
            Value::Text(text.to_owned())
        }
        Tag::CompressedBytes => {
            let bytes = config
                .codec()
                .decompress(read_payload(cursor)?, budget.remaining)?;
            budget.charge(bytes.len())?;
            Value::Compressed(bytes)
        }
        Tag::Frame => {
            if depth >= MAX_NESTING_DEPTH {
                tracing::warn!(depth, "frames nested too deeply");
                return Err(Error::CorruptFormat);
            }
            let payload = read_payload(cursor)?;
            budget.charge(payload.len())?;
            let nested = decode_frame(payload, config, depth + 1, budget)?;
            Value::Frame(Box::new(nested))
        }
    };
    Ok(value)
}

fn read_payload<'a>(cursor: &mut FieldCursor<'a>) -> Result<&'a [u8]> {
    let len = cursor.get_u32()? as usize;
    cursor.get_bytes(len)
}

fn decode_list(cursor: &mut FieldCursor<'_>, tag: Tag) -> Result<List> {
    let count = cursor.get_u16()? as usize;
    if count == 0 {
        tracing::warn!(?tag, "empty list field");
        return Err(Error::CorruptFormat);
    }

    match tag {
        Tag::Int16 => read_list::<i16>(cursor, count),
        Tag::UInt16 => read_list::<u16>(cursor, count),
        Tag::Int32 => read_list::<i32>(cursor, count),
        Tag::UInt32 => read_list::<u32>(cursor, count),
        Tag::Int64 => read_list::<i64>(cursor, count),
        Tag::UInt64 => read_list::<u64>(cursor, count),
        Tag::Float32 => read_list::<f32>(cursor, count),
        Tag::Float64 => read_list::<f64>(cursor, count),
        Tag::Bool => read_list::<bool>(cursor, count),
        Tag::Decimal => read_list::<Decimal>(cursor, count),
        Tag::TimeSpan
        | Tag::Timestamp
        | Tag::Guid
        | Tag::Bytes
        | Tag::Text
        | Tag::CompressedBytes
        | Tag::Frame => {
            tracing::warn!(?tag, "list of a kind that cannot be listed");
            Err(Error::CorruptFormat)
        }
    }
}

fn read_list<T: ListElement>(cursor: &mut FieldCursor<'_>, count: usize) -> Result<List> {
    let bytes = cursor.get_bytes(count * T::WIDTH)?;
    let items = bytes
        .chunks_exact(T::WIDTH)
        .map(T::read_le)
        .collect::<Result<Vec<T>>>()?;
    Ok(T::into_list(items))
}
