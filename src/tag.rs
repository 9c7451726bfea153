//! Field type tags
//!
//! Every field starts with a one-byte tag. The low seven bits select the value
//! kind, the high bit ([`LIST_FLAG`]) marks a count-prefixed homogeneous list of
//! that kind.

use crate::error::{Error, Result};

/// High bit of a tag byte: the field is a list of the base kind
pub const LIST_FLAG: u8 = 0x80;

/// Size of the length prefix carried by variable-width fields
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the element count carried by list fields
pub const LIST_COUNT_SIZE: usize = 2;

/// How a kind lays out its payload after the tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Payload width is implied by the tag
    Fixed(usize),
    /// Payload is preceded by a 4-byte length
    Variable,
}

/// Value kind carried by a field
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Signed 16-bit integer
    Int16 = 0,
    /// Unsigned 16-bit integer
    UInt16 = 1,
    /// Signed 32-bit integer
    Int32 = 2,
    /// Unsigned 32-bit integer
    UInt32 = 3,
    /// Signed 64-bit integer
    Int64 = 4,
    /// Unsigned 64-bit integer
    UInt64 = 5,
    /// IEEE-754 single precision float
    Float32 = 6,
    /// IEEE-754 double precision float
    Float64 = 7,
    /// Boolean stored as one byte
    Bool = 8,
    /// 128-bit scaled decimal
    Decimal = 9,
    /// Signed duration in 100 ns ticks
    TimeSpan = 10,
    /// Point in time in 100 ns ticks
    Timestamp = 11,
    /// 128-bit identifier
    Guid = 12,
    /// Raw byte blob
    Bytes = 13,
    /// UTF-8 text
    Text = 14,
    /// Byte blob stored through the compression codec
    CompressedBytes = 15,
    /// Nested serialized frame
    Frame = 16,
}

impl Tag {
    /// Every tag, in wire order
    pub const ALL: [Tag; 17] = [
        Tag::Int16,
        Tag::UInt16,
        Tag::Int32,
        Tag::UInt32,
        Tag::Int64,
        Tag::UInt64,
        Tag::Float32,
        Tag::Float64,
        Tag::Bool,
        Tag::Decimal,
        Tag::TimeSpan,
        Tag::Timestamp,
        Tag::Guid,
        Tag::Bytes,
        Tag::Text,
        Tag::CompressedBytes,
        Tag::Frame,
    ];

    /// Wire byte for a single value of this kind
    #[inline]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Wire byte for a list of this kind
    #[inline]
    pub const fn list_byte(self) -> u8 {
        self as u8 | LIST_FLAG
    }

    /// Payload layout of this kind
    pub const fn encoding(self) -> Encoding {
        match self {
            Tag::Bool => Encoding::Fixed(1),
            Tag::Int16 | Tag::UInt16 => Encoding::Fixed(2),
            Tag::Int32 | Tag::UInt32 | Tag::Float32 => Encoding::Fixed(4),
            Tag::Int64 | Tag::UInt64 | Tag::Float64 | Tag::TimeSpan | Tag::Timestamp => {
                Encoding::Fixed(8)
            }
            Tag::Decimal | Tag::Guid => Encoding::Fixed(16),
            Tag::Bytes | Tag::Text | Tag::CompressedBytes | Tag::Frame => Encoding::Variable,
        }
    }

    /// Fixed payload width, or `None` for variable-width kinds
    #[inline]
    pub const fn width(self) -> Option<usize> {
        match self.encoding() {
            Encoding::Fixed(width) => Some(width),
            Encoding::Variable => None,
        }
    }

    /// Whether this kind may appear as the base of a list field
    pub const fn is_list_element(self) -> bool {
        matches!(
            self,
            Tag::Int16
                | Tag::UInt16
                | Tag::Int32
                | Tag::UInt32
                | Tag::Int64
                | Tag::UInt64
                | Tag::Float32
                | Tag::Float64
                | Tag::Bool
                | Tag::Decimal
        )
    }

    /// Split a raw tag byte into its base kind and list flag
    #[inline]
    pub fn parse(raw: u8) -> Result<(Tag, bool)> {
        let tag = Tag::try_from(raw & !LIST_FLAG)?;
        Ok((tag, raw & LIST_FLAG != 0))
    }
}

impl TryFrom<u8> for Tag {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self> {
        Tag::ALL
            .get(raw as usize)
            .copied()
            .ok_or(Error::CorruptFormat)
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> u8 {
        tag.byte()
    }
}
