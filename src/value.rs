//! Decoded values and the statically dispatched scalar kinds
//!
//! [`Value`] is the closed set of things a field can decode into. [`Scalar`]
//! ties each fixed-width Rust type to its tag at compile time, and
//! [`ListElement`] narrows that set to the kinds allowed inside list fields.

use core::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::tag::Tag;

mod private {
    pub trait Sealed {}
}

/// Fixed-width kind with a compile-time tag
pub trait Scalar: private::Sealed + Copy + Sized {
    /// Tag written in front of a single value
    const TAG: Tag;
    /// Encoded width in bytes
    const WIDTH: usize;

    /// Write the little-endian form into `out`, which is exactly `WIDTH` bytes
    fn write_le(&self, out: &mut [u8]);

    /// Read a value from exactly `WIDTH` bytes
    fn read_le(bytes: &[u8]) -> Result<Self>;

    /// Wrap in the matching [`Value`] case
    fn into_value(self) -> Value;

    /// Extract from the matching [`Value`] case
    fn from_value(value: &Value) -> Option<Self>;
}

/// Scalar kind that may be packed into a list field
pub trait ListElement: Scalar {
    /// Wrap a decoded sequence in the matching [`List`] case
    fn into_list(items: Vec<Self>) -> List;

    /// Borrow the elements if `list` holds this kind
    fn from_list(list: &List) -> Option<&[Self]>;
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| Error::UnexpectedEof)
}

macro_rules! impl_primitive {
    ($ty:ty, $tag:ident, $variant:ident) => {
        impl private::Sealed for $ty {}

        impl Scalar for $ty {
            const TAG: Tag = Tag::$tag;
            const WIDTH: usize = core::mem::size_of::<$ty>();

            #[inline]
            fn write_le(&self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Result<Self> {
                Ok(<$ty>::from_le_bytes(fixed(bytes)?))
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

macro_rules! impl_list_element {
    ($ty:ty, $variant:ident) => {
        impl ListElement for $ty {
            fn into_list(items: Vec<Self>) -> List {
                List::$variant(items)
            }

            fn from_list(list: &List) -> Option<&[Self]> {
                match list {
                    List::$variant(items) => Some(items),
                    _ => None,
                }
            }
        }
    };
}

impl_primitive!(i16, Int16, I16);
impl_primitive!(u16, UInt16, U16);
impl_primitive!(i32, Int32, I32);
impl_primitive!(u32, UInt32, U32);
impl_primitive!(i64, Int64, I64);
impl_primitive!(u64, UInt64, U64);
impl_primitive!(f32, Float32, F32);
impl_primitive!(f64, Float64, F64);

impl private::Sealed for bool {}

impl Scalar for bool {
    const TAG: Tag = Tag::Bool;
    const WIDTH: usize = 1;

    #[inline]
    fn write_le(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Result<Self> {
        match fixed::<1>(bytes)? {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(Error::CorruptFormat),
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl_list_element!(i16, I16);
impl_list_element!(u16, U16);
impl_list_element!(i32, I32);
impl_list_element!(u32, U32);
impl_list_element!(i64, I64);
impl_list_element!(u64, U64);
impl_list_element!(f32, F32);
impl_list_element!(f64, F64);
impl_list_element!(bool, Bool);
impl_list_element!(Decimal, Decimal);

/// 128-bit decimal: a 96-bit magnitude, a sign and a power-of-ten scale
///
/// The wire form is four little-endian `u32` words: low, middle and high
/// magnitude words followed by a flags word holding the scale in bits 16..24
/// and the sign in bit 31. All other flag bits must be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    lo: u32,
    mid: u32,
    hi: u32,
    flags: u32,
}

impl Decimal {
    /// Largest supported scale
    pub const MAX_SCALE: u8 = 28;

    const SIGN_MASK: u32 = 0x8000_0000;
    const SCALE_SHIFT: u32 = 16;
    const SCALE_MASK: u32 = 0x00FF_0000;

    /// Zero with scale 0
    pub const ZERO: Decimal = Decimal {
        lo: 0,
        mid: 0,
        hi: 0,
        flags: 0,
    };

    /// Build from a signed mantissa and scale; the value is `mantissa / 10^scale`
    ///
    /// Returns `None` when the magnitude needs more than 96 bits or the scale
    /// exceeds [`Decimal::MAX_SCALE`].
    pub fn new(mantissa: i128, scale: u8) -> Option<Self> {
        let magnitude = mantissa.unsigned_abs();
        if magnitude >> 96 != 0 {
            return None;
        }
        Self::from_parts(
            magnitude as u32,
            (magnitude >> 32) as u32,
            (magnitude >> 64) as u32,
            mantissa < 0,
            scale,
        )
    }

    /// Build from raw magnitude words
    pub fn from_parts(lo: u32, mid: u32, hi: u32, negative: bool, scale: u8) -> Option<Self> {
        if scale > Self::MAX_SCALE {
            return None;
        }
        let mut flags = (scale as u32) << Self::SCALE_SHIFT;
        if negative {
            flags |= Self::SIGN_MASK;
        }
        Some(Self { lo, mid, hi, flags })
    }

    /// Signed mantissa
    pub fn mantissa(&self) -> i128 {
        let magnitude = ((self.hi as i128) << 64) | ((self.mid as i128) << 32) | self.lo as i128;
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Power-of-ten scale
    pub fn scale(&self) -> u8 {
        ((self.flags & Self::SCALE_MASK) >> Self::SCALE_SHIFT) as u8
    }

    /// Sign bit
    pub fn is_negative(&self) -> bool {
        self.flags & Self::SIGN_MASK != 0
    }

    /// Raw `[lo, mid, hi, flags]` words
    pub fn to_parts(&self) -> [u32; 4] {
        [self.lo, self.mid, self.hi, self.flags]
    }
}

impl private::Sealed for Decimal {}

impl Scalar for Decimal {
    const TAG: Tag = Tag::Decimal;
    const WIDTH: usize = 16;

    fn write_le(&self, out: &mut [u8]) {
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.to_parts()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
    }

    fn read_le(bytes: &[u8]) -> Result<Self> {
        let raw = fixed::<16>(bytes)?;
        let word = |i: usize| u32::from_le_bytes([raw[i], raw[i + 1], raw[i + 2], raw[i + 3]]);
        let flags = word(12);
        if flags & !(Self::SIGN_MASK | Self::SCALE_MASK) != 0 {
            return Err(Error::CorruptFormat);
        }
        let scale = ((flags & Self::SCALE_MASK) >> Self::SCALE_SHIFT) as u8;
        Self::from_parts(word(0), word(4), word(8), flags & Self::SIGN_MASK != 0, scale)
            .ok_or(Error::CorruptFormat)
    }

    fn into_value(self) -> Value {
        Value::Decimal(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Decimal(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa().unsigned_abs().to_string();
        let scale = self.scale() as usize;
        let sign = if self.is_negative() { "-" } else { "" };
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int}.{frac}")
    }
}

/// Ticks per second (one tick is 100 ns)
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Ticks between 0001-01-01 and the Unix epoch
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Signed duration counted in 100 ns ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeSpan(pub i64);

impl TimeSpan {
    /// Duration from raw ticks
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Raw ticks
    pub const fn ticks(&self) -> i64 {
        self.0
    }

    /// Convert a non-negative [`Duration`], `None` if it overflows the tick range
    pub fn from_duration(duration: Duration) -> Option<Self> {
        let ticks = duration.as_nanos() / 100;
        i64::try_from(ticks).ok().map(Self)
    }

    /// Convert to a [`Duration`], `None` for negative spans
    pub fn to_duration(&self) -> Option<Duration> {
        let ticks = u64::try_from(self.0).ok()?;
        let per_second = TICKS_PER_SECOND as u64;
        Some(Duration::new(
            ticks / per_second,
            ((ticks % per_second) * 100) as u32,
        ))
    }
}

/// Point in time counted in 100 ns ticks since 0001-01-01T00:00:00
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Timestamp from raw ticks
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Raw ticks
    pub const fn ticks(&self) -> i64 {
        self.0
    }

    /// Convert a [`SystemTime`], `None` if it falls outside the tick range
    pub fn from_system_time(time: SystemTime) -> Option<Self> {
        let since_epoch = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_nanos() / 100).ok()?,
            Err(before) => -i64::try_from(before.duration().as_nanos() / 100).ok()?,
        };
        UNIX_EPOCH_TICKS.checked_add(since_epoch).map(Self)
    }

    /// Convert to a [`SystemTime`], `None` if not representable on this platform
    pub fn to_system_time(&self) -> Option<SystemTime> {
        let since_epoch = self.0.checked_sub(UNIX_EPOCH_TICKS)?;
        let offset = Duration::from_nanos(since_epoch.unsigned_abs().checked_mul(100)?);
        if since_epoch >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        }
    }
}

macro_rules! impl_tick_scalar {
    ($ty:ident) => {
        impl private::Sealed for $ty {}

        impl Scalar for $ty {
            const TAG: Tag = Tag::$ty;
            const WIDTH: usize = 8;

            #[inline]
            fn write_le(&self, out: &mut [u8]) {
                out.copy_from_slice(&self.0.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Result<Self> {
                Ok($ty(i64::from_le_bytes(fixed(bytes)?)))
            }

            fn into_value(self) -> Value {
                Value::$ty(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$ty(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

impl_tick_scalar!(TimeSpan);
impl_tick_scalar!(Timestamp);

/// 128-bit identifier kept as raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    /// The all-zero identifier
    pub const NIL: Guid = Guid([0; 16]);

    /// Identifier from raw bytes
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl private::Sealed for Guid {}

impl Scalar for Guid {
    const TAG: Tag = Tag::Guid;
    const WIDTH: usize = 16;

    #[inline]
    fn write_le(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.0);
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Result<Self> {
        Ok(Guid(fixed(bytes)?))
    }

    fn into_value(self) -> Value {
        Value::Guid(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Guid(v) => Some(*v),
            _ => None,
        }
    }
}

/// Decoded homogeneous list field
#[derive(Debug, Clone, PartialEq)]
pub enum List {
    /// List of `i16`
    I16(Vec<i16>),
    /// List of `u16`
    U16(Vec<u16>),
    /// List of `i32`
    I32(Vec<i32>),
    /// List of `u32`
    U32(Vec<u32>),
    /// List of `i64`
    I64(Vec<i64>),
    /// List of `u64`
    U64(Vec<u64>),
    /// List of `f32`
    F32(Vec<f32>),
    /// List of `f64`
    F64(Vec<f64>),
    /// List of `bool`
    Bool(Vec<bool>),
    /// List of [`Decimal`]
    Decimal(Vec<Decimal>),
}

impl List {
    /// Element tag
    pub fn tag(&self) -> Tag {
        match self {
            List::I16(_) => Tag::Int16,
            List::U16(_) => Tag::UInt16,
            List::I32(_) => Tag::Int32,
            List::U32(_) => Tag::UInt32,
            List::I64(_) => Tag::Int64,
            List::U64(_) => Tag::UInt64,
            List::F32(_) => Tag::Float32,
            List::F64(_) => Tag::Float64,
            List::Bool(_) => Tag::Bool,
            List::Decimal(_) => Tag::Decimal,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            List::I16(v) => v.len(),
            List::U16(v) => v.len(),
            List::I32(v) => v.len(),
            List::U32(v) => v.len(),
            List::I64(v) => v.len(),
            List::U64(v) => v.len(),
            List::F32(v) => v.len(),
            List::F64(v) => v.len(),
            List::Bool(v) => v.len(),
            List::Decimal(v) => v.len(),
        }
    }

    /// Whether the list has no elements (never true for decoded lists)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the elements as `T`, `None` if the list holds another kind
    pub fn get<T: ListElement>(&self) -> Option<&[T]> {
        T::from_list(self)
    }
}

/// One decoded field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed 16-bit integer
    I16(i16),
    /// Unsigned 16-bit integer
    U16(u16),
    /// Signed 32-bit integer
    I32(i32),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Signed 64-bit integer
    I64(i64),
    /// Unsigned 64-bit integer
    U64(u64),
    /// Single precision float
    F32(f32),
    /// Double precision float
    F64(f64),
    /// Boolean
    Bool(bool),
    /// Scaled decimal
    Decimal(Decimal),
    /// Tick duration
    TimeSpan(TimeSpan),
    /// Tick timestamp
    Timestamp(Timestamp),
    /// 128-bit identifier
    Guid(Guid),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// UTF-8 text
    Text(String),
    /// Bytes recovered from a compressed field
    Compressed(Vec<u8>),
    /// Nested frame, fully decoded
    Frame(Box<Frame>),
    /// Homogeneous list
    List(List),
}

impl Value {
    /// Tag of the field this value was (or would be) encoded as
    pub fn tag(&self) -> Tag {
        match self {
            Value::I16(_) => Tag::Int16,
            Value::U16(_) => Tag::UInt16,
            Value::I32(_) => Tag::Int32,
            Value::U32(_) => Tag::UInt32,
            Value::I64(_) => Tag::Int64,
            Value::U64(_) => Tag::UInt64,
            Value::F32(_) => Tag::Float32,
            Value::F64(_) => Tag::Float64,
            Value::Bool(_) => Tag::Bool,
            Value::Decimal(_) => Tag::Decimal,
            Value::TimeSpan(_) => Tag::TimeSpan,
            Value::Timestamp(_) => Tag::Timestamp,
            Value::Guid(_) => Tag::Guid,
            Value::Bytes(_) => Tag::Bytes,
            Value::Text(_) => Tag::Text,
            Value::Compressed(_) => Tag::CompressedBytes,
            Value::Frame(_) => Tag::Frame,
            Value::List(list) => list.tag(),
        }
    }

    /// Whether this value came from a list field
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Extract a fixed-width scalar of type `T`
    pub fn get<T: Scalar>(&self) -> Option<T> {
        T::from_value(self)
    }

    /// Borrow byte content of `Bytes` and `Compressed` values
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) | Value::Compressed(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Borrow text content
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow a nested frame
    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Value::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// Mutably borrow a nested frame
    pub fn as_frame_mut(&mut self) -> Option<&mut Frame> {
        match self {
            Value::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// Borrow list content
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }
}

impl<T: Scalar> From<T> for Value {
    fn from(value: T) -> Self {
        value.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T: Scalar + PartialEq + fmt::Debug>(value: T) {
        let mut buf = vec![0u8; T::WIDTH];
        value.write_le(&mut buf);
        assert_eq!(T::read_le(&buf).unwrap(), value);
    }

    #[test]
    fn test_scalar_widths_match_tags() {
        assert_eq!(Some(i16::WIDTH), Tag::Int16.width());
        assert_eq!(Some(u64::WIDTH), Tag::UInt64.width());
        assert_eq!(Some(f32::WIDTH), Tag::Float32.width());
        assert_eq!(Some(bool::WIDTH), Tag::Bool.width());
        assert_eq!(Some(Decimal::WIDTH), Tag::Decimal.width());
        assert_eq!(Some(TimeSpan::WIDTH), Tag::TimeSpan.width());
        assert_eq!(Some(Timestamp::WIDTH), Tag::Timestamp.width());
        assert_eq!(Some(Guid::WIDTH), Tag::Guid.width());
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buf = [0u8; 4];
        0x0102_0304i32.write_le(&mut buf);
        assert_eq!(buf, [4, 3, 2, 1]);
    }

    #[test]
    fn test_extreme_values() {
        roundtrip(i16::MIN);
        roundtrip(u16::MAX);
        roundtrip(i32::MIN);
        roundtrip(u64::MAX);
        roundtrip(f64::MIN_POSITIVE);
        roundtrip(f32::NEG_INFINITY);
        roundtrip(TimeSpan(i64::MIN));
        roundtrip(Timestamp(i64::MAX));
        roundtrip(Guid([0xAB; 16]));
    }

    #[test]
    fn test_bool_rejects_other_bytes() {
        assert_eq!(bool::read_le(&[0]), Ok(false));
        assert_eq!(bool::read_le(&[1]), Ok(true));
        assert_eq!(bool::read_le(&[2]), Err(Error::CorruptFormat));
    }

    #[test]
    fn test_decimal_parts() {
        let d = Decimal::new(-123_456, 3).unwrap();
        assert_eq!(d.mantissa(), -123_456);
        assert_eq!(d.scale(), 3);
        assert!(d.is_negative());
        assert_eq!(d.to_string(), "-123.456");
        roundtrip(d);

        let max = Decimal::new((1i128 << 96) - 1, 0).unwrap();
        roundtrip(max);
        assert_eq!(Decimal::new(1i128 << 96, 0), None);
        assert_eq!(Decimal::new(1, 29), None);
        assert_eq!(Decimal::new(5, 2).unwrap().to_string(), "0.05");
    }

    #[test]
    fn test_decimal_rejects_reserved_flag_bits() {
        let mut buf = [0u8; 16];
        Decimal::new(42, 1).unwrap().write_le(&mut buf);
        buf[12] = 1;
        assert_eq!(Decimal::read_le(&buf), Err(Error::CorruptFormat));

        let mut buf = [0u8; 16];
        buf[14] = 29;
        assert_eq!(Decimal::read_le(&buf), Err(Error::CorruptFormat));
    }

    #[test]
    fn test_timestamp_system_time() {
        let unix = Timestamp::from_system_time(UNIX_EPOCH).unwrap();
        assert_eq!(unix.ticks(), UNIX_EPOCH_TICKS);
        assert_eq!(unix.to_system_time(), Some(UNIX_EPOCH));

        let later = UNIX_EPOCH + Duration::from_secs(90);
        let ts = Timestamp::from_system_time(later).unwrap();
        assert_eq!(ts.ticks(), UNIX_EPOCH_TICKS + 90 * TICKS_PER_SECOND);
        assert_eq!(ts.to_system_time(), Some(later));
    }

    #[test]
    fn test_timespan_duration() {
        let span = TimeSpan::from_duration(Duration::from_millis(1500)).unwrap();
        assert_eq!(span.ticks(), 15_000_000);
        assert_eq!(span.to_duration(), Some(Duration::from_millis(1500)));
        assert_eq!(TimeSpan(-1).to_duration(), None);
        assert_eq!(TimeSpan(3).to_duration(), Some(Duration::from_nanos(300)));
    }

    #[test]
    fn test_value_accessors() {
        let v = Value::from(42i32);
        assert_eq!(v.tag(), Tag::Int32);
        assert_eq!(v.get::<i32>(), Some(42));
        assert_eq!(v.get::<u32>(), None);

        let list = Value::List(List::F64(vec![1.0, 2.0]));
        assert!(list.is_list());
        assert_eq!(list.tag(), Tag::Float64);
        assert_eq!(list.as_list().unwrap().get::<f64>(), Some(&[1.0, 2.0][..]));
        assert_eq!(list.as_list().unwrap().get::<f32>(), None);
    }

    #[test]
    fn test_guid_display() {
        let guid = Guid::from_bytes([
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ]);
        assert_eq!(guid.to_string(), "00112233-4455-6677-8899-aabbccddeeff");
    }
}
