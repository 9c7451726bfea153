//! tagframe: tagged-field binary frames with nested frames and stream framing
//!
//! A [`Frame`] carries an application-defined type identifier and an ordered
//! sequence of typed fields. Fields are appended through a growable buffer,
//! serialized to a flat byte form, and decoded back into a sequence of
//! [`Value`]s. [`read_frame`] and [`FrameReader`] recover frames from a
//! continuous byte stream.
//!
//! # Frame Format
//!
//! ```text
//! +-------------+-------------+--------------+-------------+
//! | Magic [4]   | Fields u16  | Length u32   | TypeId u16  |
//! +-------------+-------------+--------------+-------------+
//! | [tag][value]                        fixed-width field  |
//! | [tag][len u32][payload]             variable field     |
//! | [tag|0x80][count u16][value]*count  list field         |
//! +--------------------------------------------------------+
//! ```
//!
//! All integers are little-endian and `Length` includes the header. The
//! magic prefix only helps resynchronize on a stream; it is not a checksum.
//!
//! # Example
//!
//! ```rust
//! use tagframe::*;
//!
//! let mut frame = Frame::new(5);
//! frame.add(42i32)?;
//! frame.add(7u16)?;
//! frame.add_list(&[1.5f64, -2.25, 0.0])?;
//!
//! let bytes = frame.to_bytes()?.to_vec();
//! let mut decoded = Frame::from_bytes(&bytes)?;
//! assert_eq!(decoded.type_id(), 5);
//! assert_eq!(
//!     decoded.values()?,
//!     &[
//!         Value::I32(42),
//!         Value::U16(7),
//!         Value::List(List::F64(vec![1.5, -2.25, 0.0])),
//!     ]
//! );
//! # Ok::<(), tagframe::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod compression;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod stream;
pub mod tag;
pub mod value;

// Re-export main types
pub use compression::{Compressor, Stored};
#[cfg(feature = "deflate")]
pub use compression::Deflate;
#[cfg(feature = "lz4")]
pub use compression::Lz4;
pub use config::FrameConfig;
pub use error::{Error, Result};
pub use frame::{Frame, FrameHeader};
pub use stream::{read_frame, read_frame_with, write_frame, FrameReader};
pub use tag::Tag;
pub use value::{Decimal, Guid, List, ListElement, Scalar, TimeSpan, Timestamp, Value};

/// Magic prefix that opens every frame
pub const FRAME_MAGIC: [u8; 4] = [0xFE, 0xED, 0xF0, 0x0D];

/// Header size in bytes
pub const HEADER_SIZE: usize = 12;

/// Maximum number of fields in a frame, and of elements in a list field
pub const MAX_FIELDS: usize = u16::MAX as usize;

/// Default maximum serialized frame size (16MB - safety limit)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Deepest nesting of frames accepted while decoding
pub const MAX_NESTING_DEPTH: usize = 64;
