//! Reading and writing frames over byte streams
//!
//! The reader pulls exactly one header, checks the magic prefix, then pulls
//! the rest of the declared length and hands the whole frame to
//! [`Frame::from_bytes_with`]. A magic mismatch stops right after the header;
//! no further bytes are consumed. Reads are blocking and never retried.

use std::io::{ErrorKind, Read, Write};

use crate::config::FrameConfig;
use crate::error::{Error, Result};
use crate::frame::{Frame, FrameHeader};
use crate::HEADER_SIZE;

/// Read one frame with default settings
pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> Result<Frame> {
    read_frame_with(reader, &FrameConfig::default())
}

/// Read one frame
pub fn read_frame_with<R: Read + ?Sized>(reader: &mut R, config: &FrameConfig) -> Result<Frame> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;
    read_remaining(reader, header, config)
}

/// Write the serialized form of `frame`
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, frame: &mut Frame) -> Result<()> {
    writer.write_all(frame.to_bytes()?)?;
    Ok(())
}

fn read_remaining<R: Read + ?Sized>(
    reader: &mut R,
    header_bytes: [u8; HEADER_SIZE],
    config: &FrameConfig,
) -> Result<Frame> {
    let header = FrameHeader::decode(&header_bytes).map_err(|err| {
        if err == Error::NotAFrame {
            tracing::warn!(prefix = ?&header_bytes[..4], "stream header lacks magic prefix");
        }
        err
    })?;
    header.check_size(config.max_frame_size()).map_err(|err| {
        tracing::warn!(len = header.len, max = config.max_frame_size(), "frame too large");
        err
    })?;

    let total = header.len as usize;
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(total)
        .map_err(|_| Error::AllocationFailure)?;
    bytes.extend_from_slice(&header_bytes);
    bytes.resize(total, 0);
    reader.read_exact(&mut bytes[HEADER_SIZE..])?;

    tracing::debug!(
        type_id = header.type_id,
        fields = header.field_count,
        len = total,
        "read frame"
    );
    Frame::from_bytes_with(&bytes, config)
}

/// Iterator over consecutive frames in a stream
///
/// A clean end of stream on a frame boundary ends iteration. End of stream
/// inside a frame, or any other error, is yielded once and then iteration
/// stops.
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    config: FrameConfig,
    done: bool,
}

impl<R: Read> FrameReader<R> {
    /// Reader with default settings
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, FrameConfig::default())
    }

    /// Reader with the given settings
    pub fn with_config(reader: R, config: FrameConfig) -> Self {
        Self {
            reader,
            config,
            done: false,
        }
    }

    /// Borrow the underlying reader
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Recover the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Fill a header, or return `None` if the stream ends before its first byte
    fn read_header(&mut self) -> Result<Option<[u8; HEADER_SIZE]>> {
        let mut header = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            match self.reader.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(Error::UnexpectedEof),
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Some(header))
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.read_header()? {
            Some(header) => read_remaining(&mut self.reader, header, &self.config).map(Some),
            None => Ok(None),
        }
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
