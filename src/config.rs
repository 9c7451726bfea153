//! Frame construction and decoding settings

use std::fmt;
use std::sync::Arc;

use crate::compression::{default_codec, Compressor};
use crate::{HEADER_SIZE, MAX_FRAME_SIZE};

/// Default starting capacity of a frame's field buffer
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Settings shared by a frame, the frames nested in it and the stream reader
#[derive(Clone)]
pub struct FrameConfig {
    initial_capacity: usize,
    max_frame_size: usize,
    codec: Arc<dyn Compressor>,
}

impl FrameConfig {
    /// Default settings
    pub fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_frame_size: MAX_FRAME_SIZE,
            codec: default_codec(),
        }
    }

    /// Starting capacity of the field buffer
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Largest serialized frame, header included
    ///
    /// Clamped to at least [`HEADER_SIZE`] and at most `u32::MAX`, the range the
    /// header's length field can express.
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size.clamp(HEADER_SIZE, u32::MAX as usize);
        self
    }

    /// Codec for compressed-bytes fields
    pub fn with_codec(mut self, codec: Arc<dyn Compressor>) -> Self {
        self.codec = codec;
        self
    }

    /// Starting capacity of the field buffer
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity.min(self.max_body_size())
    }

    /// Largest serialized frame, header included
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Largest field section a frame may hold
    pub fn max_body_size(&self) -> usize {
        self.max_frame_size - HEADER_SIZE
    }

    /// Codec for compressed-bytes fields
    pub fn codec(&self) -> &Arc<dyn Compressor> {
        &self.codec
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameConfig")
            .field("initial_capacity", &self.initial_capacity)
            .field("max_frame_size", &self.max_frame_size)
            .field("codec", &self.codec.name())
            .finish()
    }
}
