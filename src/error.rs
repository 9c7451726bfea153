//! Error types for the tagframe wire format

/// Errors that can occur while building, serializing, decoding or reading frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Operation attempted on a frame that has been released
    UsedAfterRelease,
    /// Field buffer cannot grow to hold the next field
    AllocationFailure,
    /// Empty or over-long list passed to a list add
    InvalidListInput,
    /// Frame already holds the maximum number of fields
    TooManyFields,
    /// Unknown tag, malformed payload or inconsistent lengths while decoding
    CorruptFormat,
    /// Header does not start with the magic prefix
    NotAFrame,
    /// Input ended before the declared data
    UnexpectedEof,
    /// Declared or serialized frame length exceeds the configured limit
    FrameTooLarge,
    /// Compression collaborator failed in either direction
    Compression,
    /// Underlying stream I/O failed
    Io(std::io::ErrorKind),
}

impl Error {
    /// Returns a human-readable description of the error
    pub const fn description(&self) -> &'static str {
        match self {
            Error::UsedAfterRelease => "frame used after release",
            Error::AllocationFailure => "frame buffer cannot grow further",
            Error::InvalidListInput => "list must hold between 1 and 65535 elements",
            Error::TooManyFields => "frame already holds 65535 fields",
            Error::CorruptFormat => "corrupt frame format",
            Error::NotAFrame => "magic prefix mismatch, not a frame",
            Error::UnexpectedEof => "unexpected end of frame data",
            Error::FrameTooLarge => "frame exceeds the maximum frame size",
            Error::Compression => "compression codec failed",
            Error::Io(_) => "stream I/O failed",
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(kind) => write!(f, "{}: {}", self.description(), kind),
            _ => write!(f, "{}", self.description()),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            kind => Error::Io(kind),
        }
    }
}

/// Result type alias for tagframe operations
pub type Result<T> = core::result::Result<T, Error>;
