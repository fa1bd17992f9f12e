//! Error kinds shared by the wire codec and the pluggable payload codec.
//!
//! Mirrors the hand-rolled enum style the rest of this lineage uses: plain
//! `#[non_exhaustive]` enums with manual `Display`/`Error` impls, no
//! `thiserror`.

use std::{error, fmt, io};

/// Failure decoding a `Query`/`Response` frame body from raw bytes.
#[derive(Debug)]
#[non_exhaustive]
pub enum FrameError {
    /// A declared length field (`handlerLen`, `errorLen`, or the frame
    /// length prefix) pointed past the end of the buffer that was handed
    /// to the decoder.
    Malformed(&'static str),
    /// The handler name or error message bytes were not valid UTF-8.
    InvalidUtf8(std::str::Utf8Error),
    /// The socket reached EOF while a frame was only partially read.
    ShortRead,
    /// Underlying I/O failure while reading/writing a framed message.
    Io(io::Error),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(field) => write!(f, "malformed frame: {field} out of bounds"),
            Self::InvalidUtf8(e) => write!(f, "malformed frame: {e}"),
            Self::ShortRead => write!(f, "short read: connection closed mid-frame"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl error::Error for FrameError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::InvalidUtf8(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FrameError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::ShortRead
        } else {
            Self::Io(e)
        }
    }
}

impl From<std::str::Utf8Error> for FrameError {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::InvalidUtf8(e)
    }
}

/// Failure from the pluggable payload codec (§4.8 of the design). Carried
/// by a `Query`/`Response`'s opaque `message_data` when a caller asked for
/// it to be decoded into a typed value.
#[derive(Debug)]
pub struct CodecError(pub Box<dyn error::Error + Send + Sync>);

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payload codec error: {}", self.0)
    }
}

impl error::Error for CodecError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&*self.0)
    }
}
