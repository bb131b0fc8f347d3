//! Error types
//!
//! A single crate-level [`Error`] plus [`SourceError`] for failures that
//! originate in the capture side.

use std::io;
use std::net::SocketAddr;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate error type
#[derive(Debug)]
pub enum Error {
    /// Underlying I/O error
    Io(io::Error),
    /// Sample spec rejected at startup
    InvalidSampleSpec(String),
    /// Buffer length rejected at startup
    InvalidBufferLength(String),
    /// Listen address could not be parsed
    InvalidListenAddr(String),
    /// Frame source failure
    Source(SourceError),
    /// Listening socket could not be bound
    Bind { addr: SocketAddr, source: io::Error },
    /// Per-connection write did not complete in time
    WriteTimeout,
}

/// Errors from a [`FrameSource`](crate::audio::FrameSource)
#[derive(Debug)]
pub enum SourceError {
    /// Source ended cleanly on a frame boundary
    EndOfStream,
    /// Source ended in the middle of a frame
    ShortFrame { expected: usize, got: usize },
    /// Capture process could not be started
    Spawn(io::Error),
    /// Read from the capture stream failed
    Read(io::Error),
}

impl SourceError {
    /// Whether this is the clean end-of-stream condition
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, SourceError::EndOfStream)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::InvalidSampleSpec(msg) => write!(f, "Invalid sample spec: {}", msg),
            Error::InvalidBufferLength(msg) => write!(f, "Invalid buffer length: {}", msg),
            Error::InvalidListenAddr(addr) => write!(f, "Invalid listen address: {}", addr),
            Error::Source(e) => write!(f, "Frame source error: {}", e),
            Error::Bind { addr, source } => write!(f, "Failed to listen on {}: {}", addr, source),
            Error::WriteTimeout => write!(f, "Write timed out"),
        }
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::EndOfStream => write!(f, "End of stream"),
            SourceError::ShortFrame { expected, got } => {
                write!(f, "Short frame: expected {} bytes, got {}", expected, got)
            }
            SourceError::Spawn(e) => write!(f, "Failed to start capture: {}", e),
            SourceError::Read(e) => write!(f, "Capture read failed: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Source(e) => Some(e),
            Error::Bind { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Spawn(e) | SourceError::Read(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<SourceError> for Error {
    fn from(e: SourceError) -> Self {
        Error::Source(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_converts() {
        let err: Error = SourceError::EndOfStream.into();
        assert!(matches!(err, Error::Source(SourceError::EndOfStream)));
    }

    #[test]
    fn test_display_short_frame() {
        let err = SourceError::ShortFrame {
            expected: 8820,
            got: 100,
        };
        assert_eq!(err.to_string(), "Short frame: expected 8820 bytes, got 100");
    }

    #[test]
    fn test_end_of_stream_detection() {
        assert!(SourceError::EndOfStream.is_end_of_stream());
        assert!(!SourceError::Read(io::Error::from(io::ErrorKind::Other)).is_end_of_stream());
    }
}
