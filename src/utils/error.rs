// src/utils/error.rs

use std::fmt;
use std::path::PathBuf;

use crate::codec::bits::BitstreamError;

/// The primary error type for all operations in the BARCH library.
#[derive(Debug)]
pub enum BarchError {
    /// The caller handed us an image the codec refuses to touch
    /// (zero dimensions, or a pixel buffer that does not match them).
    InvalidInput(String),
    /// The byte stream is not a well-formed BARCH (or 8-bit BMP) file.
    Format(String),
    /// An error occurred during I/O operations (e.g., file not found, permission denied).
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
}

impl BarchError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        BarchError::InvalidInput(msg.into())
    }

    pub fn format(msg: impl Into<String>) -> Self {
        BarchError::Format(msg.into())
    }

    /// Wraps an I/O error together with the path it happened on.
    pub fn io_at(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BarchError::Io {
            source,
            path: Some(path.into()),
        }
    }

    pub fn is_format(&self) -> bool {
        matches!(self, BarchError::Format(_))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, BarchError::InvalidInput(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(self, BarchError::Io { .. })
    }
}

impl std::error::Error for BarchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BarchError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for BarchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarchError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            BarchError::Format(msg) => write!(f, "Format error: {}", msg),
            BarchError::Io {
                source,
                path: Some(path),
            } => write!(f, "I/O error on path '{}': {}", path.display(), source),
            BarchError::Io { source, path: None } => write!(f, "I/O error: {}", source),
        }
    }
}

impl From<std::io::Error> for BarchError {
    fn from(err: std::io::Error) -> Self {
        BarchError::Io {
            source: err,
            path: None,
        }
    }
}

impl From<BitstreamError> for BarchError {
    fn from(err: BitstreamError) -> Self {
        BarchError::Format(err.to_string())
    }
}

/// A specialized `Result` type for BARCH operations.
pub type Result<T> = std::result::Result<T, BarchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_cause() {
        let err = BarchError::format("bad magic");
        assert_eq!(err.to_string(), "Format error: bad magic");

        let err = BarchError::io_at(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/tmp/x.barch",
        );
        assert!(err.to_string().contains("/tmp/x.barch"));
        assert!(err.is_io());
    }

    #[test]
    fn bitstream_error_is_a_format_error() {
        let err: BarchError = BitstreamError::OutOfData { byte_len: 3 }.into();
        assert!(err.is_format());
        assert!(err.to_string().contains("end of bitstream"));
    }
}
