//! Error types for LZMA stream operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when compressing or decompressing LZMA streams, along with a
//! convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`. Every
//! stream error is fatal for the session that produced it: the range coder is
//! a strict sequential dependency, so a single bad bit invalidates all
//! subsequent output. Discard the stream and do not reuse the session.
//!
//! ```rust
//! use lzma_codec::{Error, decompress_bytes};
//!
//! fn describe(data: &[u8]) -> String {
//!     match decompress_bytes(data) {
//!         Ok(bytes) => format!("{} bytes", bytes.len()),
//!         Err(Error::StreamTruncated { context }) => format!("truncated in {}", context),
//!         Err(Error::InvalidProperties(reason)) => format!("bad properties: {}", reason),
//!         Err(e) => format!("error: {}", e),
//!     }
//! }
//!
//! assert_eq!(describe(&[0x5D, 0x00]), "truncated in header");
//! ```

use std::io;

/// The main error type for LZMA operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io] | Sink or source failure |
/// | Framing | [`StreamTruncated`][Self::StreamTruncated], [`InvalidProperties`][Self::InvalidProperties], [`SizeMismatch`][Self::SizeMismatch] | Malformed stream |
/// | Payload | [`CorruptData`][Self::CorruptData] | Damaged range-coded data |
/// | Integrity | [`CrcMismatch`][Self::CrcMismatch] | Caller-side checksum failure |
/// | Resources | [`ResourceLimitExceeded`][Self::ResourceLimitExceeded] | Memory limits |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred on the underlying sink or source.
    ///
    /// Running out of input is not reported here; see
    /// [`StreamTruncated`][Self::StreamTruncated].
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input ended before the header or payload was complete.
    ///
    /// No partial result is returned.
    #[error("stream truncated: input ended while reading {context}")]
    StreamTruncated {
        /// Which part of the stream was being read.
        context: &'static str,
    },

    /// The properties record or an encoder option is out of range.
    ///
    /// Streams are rejected with this error before any payload is decoded.
    #[error("invalid LZMA properties: {0}")]
    InvalidProperties(String),

    /// The number of decoded bytes disagrees with the declared size.
    #[error("size mismatch: header declares {expected} bytes, stream produced {actual}")]
    SizeMismatch {
        /// Size declared in the stream header.
        expected: u64,
        /// Size actually produced (or that would have been produced).
        actual: u64,
    },

    /// The range-coded payload decodes to something impossible.
    ///
    /// Typical causes are a match distance pointing before the start of the
    /// output or beyond the dictionary.
    #[error("corrupt data at output position {position}: {reason}")]
    CorruptData {
        /// Number of bytes decoded before the corruption was detected.
        position: u64,
        /// A description of the corruption.
        reason: &'static str,
    },

    /// A CRC-32 computed over decoded data does not match the expected value.
    ///
    /// This is a data-integrity failure reported by callers that keep a
    /// checksum next to the stream, distinct from framing failures.
    #[error("CRC mismatch: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch {
        /// The expected CRC value.
        expected: u32,
        /// The CRC value of the decoded data.
        actual: u32,
    },

    /// A configured resource limit was exceeded.
    #[error("resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),
}

impl Error {
    /// Returns `true` if this error indicates damaged or malformed stream data.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::StreamTruncated { .. }
                | Error::InvalidProperties(_)
                | Error::SizeMismatch { .. }
                | Error::CorruptData { .. }
                | Error::CrcMismatch { .. }
        )
    }

    /// Returns `true` if this error might be recoverable.
    ///
    /// Only transient I/O errors qualify. Every stream error leaves the coder
    /// in an unusable state.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Creates a CrcMismatch error.
    pub fn crc_mismatch(expected: u32, actual: u32) -> Self {
        Error::CrcMismatch { expected, actual }
    }

    /// Creates a CorruptData error.
    pub fn corrupt_data(position: u64, reason: &'static str) -> Self {
        Error::CorruptData { position, reason }
    }

    /// Maps an I/O error raised while reading stream bytes.
    ///
    /// `UnexpectedEof` becomes [`Error::StreamTruncated`]; everything else
    /// stays an I/O error.
    pub(crate) fn from_read(err: io::Error, context: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::StreamTruncated { context }
        } else {
            Error::Io(err)
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::StreamTruncated { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            Error::ResourceLimitExceeded(_) => io::Error::other(err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// A specialized Result type for LZMA operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_from_read_maps_eof_to_truncation() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let err = Error::from_read(eof, "payload");
        assert!(matches!(err, Error::StreamTruncated { context: "payload" }));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(Error::from_read(denied, "payload"), Error::Io(_)));
    }

    #[test]
    fn test_size_mismatch_display() {
        let err = Error::SizeMismatch {
            expected: 10,
            actual: 7,
        };
        assert_eq!(
            err.to_string(),
            "size mismatch: header declares 10 bytes, stream produced 7"
        );
    }

    #[test]
    fn test_crc_mismatch_display() {
        let err = Error::crc_mismatch(0xCBF43926, 0x12345678);
        assert_eq!(
            err.to_string(),
            "CRC mismatch: expected 0xcbf43926, got 0x12345678"
        );
        assert!(err.is_corruption());
    }

    #[test]
    fn test_is_recoverable() {
        let err = Error::Io(io::Error::new(io::ErrorKind::Interrupted, "signal"));
        assert!(err.is_recoverable());

        let err = Error::corrupt_data(12, "distance beyond dictionary");
        assert!(!err.is_recoverable());
        assert!(err.is_corruption());

        let err = Error::ResourceLimitExceeded("window".into());
        assert!(!err.is_recoverable());
        assert!(!err.is_corruption());
    }

    #[test]
    fn test_into_io_error_kinds() {
        let err: io::Error = Error::StreamTruncated { context: "header" }.into();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let err: io::Error = Error::InvalidProperties("lc".into()).into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let inner = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        let err: io::Error = Error::Io(inner).into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
