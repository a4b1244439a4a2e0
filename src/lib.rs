//! # lzma-codec
//!
//! A pure-Rust implementation of the LZMA compression format and its
//! building blocks.
//!
//! This crate provides the binary range coder, adaptive bit-tree models, the
//! LZMA packet coder and the 13-byte `.lzma` stream framing, together with a
//! CRC-32 (ISO-HDLC) implementation for integrity checks.
//!
//! ## Quick Start
//!
//! ### Compressing Data
//!
//! ```rust
//! use lzma_codec::{LzmaEncoderOptions, Result, compress_bytes, decompress_bytes};
//!
//! fn main() -> Result<()> {
//!     let data = b"The quick brown fox jumps over the lazy dog. ".repeat(20);
//!
//!     let packed = compress_bytes(&data, &LzmaEncoderOptions::with_preset(6))?;
//!     assert!(packed.len() < data.len());
//!
//!     let unpacked = decompress_bytes(&packed)?;
//!     assert_eq!(unpacked, data);
//!     Ok(())
//! }
//! ```
//!
//! ### Streaming Adapters
//!
//! [`LzmaEncoder`] implements [`std::io::Write`] and produces a stream of
//! unknown size terminated by an end marker. [`LzmaDecoder`] implements
//! [`std::io::Read`]:
//!
//! ```rust
//! use std::io::{Read, Write};
//! use lzma_codec::{LzmaDecoder, LzmaEncoder, LzmaEncoderOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let mut encoder = LzmaEncoder::new(Vec::new(), &LzmaEncoderOptions::default())?;
//!     encoder.write_all(b"streamed ")?;
//!     encoder.write_all(b"content")?;
//!     let packed = encoder.finish()?;
//!
//!     let mut decoder = LzmaDecoder::new(&packed[..])?;
//!     let mut text = String::new();
//!     decoder.read_to_string(&mut text)?;
//!     assert_eq!(text, "streamed content");
//!     Ok(())
//! }
//! ```
//!
//! ### Low-Level Coding
//!
//! The range coder and bit-tree models can be used on their own:
//!
//! ```rust
//! use lzma_codec::codec::{BitTreeDecoder, BitTreeEncoder, RangeDecoder, RangeEncoder};
//!
//! # fn main() -> lzma_codec::Result<()> {
//! let mut tree = BitTreeEncoder::new(8);
//! let mut rc = RangeEncoder::new(Vec::new());
//! for symbol in [0x00, 0xFF, 0x80, 0x7F] {
//!     tree.encode(&mut rc, symbol)?;
//! }
//! let bytes = rc.finish()?;
//!
//! let mut tree = BitTreeDecoder::new(8);
//! let mut rc = RangeDecoder::new(&bytes[..])?;
//! for symbol in [0x00, 0xFF, 0x80, 0x7F] {
//!     assert_eq!(tree.decode(&mut rc)?, symbol);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `parallel` | No | Compress several files concurrently in the CLI (implies `cli`) |
//! | `cli` | No | Command-line interface tool |
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`], which is an alias for
//! `std::result::Result<T, Error>`. Every stream error is fatal for the
//! session that raised it.
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never
//! installs a logger.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

/// Default buffer size for read operations (8 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod checksum;
pub mod codec;
pub mod error;

pub use error::{Error, Result};

pub use checksum::{Checksum, Crc32, Crc32Reader, Crc32Writer, VerifyResult, verify_crc32};

// Re-export the stream API at crate root for convenience
pub use codec::{
    CompressionStats, LzmaDecoder, LzmaDecoderOptions, LzmaEncoder, LzmaEncoderOptions,
    LzmaHeader, LzmaProperties, compress, compress_bytes, decompress, decompress_bytes,
    decompress_with_options,
};
