//! Checksum computation utilities.
//!
//! This module provides the CRC-32 accumulator used to integrity-check
//! decompressed data.
//!
//! # CRC-32
//!
//! The variant is CRC-32/ISO-HDLC: reflected polynomial `0xEDB88320`, initial
//! value `0xFFFFFFFF`, final XOR `0xFFFFFFFF` (the one used by ZIP, gzip, 7z
//! and Ethernet). The lookup table is computed at compile time.
//!
//! # Example
//!
//! ```rust
//! use lzma_codec::checksum::{Checksum, Crc32};
//!
//! let mut crc = Crc32::new();
//! crc.update(b"1234");
//! crc.update(b"56789");
//! assert_eq!(crc.finalize(), 0xCBF43926);
//!
//! assert_eq!(Crc32::compute(b"123456789"), 0xCBF43926);
//! ```

use std::io::{self, Read, Write};

use crate::{Error, READ_BUFFER_SIZE, Result};

/// Reflected CRC-32/ISO-HDLC polynomial.
pub const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

const fn build_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut r = i as u32;
        let mut j = 0;
        while j < 8 {
            r = if r & 1 != 0 {
                (r >> 1) ^ CRC32_POLYNOMIAL
            } else {
                r >> 1
            };
            j += 1;
        }
        table[i] = r;
        i += 1;
    }
    table
}

/// Byte-indexed lookup table for [`CRC32_POLYNOMIAL`].
pub static CRC32_TABLE: [u32; 256] = build_crc32_table();

/// Common trait for checksum computation.
pub trait Checksum: Default + Clone {
    /// The output type of this checksum.
    type Output: Copy + Eq + std::fmt::Debug;

    /// Creates a new checksum calculator.
    fn new() -> Self;

    /// Updates the checksum with additional data.
    fn update(&mut self, data: &[u8]);

    /// Finishes the checksum computation and returns the value.
    fn finalize(&self) -> Self::Output;

    /// Resets the checksum to its initial state.
    fn reset(&mut self);

    /// Computes the checksum of a single slice in one call.
    fn compute(data: &[u8]) -> Self::Output {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Computes the checksum by reading from a reader.
    fn compute_reader<R: Read>(reader: &mut R) -> io::Result<Self::Output> {
        let mut hasher = Self::new();
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(hasher.finalize())
    }
}

/// CRC-32 checksum calculator.
///
/// # Example
///
/// ```rust
/// use lzma_codec::checksum::{Checksum, Crc32};
///
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, ");
/// crc.update(b"World!");
/// assert_eq!(crc.finalize(), 0xEC4AC3D0);
/// ```
#[derive(Clone)]
pub struct Crc32 {
    value: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Crc32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crc32")
            .field("current", &format_args!("{:#010x}", self.finalize()))
            .finish()
    }
}

impl Checksum for Crc32 {
    type Output = u32;

    fn new() -> Self {
        Self { value: 0xFFFF_FFFF }
    }

    fn update(&mut self, data: &[u8]) {
        let mut value = self.value;
        for &byte in data {
            value = CRC32_TABLE[((value ^ byte as u32) & 0xFF) as usize] ^ (value >> 8);
        }
        self.value = value;
    }

    fn finalize(&self) -> u32 {
        self.value ^ 0xFFFF_FFFF
    }

    fn reset(&mut self) {
        self.value = 0xFFFF_FFFF;
    }
}

impl Crc32 {
    /// Folds a single byte into the accumulator.
    #[inline]
    pub fn update_byte(&mut self, byte: u8) {
        self.value = CRC32_TABLE[((self.value ^ byte as u32) & 0xFF) as usize] ^ (self.value >> 8);
    }

    /// Continues a checksum from a previously finalized value.
    ///
    /// `Crc32::resume(a.finalize())` followed by `update(b)` equals the CRC of
    /// `a` followed by `b`.
    pub fn resume(finalized: u32) -> Self {
        Self {
            value: finalized ^ 0xFFFF_FFFF,
        }
    }
}

/// A writer wrapper that computes CRC-32 while writing.
///
/// # Example
///
/// ```rust
/// use lzma_codec::checksum::Crc32Writer;
/// use std::io::Write;
///
/// let mut buffer = Vec::new();
/// let mut writer = Crc32Writer::new(&mut buffer);
/// writer.write_all(b"123456789").unwrap();
///
/// assert_eq!(writer.crc(), 0xCBF43926);
/// assert_eq!(buffer, b"123456789");
/// ```
pub struct Crc32Writer<W> {
    inner: W,
    crc: Crc32,
    bytes_written: u64,
}

impl<W> Crc32Writer<W> {
    /// Creates a new CRC-32 writer wrapping the given writer.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            crc: Crc32::new(),
            bytes_written: 0,
        }
    }

    /// Returns the current CRC-32 value.
    pub fn crc(&self) -> u32 {
        self.crc.finalize()
    }

    /// Returns the number of bytes written.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Consumes the wrapper and returns the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for Crc32Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.crc.update(&buf[..n]);
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A reader wrapper that computes CRC-32 while reading.
pub struct Crc32Reader<R> {
    inner: R,
    crc: Crc32,
    bytes_read: u64,
}

impl<R> Crc32Reader<R> {
    /// Creates a new CRC-32 reader wrapping the given reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            crc: Crc32::new(),
            bytes_read: 0,
        }
    }

    /// Returns the current CRC-32 value.
    pub fn crc(&self) -> u32 {
        self.crc.finalize()
    }

    /// Returns the number of bytes read.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Consumes the wrapper and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Crc32Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.crc.update(&buf[..n]);
        self.bytes_read += n as u64;
        Ok(n)
    }
}

/// Verify result for CRC checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyResult {
    /// CRC matches expected value.
    Match,
    /// CRC does not match.
    Mismatch {
        /// Expected CRC value.
        expected: u32,
        /// Actual computed CRC value.
        actual: u32,
    },
    /// No CRC available for comparison.
    NoCrc,
}

impl VerifyResult {
    /// Returns true if verification passed or was skipped (no CRC).
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Match | Self::NoCrc)
    }

    /// Returns true if verification failed.
    pub fn is_err(&self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }

    /// Converts a mismatch into [`Error::CrcMismatch`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Mismatch { expected, actual } => Err(Error::crc_mismatch(expected, actual)),
            Self::Match | Self::NoCrc => Ok(()),
        }
    }
}

/// Verifies CRC-32 against an expected value.
pub fn verify_crc32(data: &[u8], expected: Option<u32>) -> VerifyResult {
    match expected {
        Some(expected) => {
            let actual = Crc32::compute(data);
            if actual == expected {
                VerifyResult::Match
            } else {
                VerifyResult::Mismatch { expected, actual }
            }
        }
        None => VerifyResult::NoCrc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_crc32_check_value() {
        assert_eq!(Crc32::compute(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn test_crc32_empty() {
        assert_eq!(Crc32::compute(b""), 0);
    }

    #[test]
    fn test_crc32_table_entries() {
        assert_eq!(CRC32_TABLE[0], 0);
        assert_eq!(CRC32_TABLE[1], 0x7707_3096);
        assert_eq!(CRC32_TABLE[128], CRC32_POLYNOMIAL);
        assert_eq!(CRC32_TABLE[255], 0x2D02_EF8D);
    }

    #[test]
    fn test_crc32_incremental() {
        let mut hasher = Crc32::new();
        hasher.update(b"Hello, ");
        hasher.update(b"World!");
        assert_eq!(hasher.finalize(), 0xEC4AC3D0);
    }

    #[test]
    fn test_crc32_update_byte() {
        let mut hasher = Crc32::new();
        for &b in b"123456789" {
            hasher.update_byte(b);
        }
        assert_eq!(hasher.finalize(), 0xCBF43926);
    }

    #[test]
    fn test_crc32_finalize_is_repeatable() {
        let mut hasher = Crc32::new();
        hasher.update(b"abc");
        assert_eq!(hasher.finalize(), hasher.finalize());
    }

    #[test]
    fn test_crc32_reset() {
        let mut hasher = Crc32::new();
        hasher.update(b"test");
        hasher.reset();
        hasher.update(b"123456789");
        assert_eq!(hasher.finalize(), 0xCBF43926);
    }

    #[test]
    fn test_crc32_resume() {
        let first = Crc32::compute(b"12345");
        let mut hasher = Crc32::resume(first);
        hasher.update(b"6789");
        assert_eq!(hasher.finalize(), 0xCBF43926);
    }

    #[test]
    fn test_crc32_matches_crc32fast() {
        let data: Vec<u8> = (0..10_000u32)
            .map(|i| (i.wrapping_mul(2654435761) >> 13) as u8)
            .collect();
        assert_eq!(Crc32::compute(&data), crc32fast::hash(&data));
    }

    #[test]
    fn test_crc32_compute_reader() {
        let mut reader = Cursor::new(vec![0xA5u8; READ_BUFFER_SIZE * 3 + 17]);
        let crc = Crc32::compute_reader(&mut reader).unwrap();
        assert_eq!(crc, Crc32::compute(&vec![0xA5u8; READ_BUFFER_SIZE * 3 + 17]));
    }

    #[test]
    fn test_crc32_writer() {
        let mut buffer = Vec::new();
        let mut writer = Crc32Writer::new(&mut buffer);
        writer.write_all(b"Hello, World!").unwrap();

        assert_eq!(writer.crc(), 0xEC4AC3D0);
        assert_eq!(writer.bytes_written(), 13);
        assert_eq!(buffer, b"Hello, World!");
    }

    #[test]
    fn test_crc32_reader() {
        let mut reader = Crc32Reader::new(Cursor::new(b"Hello, World!"));
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).unwrap();

        assert_eq!(reader.crc(), 0xEC4AC3D0);
        assert_eq!(reader.bytes_read(), 13);
    }

    #[test]
    fn test_verify_crc32() {
        let data = b"123456789";
        assert_eq!(verify_crc32(data, Some(0xCBF43926)), VerifyResult::Match);
        assert_eq!(verify_crc32(data, None), VerifyResult::NoCrc);

        let result = verify_crc32(data, Some(0x12345678));
        assert!(result.is_err());
        assert!(matches!(
            result.into_result(),
            Err(Error::CrcMismatch {
                expected: 0x12345678,
                actual: 0xCBF43926
            })
        ));
    }
}
