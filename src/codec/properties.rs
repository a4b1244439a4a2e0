//! LZMA properties and the `.lzma` stream header.
//!
//! # Header Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 1 | Properties byte: `(pb * 5 + lp) * 9 + lc` |
//! | 1 | 4 | Dictionary size (little-endian) |
//! | 5 | 8 | Uncompressed size (little-endian), all ones if unknown |
//!
//! A stream of unknown size is terminated by an end marker in the payload.

use std::io::{Read, Write};

use crate::{Error, Result};

/// Size of the properties record (properties byte + dictionary size).
pub const PROPERTIES_SIZE: usize = 5;

/// Size of the full `.lzma` header.
pub const HEADER_SIZE: usize = PROPERTIES_SIZE + 8;

/// Uncompressed-size field value meaning "unknown, ends with an end marker".
pub const UNKNOWN_SIZE: u64 = u64::MAX;

/// Smallest dictionary a decoder allocates.
pub const DICT_SIZE_MIN: u32 = 1 << 12;

/// Largest dictionary the encoder accepts.
pub const DICT_SIZE_MAX: u32 = 1 << 29;

/// Maximum literal context bits.
pub const LC_MAX: u32 = 8;

/// Maximum literal position bits.
pub const LP_MAX: u32 = 4;

/// Maximum position bits.
pub const PB_MAX: u32 = 4;

/// Properties bytes at or above this value are invalid.
const PROPS_BYTE_LIMIT: u8 = ((PB_MAX + 1) * (LP_MAX + 1) * (LC_MAX + 1)) as u8;

/// LZMA model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaProperties {
    /// Literal context bits (0-8).
    pub lc: u32,
    /// Literal position bits (0-4).
    pub lp: u32,
    /// Position bits (0-4).
    pub pb: u32,
    /// Dictionary size in bytes.
    pub dict_size: u32,
}

impl Default for LzmaProperties {
    fn default() -> Self {
        Self {
            lc: 3,
            lp: 0,
            pb: 2,
            dict_size: 1 << 23,
        }
    }
}

impl LzmaProperties {
    /// Creates validated properties.
    pub fn new(lc: u32, lp: u32, pb: u32, dict_size: u32) -> Result<Self> {
        let props = Self {
            lc,
            lp,
            pb,
            dict_size,
        };
        props.validate()?;
        Ok(props)
    }

    /// Checks `lc`, `lp` and `pb` against their limits.
    pub fn validate(&self) -> Result<()> {
        if self.lc > LC_MAX {
            return Err(Error::InvalidProperties(format!(
                "lc must be at most {}, got {}",
                LC_MAX, self.lc
            )));
        }
        if self.lp > LP_MAX {
            return Err(Error::InvalidProperties(format!(
                "lp must be at most {}, got {}",
                LP_MAX, self.lp
            )));
        }
        if self.pb > PB_MAX {
            return Err(Error::InvalidProperties(format!(
                "pb must be at most {}, got {}",
                PB_MAX, self.pb
            )));
        }
        Ok(())
    }

    /// Returns the properties byte `(pb * 5 + lp) * 9 + lc`.
    pub fn props_byte(&self) -> u8 {
        ((self.pb * 5 + self.lp) * 9 + self.lc) as u8
    }

    /// Serializes the 5-byte properties record.
    pub fn to_bytes(&self) -> [u8; PROPERTIES_SIZE] {
        let mut out = [0u8; PROPERTIES_SIZE];
        out[0] = self.props_byte();
        out[1..].copy_from_slice(&self.dict_size.to_le_bytes());
        out
    }

    /// Parses a 5-byte properties record.
    pub fn from_bytes(bytes: &[u8; PROPERTIES_SIZE]) -> Result<Self> {
        let byte = bytes[0];
        if byte >= PROPS_BYTE_LIMIT {
            return Err(Error::InvalidProperties(format!(
                "properties byte {:#04x} out of range",
                byte
            )));
        }
        let mut d = byte as u32;
        let lc = d % 9;
        d /= 9;
        let lp = d % 5;
        let pb = d / 5;
        let dict_size = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        Self::new(lc, lp, pb, dict_size)
    }

    /// Dictionary size a decoder must provide for this stream.
    pub fn decoder_dict_size(&self) -> u32 {
        self.dict_size.max(DICT_SIZE_MIN)
    }
}

/// The 13-byte `.lzma` stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaHeader {
    /// Model parameters and dictionary size.
    pub properties: LzmaProperties,
    /// Declared uncompressed size, `None` when the stream ends with an end marker.
    pub uncompressed_size: Option<u64>,
}

impl LzmaHeader {
    /// Creates a header.
    pub fn new(properties: LzmaProperties, uncompressed_size: Option<u64>) -> Self {
        Self {
            properties,
            uncompressed_size,
        }
    }

    /// Serializes the header.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..PROPERTIES_SIZE].copy_from_slice(&self.properties.to_bytes());
        let size = self.uncompressed_size.unwrap_or(UNKNOWN_SIZE);
        out[PROPERTIES_SIZE..].copy_from_slice(&size.to_le_bytes());
        out
    }

    /// Writes the header to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Reads and validates a header.
    ///
    /// The properties are validated before the size field is read.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut props = [0u8; PROPERTIES_SIZE];
        reader
            .read_exact(&mut props)
            .map_err(|e| Error::from_read(e, "header"))?;
        let properties = LzmaProperties::from_bytes(&props)?;

        let mut size = [0u8; 8];
        reader
            .read_exact(&mut size)
            .map_err(|e| Error::from_read(e, "header"))?;
        let size = u64::from_le_bytes(size);
        let uncompressed_size = (size != UNKNOWN_SIZE).then_some(size);

        log::trace!(
            "parsed header: lc={} lp={} pb={} dict_size={} uncompressed_size={:?}",
            properties.lc,
            properties.lp,
            properties.pb,
            properties.dict_size,
            uncompressed_size
        );
        Ok(Self {
            properties,
            uncompressed_size,
        })
    }
}
