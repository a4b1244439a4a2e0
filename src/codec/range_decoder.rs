//! LZMA Range Decoder.
//!
//! Mirror image of [`super::range_encoder`]: it tracks the same `range` and
//! reads the settled bytes back into `code`, the offset of the coded value
//! inside the current interval.

use std::io::Read;

use super::{BIT_MODEL_TOTAL, NUM_BIT_MODEL_TOTAL_BITS, NUM_MOVE_BITS, TOP_VALUE};
use crate::{Error, Result};

/// LZMA Range Decoder.
///
/// Running out of input is reported as [`Error::StreamTruncated`]; missing
/// bytes are never treated as zeros.
pub struct RangeDecoder<R: Read> {
    range: u32,
    code: u32,
    source: R,
}

impl<R: Read> std::fmt::Debug for RangeDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeDecoder")
            .field("range", &self.range)
            .field("code", &self.code)
            .finish_non_exhaustive()
    }
}

impl<R: Read> RangeDecoder<R> {
    /// Creates a range decoder and reads the 5 initial payload bytes.
    ///
    /// The first byte is an alignment byte and is discarded; the next four
    /// form the initial `code` (big-endian).
    pub fn new(mut source: R) -> Result<Self> {
        let mut init = [0u8; 5];
        source
            .read_exact(&mut init)
            .map_err(|e| Error::from_read(e, "range coder initialization"))?;
        if init[0] != 0 {
            log::warn!(
                "leading payload byte is {:#04x}, expected 0x00; discarding it",
                init[0]
            );
        }
        let code = u32::from_be_bytes([init[1], init[2], init[3], init[4]]);
        Ok(Self {
            range: 0xFFFF_FFFF,
            code,
            source,
        })
    }

    /// Decodes a single bit against an adaptive probability.
    #[inline]
    pub fn decode_bit(&mut self, prob: &mut u16) -> Result<u32> {
        let p = *prob as u32;
        let bound = (self.range >> NUM_BIT_MODEL_TOTAL_BITS) * p;

        let bit = if self.code < bound {
            self.range = bound;
            *prob = (p + ((BIT_MODEL_TOTAL - p) >> NUM_MOVE_BITS)) as u16;
            0
        } else {
            self.range -= bound;
            self.code -= bound;
            *prob = (p - (p >> NUM_MOVE_BITS)) as u16;
            1
        };

        self.normalize()?;
        Ok(bit)
    }

    /// Decodes `num_bits` fixed-probability bits, most significant bit first.
    pub fn decode_direct_bits(&mut self, num_bits: u32) -> Result<u32> {
        let mut result = 0u32;
        for _ in 0..num_bits {
            self.range >>= 1;
            // t is 1 when code < range (a 0 bit), 0 otherwise.
            let t = self.code.wrapping_sub(self.range) >> 31;
            self.code = self.code.wrapping_sub(self.range & t.wrapping_sub(1));
            result = (result << 1) | (1 - t);
            self.normalize()?;
        }
        Ok(result)
    }

    /// Returns true when the coder sits exactly at the end of a flushed stream.
    pub fn is_finished_ok(&self) -> bool {
        self.code == 0
    }

    #[inline]
    fn normalize(&mut self) -> Result<()> {
        if self.range < TOP_VALUE {
            let mut byte = [0u8; 1];
            self.source
                .read_exact(&mut byte)
                .map_err(|e| Error::from_read(e, "payload"))?;
            self.range <<= 8;
            self.code = (self.code << 8) | byte[0] as u32;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn range(&self) -> u32 {
        self.range
    }
}
