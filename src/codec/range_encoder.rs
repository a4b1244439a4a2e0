//! LZMA Range Encoder.
//!
//! This module provides the adaptive binary range encoder at the bottom of the
//! LZMA stack. It supports:
//! - Adaptive probability-based bit encoding
//! - Direct bit encoding (for distance extra bits)
//!
//! Multi-bit symbols are coded by [`super::bit_tree`] on top of this type.
//!
//! # Range Coding Overview
//!
//! Range coding represents a sequence of binary decisions as a single number
//! inside an interval. Each decision narrows `range` in proportion to the
//! probability of the coded bit; whenever the top byte of `range` becomes
//! zero, a byte of `low` is settled and shifted out.
//!
//! # Carry Handling
//!
//! Adding `bound` to `low` can carry into bytes that were already settled.
//! Settled bytes are therefore held back: `cache` is the last settled byte and
//! `cache_size` counts it together with the `0xFF` bytes queued behind it. They
//! are written only once it is known whether a carry reaches them.

use std::io::Write;

use super::{BIT_MODEL_TOTAL, NUM_BIT_MODEL_TOTAL_BITS, NUM_MOVE_BITS, TOP_VALUE};
use crate::Result;

/// Buffered output is handed to the sink in batches of this size.
const OUTPUT_BATCH_SIZE: usize = 64 * 1024;

/// LZMA Range Encoder.
///
/// Encodes a sequence of bits using range coding with adaptive probabilities
/// and writes the resulting bytes to `W`.
pub struct RangeEncoder<W: Write> {
    low: u64,
    range: u32,
    cache: u8,
    cache_size: u64,
    buffer: Vec<u8>,
    sink: W,
    bytes_written: u64,
}

impl<W: Write> std::fmt::Debug for RangeEncoder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeEncoder")
            .field("low", &self.low)
            .field("range", &self.range)
            .field("cache", &self.cache)
            .field("cache_size", &self.cache_size)
            .finish_non_exhaustive()
    }
}

impl<W: Write> RangeEncoder<W> {
    /// Creates a freshly initialised range encoder writing to `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            low: 0,
            range: 0xFFFF_FFFF,
            cache: 0,
            cache_size: 1,
            buffer: Vec::with_capacity(OUTPUT_BATCH_SIZE),
            sink,
            bytes_written: 0,
        }
    }

    /// Encodes a single bit against an adaptive probability.
    ///
    /// `prob` is the probability (out of 2048) that the bit is 0; it is moved
    /// 1/32 of the way towards the observed bit.
    #[inline]
    pub fn encode_bit(&mut self, prob: &mut u16, bit: u32) -> Result<()> {
        let p = *prob as u32;
        let bound = (self.range >> NUM_BIT_MODEL_TOTAL_BITS) * p;

        if bit == 0 {
            self.range = bound;
            *prob = (p + ((BIT_MODEL_TOTAL - p) >> NUM_MOVE_BITS)) as u16;
        } else {
            self.low += bound as u64;
            self.range -= bound;
            *prob = (p - (p >> NUM_MOVE_BITS)) as u16;
        }

        if self.range < TOP_VALUE {
            self.range <<= 8;
            self.shift_low()?;
        }
        Ok(())
    }

    /// Encodes the low `num_bits` of `value` with fixed 50% probability,
    /// most significant bit first.
    pub fn encode_direct_bits(&mut self, value: u32, num_bits: u32) -> Result<()> {
        for i in (0..num_bits).rev() {
            self.range >>= 1;
            if (value >> i) & 1 != 0 {
                self.low += self.range as u64;
            }
            if self.range < TOP_VALUE {
                self.range <<= 8;
                self.shift_low()?;
            }
        }
        Ok(())
    }

    /// Settles the top byte of the 32-bit window of `low`.
    ///
    /// The comparison against `0xFF00_0000` decides whether a future carry can
    /// still reach the cached bytes; it must not be altered.
    pub fn shift_low(&mut self) -> Result<()> {
        if (self.low as u32) < 0xFF00_0000 || (self.low >> 32) != 0 {
            let carry = (self.low >> 32) as u8;
            let mut temp = self.cache;
            loop {
                self.put_byte(temp.wrapping_add(carry))?;
                temp = 0xFF;
                self.cache_size -= 1;
                if self.cache_size == 0 {
                    break;
                }
            }
            self.cache = (self.low >> 24) as u8;
        }
        self.cache_size += 1;
        self.low = (self.low & 0x00FF_FFFF) << 8;
        Ok(())
    }

    /// Drains all pending state into the output.
    pub fn flush(&mut self) -> Result<()> {
        for _ in 0..5 {
            self.shift_low()?;
        }
        Ok(())
    }

    /// Flushes the coder and the output buffer, returning the sink.
    pub fn finish(mut self) -> Result<W> {
        self.flush()?;
        self.drain_buffer()?;
        self.sink.flush()?;
        Ok(self.sink)
    }

    /// Returns the number of bytes emitted so far, including buffered ones.
    ///
    /// Bytes held back for carry resolution are not counted.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Returns the number of bytes `finish` will still emit from coder state.
    pub fn pending_bytes(&self) -> u64 {
        self.cache_size + 4
    }

    #[inline]
    fn put_byte(&mut self, byte: u8) -> Result<()> {
        self.buffer.push(byte);
        self.bytes_written += 1;
        if self.buffer.len() >= OUTPUT_BATCH_SIZE {
            self.drain_buffer()?;
        }
        Ok(())
    }

    fn drain_buffer(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.sink.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn range(&self) -> u32 {
        self.range
    }

    #[cfg(test)]
    pub(crate) fn cache_size(&self) -> u64 {
        self.cache_size
    }

    /// True when `low` overflowed and the next `shift_low` adds a carry.
    #[cfg(test)]
    pub(crate) fn carry_pending(&self) -> bool {
        self.low >> 32 != 0
    }
}
