//! Match length coding.
//!
//! Lengths `2..=273` are split over three bit trees:
//! - Low tree: lengths 2-9 (3 bits, one tree per position state)
//! - Mid tree: lengths 10-17 (3 bits, one tree per position state)
//! - High tree: lengths 18-273 (8 bits, shared)
//!
//! Two choice bits select the tree.

use std::io::{Read, Write};

use super::bit_tree::{BitTreeDecoder, BitTreeEncoder};
use super::price::{price0, price1};
use super::range_decoder::RangeDecoder;
use super::range_encoder::RangeEncoder;
use super::{INITIAL_PROB, MATCH_LEN_MIN};
use crate::Result;

/// Maximum number of position bits (`pb`).
pub const NUM_POS_BITS_MAX: u32 = 4;

/// Maximum number of position states.
pub const NUM_POS_STATES_MAX: usize = 1 << NUM_POS_BITS_MAX;

const LEN_LOW_BITS: u32 = 3;
const LEN_MID_BITS: u32 = 3;
const LEN_HIGH_BITS: u32 = 8;
const LEN_LOW_SYMBOLS: u32 = 1 << LEN_LOW_BITS;
const LEN_MID_SYMBOLS: u32 = 1 << LEN_MID_BITS;

/// Length encoder for match and rep lengths.
#[derive(Debug, Clone)]
pub struct LengthEncoder {
    choice: u16,
    choice2: u16,
    low: [BitTreeEncoder; NUM_POS_STATES_MAX],
    mid: [BitTreeEncoder; NUM_POS_STATES_MAX],
    high: BitTreeEncoder,
}

impl LengthEncoder {
    /// Creates a new length encoder with probabilities initialized.
    pub fn new() -> Self {
        Self {
            choice: INITIAL_PROB,
            choice2: INITIAL_PROB,
            low: std::array::from_fn(|_| BitTreeEncoder::new(LEN_LOW_BITS)),
            mid: std::array::from_fn(|_| BitTreeEncoder::new(LEN_MID_BITS)),
            high: BitTreeEncoder::new(LEN_HIGH_BITS),
        }
    }

    /// Encodes a length value.
    ///
    /// # Arguments
    /// * `rc` - Range encoder
    /// * `length` - Length to encode (2-273)
    /// * `pos_state` - Position state (0 to NUM_POS_STATES_MAX-1)
    pub fn encode<W: Write>(
        &mut self,
        rc: &mut RangeEncoder<W>,
        length: u32,
        pos_state: usize,
    ) -> Result<()> {
        let len = length - MATCH_LEN_MIN;

        if len < LEN_LOW_SYMBOLS {
            rc.encode_bit(&mut self.choice, 0)?;
            self.low[pos_state].encode(rc, len)
        } else if len < LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS {
            rc.encode_bit(&mut self.choice, 1)?;
            rc.encode_bit(&mut self.choice2, 0)?;
            self.mid[pos_state].encode(rc, len - LEN_LOW_SYMBOLS)
        } else {
            rc.encode_bit(&mut self.choice, 1)?;
            rc.encode_bit(&mut self.choice2, 1)?;
            self.high.encode(rc, len - LEN_LOW_SYMBOLS - LEN_MID_SYMBOLS)
        }
    }

    /// Returns the price of encoding `length` at `pos_state`.
    pub fn price(&self, length: u32, pos_state: usize) -> u32 {
        let len = length - MATCH_LEN_MIN;

        if len < LEN_LOW_SYMBOLS {
            price0(self.choice) + self.low[pos_state].price(len)
        } else if len < LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS {
            price1(self.choice)
                + price0(self.choice2)
                + self.mid[pos_state].price(len - LEN_LOW_SYMBOLS)
        } else {
            price1(self.choice)
                + price1(self.choice2)
                + self.high.price(len - LEN_LOW_SYMBOLS - LEN_MID_SYMBOLS)
        }
    }
}

impl Default for LengthEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Length decoder, the mirror of [`LengthEncoder`].
#[derive(Debug, Clone)]
pub struct LengthDecoder {
    choice: u16,
    choice2: u16,
    low: [BitTreeDecoder; NUM_POS_STATES_MAX],
    mid: [BitTreeDecoder; NUM_POS_STATES_MAX],
    high: BitTreeDecoder,
}

impl LengthDecoder {
    /// Creates a new length decoder with probabilities initialized.
    pub fn new() -> Self {
        Self {
            choice: INITIAL_PROB,
            choice2: INITIAL_PROB,
            low: std::array::from_fn(|_| BitTreeDecoder::new(LEN_LOW_BITS)),
            mid: std::array::from_fn(|_| BitTreeDecoder::new(LEN_MID_BITS)),
            high: BitTreeDecoder::new(LEN_HIGH_BITS),
        }
    }

    /// Decodes a length in `2..=273`.
    pub fn decode<R: Read>(&mut self, rc: &mut RangeDecoder<R>, pos_state: usize) -> Result<u32> {
        let len = if rc.decode_bit(&mut self.choice)? == 0 {
            self.low[pos_state].decode(rc)?
        } else if rc.decode_bit(&mut self.choice2)? == 0 {
            LEN_LOW_SYMBOLS + self.mid[pos_state].decode(rc)?
        } else {
            LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS + self.high.decode(rc)?
        };
        Ok(len + MATCH_LEN_MIN)
    }
}

impl Default for LengthDecoder {
    fn default() -> Self {
        Self::new()
    }
}
