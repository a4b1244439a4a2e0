//! Bit price estimation.
//!
//! A price is the approximate cost of coding a bit, in 1/64ths of a bit
//! (`-log2(p)` in fixed point). The encoder compares prices to pick between
//! alternative encodings of the same data; prices never influence the coded
//! bit stream itself.
//!
//! The table is computed at compile time with a piecewise-linear
//! approximation of `log2` over the probability range, quantised to
//! `2^(11 - 2)` buckets.

use super::{BIT_MODEL_TOTAL, NUM_BIT_MODEL_TOTAL_BITS};

/// Probabilities are bucketed by dropping this many low bits.
pub const NUM_MOVE_REDUCING_BITS: u32 = 2;

/// Fractional bits of a price.
pub const NUM_BIT_PRICE_SHIFT_BITS: u32 = 6;

const PRICE_TABLE_BITS: u32 = NUM_BIT_MODEL_TOTAL_BITS - NUM_MOVE_REDUCING_BITS;

/// Number of entries in [`PROB_PRICES`].
pub const PRICE_TABLE_SIZE: usize = 1 << PRICE_TABLE_BITS;

/// Price of a bit at each reduced probability.
pub static PROB_PRICES: [u32; PRICE_TABLE_SIZE] = build_price_table();

const fn build_price_table() -> [u32; PRICE_TABLE_SIZE] {
    let mut table = [0u32; PRICE_TABLE_SIZE];
    let mut i = PRICE_TABLE_BITS;
    while i > 0 {
        i -= 1;
        let start = 1usize << (PRICE_TABLE_BITS - i - 1);
        let end = 1usize << (PRICE_TABLE_BITS - i);
        let mut j = start;
        while j < end {
            table[j] = (i << NUM_BIT_PRICE_SHIFT_BITS)
                + ((((end - j) as u32) << NUM_BIT_PRICE_SHIFT_BITS)
                    >> (PRICE_TABLE_BITS - i - 1));
            j += 1;
        }
    }
    table
}

/// Price of coding a 0 bit with probability `prob`.
#[inline]
pub fn price0(prob: u16) -> u32 {
    PROB_PRICES[(prob as usize) >> NUM_MOVE_REDUCING_BITS]
}

/// Price of coding a 1 bit with probability `prob`.
#[inline]
pub fn price1(prob: u16) -> u32 {
    PROB_PRICES[((BIT_MODEL_TOTAL - prob as u32) as usize) >> NUM_MOVE_REDUCING_BITS]
}

/// Price of coding `bit` with probability `prob`.
#[inline]
pub fn price_bit(prob: u16, bit: u32) -> u32 {
    if bit == 0 { price0(prob) } else { price1(prob) }
}

/// Price of `num_bits` direct (fixed 50%) bits.
#[inline]
pub fn direct_bits_price(num_bits: u32) -> u32 {
    num_bits << NUM_BIT_PRICE_SHIFT_BITS
}
