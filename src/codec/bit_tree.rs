//! Bit-tree symbol coding.
//!
//! A bit tree codes a fixed-width symbol as a walk down a binary tree of
//! adaptive probabilities. The walk index `m` starts at the root (1); after
//! coding a bit `b` it moves to child `2m + b`. The tree for `n`-bit symbols
//! therefore holds `2^n` probabilities, index 0 unused.
//!
//! Symbols are coded either most significant bit first ([`BitTreeEncoder::encode`])
//! or least significant bit first ([`BitTreeEncoder::reverse_encode`]). The
//! reverse order is used for distance footers, where the low bits carry the
//! most structure.
//!
//! The free functions [`reverse_encode`], [`reverse_decode`] and
//! [`reverse_price`] operate on a window of a larger probability array. They
//! address `probs[offset + m - 1]`, so a tree rooted at `probs[offset]` can be
//! packed without the unused slot.

use std::io::{Read, Write};

use super::INITIAL_PROB;
use super::price::price_bit;
use super::range_decoder::RangeDecoder;
use super::range_encoder::RangeEncoder;
use crate::Result;

/// Largest supported symbol width.
pub const MAX_BIT_TREE_BITS: u32 = 16;

fn check_num_bits(num_bits: u32) {
    assert!(
        (1..=MAX_BIT_TREE_BITS).contains(&num_bits),
        "bit tree width must be in 1..={}, got {}",
        MAX_BIT_TREE_BITS,
        num_bits
    );
}

/// Encodes `num_bits`-wide symbols MSB first.
#[derive(Debug, Clone)]
pub struct BitTreeEncoder {
    probs: Vec<u16>,
    num_bits: u32,
}

impl BitTreeEncoder {
    /// Creates an encoder for symbols of `num_bits` bits.
    ///
    /// # Panics
    ///
    /// Panics if `num_bits` is not in `1..=16`.
    pub fn new(num_bits: u32) -> Self {
        check_num_bits(num_bits);
        Self {
            probs: vec![INITIAL_PROB; 1 << num_bits],
            num_bits,
        }
    }

    /// Encodes the low `num_bits` bits of `symbol`, MSB first.
    pub fn encode<W: Write>(&mut self, rc: &mut RangeEncoder<W>, symbol: u32) -> Result<()> {
        let mut m = 1usize;
        for i in (0..self.num_bits).rev() {
            let bit = (symbol >> i) & 1;
            rc.encode_bit(&mut self.probs[m], bit)?;
            m = (m << 1) | bit as usize;
        }
        Ok(())
    }

    /// Encodes the low `num_bits` bits of `symbol`, LSB first.
    pub fn reverse_encode<W: Write>(
        &mut self,
        rc: &mut RangeEncoder<W>,
        symbol: u32,
    ) -> Result<()> {
        reverse_encode(&mut self.probs, 1, rc, self.num_bits, symbol)
    }

    /// Returns the price of encoding `symbol` with [`encode`](Self::encode).
    pub fn price(&self, symbol: u32) -> u32 {
        let mut price = 0;
        let mut m = 1usize;
        for i in (0..self.num_bits).rev() {
            let bit = (symbol >> i) & 1;
            price += price_bit(self.probs[m], bit);
            m = (m << 1) | bit as usize;
        }
        price
    }

    /// Returns the price of encoding `symbol` with
    /// [`reverse_encode`](Self::reverse_encode).
    pub fn reverse_price(&self, symbol: u32) -> u32 {
        reverse_price(&self.probs, 1, self.num_bits, symbol)
    }

    #[cfg(test)]
    pub(crate) fn probs(&self) -> &[u16] {
        &self.probs
    }
}

/// Decodes `num_bits`-wide symbols MSB first.
#[derive(Debug, Clone)]
pub struct BitTreeDecoder {
    probs: Vec<u16>,
    num_bits: u32,
}

impl BitTreeDecoder {
    /// Creates a decoder for symbols of `num_bits` bits.
    ///
    /// # Panics
    ///
    /// Panics if `num_bits` is not in `1..=16`.
    pub fn new(num_bits: u32) -> Self {
        check_num_bits(num_bits);
        Self {
            probs: vec![INITIAL_PROB; 1 << num_bits],
            num_bits,
        }
    }

    /// Decodes a symbol coded MSB first. The result is below `2^num_bits`.
    pub fn decode<R: Read>(&mut self, rc: &mut RangeDecoder<R>) -> Result<u32> {
        let mut m = 1u32;
        for _ in 0..self.num_bits {
            m = (m << 1) | rc.decode_bit(&mut self.probs[m as usize])?;
        }
        Ok(m - (1 << self.num_bits))
    }

    /// Decodes a symbol coded LSB first.
    pub fn reverse_decode<R: Read>(&mut self, rc: &mut RangeDecoder<R>) -> Result<u32> {
        reverse_decode(&mut self.probs, 1, rc, self.num_bits)
    }
}

/// Encodes `symbol` LSB first over `probs[offset + m - 1]`.
pub fn reverse_encode<W: Write>(
    probs: &mut [u16],
    offset: usize,
    rc: &mut RangeEncoder<W>,
    num_bits: u32,
    mut symbol: u32,
) -> Result<()> {
    let mut m = 1usize;
    for _ in 0..num_bits {
        let bit = symbol & 1;
        symbol >>= 1;
        rc.encode_bit(&mut probs[offset + m - 1], bit)?;
        m = (m << 1) | bit as usize;
    }
    Ok(())
}

/// Decodes a symbol coded LSB first over `probs[offset + m - 1]`.
pub fn reverse_decode<R: Read>(
    probs: &mut [u16],
    offset: usize,
    rc: &mut RangeDecoder<R>,
    num_bits: u32,
) -> Result<u32> {
    let mut m = 1usize;
    let mut symbol = 0u32;
    for i in 0..num_bits {
        let bit = rc.decode_bit(&mut probs[offset + m - 1])?;
        m = (m << 1) | bit as usize;
        symbol |= bit << i;
    }
    Ok(symbol)
}

/// Returns the price of [`reverse_encode`] for `symbol`.
pub fn reverse_price(probs: &[u16], offset: usize, num_bits: u32, mut symbol: u32) -> u32 {
    let mut price = 0;
    let mut m = 1usize;
    for _ in 0..num_bits {
        let bit = symbol & 1;
        symbol >>= 1;
        price += price_bit(probs[offset + m - 1], bit);
        m = (m << 1) | bit as usize;
    }
    price
}
