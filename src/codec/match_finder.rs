//! Hash-chain match finder.
//!
//! Finds earlier occurrences of the bytes at the current position inside an
//! in-memory input block.
//!
//! # Algorithm Overview
//!
//! 1. **Hash Table**: maps a hash of the next 3 bytes to the most recent
//!    position with that hash
//! 2. **Chain Links**: a cyclic buffer of `min(dict_size, block_len)` entries
//!    links each position to the previous one with the same hash
//! 3. **Match Extension**: candidates are compared byte by byte, up to
//!    `MATCH_LEN_MAX` bytes
//!
//! Querying ([`MatchFinder::longest_match`]) and indexing
//! ([`MatchFinder::insert`]) are separate, so the caller decides which
//! positions are searched. A position must be inserted after it is queried.

use super::{MATCH_LEN_MAX, MATCH_LEN_MIN};

/// Bytes hashed per position.
const HASH_BYTES: usize = 3;

const HASH_BITS_MIN: u32 = 10;
const HASH_BITS_MAX: u32 = 20;

/// Empty head/chain slot.
const NULL_POS: u32 = u32::MAX;

/// A match found by the match finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Distance back to the earlier occurrence (1 = previous byte).
    pub distance: u32,
    /// Length of the match in bytes.
    pub length: u32,
}

impl Match {
    /// Creates a new match.
    #[inline]
    pub fn new(distance: u32, length: u32) -> Self {
        Self { distance, length }
    }
}

/// Hash-chain match finder over a single input block.
///
/// # Memory Usage
///
/// - Chain table: 4 bytes per position, up to the dictionary size
/// - Hash table: 4 bytes per bucket, between 1K and 1M buckets
pub struct MatchFinder {
    head: Vec<u32>,
    chain: Vec<u32>,
    hash_shift: u32,
    dict_size: usize,
    depth: u32,
    nice_len: usize,
}

impl std::fmt::Debug for MatchFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchFinder")
            .field("dict_size", &self.dict_size)
            .field("depth", &self.depth)
            .field("nice_len", &self.nice_len)
            .field("chain_len", &self.chain.len())
            .finish()
    }
}

impl MatchFinder {
    /// Creates a match finder for a block of `block_len` bytes.
    ///
    /// # Arguments
    ///
    /// * `dict_size` - Largest distance a match may have
    /// * `block_len` - Length of the data that will be indexed
    /// * `depth` - Maximum number of chain links followed per query
    /// * `nice_len` - Length at which a search stops early
    pub fn new(dict_size: u32, block_len: usize, depth: u32, nice_len: u32) -> Self {
        let dict_size = (dict_size as usize).max(1);
        let cyclic_size = dict_size.min(block_len).max(1);
        let hash_bits =
            (usize::BITS - cyclic_size.leading_zeros()).clamp(HASH_BITS_MIN, HASH_BITS_MAX);

        Self {
            head: vec![NULL_POS; 1 << hash_bits],
            chain: vec![NULL_POS; cyclic_size],
            hash_shift: 32 - hash_bits,
            dict_size,
            depth: depth.max(1),
            nice_len: (nice_len as usize).clamp(MATCH_LEN_MIN as usize, MATCH_LEN_MAX as usize),
        }
    }

    #[inline]
    fn hash(&self, data: &[u8], pos: usize) -> usize {
        let v = data[pos] as u32 | (data[pos + 1] as u32) << 8 | (data[pos + 2] as u32) << 16;
        (v.wrapping_mul(0x9E37_79B1) >> self.hash_shift) as usize
    }

    /// Indexes `pos` so that later positions can find it.
    ///
    /// Positions too close to the end of `data` to be hashed are ignored.
    pub fn insert(&mut self, data: &[u8], pos: usize) {
        if pos + HASH_BYTES > data.len() {
            return;
        }
        let h = self.hash(data, pos);
        let slot = pos % self.chain.len();
        self.chain[slot] = self.head[h];
        self.head[h] = pos as u32;
    }

    /// Finds the longest earlier occurrence of the bytes at `pos`.
    ///
    /// Matches are at least 3 bytes long (the hashed prefix), at most
    /// `MATCH_LEN_MAX` and never cross the end of `data`. Among equally long
    /// candidates the nearest one wins.
    pub fn longest_match(&self, data: &[u8], pos: usize) -> Option<Match> {
        if pos + HASH_BYTES > data.len() {
            return None;
        }

        let max_len = (data.len() - pos).min(MATCH_LEN_MAX as usize);
        let nice_len = self.nice_len.min(max_len);
        let mut best: Option<Match> = None;
        let mut best_len = HASH_BYTES - 1;
        let mut candidate = self.head[self.hash(data, pos)];

        for _ in 0..self.depth {
            if candidate == NULL_POS {
                break;
            }
            let cand = candidate as usize;
            if cand >= pos {
                break;
            }
            let distance = pos - cand;
            // The chain slot of `cand` is only intact while it is within the
            // cyclic window.
            if distance > self.dict_size || distance > self.chain.len() {
                break;
            }

            if data[cand + best_len] == data[pos + best_len] {
                let len = common_prefix_len(data, cand, pos, max_len);
                if len > best_len {
                    best_len = len;
                    best = Some(Match::new(distance as u32, len as u32));
                    if len >= nice_len {
                        break;
                    }
                }
            }

            candidate = self.chain[cand % self.chain.len()];
        }

        best
    }
}

/// Length of the common prefix of `data[a..]` and `data[b..]`, capped at
/// `limit`. `a < b`; the ranges may overlap.
#[inline]
pub fn common_prefix_len(data: &[u8], a: usize, b: usize, limit: usize) -> usize {
    let limit = limit.min(data.len() - b);
    let mut len = 0;
    while len < limit && data[a + len] == data[b + len] {
        len += 1;
    }
    len
}
