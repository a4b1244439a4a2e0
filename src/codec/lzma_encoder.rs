//! LZMA encoder context, packet encoding and parser.
//!
//! This module implements the LZMA probability context and encoding logic for:
//! - Literal bytes (plain, or matched against the byte at `rep0`)
//! - Matches (length + distance slot + footer bits)
//! - Rep matches and short reps (re-using one of the four last distances)
//! - The end-of-stream marker
//!
//! [`encode_block`] drives the context with a greedy parser that looks one
//! position ahead before committing to a match.

use std::io::Write;

use super::bit_tree::{self, BitTreeEncoder};
use super::length::{LengthEncoder, NUM_POS_STATES_MAX};
use super::match_finder::{Match, MatchFinder, common_prefix_len};
use super::price::{price0, price1, price_bit};
use super::properties::LzmaProperties;
use super::range_encoder::RangeEncoder;
use super::state::{
    ALIGN_MASK, END_MARKER_DISTANCE, END_POS_MODEL_INDEX, LITERAL_CODER_SIZE,
    NUM_ALIGN_BITS, NUM_LEN_TO_POS_STATES, NUM_POS_SLOT_BITS, NUM_REPS, NUM_SPEC_POS_MODELS,
    NUM_STATES, START_POS_MODEL_INDEX, State, dist_slot, len_to_pos_state, slot_footer,
};
use super::{INITIAL_PROB, MATCH_LEN_MAX, MATCH_LEN_MIN};
use crate::Result;

/// 2-byte matches this far away or further cost more than two literals.
const MAX_SHORT_MATCH_DISTANCE: u32 = 0x80;

/// LZMA encoder state with all probability arrays.
///
/// This structure maintains the adaptive probabilities used for
/// encoding literals, matches, and distances.
pub(crate) struct LzmaEncoderState {
    lc: u32,
    lp: u32,
    pos_mask: usize,

    state: State,
    /// Last four distances, 0-based.
    reps: [u32; NUM_REPS],

    is_match: [[u16; NUM_POS_STATES_MAX]; NUM_STATES],
    is_rep: [u16; NUM_STATES],
    is_rep_g0: [u16; NUM_STATES],
    is_rep_g1: [u16; NUM_STATES],
    is_rep_g2: [u16; NUM_STATES],
    is_rep0_long: [[u16; NUM_POS_STATES_MAX]; NUM_STATES],

    literal_probs: Vec<u16>,

    pos_slot_encoders: [BitTreeEncoder; NUM_LEN_TO_POS_STATES],
    pos_special: [u16; NUM_SPEC_POS_MODELS],
    align_encoder: BitTreeEncoder,

    len_encoder: LengthEncoder,
    rep_len_encoder: LengthEncoder,
}

impl std::fmt::Debug for LzmaEncoderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LzmaEncoderState")
            .field("state", &self.state)
            .field("reps", &self.reps)
            .finish_non_exhaustive()
    }
}

impl LzmaEncoderState {
    /// Creates a new encoder state with the given LZMA parameters.
    pub(crate) fn new(props: &LzmaProperties) -> Self {
        let num_literal_probs = LITERAL_CODER_SIZE << (props.lc + props.lp);

        Self {
            lc: props.lc,
            lp: props.lp,
            pos_mask: (1 << props.pb) - 1,
            state: State::new(),
            reps: [0; NUM_REPS],
            is_match: [[INITIAL_PROB; NUM_POS_STATES_MAX]; NUM_STATES],
            is_rep: [INITIAL_PROB; NUM_STATES],
            is_rep_g0: [INITIAL_PROB; NUM_STATES],
            is_rep_g1: [INITIAL_PROB; NUM_STATES],
            is_rep_g2: [INITIAL_PROB; NUM_STATES],
            is_rep0_long: [[INITIAL_PROB; NUM_POS_STATES_MAX]; NUM_STATES],
            literal_probs: vec![INITIAL_PROB; num_literal_probs],
            pos_slot_encoders: std::array::from_fn(|_| BitTreeEncoder::new(NUM_POS_SLOT_BITS)),
            pos_special: [INITIAL_PROB; NUM_SPEC_POS_MODELS],
            align_encoder: BitTreeEncoder::new(NUM_ALIGN_BITS),
            len_encoder: LengthEncoder::new(),
            rep_len_encoder: LengthEncoder::new(),
        }
    }

    #[inline]
    fn pos_state(&self, pos: usize) -> usize {
        pos & self.pos_mask
    }

    /// Returns the offset of the literal coder for this position.
    #[inline]
    fn literal_offset(&self, pos: usize, prev_byte: u8) -> usize {
        // Position is masked by lp bits only (not lc+lp)
        let lp_mask = (1usize << self.lp) - 1;
        let pos_bits = pos & lp_mask;
        let prev_bits = (prev_byte as usize) >> (8 - self.lc as usize);
        ((pos_bits << self.lc as usize) + prev_bits) * LITERAL_CODER_SIZE
    }

    /// Encodes a literal byte.
    ///
    /// `match_byte` is the byte at distance `rep0`; it is only consulted
    /// right after a match, when the literal is coded in matched mode.
    pub(crate) fn encode_literal<W: Write>(
        &mut self,
        rc: &mut RangeEncoder<W>,
        byte: u8,
        pos: usize,
        prev_byte: u8,
        match_byte: u8,
    ) -> Result<()> {
        let pos_state = self.pos_state(pos);
        rc.encode_bit(&mut self.is_match[self.state.index()][pos_state], 0)?;

        let base = self.literal_offset(pos, prev_byte);
        let probs = &mut self.literal_probs[base..base + LITERAL_CODER_SIZE];

        if self.state.is_literal() {
            let mut symbol = 1usize;
            for i in (0..8).rev() {
                let bit = ((byte >> i) & 1) as u32;
                rc.encode_bit(&mut probs[symbol], bit)?;
                symbol = (symbol << 1) | bit as usize;
            }
        } else {
            let mut symbol = 1usize;
            let mut offset = 0x100usize;
            for i in (0..8).rev() {
                let bit = ((byte >> i) & 1) as u32;
                let match_bit = ((match_byte >> i) & 1) as usize;
                rc.encode_bit(&mut probs[offset + match_bit * offset + symbol], bit)?;
                symbol = (symbol << 1) | bit as usize;
                if match_bit != bit as usize {
                    // Mismatch: switch to plain coding for the remaining bits
                    offset = 0;
                }
            }
        }

        self.state.update_literal();
        Ok(())
    }

    /// Encodes a match.
    ///
    /// # Arguments
    /// * `rc` - Range encoder
    /// * `distance` - Match distance (1-indexed, so distance=1 is the previous byte)
    /// * `length` - Match length (2-273)
    /// * `pos` - Current position in output
    pub(crate) fn encode_match<W: Write>(
        &mut self,
        rc: &mut RangeEncoder<W>,
        distance: u32,
        length: u32,
        pos: usize,
    ) -> Result<()> {
        let pos_state = self.pos_state(pos);
        rc.encode_bit(&mut self.is_match[self.state.index()][pos_state], 1)?;
        rc.encode_bit(&mut self.is_rep[self.state.index()], 0)?;
        self.len_encoder.encode(rc, length, pos_state)?;

        let dist = distance - 1;
        self.encode_distance(rc, dist, length)?;

        self.reps[3] = self.reps[2];
        self.reps[2] = self.reps[1];
        self.reps[1] = self.reps[0];
        self.reps[0] = dist;
        self.state.update_match();
        Ok(())
    }

    /// Encodes a repetition match (using a previous distance).
    ///
    /// A `length` of 1 with `rep_index` 0 is a short rep.
    pub(crate) fn encode_rep<W: Write>(
        &mut self,
        rc: &mut RangeEncoder<W>,
        rep_index: usize,
        length: u32,
        pos: usize,
    ) -> Result<()> {
        let pos_state = self.pos_state(pos);
        let s = self.state.index();
        rc.encode_bit(&mut self.is_match[s][pos_state], 1)?;
        rc.encode_bit(&mut self.is_rep[s], 1)?;

        if rep_index == 0 {
            rc.encode_bit(&mut self.is_rep_g0[s], 0)?;
            if length == 1 {
                rc.encode_bit(&mut self.is_rep0_long[s][pos_state], 0)?;
                self.state.update_short_rep();
                return Ok(());
            }
            rc.encode_bit(&mut self.is_rep0_long[s][pos_state], 1)?;
        } else {
            rc.encode_bit(&mut self.is_rep_g0[s], 1)?;
            if rep_index == 1 {
                rc.encode_bit(&mut self.is_rep_g1[s], 0)?;
            } else {
                rc.encode_bit(&mut self.is_rep_g1[s], 1)?;
                rc.encode_bit(&mut self.is_rep_g2[s], (rep_index - 2) as u32)?;
            }
            // Rotate reps to put used one at position 0
            let rep_dist = self.reps[rep_index];
            for i in (1..=rep_index).rev() {
                self.reps[i] = self.reps[i - 1];
            }
            self.reps[0] = rep_dist;
        }

        self.rep_len_encoder.encode(rc, length, pos_state)?;
        self.state.update_rep();
        Ok(())
    }

    /// Encodes the end-of-stream marker: a 2-byte match at distance
    /// `0xFFFF_FFFF`.
    pub(crate) fn encode_end_marker<W: Write>(
        &mut self,
        rc: &mut RangeEncoder<W>,
        pos: usize,
    ) -> Result<()> {
        let pos_state = self.pos_state(pos);
        rc.encode_bit(&mut self.is_match[self.state.index()][pos_state], 1)?;
        rc.encode_bit(&mut self.is_rep[self.state.index()], 0)?;
        self.len_encoder.encode(rc, MATCH_LEN_MIN, pos_state)?;
        self.encode_distance(rc, END_MARKER_DISTANCE, MATCH_LEN_MIN)?;
        self.state.update_match();
        Ok(())
    }

    /// Encodes a 0-based distance.
    ///
    /// - Slots 0-3: the slot is the distance
    /// - Slots 4-13: slot + reverse bit tree over the special models
    /// - Slots 14+: slot + direct bits + reverse-coded alignment bits
    fn encode_distance<W: Write>(
        &mut self,
        rc: &mut RangeEncoder<W>,
        dist: u32,
        length: u32,
    ) -> Result<()> {
        let slot = dist_slot(dist);
        self.pos_slot_encoders[len_to_pos_state(length)].encode(rc, slot)?;

        if slot >= START_POS_MODEL_INDEX {
            let (footer_bits, base) = slot_footer(slot);
            let reduced = dist - base;

            if slot < END_POS_MODEL_INDEX {
                bit_tree::reverse_encode(
                    &mut self.pos_special,
                    (base - slot) as usize,
                    rc,
                    footer_bits,
                    reduced,
                )?;
            } else {
                rc.encode_direct_bits(reduced >> NUM_ALIGN_BITS, footer_bits - NUM_ALIGN_BITS)?;
                self.align_encoder.reverse_encode(rc, reduced & ALIGN_MASK)?;
            }
        }
        Ok(())
    }

    /// Price of coding `byte` as a literal at `pos`.
    pub(crate) fn literal_price(&self, byte: u8, pos: usize, prev_byte: u8, match_byte: u8) -> u32 {
        let pos_state = self.pos_state(pos);
        let base = self.literal_offset(pos, prev_byte);
        let probs = &self.literal_probs[base..base + LITERAL_CODER_SIZE];

        let mut price = price0(self.is_match[self.state.index()][pos_state]);
        let mut symbol = 1usize;
        let mut offset = if self.state.is_literal() { 0 } else { 0x100usize };
        for i in (0..8).rev() {
            let bit = ((byte >> i) & 1) as u32;
            let match_bit = ((match_byte >> i) & 1) as usize;
            price += price_bit(probs[offset + match_bit * offset + symbol], bit);
            symbol = (symbol << 1) | bit as usize;
            if match_bit != bit as usize {
                offset = 0;
            }
        }
        price
    }

    /// Price of a short rep (one byte at `rep0`) at `pos`.
    pub(crate) fn short_rep_price(&self, pos: usize) -> u32 {
        let pos_state = self.pos_state(pos);
        let s = self.state.index();
        price1(self.is_match[s][pos_state])
            + price1(self.is_rep[s])
            + price0(self.is_rep_g0[s])
            + price0(self.is_rep0_long[s][pos_state])
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> State {
        self.state
    }

    pub(crate) fn reps(&self) -> &[u32; NUM_REPS] {
        &self.reps
    }
}

/// Parser tuning for [`encode_block`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParserParams {
    pub dict_size: u32,
    pub nice_len: u32,
    pub depth: u32,
    pub end_marker: bool,
}

/// Number of packets of each kind emitted by [`encode_block`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PacketCounts {
    pub literals: u64,
    pub matches: u64,
    pub reps: u64,
    pub short_reps: u64,
}

/// Decision taken at one position.
enum Packet {
    /// A literal, or a short rep if that is cheaper.
    Literal,
    Match(Match),
    Rep { index: usize, len: u32 },
}

/// `true` when `big` is so much further away than `small` that the shorter
/// distance is worth a byte of length.
#[inline]
fn change_pair(small: u32, big: u32) -> bool {
    (big >> 7) > small
}

/// Encodes all of `data` as one LZMA payload.
///
/// Writes no header and does not flush `rc`.
pub(crate) fn encode_block<W: Write>(
    data: &[u8],
    props: &LzmaProperties,
    params: &ParserParams,
    rc: &mut RangeEncoder<W>,
) -> Result<PacketCounts> {
    let mut enc = LzmaEncoderState::new(props);
    let mut mf = MatchFinder::new(params.dict_size, data.len(), params.depth, params.nice_len);
    let nice_len = params.nice_len as usize;
    let dict_size = params.dict_size as usize;
    let mut counts = PacketCounts::default();

    let mut pos = 0usize;
    // Match found at `pos` by the previous lookahead, not yet inserted.
    let mut lookahead: Option<Option<Match>> = None;

    while pos < data.len() {
        let main = match lookahead.take() {
            Some(found) => found,
            None => mf.longest_match(data, pos),
        };
        mf.insert(data, pos);

        let avail = (data.len() - pos).min(MATCH_LEN_MAX as usize);
        let packet = if pos == 0 || avail < MATCH_LEN_MIN as usize {
            Packet::Literal
        } else {
            choose_packet(
                data,
                pos,
                avail,
                main,
                &enc,
                &mut mf,
                &mut lookahead,
                nice_len,
                dict_size,
            )
        };

        let prev_byte = if pos > 0 { data[pos - 1] } else { 0 };
        let advance = match packet {
            Packet::Literal => {
                let rep0 = enc.reps()[0] as usize + 1;
                let match_byte = if rep0 <= pos { data[pos - rep0] } else { 0 };
                let short_rep_ok =
                    pos > 0 && rep0 <= pos && rep0 <= dict_size && match_byte == data[pos];
                if short_rep_ok
                    && enc.short_rep_price(pos)
                        < enc.literal_price(data[pos], pos, prev_byte, match_byte)
                {
                    enc.encode_rep(rc, 0, 1, pos)?;
                    counts.short_reps += 1;
                } else {
                    enc.encode_literal(rc, data[pos], pos, prev_byte, match_byte)?;
                    counts.literals += 1;
                }
                1
            }
            Packet::Match(m) => {
                enc.encode_match(rc, m.distance, m.length, pos)?;
                counts.matches += 1;
                m.length as usize
            }
            Packet::Rep { index, len } => {
                enc.encode_rep(rc, index, len, pos)?;
                counts.reps += 1;
                len as usize
            }
        };

        if advance > 1 {
            // The lookahead result is stale once a match is taken.
            lookahead = None;
            for p in pos + 1..pos + advance {
                mf.insert(data, p);
            }
        }
        pos += advance;
    }

    if params.end_marker {
        enc.encode_end_marker(rc, pos)?;
    }

    log::trace!(
        "encoded {} bytes: {} literals, {} matches, {} reps, {} short reps",
        data.len(),
        counts.literals,
        counts.matches,
        counts.reps,
        counts.short_reps
    );
    Ok(counts)
}

/// Picks the packet for `pos` (`pos > 0`, at least 2 bytes available).
#[allow(clippy::too_many_arguments)]
fn choose_packet(
    data: &[u8],
    pos: usize,
    avail: usize,
    main: Option<Match>,
    enc: &LzmaEncoderState,
    mf: &mut MatchFinder,
    lookahead: &mut Option<Option<Match>>,
    nice_len: usize,
    dict_size: usize,
) -> Packet {
    let reps = enc.reps();

    // Longest rep match.
    let mut rep_len = 0usize;
    let mut rep_index = 0usize;
    for (i, &rep) in reps.iter().enumerate() {
        let dist = rep as usize + 1;
        if dist > pos || dist > dict_size {
            continue;
        }
        let start = pos - dist;
        if data[start] != data[pos] || data[start + 1] != data[pos + 1] {
            continue;
        }
        let len = common_prefix_len(data, start, pos, avail);
        if len >= nice_len {
            return Packet::Rep { index: i, len: len as u32 };
        }
        if len > rep_len {
            rep_len = len;
            rep_index = i;
        }
    }

    let (mut main_len, main_dist) = match main {
        Some(m) => (m.length as usize, m.distance - 1),
        None => (0, 0),
    };
    if main_len >= nice_len {
        return Packet::Match(Match::new(main_dist + 1, main_len as u32));
    }
    if main_len == MATCH_LEN_MIN as usize && main_dist >= MAX_SHORT_MATCH_DISTANCE {
        main_len = 0;
    }

    if rep_len >= MATCH_LEN_MIN as usize
        && (rep_len + 1 >= main_len
            || (rep_len + 2 >= main_len && main_dist >= 1 << 9)
            || (rep_len + 3 >= main_len && main_dist >= 1 << 15))
    {
        return Packet::Rep {
            index: rep_index,
            len: rep_len as u32,
        };
    }

    if main_len < MATCH_LEN_MIN as usize {
        return Packet::Literal;
    }

    // One-step lookahead: is the match starting at the next byte better?
    let next = mf.longest_match(data, pos + 1);
    *lookahead = Some(next);
    if let Some(n) = next {
        let new_len = n.length as usize;
        let new_dist = n.distance - 1;
        if (new_len >= main_len && new_dist < main_dist)
            || (new_len == main_len + 1 && !change_pair(main_dist, new_dist))
            || new_len > main_len + 1
            || (new_len + 1 >= main_len && main_len >= 3 && change_pair(new_dist, main_dist))
        {
            return Packet::Literal;
        }
    }

    let next_pos = pos + 1;
    let limit = (main_len - 1).max(MATCH_LEN_MIN as usize);
    if next_pos + limit <= data.len() {
        for &rep in reps {
            let dist = rep as usize + 1;
            if dist > next_pos || dist > dict_size {
                continue;
            }
            if common_prefix_len(data, next_pos - dist, next_pos, limit) >= limit {
                return Packet::Literal;
            }
        }
    }

    Packet::Match(Match::new(main_dist + 1, main_len as u32))
}
