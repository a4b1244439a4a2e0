//! The LZMA state machine and the constants shared by the encoder and decoder.
//!
//! The state (0-11) remembers the kinds of the last few packets. States 0-6
//! follow a literal, 7-11 follow a match or rep match, which is when the next
//! literal is coded against the byte at `rep0`.

/// Number of remembered rep distances.
pub(crate) const NUM_REPS: usize = 4;

/// Number of states.
pub(crate) const NUM_STATES: usize = 12;

/// Distance-slot trees are selected by `min(len - 2, 3)`.
pub(crate) const NUM_LEN_TO_POS_STATES: usize = 4;

pub(crate) const NUM_POS_SLOT_BITS: u32 = 6;
pub(crate) const NUM_ALIGN_BITS: u32 = 4;
pub(crate) const ALIGN_MASK: u32 = (1 << NUM_ALIGN_BITS) - 1;

/// First slot with footer bits.
pub(crate) const START_POS_MODEL_INDEX: u32 = 4;

/// First slot whose footer uses direct bits plus alignment.
pub(crate) const END_POS_MODEL_INDEX: u32 = 14;

/// Distances below this are fully coded with adaptive models.
pub(crate) const NUM_FULL_DISTANCES: u32 = 1 << (END_POS_MODEL_INDEX >> 1);

/// Size of the special distance model array shared by slots 4-13.
pub(crate) const NUM_SPEC_POS_MODELS: usize = (NUM_FULL_DISTANCES - END_POS_MODEL_INDEX) as usize;

/// Literal probabilities per literal context.
pub(crate) const LITERAL_CODER_SIZE: usize = 0x300;

/// Distance value (0-based) that marks the end of the stream.
pub(crate) const END_MARKER_DISTANCE: u32 = 0xFFFF_FFFF;

const LIT_NEXT_STATES: [u8; NUM_STATES] = [0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 4, 5];

/// LZMA state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct State(u8);

impl State {
    pub(crate) fn new() -> Self {
        State(0)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns true while the last packet was a literal.
    #[inline]
    pub(crate) fn is_literal(self) -> bool {
        self.0 < 7
    }

    #[inline]
    pub(crate) fn update_literal(&mut self) {
        self.0 = LIT_NEXT_STATES[self.index()];
    }

    #[inline]
    pub(crate) fn update_match(&mut self) {
        self.0 = if self.is_literal() { 7 } else { 10 };
    }

    #[inline]
    pub(crate) fn update_rep(&mut self) {
        self.0 = if self.is_literal() { 8 } else { 11 };
    }

    #[inline]
    pub(crate) fn update_short_rep(&mut self) {
        self.0 = if self.is_literal() { 9 } else { 11 };
    }
}

/// Distance-slot tree used for a match of length `len`.
#[inline]
pub(crate) fn len_to_pos_state(len: u32) -> usize {
    ((len - super::MATCH_LEN_MIN) as usize).min(NUM_LEN_TO_POS_STATES - 1)
}

/// Gets the distance slot for a 0-based distance.
///
/// Distance slots are logarithmically distributed:
/// - Slots 0-3: distances 0-3
/// - Slots 4-5: distances 4-7
/// - Slots 6-7: distances 8-15
/// - etc.
///
/// For dist >= 4, the slot is: 2 * (highest_bit_pos - 1) + second_highest_bit
#[inline]
pub(crate) fn dist_slot(dist: u32) -> u32 {
    if dist < START_POS_MODEL_INDEX {
        return dist;
    }
    let highest_bit_pos = 32 - dist.leading_zeros();
    let second_bit = (dist >> (highest_bit_pos - 2)) & 1;
    (highest_bit_pos - 1) * 2 + second_bit
}

/// Number of footer bits and base distance of a slot >= 4.
#[inline]
pub(crate) fn slot_footer(slot: u32) -> (u32, u32) {
    let footer_bits = (slot >> 1) - 1;
    (footer_bits, (2 | (slot & 1)) << footer_bits)
}
