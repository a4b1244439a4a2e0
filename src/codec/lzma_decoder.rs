//! LZMA decoder state and dictionary window.
//!
//! The decoder mirrors [`super::lzma_encoder`] packet by packet. Every
//! distance is validated against the amount of output produced so far and
//! the dictionary size before any byte is copied; the declared uncompressed
//! size, when known, is enforced exactly.

use std::io::Read;

use super::INITIAL_PROB;
use super::bit_tree::{self, BitTreeDecoder};
use super::length::{LengthDecoder, NUM_POS_STATES_MAX};
use super::properties::LzmaProperties;
use super::range_decoder::RangeDecoder;
use super::state::{
    END_MARKER_DISTANCE, END_POS_MODEL_INDEX, LITERAL_CODER_SIZE, NUM_ALIGN_BITS,
    NUM_LEN_TO_POS_STATES, NUM_POS_SLOT_BITS, NUM_REPS, NUM_SPEC_POS_MODELS, NUM_STATES,
    START_POS_MODEL_INDEX, State, len_to_pos_state, slot_footer,
};
use crate::{Error, Result};

/// Circular history buffer holding the last `size` output bytes.
pub(crate) struct OutWindow {
    buf: Vec<u8>,
    pos: usize,
}

impl OutWindow {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            buf: vec![0; size.max(1)],
            pos: 0,
        }
    }

    #[inline]
    pub(crate) fn put_byte(&mut self, byte: u8) {
        self.buf[self.pos] = byte;
        self.pos += 1;
        if self.pos == self.buf.len() {
            self.pos = 0;
        }
    }

    /// Returns the byte `dist` positions back (1 = last byte written).
    #[inline]
    pub(crate) fn get_byte(&self, dist: usize) -> u8 {
        let index = if dist <= self.pos {
            self.pos - dist
        } else {
            self.buf.len() - dist + self.pos
        };
        self.buf[index]
    }

    /// Copies `len` bytes from `dist` back, appending them to `out` as well.
    ///
    /// The source may overlap the bytes being written.
    pub(crate) fn copy_match(&mut self, dist: usize, len: usize, out: &mut Vec<u8>) {
        for _ in 0..len {
            let byte = self.get_byte(dist);
            self.put_byte(byte);
            out.push(byte);
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.buf.len()
    }
}

/// Outcome of decoding one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Finished,
}

/// LZMA decoder: range decoder, probability model and dictionary window.
pub(crate) struct LzmaDecoderState<R: Read> {
    rc: RangeDecoder<R>,
    window: OutWindow,

    lc: u32,
    lp: u32,
    pos_mask: usize,
    dict_size: u32,
    uncompressed_size: Option<u64>,
    total_out: u64,
    finished: bool,
    /// Set once a packet failed to decode; the session is unusable after that.
    failed: bool,

    state: State,
    reps: [u32; NUM_REPS],

    is_match: [[u16; NUM_POS_STATES_MAX]; NUM_STATES],
    is_rep: [u16; NUM_STATES],
    is_rep_g0: [u16; NUM_STATES],
    is_rep_g1: [u16; NUM_STATES],
    is_rep_g2: [u16; NUM_STATES],
    is_rep0_long: [[u16; NUM_POS_STATES_MAX]; NUM_STATES],

    literal_probs: Vec<u16>,

    pos_slot_decoders: [BitTreeDecoder; NUM_LEN_TO_POS_STATES],
    pos_special: [u16; NUM_SPEC_POS_MODELS],
    align_decoder: BitTreeDecoder,

    len_decoder: LengthDecoder,
    rep_len_decoder: LengthDecoder,
}

impl<R: Read> std::fmt::Debug for LzmaDecoderState<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LzmaDecoderState")
            .field("dict_size", &self.dict_size)
            .field("uncompressed_size", &self.uncompressed_size)
            .field("total_out", &self.total_out)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Bytes of memory a decoder for these properties allocates.
pub(crate) fn memory_usage(props: &LzmaProperties, uncompressed_size: Option<u64>) -> u64 {
    window_size(props, uncompressed_size) as u64
        + ((LITERAL_CODER_SIZE as u64) << (props.lc + props.lp)) * 2
}

fn window_size(props: &LzmaProperties, uncompressed_size: Option<u64>) -> usize {
    let dict = props.decoder_dict_size() as u64;
    match uncompressed_size {
        Some(size) => dict.min(size) as usize,
        None => dict as usize,
    }
}

impl<R: Read> LzmaDecoderState<R> {
    /// Creates a decoder for a raw payload read from `source`.
    ///
    /// Reads the 5 range coder initialization bytes.
    pub(crate) fn new(
        source: R,
        props: &LzmaProperties,
        uncompressed_size: Option<u64>,
        memory_limit: Option<u64>,
    ) -> Result<Self> {
        props.validate()?;
        if let Some(limit) = memory_limit {
            let needed = memory_usage(props, uncompressed_size);
            if needed > limit {
                return Err(Error::ResourceLimitExceeded(format!(
                    "decoder needs {} bytes, limit is {}",
                    needed, limit
                )));
            }
        }

        let rc = RangeDecoder::new(source)?;
        Ok(Self {
            rc,
            window: OutWindow::new(window_size(props, uncompressed_size)),
            lc: props.lc,
            lp: props.lp,
            pos_mask: (1 << props.pb) - 1,
            dict_size: props.decoder_dict_size(),
            uncompressed_size,
            total_out: 0,
            finished: uncompressed_size == Some(0),
            failed: false,
            state: State::new(),
            reps: [0; NUM_REPS],
            is_match: [[INITIAL_PROB; NUM_POS_STATES_MAX]; NUM_STATES],
            is_rep: [INITIAL_PROB; NUM_STATES],
            is_rep_g0: [INITIAL_PROB; NUM_STATES],
            is_rep_g1: [INITIAL_PROB; NUM_STATES],
            is_rep_g2: [INITIAL_PROB; NUM_STATES],
            is_rep0_long: [[INITIAL_PROB; NUM_POS_STATES_MAX]; NUM_STATES],
            literal_probs: vec![INITIAL_PROB; LITERAL_CODER_SIZE << (props.lc + props.lp)],
            pos_slot_decoders: std::array::from_fn(|_| BitTreeDecoder::new(NUM_POS_SLOT_BITS)),
            pos_special: [INITIAL_PROB; NUM_SPEC_POS_MODELS],
            align_decoder: BitTreeDecoder::new(NUM_ALIGN_BITS),
            len_decoder: LengthDecoder::new(),
            rep_len_decoder: LengthDecoder::new(),
        })
    }

    /// Returns true once the declared size was produced or the end marker seen.
    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of bytes decoded so far.
    pub(crate) fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Decodes packets, appending output to `out`, until `out` holds at least
    /// `target` bytes or the stream is finished.
    ///
    /// After an error the session is poisoned: every later call fails without
    /// touching the range decoder again.
    pub(crate) fn decode_into(&mut self, out: &mut Vec<u8>, target: usize) -> Result<()> {
        if self.failed {
            return Err(Error::corrupt_data(self.total_out, "decoder used after a fatal error"));
        }
        while !self.finished && out.len() < target {
            if self.uncompressed_size == Some(self.total_out) {
                self.finished = true;
                break;
            }
            match self.decode_packet(out) {
                Ok(Step::Finished) => self.finished = true,
                Ok(Step::Continue) => {}
                Err(e) => {
                    self.failed = true;
                    return Err(e);
                }
            }
        }
        if !self.finished && self.uncompressed_size == Some(self.total_out) {
            self.finished = true;
        }
        Ok(())
    }

    fn decode_packet(&mut self, out: &mut Vec<u8>) -> Result<Step> {
        let pos_state = self.total_out as usize & self.pos_mask;
        let s = self.state.index();

        if self.rc.decode_bit(&mut self.is_match[s][pos_state])? == 0 {
            let byte = self.decode_literal()?;
            self.window.put_byte(byte);
            out.push(byte);
            self.total_out += 1;
            self.state.update_literal();
            return Ok(Step::Continue);
        }

        let len = if self.rc.decode_bit(&mut self.is_rep[s])? == 1 {
            self.decode_rep(s, pos_state)?
        } else {
            self.reps[3] = self.reps[2];
            self.reps[2] = self.reps[1];
            self.reps[1] = self.reps[0];
            let len = self.len_decoder.decode(&mut self.rc, pos_state)?;
            self.state.update_match();
            self.reps[0] = self.decode_distance(len)?;

            if self.reps[0] == END_MARKER_DISTANCE {
                if let Some(expected) = self.uncompressed_size {
                    return Err(Error::SizeMismatch {
                        expected,
                        actual: self.total_out,
                    });
                }
                if !self.rc.is_finished_ok() {
                    return Err(Error::corrupt_data(
                        self.total_out,
                        "range coder has leftover data after the end marker",
                    ));
                }
                log::trace!("end marker after {} bytes", self.total_out);
                return Ok(Step::Finished);
            }
            len
        };

        let rep0 = self.reps[0];
        if rep0 as u64 >= self.total_out {
            return Err(Error::corrupt_data(
                self.total_out,
                "match distance points before the start of the output",
            ));
        }
        if rep0 >= self.dict_size {
            return Err(Error::corrupt_data(
                self.total_out,
                "match distance exceeds the dictionary size",
            ));
        }
        if let Some(expected) = self.uncompressed_size {
            let actual = self.total_out + len as u64;
            if actual > expected {
                return Err(Error::SizeMismatch { expected, actual });
            }
        }

        self.window.copy_match(rep0 as usize + 1, len as usize, out);
        self.total_out += len as u64;
        Ok(Step::Continue)
    }

    /// Decodes the rep-match part of a packet and returns its length.
    fn decode_rep(&mut self, s: usize, pos_state: usize) -> Result<u32> {
        if self.rc.decode_bit(&mut self.is_rep_g0[s])? == 0 {
            if self.rc.decode_bit(&mut self.is_rep0_long[s][pos_state])? == 0 {
                self.state.update_short_rep();
                return Ok(1);
            }
        } else {
            let dist = if self.rc.decode_bit(&mut self.is_rep_g1[s])? == 0 {
                self.reps[1]
            } else {
                let dist = if self.rc.decode_bit(&mut self.is_rep_g2[s])? == 0 {
                    self.reps[2]
                } else {
                    let dist = self.reps[3];
                    self.reps[3] = self.reps[2];
                    dist
                };
                self.reps[2] = self.reps[1];
                dist
            };
            self.reps[1] = self.reps[0];
            self.reps[0] = dist;
        }

        let len = self.rep_len_decoder.decode(&mut self.rc, pos_state)?;
        self.state.update_rep();
        Ok(len)
    }

    fn decode_literal(&mut self) -> Result<u8> {
        let prev_byte = if self.total_out > 0 {
            self.window.get_byte(1)
        } else {
            0
        };
        let lp_mask = (1u64 << self.lp) - 1;
        let pos_bits = (self.total_out & lp_mask) as usize;
        let base =
            ((pos_bits << self.lc) + ((prev_byte as usize) >> (8 - self.lc))) * LITERAL_CODER_SIZE;
        let probs = &mut self.literal_probs[base..base + LITERAL_CODER_SIZE];

        let mut symbol = 1usize;
        if !self.state.is_literal() {
            let mut match_byte = self.window.get_byte(self.reps[0] as usize + 1) as usize;
            while symbol < 0x100 {
                let match_bit = (match_byte >> 7) & 1;
                match_byte <<= 1;
                let bit = self
                    .rc
                    .decode_bit(&mut probs[((1 + match_bit) << 8) + symbol])?
                    as usize;
                symbol = (symbol << 1) | bit;
                if match_bit != bit {
                    break;
                }
            }
        }
        while symbol < 0x100 {
            symbol = (symbol << 1) | self.rc.decode_bit(&mut probs[symbol])? as usize;
        }
        Ok(symbol as u8)
    }

    /// Decodes a 0-based match distance.
    fn decode_distance(&mut self, len: u32) -> Result<u32> {
        let slot = self.pos_slot_decoders[len_to_pos_state(len)].decode(&mut self.rc)?;
        if slot < START_POS_MODEL_INDEX {
            return Ok(slot);
        }

        let (footer_bits, base) = slot_footer(slot);
        let reduced = if slot < END_POS_MODEL_INDEX {
            bit_tree::reverse_decode(
                &mut self.pos_special,
                (base - slot) as usize,
                &mut self.rc,
                footer_bits,
            )?
        } else {
            (self.rc.decode_direct_bits(footer_bits - NUM_ALIGN_BITS)? << NUM_ALIGN_BITS)
                + self.align_decoder.reverse_decode(&mut self.rc)?
        };
        Ok(base + reduced)
    }

    #[cfg(test)]
    pub(crate) fn window_size(&self) -> usize {
        self.window.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::lzma_encoder::{LzmaEncoderState, ParserParams, encode_block};
    use crate::codec::range_encoder::RangeEncoder;
    use std::io::Cursor;

    fn params(end_marker: bool) -> ParserParams {
        ParserParams {
            dict_size: 1 << 16,
            nice_len: 32,
            depth: 16,
            end_marker,
        }
    }

    fn decode_all(payload: &[u8], size: Option<u64>) -> Result<Vec<u8>> {
        let props = LzmaProperties::default();
        let mut dec = LzmaDecoderState::new(Cursor::new(payload), &props, size, None)?;
        let mut out = Vec::new();
        dec.decode_into(&mut out, usize::MAX)?;
        Ok(out)
    }

    fn encode(data: &[u8], end_marker: bool) -> Vec<u8> {
        let mut rc = RangeEncoder::new(Vec::new());
        encode_block(data, &LzmaProperties::default(), &params(end_marker), &mut rc).unwrap();
        rc.finish().unwrap()
    }

    #[test]
    fn test_window_wraps() {
        let mut w = OutWindow::new(4);
        for b in 1..=6u8 {
            w.put_byte(b);
        }
        assert_eq!(w.get_byte(1), 6);
        assert_eq!(w.get_byte(4), 3);

        let mut out = Vec::new();
        w.copy_match(2, 5, &mut out);
        assert_eq!(out, [5, 6, 5, 6, 5]);
    }

    #[test]
    fn test_known_size_roundtrip() {
        let data = b"the quick brown fox jumps over the lazy dog; the quick brown fox".to_vec();
        let payload = encode(&data, false);
        assert_eq!(decode_all(&payload, Some(data.len() as u64)).unwrap(), data);
    }

    #[test]
    fn test_end_marker_roundtrip() {
        let data = b"abababababababababab xyz abababab".to_vec();
        let payload = encode(&data, true);
        assert_eq!(decode_all(&payload, None).unwrap(), data);
    }

    #[test]
    fn test_end_marker_before_declared_size() {
        let data = b"short".to_vec();
        let payload = encode(&data, true);
        let err = decode_all(&payload, Some(100)).unwrap_err();
        assert!(matches!(
            err,
            Error::SizeMismatch {
                expected: 100,
                actual: 5
            }
        ));
    }

    #[test]
    fn test_corrupt_tail_after_end_marker() {
        let data = b"abababababababababab xyz abababab".to_vec();
        let mut payload = encode(&data, true);
        // The final interval spans at least 2^24, so the symbols still decode
        // and only the leftover code differs.
        *payload.last_mut().unwrap() ^= 1;
        let err = decode_all(&payload, None).unwrap_err();
        assert!(matches!(err, Error::CorruptData { .. }));
    }

    #[test]
    fn test_session_is_poisoned_after_error() {
        let data = vec![b'z'; 50];
        let payload = encode(&data, false);
        let props = LzmaProperties::default();
        let mut dec = LzmaDecoderState::new(Cursor::new(&payload), &props, Some(20), None).unwrap();

        let mut out = Vec::new();
        let err = dec.decode_into(&mut out, usize::MAX).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { expected: 20, .. }));

        let total = dec.total_out();
        for _ in 0..3 {
            let mut more = Vec::new();
            let err = dec.decode_into(&mut more, usize::MAX).unwrap_err();
            assert!(matches!(err, Error::CorruptData { .. }));
            assert!(more.is_empty());
            assert_eq!(dec.total_out(), total);
        }
    }

    #[test]
    fn test_match_past_declared_size() {
        let data = vec![b'z'; 50];
        let payload = encode(&data, false);
        let err = decode_all(&payload, Some(20)).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { expected: 20, .. }));
    }

    #[test]
    fn test_distance_before_start_is_corrupt() {
        // A match as the very first packet.
        let props = LzmaProperties::default();
        let mut enc = LzmaEncoderState::new(&props);
        let mut rc = RangeEncoder::new(Vec::new());
        enc.encode_match(&mut rc, 1, 3, 0).unwrap();
        let payload = rc.finish().unwrap();

        let err = decode_all(&payload, Some(3)).unwrap_err();
        assert!(matches!(err, Error::CorruptData { position: 0, .. }));
    }

    #[test]
    fn test_distance_beyond_dictionary_is_corrupt() {
        let mut seed = 0x2545_F491u32;
        let data: Vec<u8> = (0..6000)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                (seed >> 24) as u8
            })
            .collect();
        let mut input = data.clone();
        input.extend_from_slice(&data[..100]);

        let mut rc = RangeEncoder::new(Vec::new());
        encode_block(&input, &LzmaProperties::default(), &params(false), &mut rc).unwrap();
        let payload = rc.finish().unwrap();

        // Claim a 4 KiB dictionary: the 6000-byte distance no longer fits.
        let props = LzmaProperties::new(3, 0, 2, 4096).unwrap();
        let mut dec =
            LzmaDecoderState::new(Cursor::new(&payload), &props, Some(input.len() as u64), None)
                .unwrap();
        let err = dec.decode_into(&mut Vec::new(), usize::MAX).unwrap_err();
        assert!(matches!(err, Error::CorruptData { .. }));
    }

    #[test]
    fn test_incremental_decoding() {
        let data: Vec<u8> = b"incremental ".iter().cycle().take(5000).copied().collect();
        let payload = encode(&data, false);
        let props = LzmaProperties::default();
        let mut dec =
            LzmaDecoderState::new(Cursor::new(&payload), &props, Some(data.len() as u64), None)
                .unwrap();

        let mut out = Vec::new();
        let mut steps = 0;
        while !dec.is_finished() {
            let target = out.len() + 100;
            dec.decode_into(&mut out, target).unwrap();
            steps += 1;
        }
        assert!(steps > 1);
        assert_eq!(dec.total_out(), data.len() as u64);
        assert_eq!(out, data);
    }

    #[test]
    fn test_window_capped_to_declared_size() {
        let props = LzmaProperties::new(3, 0, 2, 1 << 24).unwrap();
        let dec = LzmaDecoderState::new(Cursor::new([0u8; 5]), &props, Some(10), None).unwrap();
        assert_eq!(dec.window_size(), 10);

        let dec = LzmaDecoderState::new(Cursor::new([0u8; 5]), &props, None, None).unwrap();
        assert_eq!(dec.window_size(), 1 << 24);
    }

    #[test]
    fn test_memory_limit() {
        let props = LzmaProperties::new(3, 0, 2, 1 << 24).unwrap();
        let err = LzmaDecoderState::new(Cursor::new([0u8; 5]), &props, None, Some(1 << 20))
            .unwrap_err();
        assert!(matches!(err, Error::ResourceLimitExceeded(_)));
    }

    #[test]
    fn test_empty_known_size_is_finished() {
        let payload = encode(&[], false);
        assert!(decode_all(&payload, Some(0)).unwrap().is_empty());
    }
}
