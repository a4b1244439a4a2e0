//! `.lzma` stream compression and decompression.
//!
//! This module ties the codec layers together behind a small API:
//!
//! - [`compress`] / [`compress_bytes`] write a 13-byte header with the exact
//!   uncompressed size, followed by the range-coded payload.
//! - [`decompress`] / [`decompress_bytes`] read such a stream back. Streams of
//!   unknown size (size field all ones) are decoded up to their end marker.
//! - [`LzmaEncoder`] and [`LzmaDecoder`] adapt the codec to [`Write`] and
//!   [`Read`].
//!
//! # Example
//!
//! ```rust
//! use lzma_codec::{LzmaEncoderOptions, compress_bytes, decompress_bytes};
//!
//! let data = b"hello hello hello hello";
//! let packed = compress_bytes(data, &LzmaEncoderOptions::with_preset(1))?;
//! assert_eq!(packed[0], 0x5D);
//! assert_eq!(decompress_bytes(&packed)?, data);
//! # Ok::<(), lzma_codec::Error>(())
//! ```

use std::io::{self, BufReader, Read, Write};

use super::MATCH_LEN_MAX;
use super::lzma_decoder::LzmaDecoderState;
use super::lzma_encoder::{ParserParams, encode_block};
use super::properties::{DICT_SIZE_MAX, DICT_SIZE_MIN, HEADER_SIZE, LzmaHeader, LzmaProperties};
use super::range_encoder::RangeEncoder;
use crate::{Error, READ_BUFFER_SIZE, Result};

/// Dictionary size for each preset level.
const PRESET_DICT_SIZES: [u32; 10] = [
    1 << 18,
    1 << 20,
    1 << 21,
    1 << 22,
    1 << 22,
    1 << 23,
    1 << 23,
    1 << 24,
    1 << 25,
    1 << 26,
];

/// Nice match length for each preset level.
const PRESET_NICE_LENS: [u32; 10] = [32, 32, 48, 64, 64, 64, 64, 128, 192, 273];

/// Match finder chain depth for each preset level.
const PRESET_DEPTHS: [u32; 10] = [4, 8, 12, 16, 24, 32, 48, 64, 96, 128];

/// Smallest accepted nice length.
const NICE_LEN_MIN: u32 = 5;

/// Largest input the in-memory encoder indexes.
const MAX_INPUT_SIZE: u64 = u32::MAX as u64 - 1;

/// LZMA encoder options.
#[derive(Debug, Clone)]
pub struct LzmaEncoderOptions {
    /// Compression preset level (0-9, default 6).
    pub preset: u32,
    /// Dictionary size in bytes (optional, uses preset default if None).
    pub dict_size: Option<u32>,
    /// Literal context bits (0-8, default 3).
    pub lc: u32,
    /// Literal position bits (0-4, default 0).
    pub lp: u32,
    /// Position bits (0-4, default 2).
    pub pb: u32,
    /// Match length at which the search stops (optional, uses preset default if None).
    pub nice_len: Option<u32>,
    /// Match finder chain depth (optional, uses preset default if None).
    pub depth: Option<u32>,
    /// Write an end marker even when the size is stored in the header.
    pub end_marker: bool,
}

impl Default for LzmaEncoderOptions {
    fn default() -> Self {
        Self::with_preset(6)
    }
}

impl LzmaEncoderOptions {
    /// Creates options with the given preset level (clamped to 9).
    pub fn with_preset(preset: u32) -> Self {
        Self {
            preset: preset.min(9),
            dict_size: None,
            lc: 3,
            lp: 0,
            pb: 2,
            nice_len: None,
            depth: None,
            end_marker: false,
        }
    }

    /// Sets a custom dictionary size.
    pub fn with_dict_size(mut self, dict_size: u32) -> Self {
        self.dict_size = Some(dict_size);
        self
    }

    /// Sets the literal context, literal position and position bits.
    pub fn with_lc_lp_pb(mut self, lc: u32, lp: u32, pb: u32) -> Self {
        self.lc = lc;
        self.lp = lp;
        self.pb = pb;
        self
    }

    /// Sets the nice match length.
    pub fn with_nice_len(mut self, nice_len: u32) -> Self {
        self.nice_len = Some(nice_len);
        self
    }

    /// Sets the match finder chain depth.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Requests an end marker after the payload.
    pub fn with_end_marker(mut self, end_marker: bool) -> Self {
        self.end_marker = end_marker;
        self
    }

    fn preset_index(&self) -> usize {
        self.preset.min(9) as usize
    }

    /// Returns the dictionary size that will be used.
    pub fn effective_dict_size(&self) -> u32 {
        self.dict_size.unwrap_or(PRESET_DICT_SIZES[self.preset_index()])
    }

    /// Returns the nice match length that will be used.
    pub fn effective_nice_len(&self) -> u32 {
        self.nice_len.unwrap_or(PRESET_NICE_LENS[self.preset_index()])
    }

    /// Returns the chain depth that will be used.
    pub fn effective_depth(&self) -> u32 {
        self.depth.unwrap_or(PRESET_DEPTHS[self.preset_index()])
    }

    /// Validates all settings.
    pub fn validate(&self) -> Result<()> {
        self.properties().validate()?;

        let dict_size = self.effective_dict_size();
        if !(DICT_SIZE_MIN..=DICT_SIZE_MAX).contains(&dict_size) {
            return Err(Error::InvalidProperties(format!(
                "dictionary size must be between {} and {} bytes, got {}",
                DICT_SIZE_MIN, DICT_SIZE_MAX, dict_size
            )));
        }
        let nice_len = self.effective_nice_len();
        if !(NICE_LEN_MIN..=MATCH_LEN_MAX).contains(&nice_len) {
            return Err(Error::InvalidProperties(format!(
                "nice length must be between {} and {}, got {}",
                NICE_LEN_MIN, MATCH_LEN_MAX, nice_len
            )));
        }
        if self.effective_depth() == 0 {
            return Err(Error::InvalidProperties(
                "match finder depth must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Returns the LZMA properties for these options.
    pub fn properties(&self) -> LzmaProperties {
        LzmaProperties {
            lc: self.lc,
            lp: self.lp,
            pb: self.pb,
            dict_size: self.effective_dict_size(),
        }
    }

    fn parser_params(&self, end_marker: bool) -> ParserParams {
        ParserParams {
            dict_size: self.effective_dict_size(),
            nice_len: self.effective_nice_len(),
            depth: self.effective_depth(),
            end_marker,
        }
    }
}

/// LZMA decoder options.
#[derive(Debug, Clone, Default)]
pub struct LzmaDecoderOptions {
    /// Maximum bytes the decoder may allocate for its window and models.
    pub memory_limit: Option<u64>,
}

impl LzmaDecoderOptions {
    /// Sets a memory limit.
    pub fn with_memory_limit(mut self, limit: u64) -> Self {
        self.memory_limit = Some(limit);
        self
    }
}

/// Statistics of one compression session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionStats {
    /// Input bytes.
    pub uncompressed_size: u64,
    /// Output bytes, header included.
    pub compressed_size: u64,
    /// Literal packets.
    pub literals: u64,
    /// Match packets with an explicit distance.
    pub matches: u64,
    /// Rep match packets (two bytes or more).
    pub rep_matches: u64,
    /// Short rep packets (one byte at the last distance).
    pub short_reps: u64,
}

impl CompressionStats {
    /// Returns the compression ratio (compressed / uncompressed).
    pub fn ratio(&self) -> f64 {
        if self.uncompressed_size == 0 {
            1.0
        } else {
            self.compressed_size as f64 / self.uncompressed_size as f64
        }
    }

    /// Returns the space savings (0.0-1.0, negative when the data grew).
    pub fn space_savings(&self) -> f64 {
        1.0 - self.ratio()
    }
}

/// Range-codes `data` (no header) into `output`.
fn encode_payload<W: Write>(
    data: &[u8],
    output: W,
    options: &LzmaEncoderOptions,
    end_marker: bool,
) -> Result<(W, CompressionStats)> {
    if data.len() as u64 > MAX_INPUT_SIZE {
        return Err(Error::ResourceLimitExceeded(format!(
            "input of {} bytes exceeds the {} byte limit of the in-memory encoder",
            data.len(),
            MAX_INPUT_SIZE
        )));
    }

    let props = options.properties();
    let mut rc = RangeEncoder::new(output);
    let counts = encode_block(data, &props, &options.parser_params(end_marker), &mut rc)?;
    let payload_size = rc.bytes_written() + rc.pending_bytes();
    let output = rc.finish()?;

    let stats = CompressionStats {
        uncompressed_size: data.len() as u64,
        compressed_size: HEADER_SIZE as u64 + payload_size,
        literals: counts.literals,
        matches: counts.matches,
        rep_matches: counts.reps,
        short_reps: counts.short_reps,
    };
    Ok((output, stats))
}

/// Compresses everything from `input` into a `.lzma` stream on `output`.
///
/// The input is read completely first; the header records its exact size.
pub fn compress<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    options: &LzmaEncoderOptions,
) -> Result<CompressionStats> {
    options.validate()?;
    let mut data = Vec::new();
    input.read_to_end(&mut data)?;

    let props = options.properties();
    log::debug!(
        "compressing {} bytes: lc={} lp={} pb={} dict_size={} nice_len={} depth={}",
        data.len(),
        props.lc,
        props.lp,
        props.pb,
        props.dict_size,
        options.effective_nice_len(),
        options.effective_depth()
    );

    LzmaHeader::new(props, Some(data.len() as u64)).write_to(&mut output)?;
    let (mut output, stats) = encode_payload(&data, output, options, options.end_marker)?;
    output.flush()?;

    log::debug!(
        "compressed {} -> {} bytes ({} literals, {} matches, {} reps, {} short reps)",
        stats.uncompressed_size,
        stats.compressed_size,
        stats.literals,
        stats.matches,
        stats.rep_matches,
        stats.short_reps
    );
    Ok(stats)
}

/// Compresses `data` into a new `.lzma` stream.
pub fn compress_bytes(data: &[u8], options: &LzmaEncoderOptions) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_SIZE + data.len() / 2);
    compress(data, &mut out, options)?;
    Ok(out)
}

/// Decompresses a `.lzma` stream from `input` into `output`.
///
/// Returns the number of bytes written.
pub fn decompress<R: Read, W: Write>(input: R, output: W) -> Result<u64> {
    decompress_with_options(input, output, &LzmaDecoderOptions::default())
}

/// Decompresses a `.lzma` stream with explicit decoder options.
pub fn decompress_with_options<R: Read, W: Write>(
    input: R,
    mut output: W,
    options: &LzmaDecoderOptions,
) -> Result<u64> {
    let mut decoder = LzmaDecoder::with_options(BufReader::new(input), options)?;
    let mut chunk = Vec::with_capacity(READ_BUFFER_SIZE + MATCH_LEN_MAX as usize);
    while !decoder.inner.is_finished() {
        chunk.clear();
        decoder.inner.decode_into(&mut chunk, READ_BUFFER_SIZE)?;
        output.write_all(&chunk)?;
    }
    output.flush()?;

    let total = decoder.inner.total_out();
    log::debug!("decompressed {} bytes", total);
    Ok(total)
}

/// Decompresses a complete `.lzma` stream held in memory.
pub fn decompress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decompress(data, &mut out)?;
    Ok(out)
}

/// LZMA encoder implementing [`Write`].
///
/// The header (unknown size) is written on creation. Data is buffered and
/// encoded, followed by an end marker, when [`finish`](Self::finish) is
/// called. Dropping the encoder without finishing leaves a header-only,
/// invalid stream.
pub struct LzmaEncoder<W: Write> {
    output: W,
    buffer: Vec<u8>,
    options: LzmaEncoderOptions,
}

impl<W: Write> std::fmt::Debug for LzmaEncoder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LzmaEncoder")
            .field("buffered", &self.buffer.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<W: Write> LzmaEncoder<W> {
    /// Creates a new LZMA encoder and writes the stream header.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid or the header cannot be
    /// written.
    pub fn new(mut output: W, options: &LzmaEncoderOptions) -> Result<Self> {
        options.validate()?;
        LzmaHeader::new(options.properties(), None).write_to(&mut output)?;
        Ok(Self {
            output,
            buffer: Vec::new(),
            options: options.clone(),
        })
    }

    /// Encodes all buffered data, writes the end marker and returns the sink.
    pub fn finish(self) -> Result<W> {
        self.finish_with_stats().map(|(output, _)| output)
    }

    /// Like [`finish`](Self::finish), also returning session statistics.
    pub fn finish_with_stats(self) -> Result<(W, CompressionStats)> {
        log::debug!("encoding {} buffered bytes", self.buffer.len());
        let (mut output, stats) = encode_payload(&self.buffer, self.output, &self.options, true)?;
        output.flush()?;
        Ok((output, stats))
    }
}

impl<W: Write> Write for LzmaEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if (self.buffer.len() + buf.len()) as u64 > MAX_INPUT_SIZE {
            return Err(Error::ResourceLimitExceeded(
                "LzmaEncoder input exceeds the in-memory encoder limit".into(),
            )
            .into());
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

/// LZMA decoder implementing [`Read`].
///
/// The range decoder reads one byte at a time; wrap unbuffered sources in a
/// [`BufReader`].
pub struct LzmaDecoder<R: Read> {
    inner: LzmaDecoderState<R>,
    properties: LzmaProperties,
    uncompressed_size: Option<u64>,
    buffer: Vec<u8>,
    cursor: usize,
}

impl<R: Read> std::fmt::Debug for LzmaDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LzmaDecoder")
            .field("properties", &self.properties)
            .field("uncompressed_size", &self.uncompressed_size)
            .finish_non_exhaustive()
    }
}

impl<R: Read> LzmaDecoder<R> {
    /// Reads the `.lzma` header from `input` and prepares to decode.
    pub fn new(input: R) -> Result<Self> {
        Self::with_options(input, &LzmaDecoderOptions::default())
    }

    /// Like [`new`](Self::new), with explicit decoder options.
    pub fn with_options(mut input: R, options: &LzmaDecoderOptions) -> Result<Self> {
        let header = LzmaHeader::read_from(&mut input)?;
        Self::with_properties(input, header.properties, header.uncompressed_size, options)
    }

    /// Decodes a raw payload whose properties are stored elsewhere.
    ///
    /// # Arguments
    ///
    /// * `input` - The payload, starting with the range coder bytes
    /// * `properties` - Model parameters and dictionary size
    /// * `uncompressed_size` - Exact output size, or `None` for an end marker
    /// * `options` - Decoder options
    pub fn with_properties(
        input: R,
        properties: LzmaProperties,
        uncompressed_size: Option<u64>,
        options: &LzmaDecoderOptions,
    ) -> Result<Self> {
        log::debug!(
            "decompressing: lc={} lp={} pb={} dict_size={} uncompressed_size={:?}",
            properties.lc,
            properties.lp,
            properties.pb,
            properties.dict_size,
            uncompressed_size
        );
        let inner = LzmaDecoderState::new(
            input,
            &properties,
            uncompressed_size,
            options.memory_limit,
        )?;
        Ok(Self {
            inner,
            properties,
            uncompressed_size,
            buffer: Vec::new(),
            cursor: 0,
        })
    }

    /// Returns the stream properties.
    pub fn properties(&self) -> &LzmaProperties {
        &self.properties
    }

    /// Returns the declared uncompressed size, if known.
    pub fn uncompressed_size(&self) -> Option<u64> {
        self.uncompressed_size
    }

    /// Returns the number of bytes decoded so far.
    pub fn total_out(&self) -> u64 {
        self.inner.total_out()
    }
}

impl<R: Read> Read for LzmaDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.cursor == self.buffer.len() {
            self.buffer.clear();
            self.cursor = 0;
            if let Err(e) = self.inner.decode_into(&mut self.buffer, READ_BUFFER_SIZE) {
                // Bytes decoded before the failure are not handed out.
                self.buffer.clear();
                return Err(e.into());
            }
        }
        let n = (self.buffer.len() - self.cursor).min(buf.len());
        buf[..n].copy_from_slice(&self.buffer[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_lzma_encoder_options_default() {
        let opts = LzmaEncoderOptions::default();
        assert_eq!(opts.preset, 6);
        assert!(opts.dict_size.is_none());
        assert_eq!((opts.lc, opts.lp, opts.pb), (3, 0, 2));
        assert!(!opts.end_marker);
        assert_eq!(opts.effective_dict_size(), 1 << 23);
        opts.validate().unwrap();
    }

    #[test]
    fn test_preset_is_clamped() {
        let opts = LzmaEncoderOptions::with_preset(42);
        assert_eq!(opts.preset, 9);
        assert_eq!(opts.effective_dict_size(), 1 << 26);
        assert_eq!(opts.effective_nice_len(), 273);
    }

    #[test]
    fn test_options_validation() {
        let bad = [
            LzmaEncoderOptions::default().with_lc_lp_pb(9, 0, 2),
            LzmaEncoderOptions::default().with_lc_lp_pb(3, 5, 2),
            LzmaEncoderOptions::default().with_lc_lp_pb(3, 0, 5),
            LzmaEncoderOptions::default().with_dict_size(1024),
            LzmaEncoderOptions::default().with_dict_size((1 << 29) + 1),
            LzmaEncoderOptions::default().with_nice_len(4),
            LzmaEncoderOptions::default().with_nice_len(274),
            LzmaEncoderOptions::default().with_depth(0),
        ];
        for opts in &bad {
            let err = opts.validate().unwrap_err();
            assert!(matches!(err, Error::InvalidProperties(_)), "{:?}", opts);
        }
    }

    #[test]
    fn test_compress_rejects_invalid_options() {
        let opts = LzmaEncoderOptions::default().with_lc_lp_pb(9, 0, 0);
        assert!(compress_bytes(b"abc", &opts).is_err());
        assert!(LzmaEncoder::new(Vec::new(), &opts).is_err());
    }

    #[test]
    fn test_header_of_compressed_stream() {
        let data = b"Hello, World! This is a test of LZMA compression.";
        let opts = LzmaEncoderOptions::with_preset(0);
        let packed = compress_bytes(data, &opts).unwrap();

        assert_eq!(packed[0], 0x5D);
        assert_eq!(&packed[1..5], &(1u32 << 18).to_le_bytes());
        assert_eq!(&packed[5..13], &(data.len() as u64).to_le_bytes());
        assert_eq!(packed[13], 0);
        assert_eq!(decompress_bytes(&packed).unwrap(), data);
    }

    #[test]
    fn test_stats() {
        let data = b"abcabcabcabcabcabcabcabcabcabc".repeat(10);
        let mut out = Vec::new();
        let stats = compress(&data[..], &mut out, &LzmaEncoderOptions::default()).unwrap();
        assert_eq!(stats.uncompressed_size, data.len() as u64);
        assert_eq!(stats.compressed_size, out.len() as u64);
        assert_eq!(stats.literals, 3);
        assert!(stats.ratio() < 0.2);
        assert!(stats.space_savings() > 0.8);
    }

    #[test]
    fn test_empty_stats_ratio() {
        let stats = CompressionStats::default();
        assert_eq!(stats.ratio(), 1.0);
    }

    #[test]
    fn test_lzma_encoder_roundtrip() {
        let data = b"Hello, World! This is a test of LZMA compression.";

        let mut encoder =
            LzmaEncoder::new(Vec::new(), &LzmaEncoderOptions::with_preset(0)).unwrap();
        encoder.write_all(&data[..10]).unwrap();
        encoder.write_all(&data[10..]).unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(&compressed[5..13], &[0xFF; 8]);

        let mut decoder = LzmaDecoder::new(Cursor::new(&compressed)).unwrap();
        assert_eq!(decoder.uncompressed_size(), None);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_lzma_decoder_with_properties() {
        let data = b"raw payload, properties kept elsewhere".repeat(4);
        let opts = LzmaEncoderOptions::with_preset(3);
        let packed = compress_bytes(&data, &opts).unwrap();

        let mut decoder = LzmaDecoder::with_properties(
            Cursor::new(&packed[HEADER_SIZE..]),
            opts.properties(),
            Some(data.len() as u64),
            &LzmaDecoderOptions::default(),
        )
        .unwrap();
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
        assert_eq!(decoder.total_out(), data.len() as u64);
    }

    #[test]
    fn test_decoder_read_small_buffers() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 97) as u8).collect();
        let packed = compress_bytes(&data, &LzmaEncoderOptions::with_preset(2)).unwrap();
        let mut decoder = LzmaDecoder::new(Cursor::new(packed)).unwrap();

        let mut out = Vec::new();
        let mut buf = [0u8; 7];
        loop {
            let n = decoder.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, data);
    }

    #[test]
    fn test_decoder_read_error_kind() {
        let packed = compress_bytes(&[1u8; 1000], &LzmaEncoderOptions::default()).unwrap();
        let mut decoder = LzmaDecoder::new(Cursor::new(&packed[..packed.len() - 3])).unwrap();
        let err = decoder.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_decoder_read_fails_after_fatal_error() {
        let mut packed = compress_bytes(&[b'z'; 5000], &LzmaEncoderOptions::default()).unwrap();
        packed[5..13].copy_from_slice(&20u64.to_le_bytes());

        let mut decoder = LzmaDecoder::new(Cursor::new(packed)).unwrap();
        let mut buf = [0u8; 64];
        let err = decoder.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        for _ in 0..5 {
            assert!(decoder.read(&mut buf).is_err());
        }
    }

    #[test]
    fn test_memory_limit_option() {
        let packed = LzmaEncoder::new(Vec::new(), &LzmaEncoderOptions::with_preset(9))
            .unwrap()
            .finish()
            .unwrap();
        let opts = LzmaDecoderOptions::default().with_memory_limit(1 << 20);
        let err = decompress_with_options(&packed[..], Vec::new(), &opts).unwrap_err();
        assert!(matches!(err, Error::ResourceLimitExceeded(_)));

        let opts = LzmaDecoderOptions::default().with_memory_limit(1 << 27);
        assert_eq!(decompress_with_options(&packed[..], Vec::new(), &opts).unwrap(), 0);
    }

    #[test]
    fn test_end_marker_option_with_known_size() {
        let data = b"known size and an end marker".to_vec();
        let opts = LzmaEncoderOptions::default().with_end_marker(true);
        let with_marker = compress_bytes(&data, &opts).unwrap();
        let without = compress_bytes(&data, &LzmaEncoderOptions::default()).unwrap();
        assert!(with_marker.len() > without.len());
        assert_eq!(decompress_bytes(&with_marker).unwrap(), data);
    }
}
