//! LZMA codec building blocks.
//!
//! The modules are layered leaf to root:
//!
//! | Layer | Modules |
//! |-------|---------|
//! | Entropy coding | [`range_encoder`], [`range_decoder`], [`price`] |
//! | Symbol coding | [`bit_tree`], [`length`] |
//! | LZ77 | [`match_finder`] |
//! | LZMA model | `state`, `lzma_encoder`, `lzma_decoder` |
//! | Framing | [`properties`], [`lzma`] |
//!
//! Most users only need the facade in [`lzma`], which is re-exported at the
//! crate root.

pub mod bit_tree;
pub mod length;
pub mod lzma;
pub(crate) mod lzma_decoder;
pub(crate) mod lzma_encoder;
pub mod match_finder;
pub mod price;
pub mod properties;
pub mod range_decoder;
pub mod range_encoder;
pub(crate) mod state;

pub use bit_tree::{BitTreeDecoder, BitTreeEncoder};
pub use length::{LengthDecoder, LengthEncoder};
pub use lzma::{
    CompressionStats, LzmaDecoder, LzmaDecoderOptions, LzmaEncoder, LzmaEncoderOptions, compress,
    compress_bytes, decompress, decompress_bytes, decompress_with_options,
};
pub use match_finder::{Match, MatchFinder};
pub use properties::{LzmaHeader, LzmaProperties};
pub use range_decoder::RangeDecoder;
pub use range_encoder::RangeEncoder;

/// Number of bits for probability model total.
pub const NUM_BIT_MODEL_TOTAL_BITS: u32 = 11;

/// Total probability value (2048).
pub const BIT_MODEL_TOTAL: u32 = 1 << NUM_BIT_MODEL_TOTAL_BITS;

/// Number of bits to shift for probability updates.
pub const NUM_MOVE_BITS: u32 = 5;

/// Number of top bits for normalization threshold.
pub const NUM_TOP_BITS: u32 = 24;

/// Normalization threshold.
pub const TOP_VALUE: u32 = 1 << NUM_TOP_BITS;

/// Initial probability value (50% = 1024).
pub const INITIAL_PROB: u16 = (BIT_MODEL_TOTAL / 2) as u16;

/// Shortest match the LZMA format can express.
pub const MATCH_LEN_MIN: u32 = 2;

/// Longest match the LZMA format can express.
pub const MATCH_LEN_MAX: u32 = 273;
