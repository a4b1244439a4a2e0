//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lzma_codec::{LzmaEncoderOptions, compress_bytes, decompress_bytes};

/// Generates `len` pseudo-random bytes from a fixed seed.
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}

/// Generates English-like text with plenty of repeated words.
pub fn text_bytes(len: usize) -> Vec<u8> {
    const WORDS: &[&str] = &[
        "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "range", "coder",
        "literal", "match", "window", "dictionary", "stream", "header",
    ];
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut out = Vec::with_capacity(len + 16);
    while out.len() < len {
        let word = WORDS[rng.gen_range(0..WORDS.len())];
        out.extend_from_slice(word.as_bytes());
        out.push(if rng.gen_range(0..12) == 0 { b'\n' } else { b' ' });
    }
    out.truncate(len);
    out
}

/// Compresses `data` with `options` and checks that it decompresses back.
///
/// Returns the compressed stream.
///
/// # Panics
///
/// Panics if either direction fails or the output differs from the input.
pub fn assert_roundtrip(data: &[u8], options: &LzmaEncoderOptions) -> Vec<u8> {
    let packed = compress_bytes(data, options).expect("compression failed");
    let unpacked = decompress_bytes(&packed).expect("decompression failed");
    assert_eq!(unpacked.len(), data.len(), "length mismatch after roundtrip");
    assert!(unpacked == data, "content mismatch after roundtrip");
    packed
}

/// Extracts the error from a Result, panicking if it's Ok.
///
/// # Panics
///
/// Panics if the result is `Ok(_)`.
pub fn expect_err<T, E>(result: Result<T, E>) -> E {
    match result {
        Ok(_) => panic!("Expected error but got Ok"),
        Err(e) => e,
    }
}
