//! Fuzz target for compress/decompress round trips.
//!
//! The first input byte selects the preset and the end-marker flag; the rest
//! is compressed and must decompress to itself.
//!
//! Run with: cargo +nightly fuzz run roundtrip

#![no_main]

use libfuzzer_sys::fuzz_target;
use lzma_codec::{LzmaEncoderOptions, compress_bytes, decompress_bytes};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };

    let options = LzmaEncoderOptions::with_preset(u32::from(selector % 10))
        .with_end_marker(selector & 0x80 != 0);
    let packed = compress_bytes(payload, &options).expect("compression must succeed");
    let unpacked = decompress_bytes(&packed).expect("own output must decode");
    assert_eq!(unpacked, payload, "round trip changed the data");
});
