//! Fuzz target for decompress_with_options with arbitrary byte input.
//!
//! This target exercises header parsing and the packet decoder with
//! potentially malformed or adversarial streams. The goal is to find panics,
//! hangs, or excessive allocations.
//!
//! Run with: cargo +nightly fuzz run decompress

#![no_main]

use libfuzzer_sys::fuzz_target;
use lzma_codec::{LzmaDecoderOptions, decompress_with_options};

/// Output cap so a tiny stream cannot declare gigabytes of data.
const MAX_OUTPUT: u64 = 16 << 20;

struct CappedSink(u64);

impl std::io::Write for CappedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.len() as u64;
        if self.0 > MAX_OUTPUT {
            return Err(std::io::Error::other("output cap reached"));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let options = LzmaDecoderOptions::default().with_memory_limit(64 << 20);

    // We don't care about the result - we're looking for panics or hangs
    let _ = decompress_with_options(data, CappedSink(0), &options);
});
