//! Compression round-trip tests for the `.lzma` stream API.

mod common;

use std::io::{Cursor, Read, Write};

use common::{assert_roundtrip, random_bytes, text_bytes};
use lzma_codec::codec::properties::HEADER_SIZE;
use lzma_codec::{
    LzmaDecoder, LzmaDecoderOptions, LzmaEncoder, LzmaEncoderOptions, LzmaProperties, compress,
    compress_bytes, decompress, decompress_bytes,
};

// =============================================================================
// Basic Inputs
// =============================================================================

#[test]
fn test_roundtrip_empty() {
    let packed = assert_roundtrip(b"", &LzmaEncoderOptions::default());
    assert_eq!(&packed[5..13], &0u64.to_le_bytes());
    // Header plus the flushed range coder
    assert_eq!(packed.len(), HEADER_SIZE + 5);
}

#[test]
fn test_roundtrip_single_byte() {
    for byte in [0x00u8, 0x41, 0xFF] {
        assert_roundtrip(&[byte], &LzmaEncoderOptions::default());
    }
}

#[test]
fn test_roundtrip_text() {
    let data = text_bytes(100_000);
    let packed = assert_roundtrip(&data, &LzmaEncoderOptions::default());
    assert!(
        packed.len() < data.len() / 2,
        "text should compress well: {} -> {}",
        data.len(),
        packed.len()
    );
}

#[test]
fn test_roundtrip_random() {
    let data = random_bytes(64 * 1024, 7);
    let packed = assert_roundtrip(&data, &LzmaEncoderOptions::with_preset(1));
    // Incompressible input grows only slightly
    assert!(packed.len() < data.len() + data.len() / 20 + 64);
}

#[test]
fn test_roundtrip_all_presets() {
    let data = text_bytes(20_000);
    for preset in 0..=9 {
        assert_roundtrip(&data, &LzmaEncoderOptions::with_preset(preset));
    }
}

#[test]
fn test_roundtrip_lc_lp_pb_combinations() {
    let mut data = text_bytes(8_000);
    data.extend_from_slice(&random_bytes(2_000, 3));
    data.extend_from_slice(&text_bytes(8_000));

    for (lc, lp, pb) in [(0, 0, 0), (3, 0, 2), (8, 0, 0), (0, 4, 4), (4, 4, 4), (1, 2, 3)] {
        let opts = LzmaEncoderOptions::with_preset(2).with_lc_lp_pb(lc, lp, pb);
        let packed = assert_roundtrip(&data, &opts);
        let header_props = LzmaProperties::from_bytes(&[packed[0], 0, 0, 1, 0]).unwrap();
        assert_eq!((header_props.lc, header_props.lp, header_props.pb), (lc, lp, pb));
    }
}

#[test]
fn test_roundtrip_large_repetitive_input() {
    // More than 2^24 bytes: exercises range coder carries over a long stream
    let block = text_bytes(4_093);
    let mut data = Vec::with_capacity((1 << 24) + block.len());
    while data.len() <= 1 << 24 {
        data.extend_from_slice(&block);
    }

    let opts = LzmaEncoderOptions::with_preset(0).with_dict_size(1 << 16);
    let packed = assert_roundtrip(&data, &opts);
    assert!(packed.len() < data.len() / 100);
}

#[test]
fn test_roundtrip_repeats_beyond_dictionary() {
    // The second copy is out of reach of a 4 KiB dictionary, the third is not
    let chunk = random_bytes(6_000, 11);
    let mut data = chunk.clone();
    data.extend_from_slice(&random_bytes(3_000, 12));
    data.extend_from_slice(&chunk);
    data.extend_from_slice(&chunk[..1_000]);
    data.extend_from_slice(&chunk[..1_000]);

    let opts = LzmaEncoderOptions::with_preset(3).with_dict_size(4096);
    assert_roundtrip(&data, &opts);
}

#[test]
fn test_roundtrip_long_runs() {
    let mut data = vec![0u8; 10_000];
    data.extend(std::iter::repeat_n(0xAA, 5_000));
    data.extend((0..5_000u32).map(|i| (i % 3) as u8));
    let packed = assert_roundtrip(&data, &LzmaEncoderOptions::default());
    assert!(packed.len() < 200);
}

// =============================================================================
// End Marker
// =============================================================================

#[test]
fn test_end_marker_with_known_size() {
    let data = text_bytes(5_000);
    let opts = LzmaEncoderOptions::default().with_end_marker(true);
    let packed = assert_roundtrip(&data, &opts);
    assert_eq!(&packed[5..13], &(data.len() as u64).to_le_bytes());
}

#[test]
fn test_unknown_size_stream() {
    let data = text_bytes(30_000);
    let mut encoder = LzmaEncoder::new(Vec::new(), &LzmaEncoderOptions::default()).unwrap();
    for chunk in data.chunks(999) {
        encoder.write_all(chunk).unwrap();
    }
    let packed = encoder.finish().unwrap();
    assert_eq!(&packed[5..13], &[0xFF; 8]);
    assert_eq!(decompress_bytes(&packed).unwrap(), data);
}

#[test]
fn test_unknown_size_empty_stream() {
    let packed = LzmaEncoder::new(Vec::new(), &LzmaEncoderOptions::default())
        .unwrap()
        .finish()
        .unwrap();
    assert!(decompress_bytes(&packed).unwrap().is_empty());
}

// =============================================================================
// Streaming API
// =============================================================================

#[test]
fn test_compress_reader_to_writer() {
    let data = text_bytes(50_000);
    let mut packed = Vec::new();
    let stats = compress(Cursor::new(&data), &mut packed, &LzmaEncoderOptions::default()).unwrap();

    assert_eq!(stats.uncompressed_size, data.len() as u64);
    assert_eq!(stats.compressed_size, packed.len() as u64);
    assert!(stats.literals > 0);
    assert!(stats.matches > 0);
    assert!(stats.ratio() < 1.0);

    let mut unpacked = Vec::new();
    let written = decompress(Cursor::new(&packed), &mut unpacked).unwrap();
    assert_eq!(written, data.len() as u64);
    assert_eq!(unpacked, data);
}

#[test]
fn test_encoder_finish_with_stats() {
    let data = text_bytes(10_000);
    let mut encoder = LzmaEncoder::new(Vec::new(), &LzmaEncoderOptions::default()).unwrap();
    encoder.write_all(&data).unwrap();
    let (packed, stats) = encoder.finish_with_stats().unwrap();
    assert_eq!(stats.uncompressed_size, data.len() as u64);
    assert_eq!(stats.compressed_size, packed.len() as u64);
}

#[test]
fn test_decoder_read_to_end() {
    let data = random_bytes(40_000, 5);
    let packed = compress_bytes(&data, &LzmaEncoderOptions::with_preset(1)).unwrap();

    let mut decoder = LzmaDecoder::new(Cursor::new(&packed)).unwrap();
    assert_eq!(decoder.uncompressed_size(), Some(data.len() as u64));
    assert_eq!(decoder.properties().dict_size, 1 << 20);

    let mut out = Vec::new();
    decoder.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_decoder_with_external_properties() {
    let data = text_bytes(12_345);
    let opts = LzmaEncoderOptions::with_preset(4).with_lc_lp_pb(0, 2, 0);
    let packed = compress_bytes(&data, &opts).unwrap();

    let mut decoder = LzmaDecoder::with_properties(
        &packed[HEADER_SIZE..],
        opts.properties(),
        Some(data.len() as u64),
        &LzmaDecoderOptions::default(),
    )
    .unwrap();
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_compress_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.txt");
    let output = dir.path().join("input.txt.lzma");
    let data = text_bytes(25_000);
    std::fs::write(&input, &data).unwrap();

    let reader = std::fs::File::open(&input).unwrap();
    let writer = std::fs::File::create(&output).unwrap();
    compress(reader, writer, &LzmaEncoderOptions::default()).unwrap();

    let packed = std::fs::read(&output).unwrap();
    assert_eq!(decompress_bytes(&packed).unwrap(), data);
}

#[test]
fn test_deterministic_output() {
    let data = text_bytes(20_000);
    let opts = LzmaEncoderOptions::default();
    assert_eq!(
        compress_bytes(&data, &opts).unwrap(),
        compress_bytes(&data, &opts).unwrap()
    );
}
