//! Canned payloads shared by the test suite.
//!
//! Compressed payloads are produced with `flate2`'s encoders so the decoder
//! tests exercise the same framing real origins emit.

use std::io::Write;

use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use flate2::Compression;

/// Gzip-compresses `data`.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("gzip fixture");
    encoder.finish().expect("gzip fixture")
}

/// Gzip-compresses `data` and chops off the 8-byte CRC/length trailer,
/// producing the kind of "slightly invalid" payload misbehaving origins
/// send.
pub fn gzip_truncated(data: &[u8]) -> Vec<u8> {
    let mut payload = gzip(data);
    payload.truncate(payload.len().saturating_sub(8));
    payload
}

/// Deflate-compresses `data` with the zlib wrapper.
pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("zlib fixture");
    encoder.finish().expect("zlib fixture")
}

/// Deflate-compresses `data` without any wrapper, as legacy servers do.
pub fn deflate_raw(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("deflate fixture");
    encoder.finish().expect("deflate fixture")
}
