//! The compressing sink: raw bytes in, a zlib stream out.
//!
//! Scanlines are written into a [`ZlibEncoder`] as they are produced; the
//! finished stream is buffered in full and handed to the frame sequencer for
//! chunking.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

/// Check that `level` is a valid compression level (1-9).
pub fn validate_level(level: u8) -> Result<()> {
    if (1..=9).contains(&level) {
        Ok(())
    } else {
        Err(Error::InvalidCompressionLevel(level))
    }
}

/// A fresh in-memory zlib stream at `level`.
pub(crate) fn zlib_sink(level: u8) -> ZlibEncoder<Vec<u8>> {
    ZlibEncoder::new(Vec::new(), Compression::new(level as u32))
}

/// Compress `data` into a complete zlib stream.
pub fn zlib_compress(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut encoder = zlib_sink(level);
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
