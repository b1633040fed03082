//! PNG chunk handling.
//!
//! Every chunk is `length | type | payload | crc32(type ++ payload)`, all
//! integers big-endian. [`ChunkWriter`] serializes chunks to any
//! [`io::Write`] sink; small fixed-layout payloads are built in a stack
//! scratch buffer so writing them allocates nothing.

use std::fmt;
use std::io::{self, Write};

use crc32fast::Hasher;
use log::trace;

use crate::color::{BitDepth, PngColorType};
use crate::error::{Error, Result};
use crate::metadata::PhysicalDimensions;
use crate::png::interlace::InterlaceMode;

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Largest payload the 31-bit length field can describe.
pub const MAX_CHUNK_LEN: usize = (1 << 31) - 1;

/// Room for the largest fixed payload (fcTL).
const SCRATCH_LEN: usize = 26;

/// Four-byte chunk type code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    /// Image header.
    pub const IHDR: ChunkType = ChunkType(*b"IHDR");
    /// Palette.
    pub const PLTE: ChunkType = ChunkType(*b"PLTE");
    /// Image data.
    pub const IDAT: ChunkType = ChunkType(*b"IDAT");
    /// End of stream.
    pub const IEND: ChunkType = ChunkType(*b"IEND");
    /// Transparency.
    pub const TRNS: ChunkType = ChunkType(*b"tRNS");
    /// Gamma.
    pub const GAMA: ChunkType = ChunkType(*b"gAMA");
    /// Embedded ICC profile.
    pub const ICCP: ChunkType = ChunkType(*b"iCCP");
    /// Physical pixel dimensions.
    pub const PHYS: ChunkType = ChunkType(*b"pHYs");
    /// EXIF metadata.
    pub const EXIF: ChunkType = ChunkType(*b"eXIf");
    /// Latin-1 text.
    pub const TEXT: ChunkType = ChunkType(*b"tEXt");
    /// Compressed Latin-1 text.
    pub const ZTXT: ChunkType = ChunkType(*b"zTXt");
    /// International text.
    pub const ITXT: ChunkType = ChunkType(*b"iTXt");
    /// Animation control.
    pub const ACTL: ChunkType = ChunkType(*b"acTL");
    /// Frame control.
    pub const FCTL: ChunkType = ChunkType(*b"fcTL");
    /// Frame data.
    pub const FDAT: ChunkType = ChunkType(*b"fdAT");

    /// The raw type bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType({})", self)
    }
}

/// A chunk whose payload has a fixed length.
pub trait FixedChunk {
    /// Chunk type written for this payload.
    const CHUNK_TYPE: ChunkType;
    /// Payload length in bytes (at most 26).
    const LEN: usize;

    /// Serialize the payload into `buf`, which is exactly `LEN` bytes.
    fn encode(&self, buf: &mut [u8]);
}

/// IHDR payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// Bits per sample or palette index.
    pub bit_depth: BitDepth,
    /// Color type.
    pub color_type: PngColorType,
    /// Interlace method.
    pub interlace: InterlaceMode,
}

impl FixedChunk for ImageHeader {
    const CHUNK_TYPE: ChunkType = ChunkType::IHDR;
    const LEN: usize = 13;

    fn encode(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.width.to_be_bytes());
        buf[4..8].copy_from_slice(&self.height.to_be_bytes());
        buf[8] = self.bit_depth.bits();
        buf[9] = self.color_type.code();
        buf[10] = 0; // compression: deflate
        buf[11] = 0; // filter method: adaptive
        buf[12] = self.interlace.code();
    }
}

/// gAMA payload: gamma scaled by 100000.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gamma(pub u32);

impl Gamma {
    /// Scale a gamma value, rounding to nearest.
    pub fn from_f32(gamma: f32) -> Self {
        Gamma((gamma as f64 * 100_000.0).round() as u32)
    }
}

impl FixedChunk for Gamma {
    const CHUNK_TYPE: ChunkType = ChunkType::GAMA;
    const LEN: usize = 4;

    fn encode(&self, buf: &mut [u8]) {
        buf.copy_from_slice(&self.0.to_be_bytes());
    }
}

impl FixedChunk for PhysicalDimensions {
    const CHUNK_TYPE: ChunkType = ChunkType::PHYS;
    const LEN: usize = 9;

    fn encode(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.x_pixels_per_unit.to_be_bytes());
        buf[4..8].copy_from_slice(&self.y_pixels_per_unit.to_be_bytes());
        buf[8] = self.unit as u8;
    }
}

/// Serializes chunks to a byte sink.
#[derive(Debug)]
pub struct ChunkWriter<W: Write> {
    inner: W,
    chunks_written: usize,
}

impl<W: Write> ChunkWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            chunks_written: 0,
        }
    }

    /// Write the 8-byte PNG signature.
    pub fn write_signature(&mut self) -> Result<()> {
        self.inner.write_all(&PNG_SIGNATURE)?;
        Ok(())
    }

    /// Write a chunk with an arbitrary payload.
    pub fn write_chunk(&mut self, chunk_type: ChunkType, data: &[u8]) -> Result<()> {
        self.write_parts(chunk_type, &[], data)
    }

    /// Write a chunk whose payload starts with a sequence number (fdAT).
    ///
    /// The CRC covers the type, the sequence number and the data.
    pub fn write_sequenced_chunk(
        &mut self,
        chunk_type: ChunkType,
        sequence_number: u32,
        data: &[u8],
    ) -> Result<()> {
        self.write_parts(chunk_type, &sequence_number.to_be_bytes(), data)
    }

    /// Write a fixed-length chunk through the scratch buffer.
    pub fn write_fixed<C: FixedChunk>(&mut self, chunk: &C) -> Result<()> {
        let mut scratch = [0u8; SCRATCH_LEN];
        let payload = &mut scratch[..C::LEN];
        chunk.encode(payload);
        self.write_parts(C::CHUNK_TYPE, &[], payload)
    }

    /// Number of chunks written so far.
    pub fn chunks_written(&self) -> usize {
        self.chunks_written
    }

    /// Borrow the sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Flush and return the sink.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn write_parts(&mut self, chunk_type: ChunkType, prefix: &[u8], data: &[u8]) -> Result<()> {
        let len = prefix.len() + data.len();
        if len > MAX_CHUNK_LEN {
            return Err(Error::ChunkTooLarge {
                chunk_type: chunk_type.0,
                len,
            });
        }

        let mut crc = Hasher::new();
        crc.update(chunk_type.as_bytes());
        crc.update(prefix);
        crc.update(data);

        self.inner.write_all(&(len as u32).to_be_bytes())?;
        self.inner.write_all(chunk_type.as_bytes())?;
        self.inner.write_all(prefix)?;
        self.inner.write_all(data)?;
        self.inner.write_all(&crc.finalize().to_be_bytes())?;

        self.chunks_written += 1;
        trace!("png: wrote {} ({} bytes)", chunk_type, len);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PhysicalUnit;

    fn written(f: impl FnOnce(&mut ChunkWriter<Vec<u8>>) -> Result<()>) -> Vec<u8> {
        let mut writer = ChunkWriter::new(Vec::new());
        f(&mut writer).unwrap();
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_write_iend_chunk() {
        let output = written(|w| w.write_chunk(ChunkType::IEND, &[]));

        assert_eq!(output.len(), 12);
        assert_eq!(&output[0..4], &[0, 0, 0, 0]);
        assert_eq!(&output[4..8], b"IEND");
        assert_eq!(&output[8..12], &0xAE426082_u32.to_be_bytes());
    }

    #[test]
    fn test_write_chunk_with_data() {
        let output = written(|w| w.write_chunk(ChunkType::TEXT, b"hello"));

        assert_eq!(output.len(), 17);
        assert_eq!(&output[0..4], &[0, 0, 0, 5]);
        assert_eq!(&output[4..8], b"tEXt");
        assert_eq!(&output[8..13], b"hello");
        let crc = crc32fast::hash(b"tEXthello");
        assert_eq!(&output[13..17], &crc.to_be_bytes());
    }

    #[test]
    fn test_sequenced_chunk_crc_covers_sequence() {
        let output = written(|w| w.write_sequenced_chunk(ChunkType::FDAT, 7, &[0xAA, 0xBB]));

        assert_eq!(&output[0..4], &[0, 0, 0, 6]);
        assert_eq!(&output[4..8], b"fdAT");
        assert_eq!(&output[8..12], &[0, 0, 0, 7]);
        assert_eq!(&output[12..14], &[0xAA, 0xBB]);
        let crc = crc32fast::hash(&[b'f', b'd', b'A', b'T', 0, 0, 0, 7, 0xAA, 0xBB]);
        assert_eq!(&output[14..18], &crc.to_be_bytes());
    }

    #[test]
    fn test_image_header_layout() {
        let header = ImageHeader {
            width: 0x0102,
            height: 3,
            bit_depth: BitDepth::Sixteen,
            color_type: PngColorType::RgbAlpha,
            interlace: InterlaceMode::Adam7,
        };
        let output = written(|w| w.write_fixed(&header));

        assert_eq!(&output[0..4], &[0, 0, 0, 13]);
        assert_eq!(&output[4..8], b"IHDR");
        assert_eq!(&output[8..21], &[0, 0, 1, 2, 0, 0, 0, 3, 16, 6, 0, 0, 1]);
    }

    #[test]
    fn test_gamma_rounding() {
        assert_eq!(Gamma::from_f32(1.0 / 2.2), Gamma(45455));
        let output = written(|w| w.write_fixed(&Gamma(45455)));
        assert_eq!(&output[8..12], &45455u32.to_be_bytes());
    }

    #[test]
    fn test_physical_layout() {
        let phys = PhysicalDimensions {
            x_pixels_per_unit: 2835,
            y_pixels_per_unit: 2835,
            unit: PhysicalUnit::Meter,
        };
        let output = written(|w| w.write_fixed(&phys));
        assert_eq!(&output[4..8], b"pHYs");
        assert_eq!(&output[8..17], &[0, 0, 0x0B, 0x13, 0, 0, 0x0B, 0x13, 1]);
    }

    #[test]
    fn test_signature_and_count() {
        let mut writer = ChunkWriter::new(Vec::new());
        writer.write_signature().unwrap();
        writer.write_chunk(ChunkType::IEND, &[]).unwrap();
        assert_eq!(writer.chunks_written(), 1);
        assert_eq!(&writer.get_ref()[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_chunk_type_display() {
        assert_eq!(ChunkType::ACTL.to_string(), "acTL");
        assert_eq!(format!("{:?}", ChunkType::IDAT), "ChunkType(IDAT)");
    }
}
