//! Raw scanline layout.
//!
//! [`ScanlineCodec`] turns one row of source pixels (or palette indices) into
//! the exact unfiltered bytes PNG stores for the resolved color type and bit
//! depth. Multi-byte samples are always written big-endian.

use crate::color::{BitDepth, PngColorType};
use crate::pixel::{PixelFormat, PixelRow, RowSamples};
use crate::png::bit_depth::{pack_bits_into, pack_scaled_into};

/// Converts rows into raw scanline bytes for one color type / bit depth.
#[derive(Debug)]
pub struct ScanlineCodec {
    color_type: PngColorType,
    bit_depth: BitDepth,
    luma: Vec<u8>,
}

impl ScanlineCodec {
    /// Codec for an already validated (color type, bit depth) pair.
    pub fn new(color_type: PngColorType, bit_depth: BitDepth) -> Self {
        Self {
            color_type,
            bit_depth,
            luma: Vec::new(),
        }
    }

    /// Target color type.
    pub fn color_type(&self) -> PngColorType {
        self.color_type
    }

    /// Target bit depth.
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// Whether samples are written as 16-bit big-endian values.
    #[inline]
    pub fn use_16_bit(&self) -> bool {
        self.bit_depth == BitDepth::Sixteen
    }

    /// Filter stride in bytes: one whole pixel, at least 1.
    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.color_type.bytes_per_pixel(self.use_16_bit())
    }

    /// Raw byte length of a scanline `width` pixels wide (no filter tag).
    pub fn row_bytes(&self, width: usize) -> usize {
        let bits = width * self.color_type.channels() * self.bit_depth.bits() as usize;
        bits.div_ceil(8)
    }

    /// Write the raw bytes of `row` into `out`.
    ///
    /// `out` must be exactly [`ScanlineCodec::row_bytes`] long for the row's
    /// pixel count. Palette output is produced by
    /// [`ScanlineCodec::encode_indices`] instead.
    pub fn encode_pixels(&mut self, row: PixelRow<'_>, out: &mut [u8]) {
        if self.copy_verbatim(row, out) {
            return;
        }
        let width = row.len();
        let wide = self.use_16_bit();
        match self.color_type {
            PngColorType::Grayscale if wide => {
                for (x, dst) in out.chunks_exact_mut(2).enumerate().take(width) {
                    dst.copy_from_slice(&row.luma16(x).to_be_bytes());
                }
            }
            PngColorType::Grayscale if self.bit_depth == BitDepth::Eight => {
                for (x, dst) in out.iter_mut().enumerate().take(width) {
                    *dst = row.luma8(x);
                }
            }
            PngColorType::Grayscale => {
                self.luma.clear();
                self.luma.extend((0..width).map(|x| row.luma8(x)));
                pack_scaled_into(&self.luma, self.bit_depth.bits(), out);
            }
            PngColorType::GrayscaleAlpha if wide => {
                for (x, dst) in out.chunks_exact_mut(4).enumerate().take(width) {
                    dst[..2].copy_from_slice(&row.luma16(x).to_be_bytes());
                    dst[2..].copy_from_slice(&row.alpha16(x).to_be_bytes());
                }
            }
            PngColorType::GrayscaleAlpha => {
                for (x, dst) in out.chunks_exact_mut(2).enumerate().take(width) {
                    dst[0] = row.luma8(x);
                    dst[1] = row.alpha8(x);
                }
            }
            PngColorType::Rgb | PngColorType::RgbAlpha if wide => {
                let channels = self.color_type.channels();
                for (x, dst) in out.chunks_exact_mut(channels * 2).enumerate().take(width) {
                    let px = row.rgba16(x);
                    for (c, sample) in dst.chunks_exact_mut(2).zip(px) {
                        c.copy_from_slice(&sample.to_be_bytes());
                    }
                }
            }
            PngColorType::Rgb | PngColorType::RgbAlpha => {
                let channels = self.color_type.channels();
                for (x, dst) in out.chunks_exact_mut(channels).enumerate().take(width) {
                    dst.copy_from_slice(&row.rgba8(x)[..channels]);
                }
            }
            PngColorType::Palette => unreachable!("palette rows are encoded from indices"),
        }
    }

    /// Write a row of palette indices into `out`, packing below 8 bits.
    pub fn encode_indices(&self, indices: &[u8], out: &mut [u8]) {
        pack_bits_into(indices, self.bit_depth.bits(), out);
    }

    /// Copy 8-bit rows whose layout already matches the target.
    fn copy_verbatim(&self, row: PixelRow<'_>, out: &mut [u8]) -> bool {
        let same_layout = matches!(
            (row.format(), self.color_type, self.bit_depth),
            (PixelFormat::L8, PngColorType::Grayscale, BitDepth::Eight)
                | (PixelFormat::La8, PngColorType::GrayscaleAlpha, BitDepth::Eight)
                | (PixelFormat::Rgb8, PngColorType::Rgb, BitDepth::Eight)
                | (PixelFormat::Rgba8, PngColorType::RgbAlpha, BitDepth::Eight)
        );
        match row.samples() {
            RowSamples::U8(samples) if same_layout => {
                out.copy_from_slice(samples);
                true
            }
            _ => false,
        }
    }
}
