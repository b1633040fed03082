//! PNG and APNG encoder implementation.
//!
//! Implements PNG encoding according to the PNG specification (RFC 2083)
//! and the APNG extension for animation.
//!
//! Chunks are written in this order: signature, IHDR, gAMA, iCCP, PLTE and
//! palette tRNS, color-key tRNS, pHYs, eXIf, XMP iTXt, text chunks, acTL,
//! then per frame an fcTL (animations only) and the frame data, then IEND.

pub mod bit_depth;
pub mod chunk;
pub mod encoder;
pub mod filter;
pub mod frames;
pub mod interlace;
pub mod scanline;
pub mod text;

use bitflags::bitflags;

use crate::color::{BitDepth, PngColorType};
use crate::error::Result;
use crate::pixel::{Image, ImageFrame, PixelFormat};
use crate::quantize::QuantizerOptions;

pub use encoder::{resolve_options, PngEncoder, ResolvedOptions};
pub use filter::FilterType;
pub use interlace::InterlaceMode;

bitflags! {
    /// Ancillary chunk categories to leave out of the output.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChunkFilter: u8 {
        /// Skip pHYs.
        const EXCLUDE_PHYSICAL = 1 << 0;
        /// Skip gAMA.
        const EXCLUDE_GAMMA = 1 << 1;
        /// Skip eXIf.
        const EXCLUDE_EXIF = 1 << 2;
        /// Skip tEXt, zTXt and iTXt, XMP included.
        const EXCLUDE_TEXT = 1 << 3;
        /// Skip iCCP.
        const EXCLUDE_COLOR_PROFILE = 1 << 4;
        /// Skip every category above.
        const EXCLUDE_ALL = Self::EXCLUDE_PHYSICAL.bits()
            | Self::EXCLUDE_GAMMA.bits()
            | Self::EXCLUDE_EXIF.bits()
            | Self::EXCLUDE_TEXT.bits()
            | Self::EXCLUDE_COLOR_PROFILE.bits();
    }
}

/// Treatment of fully transparent pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransparentColorMode {
    /// Keep color values under zero alpha.
    #[default]
    Preserve,
    /// Rewrite them as transparent black, which usually compresses better.
    Clear,
}

/// PNG encoding options.
#[derive(Debug, Clone, PartialEq)]
pub struct PngEncoderOptions {
    /// Compression level (1-9, default 6).
    pub compression_level: u8,
    /// Output color type; defaults to metadata, then the pixel format.
    pub color_type: Option<PngColorType>,
    /// Output bit depth; defaults to metadata, then the pixel format.
    pub bit_depth: Option<BitDepth>,
    /// Scanline filter; defaults to `None` for palettes and `Adaptive` otherwise.
    pub filter: Option<FilterType>,
    /// Interlace method; defaults to metadata, then no interlacing.
    pub interlace: Option<InterlaceMode>,
    /// Gamma to write; defaults to metadata.
    pub gamma: Option<f32>,
    /// Ancillary chunks to leave out.
    pub chunk_filter: ChunkFilter,
    /// Leave out every ancillary chunk the filter can name.
    pub skip_metadata: bool,
    /// Text values longer than this many characters are compressed.
    pub text_compression_threshold: usize,
    /// Palette alpha above this value is written as fully opaque.
    pub transparency_threshold: u8,
    /// Treatment of fully transparent pixels.
    pub transparent_color_mode: TransparentColorMode,
    /// Options for the default quantizer.
    pub quantizer: QuantizerOptions,
}

impl Default for PngEncoderOptions {
    fn default() -> Self {
        Self::balanced()
    }
}

impl PngEncoderOptions {
    /// Speed-focused preset: low compression and a fixed Sub filter.
    pub fn fast() -> Self {
        Self {
            compression_level: 2,
            filter: Some(FilterType::Sub),
            ..Self::balanced()
        }
    }

    /// Balanced preset: level 6 with per-color-type default filters.
    pub fn balanced() -> Self {
        Self {
            compression_level: 6,
            color_type: None,
            bit_depth: None,
            filter: None,
            interlace: None,
            gamma: None,
            chunk_filter: ChunkFilter::empty(),
            skip_metadata: false,
            text_compression_threshold: 1024,
            transparency_threshold: u8::MAX,
            transparent_color_mode: TransparentColorMode::Preserve,
            quantizer: QuantizerOptions::default(),
        }
    }

    /// Highest compression preset; slowest.
    pub fn max_compression() -> Self {
        Self {
            compression_level: 9,
            ..Self::balanced()
        }
    }
}

/// Encode 8-bit pixel data as PNG with default options.
///
/// # Arguments
/// * `data` - Raw pixel data (row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `format` - Layout of the input data (an 8-bit format)
///
/// # Returns
/// Complete PNG file as bytes.
pub fn encode(data: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<Vec<u8>> {
    encode_with_options(data, width, height, format, &PngEncoderOptions::default())
}

/// Encode 8-bit pixel data as PNG with custom options.
pub fn encode_with_options(
    data: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
    options: &PngEncoderOptions,
) -> Result<Vec<u8>> {
    let frame = ImageFrame::from_u8(width, height, format, data.to_vec())?;
    PngEncoder::new(options.clone()).encode_to_vec(&Image::new(frame))
}

/// Encode an image (still or animated) into a caller-provided buffer.
///
/// The `output` buffer is cleared before writing, so one allocation can be
/// reused across encodes.
pub fn encode_into(output: &mut Vec<u8>, image: &Image, options: &PngEncoderOptions) -> Result<()> {
    output.clear();
    PngEncoder::new(options.clone()).encode(image, output)
}

#[cfg(test)]
mod tests {
    use super::chunk::PNG_SIGNATURE;
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_encode_1x1_rgb() {
        let pixels = vec![255, 0, 0]; // Red pixel
        let png = encode(&pixels, 1, 1, PixelFormat::Rgb8).unwrap();

        assert_eq!(&png[0..8], &PNG_SIGNATURE);
        // signature + IHDR + IDAT + IEND at minimum
        assert!(png.len() > 8 + 25 + 12 + 12);
        // IHDR color type byte
        assert_eq!(png[25], 2);
    }

    #[test]
    fn test_encode_1x1_rgba() {
        let pixels = vec![255, 0, 0, 255];
        let png = encode(&pixels, 1, 1, PixelFormat::Rgba8).unwrap();

        assert_eq!(&png[0..8], &PNG_SIGNATURE);
        assert_eq!(png[24], 8);
        assert_eq!(png[25], 6);
    }

    #[test]
    fn test_encode_invalid_dimensions() {
        let pixels = vec![255, 0, 0];
        let result = encode(&pixels, 0, 1, PixelFormat::Rgb8);
        assert!(matches!(result, Err(Error::InvalidDimensions { .. })));
    }

    #[test]
    fn test_encode_invalid_data_length() {
        let pixels = vec![255, 0]; // Too short for 1x1 RGB
        let result = encode(&pixels, 1, 1, PixelFormat::Rgb8);
        assert!(matches!(result, Err(Error::InvalidDataLength { .. })));
    }

    #[test]
    fn test_encode_into_reuses_buffer() {
        let mut output = Vec::with_capacity(64);
        let black = ImageFrame::from_u8(1, 1, PixelFormat::Rgb8, vec![0, 0, 0]).unwrap();
        encode_into(&mut output, &Image::new(black), &PngEncoderOptions::default()).unwrap();
        let first = output.clone();
        assert!(!first.is_empty());

        let red = ImageFrame::from_u8(1, 1, PixelFormat::Rgb8, vec![255, 0, 0]).unwrap();
        encode_into(&mut output, &Image::new(red), &PngEncoderOptions::default()).unwrap();

        assert_ne!(first, output, "buffer should have been rewritten");
        assert_eq!(&output[0..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_encode_grayscale() {
        let pixels = vec![128, 255, 0, 64]; // 2x2 grayscale
        let png = encode(&pixels, 2, 2, PixelFormat::L8).unwrap();

        assert_eq!(&png[0..8], &PNG_SIGNATURE);
        assert_eq!(png[25], 0);
    }

    #[test]
    fn test_quantize_and_encode_indexed() {
        // Three distinct colors forced into two palette entries.
        let pixels = vec![
            255, 0, 0, 255, // red
            0, 255, 0, 255, // green
            0, 0, 255, 255, // blue
        ];
        let mut opts = PngEncoderOptions::default();
        opts.color_type = Some(PngColorType::Palette);
        opts.bit_depth = Some(BitDepth::One);
        opts.quantizer.max_colors = 2;
        let png = encode_with_options(&pixels, 3, 1, PixelFormat::Rgba8, &opts).unwrap();

        assert_eq!(png[25], 3);
        assert_eq!(png[24], 1);
        assert!(png.windows(4).any(|w| w == b"PLTE"));
    }

    #[test]
    fn test_presets() {
        assert_eq!(PngEncoderOptions::default(), PngEncoderOptions::balanced());
        assert_eq!(PngEncoderOptions::fast().compression_level, 2);
        assert_eq!(PngEncoderOptions::fast().filter, Some(FilterType::Sub));
        assert_eq!(PngEncoderOptions::max_compression().compression_level, 9);
        assert_eq!(PngEncoderOptions::balanced().text_compression_threshold, 1024);
    }

    #[test]
    fn test_chunk_filter_all() {
        let all = ChunkFilter::EXCLUDE_ALL;
        assert!(all.contains(ChunkFilter::EXCLUDE_PHYSICAL));
        assert!(all.contains(ChunkFilter::EXCLUDE_COLOR_PROFILE));
        assert!(!ChunkFilter::default().contains(ChunkFilter::EXCLUDE_TEXT));
    }
}
