//! Metadata carried alongside pixels.
//!
//! The encoder reads these values when resolving options and when deciding
//! which ancillary chunks to write. Blobs (EXIF, ICC, XMP) are opaque bytes.

use crate::color::{BitDepth, PngColorType};
use crate::pixel::upscale_8_to_16;
use crate::png::InterlaceMode;

/// Image-level metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMetadata {
    /// Gamma of the source, written as gAMA when positive.
    pub gamma: Option<f32>,
    /// Color type the source was stored with.
    pub color_type: Option<PngColorType>,
    /// Bit depth the source was stored with.
    pub bit_depth: Option<BitDepth>,
    /// Interlace method the source was stored with.
    pub interlace: Option<InterlaceMode>,
    /// Color to mark as fully transparent in grayscale / RGB output.
    pub transparent_color: Option<TransparentColor>,
    /// Palette the source was stored with, as RGBA entries.
    pub color_table: Option<Vec<[u8; 4]>>,
    /// Raw EXIF bytes.
    pub exif: Option<Vec<u8>>,
    /// Raw ICC profile bytes.
    pub icc_profile: Option<Vec<u8>>,
    /// Raw XMP packet bytes.
    pub xmp: Option<Vec<u8>>,
    /// Textual key/value records.
    pub text: Vec<TextData>,
    /// Physical pixel dimensions.
    pub physical: Option<PhysicalDimensions>,
    /// Animation play count; 0 loops forever.
    pub repeat_count: u32,
}

/// A transparent color key, stored at 16 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransparentColor {
    /// Red.
    pub r: u16,
    /// Green.
    pub g: u16,
    /// Blue.
    pub b: u16,
}

impl TransparentColor {
    /// A 16-bit color key.
    pub const fn rgb16(r: u16, g: u16, b: u16) -> Self {
        Self { r, g, b }
    }

    /// An 8-bit color key, widened to 16 bits.
    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: upscale_8_to_16(r),
            g: upscale_8_to_16(g),
            b: upscale_8_to_16(b),
        }
    }

    /// A gray color key.
    pub const fn gray16(v: u16) -> Self {
        Self { r: v, g: v, b: v }
    }
}

/// One textual record.
///
/// Which chunk carries it (tEXt, zTXt or iTXt) is decided at encode time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextData {
    /// Keyword, 1-79 Latin-1 characters.
    pub keyword: String,
    /// Text value.
    pub value: String,
    /// RFC 3066 language tag.
    pub language_tag: String,
    /// Keyword translated into the language of `language_tag`.
    pub translated_keyword: String,
}

impl TextData {
    /// Plain keyword/value record.
    pub fn new(keyword: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Record with a language tag and a translated keyword.
    pub fn international(
        keyword: impl Into<String>,
        value: impl Into<String>,
        language_tag: impl Into<String>,
        translated_keyword: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            value: value.into(),
            language_tag: language_tag.into(),
            translated_keyword: translated_keyword.into(),
        }
    }
}

/// Unit of [`PhysicalDimensions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PhysicalUnit {
    /// Only the aspect ratio is meaningful.
    #[default]
    Unknown = 0,
    /// Pixels per metre.
    Meter = 1,
}

/// Pixel density written to pHYs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicalDimensions {
    /// Pixels per unit along X.
    pub x_pixels_per_unit: u32,
    /// Pixels per unit along Y.
    pub y_pixels_per_unit: u32,
    /// Unit of the two densities.
    pub unit: PhysicalUnit,
}

impl PhysicalDimensions {
    /// Density from dots per inch, converted to pixels per metre.
    pub fn from_dpi(x_dpi: f64, y_dpi: f64) -> Self {
        let to_ppm = |dpi: f64| (dpi / 0.0254).round().clamp(0.0, u32::MAX as f64) as u32;
        Self {
            x_pixels_per_unit: to_ppm(x_dpi),
            y_pixels_per_unit: to_ppm(y_dpi),
            unit: PhysicalUnit::Meter,
        }
    }
}

/// How the canvas region of a frame is treated before the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisposeOp {
    /// Leave the canvas as is.
    #[default]
    None = 0,
    /// Clear the region to transparent black.
    Background = 1,
    /// Restore the region to its previous contents.
    Previous = 2,
}

/// How a frame is combined with the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOp {
    /// Overwrite the region.
    #[default]
    Source = 0,
    /// Alpha-composite over the region.
    Over = 1,
}

/// Per-frame animation metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameMetadata {
    /// Delay numerator (seconds = numerator / denominator).
    pub delay_numerator: u16,
    /// Delay denominator; 0 is read by decoders as 100.
    pub delay_denominator: u16,
    /// Dispose operation.
    pub dispose: DisposeOp,
    /// Blend operation.
    pub blend: BlendOp,
    /// Horizontal offset inside the canvas.
    pub x_offset: u32,
    /// Vertical offset inside the canvas.
    pub y_offset: u32,
}

impl Default for FrameMetadata {
    fn default() -> Self {
        Self {
            delay_numerator: 0,
            delay_denominator: 100,
            dispose: DisposeOp::None,
            blend: BlendOp::Source,
            x_offset: 0,
            y_offset: 0,
        }
    }
}

impl FrameMetadata {
    /// Metadata with the given delay in milliseconds.
    pub fn with_delay_ms(delay_ms: u16) -> Self {
        Self {
            delay_numerator: delay_ms,
            delay_denominator: 1000,
            ..Self::default()
        }
    }
}
