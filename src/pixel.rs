//! Source pixel formats, frames and images.
//!
//! Pixels are stored as flat sample buffers tagged with a [`PixelFormat`].
//! Every format converts to the canonical forms the PNG scanline layouts
//! need (luminance, luminance + alpha, RGB, RGBA at 8 or 16 bits) through a
//! small fixed set of conversion functions selected by that tag.

use crate::color::{BitDepth, PngColorType};
use crate::error::{Error, Result};
use crate::metadata::{FrameMetadata, ImageMetadata};

/// Layout of the samples in an [`ImageFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit luminance.
    L8,
    /// 8-bit luminance + alpha.
    La8,
    /// 8-bit RGB.
    Rgb8,
    /// 8-bit RGBA.
    Rgba8,
    /// 16-bit luminance.
    L16,
    /// 16-bit luminance + alpha.
    La16,
    /// 16-bit RGB.
    Rgb16,
    /// 16-bit RGBA.
    Rgba16,
}

impl PixelFormat {
    /// Samples per pixel.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            PixelFormat::L8 | PixelFormat::L16 => 1,
            PixelFormat::La8 | PixelFormat::La16 => 2,
            PixelFormat::Rgb8 | PixelFormat::Rgb16 => 3,
            PixelFormat::Rgba8 | PixelFormat::Rgba16 => 4,
        }
    }

    /// Whether samples are stored as `u16`.
    #[inline]
    pub const fn is_16_bit(self) -> bool {
        matches!(
            self,
            PixelFormat::L16 | PixelFormat::La16 | PixelFormat::Rgb16 | PixelFormat::Rgba16
        )
    }

    /// Whether the format carries an alpha channel.
    #[inline]
    pub const fn has_alpha(self) -> bool {
        matches!(
            self,
            PixelFormat::La8 | PixelFormat::Rgba8 | PixelFormat::La16 | PixelFormat::Rgba16
        )
    }

    /// Whether the format has a single luminance channel (plus optional alpha).
    #[inline]
    pub const fn is_gray(self) -> bool {
        matches!(
            self,
            PixelFormat::L8 | PixelFormat::La8 | PixelFormat::L16 | PixelFormat::La16
        )
    }

    /// PNG color type that stores this format without loss.
    pub const fn suggested_color_type(self) -> PngColorType {
        match self {
            PixelFormat::L8 | PixelFormat::L16 => PngColorType::Grayscale,
            PixelFormat::La8 | PixelFormat::La16 => PngColorType::GrayscaleAlpha,
            PixelFormat::Rgb8 | PixelFormat::Rgb16 => PngColorType::Rgb,
            PixelFormat::Rgba8 | PixelFormat::Rgba16 => PngColorType::RgbAlpha,
        }
    }

    /// PNG bit depth that stores this format without loss.
    pub const fn suggested_bit_depth(self) -> BitDepth {
        if self.is_16_bit() {
            BitDepth::Sixteen
        } else {
            BitDepth::Eight
        }
    }
}

/// Owned sample storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    /// One byte per sample.
    U8(Vec<u8>),
    /// One `u16` per sample.
    U16(Vec<u16>),
}

/// Borrowed samples for one row (or one gathered block of pixels).
#[derive(Debug, Clone, Copy)]
pub enum RowSamples<'a> {
    /// One byte per sample.
    U8(&'a [u8]),
    /// One `u16` per sample.
    U16(&'a [u16]),
}

/// Expand an 8-bit sample to 16 bits.
#[inline]
pub const fn upscale_8_to_16(v: u8) -> u16 {
    v as u16 * 257
}

/// Reduce a 16-bit sample to 8 bits with rounding.
#[inline]
pub const fn downscale_16_to_8(v: u16) -> u8 {
    ((v as u32 * 255 + 32895) >> 16) as u8
}

/// ITU-R BT.709 luma weights.
#[inline]
fn bt709(r: f32, g: f32, b: f32) -> f32 {
    r * 0.2126 + g * 0.7152 + b * 0.0722
}

#[inline]
fn luma8_from_rgb(r: u8, g: u8, b: u8) -> u8 {
    (bt709(r as f32, g as f32, b as f32) + 0.5).min(255.0) as u8
}

#[inline]
fn luma16_from_rgb(r: u16, g: u16, b: u16) -> u16 {
    (bt709(r as f32, g as f32, b as f32) + 0.5).min(65535.0) as u16
}

/// One row of pixels in a known format.
#[derive(Debug, Clone, Copy)]
pub struct PixelRow<'a> {
    format: PixelFormat,
    samples: RowSamples<'a>,
}

impl<'a> PixelRow<'a> {
    /// Wrap a sample slice. The sample width must agree with `format`.
    pub fn new(format: PixelFormat, samples: RowSamples<'a>) -> Result<Self> {
        let wide = matches!(samples, RowSamples::U16(_));
        if wide != format.is_16_bit() {
            return Err(Error::SampleWidthMismatch);
        }
        Ok(Self { format, samples })
    }

    /// Pixel format of the row.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw samples of the row.
    #[inline]
    pub fn samples(&self) -> RowSamples<'a> {
        self.samples
    }

    /// Number of pixels in the row.
    pub fn len(&self) -> usize {
        let samples = match self.samples {
            RowSamples::U8(s) => s.len(),
            RowSamples::U16(s) => s.len(),
        };
        samples / self.format.channels()
    }

    /// Whether the row holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixel `x` as 8-bit RGBA.
    pub fn rgba8(&self, x: usize) -> [u8; 4] {
        let c = self.format.channels();
        let base = x * c;
        let raw: [u8; 4] = match self.samples {
            RowSamples::U8(s) => {
                let mut px = [0u8; 4];
                px[..c].copy_from_slice(&s[base..base + c]);
                px
            }
            RowSamples::U16(s) => {
                let mut px = [0u8; 4];
                for (dst, &src) in px.iter_mut().zip(&s[base..base + c]) {
                    *dst = downscale_16_to_8(src);
                }
                px
            }
        };
        match c {
            1 => [raw[0], raw[0], raw[0], u8::MAX],
            2 => [raw[0], raw[0], raw[0], raw[1]],
            3 => [raw[0], raw[1], raw[2], u8::MAX],
            _ => raw,
        }
    }

    /// Pixel `x` as 16-bit RGBA.
    pub fn rgba16(&self, x: usize) -> [u16; 4] {
        let c = self.format.channels();
        let base = x * c;
        let mut raw = [0u16; 4];
        match self.samples {
            RowSamples::U8(s) => {
                for (dst, &src) in raw.iter_mut().zip(&s[base..base + c]) {
                    *dst = upscale_8_to_16(src);
                }
            }
            RowSamples::U16(s) => raw[..c].copy_from_slice(&s[base..base + c]),
        }
        match c {
            1 => [raw[0], raw[0], raw[0], u16::MAX],
            2 => [raw[0], raw[0], raw[0], raw[1]],
            3 => [raw[0], raw[1], raw[2], u16::MAX],
            _ => raw,
        }
    }

    /// Luminance of pixel `x` at 8 bits.
    pub fn luma8(&self, x: usize) -> u8 {
        let c = self.format.channels();
        match (self.samples, self.format.is_gray()) {
            (RowSamples::U8(s), true) => s[x * c],
            (RowSamples::U16(s), true) => downscale_16_to_8(s[x * c]),
            (RowSamples::U8(_), false) => {
                let [r, g, b, _] = self.rgba8(x);
                luma8_from_rgb(r, g, b)
            }
            (RowSamples::U16(_), false) => downscale_16_to_8(self.luma16(x)),
        }
    }

    /// Luminance of pixel `x` at 16 bits.
    pub fn luma16(&self, x: usize) -> u16 {
        let c = self.format.channels();
        match (self.samples, self.format.is_gray()) {
            (RowSamples::U8(s), true) => upscale_8_to_16(s[x * c]),
            (RowSamples::U16(s), true) => s[x * c],
            (_, false) => {
                let [r, g, b, _] = self.rgba16(x);
                luma16_from_rgb(r, g, b)
            }
        }
    }

    /// Alpha of pixel `x` at 8 bits (opaque when the format has none).
    #[inline]
    pub fn alpha8(&self, x: usize) -> u8 {
        self.rgba8(x)[3]
    }

    /// Alpha of pixel `x` at 16 bits (opaque when the format has none).
    #[inline]
    pub fn alpha16(&self, x: usize) -> u16 {
        self.rgba16(x)[3]
    }
}

/// Reusable storage for a strided selection of pixels from a row.
#[derive(Debug, Default)]
pub(crate) struct PixelBlock {
    narrow: Vec<u8>,
    wide: Vec<u16>,
}

fn gather_samples<T: Copy>(src: &[T], channels: usize, start: usize, step: usize, out: &mut Vec<T>) {
    out.clear();
    let pixels = src.len() / channels;
    for x in (start..pixels).step_by(step) {
        out.extend_from_slice(&src[x * channels..(x + 1) * channels]);
    }
}

impl PixelBlock {
    /// Copy every `step`-th pixel of `row`, starting at `start`, into the block.
    pub(crate) fn gather<'b>(&'b mut self, row: PixelRow<'_>, start: usize, step: usize) -> PixelRow<'b> {
        let channels = row.format.channels();
        let samples = match row.samples {
            RowSamples::U8(s) => {
                gather_samples(s, channels, start, step, &mut self.narrow);
                RowSamples::U8(&self.narrow)
            }
            RowSamples::U16(s) => {
                gather_samples(s, channels, start, step, &mut self.wide);
                RowSamples::U16(&self.wide)
            }
        };
        PixelRow {
            format: row.format,
            samples,
        }
    }

    /// Copy every `step`-th palette index of `row`, starting at `start`.
    pub(crate) fn gather_indices<'b>(&'b mut self, row: &[u8], start: usize, step: usize) -> &'b [u8] {
        gather_samples(row, 1, start, step, &mut self.narrow);
        &self.narrow
    }
}

/// A single frame of pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    width: u32,
    height: u32,
    format: PixelFormat,
    samples: Samples,
    /// Animation metadata for this frame.
    pub metadata: FrameMetadata,
}

fn expected_samples(width: u32, height: u32, format: PixelFormat) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(format.channels()))
        .ok_or(Error::InvalidDimensions { width, height })
}

impl ImageFrame {
    /// Build a frame from 8-bit samples in row-major order.
    pub fn from_u8(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        if format.is_16_bit() {
            return Err(Error::SampleWidthMismatch);
        }
        let expected = expected_samples(width, height, format)?;
        if data.len() != expected {
            return Err(Error::InvalidDataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            samples: Samples::U8(data),
            metadata: FrameMetadata::default(),
        })
    }

    /// Build a frame from 16-bit samples in row-major order.
    pub fn from_u16(width: u32, height: u32, format: PixelFormat, data: Vec<u16>) -> Result<Self> {
        if !format.is_16_bit() {
            return Err(Error::SampleWidthMismatch);
        }
        let expected = expected_samples(width, height, format)?;
        if data.len() != expected {
            return Err(Error::InvalidDataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            samples: Samples::U16(data),
            metadata: FrameMetadata::default(),
        })
    }

    /// Attach animation metadata.
    pub fn with_metadata(mut self, metadata: FrameMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Frame width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format of the samples.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw sample storage.
    #[inline]
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Row `y` of the frame.
    pub fn row(&self, y: usize) -> PixelRow<'_> {
        let stride = self.width as usize * self.format.channels();
        let range = y * stride..(y + 1) * stride;
        let samples = match &self.samples {
            Samples::U8(s) => RowSamples::U8(&s[range]),
            Samples::U16(s) => RowSamples::U16(&s[range]),
        };
        PixelRow {
            format: self.format,
            samples,
        }
    }

    /// Rewrite every fully transparent pixel as transparent black.
    ///
    /// Formats without alpha are left untouched.
    pub fn clear_transparent_pixels(&mut self) {
        if !self.format.has_alpha() {
            return;
        }
        let channels = self.format.channels();
        match &mut self.samples {
            Samples::U8(s) => {
                for px in s.chunks_exact_mut(channels) {
                    if px[channels - 1] == 0 {
                        px.fill(0);
                    }
                }
            }
            Samples::U16(s) => {
                for px in s.chunks_exact_mut(channels) {
                    if px[channels - 1] == 0 {
                        px.fill(0);
                    }
                }
            }
        }
    }
}

/// An image: a root frame plus optional animation frames and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    frames: Vec<ImageFrame>,
    /// Image-level metadata.
    pub metadata: ImageMetadata,
}

impl Image {
    /// Create a still image from its root frame.
    pub fn new(root: ImageFrame) -> Self {
        Self {
            frames: vec![root],
            metadata: ImageMetadata::default(),
        }
    }

    /// Create an image from a list of frames; the first is the root frame.
    pub fn from_frames(frames: Vec<ImageFrame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::NoFrames);
        }
        Ok(Self {
            frames,
            metadata: ImageMetadata::default(),
        })
    }

    /// Attach image metadata.
    pub fn with_metadata(mut self, metadata: ImageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Append an animation frame.
    pub fn push_frame(&mut self, frame: ImageFrame) {
        self.frames.push(frame);
    }

    /// Canvas width (the root frame's width).
    pub fn width(&self) -> u32 {
        self.frames[0].width
    }

    /// Canvas height (the root frame's height).
    pub fn height(&self) -> u32 {
        self.frames[0].height
    }

    /// All frames, root first.
    pub fn frames(&self) -> &[ImageFrame] {
        &self.frames
    }

    /// The root frame.
    pub fn root_frame(&self) -> &ImageFrame {
        &self.frames[0]
    }

    /// Whether the image has more than one frame.
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_roundtrip() {
        for v in 0..=255u8 {
            assert_eq!(downscale_16_to_8(upscale_8_to_16(v)), v);
        }
        assert_eq!(downscale_16_to_8(0x8000), 128);
        assert_eq!(downscale_16_to_8(u16::MAX), 255);
    }

    #[test]
    fn test_frame_rejects_wrong_length() {
        let result = ImageFrame::from_u8(2, 2, PixelFormat::Rgb8, vec![0; 11]);
        assert!(matches!(
            result,
            Err(Error::InvalidDataLength {
                expected: 12,
                actual: 11
            })
        ));
    }

    #[test]
    fn test_frame_rejects_sample_width_mismatch() {
        let result = ImageFrame::from_u8(1, 1, PixelFormat::L16, vec![0]);
        assert!(matches!(result, Err(Error::SampleWidthMismatch)));
        let result = ImageFrame::from_u16(1, 1, PixelFormat::L8, vec![0]);
        assert!(matches!(result, Err(Error::SampleWidthMismatch)));
    }

    #[test]
    fn test_frame_rejects_zero_dimensions() {
        let result = ImageFrame::from_u8(0, 3, PixelFormat::L8, vec![]);
        assert!(matches!(result, Err(Error::InvalidDimensions { .. })));
    }

    #[test]
    fn test_row_conversions_from_gray() {
        let frame = ImageFrame::from_u8(2, 1, PixelFormat::La8, vec![10, 200, 30, 40]).unwrap();
        let row = frame.row(0);
        assert_eq!(row.len(), 2);
        assert_eq!(row.rgba8(0), [10, 10, 10, 200]);
        assert_eq!(row.luma8(1), 30);
        assert_eq!(row.alpha8(1), 40);
        assert_eq!(row.luma16(0), 10 * 257);
    }

    #[test]
    fn test_row_conversions_from_rgb16() {
        let frame =
            ImageFrame::from_u16(1, 1, PixelFormat::Rgb16, vec![0xFFFF, 0xFFFF, 0xFFFF]).unwrap();
        let row = frame.row(0);
        assert_eq!(row.rgba16(0), [0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF]);
        assert_eq!(row.rgba8(0), [255, 255, 255, 255]);
        assert_eq!(row.luma16(0), 0xFFFF);
        assert_eq!(row.luma8(0), 255);
    }

    #[test]
    fn test_luma_weights() {
        let frame = ImageFrame::from_u8(3, 1, PixelFormat::Rgb8, vec![255, 0, 0, 0, 255, 0, 0, 0, 255])
            .unwrap();
        let row = frame.row(0);
        assert_eq!(row.luma8(0), 54);
        assert_eq!(row.luma8(1), 182);
        assert_eq!(row.luma8(2), 18);
    }

    #[test]
    fn test_gather_every_other_pixel() {
        let frame =
            ImageFrame::from_u8(5, 1, PixelFormat::La8, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
        let mut block = PixelBlock::default();
        let gathered = block.gather(frame.row(0), 1, 2);
        assert_eq!(gathered.len(), 2);
        match gathered.samples() {
            RowSamples::U8(s) => assert_eq!(s, &[2, 3, 6, 7]),
            RowSamples::U16(_) => panic!("expected 8-bit samples"),
        }
    }

    #[test]
    fn test_gather_past_end_is_empty() {
        let mut block = PixelBlock::default();
        assert!(block.gather_indices(&[1, 2, 3], 4, 8).is_empty());
    }

    #[test]
    fn test_clear_transparent_pixels() {
        let mut frame =
            ImageFrame::from_u8(2, 1, PixelFormat::Rgba8, vec![9, 9, 9, 0, 9, 9, 9, 1]).unwrap();
        frame.clear_transparent_pixels();
        assert_eq!(frame.samples(), &Samples::U8(vec![0, 0, 0, 0, 9, 9, 9, 1]));
    }

    #[test]
    fn test_image_from_no_frames() {
        assert!(matches!(Image::from_frames(Vec::new()), Err(Error::NoFrames)));
    }
}
