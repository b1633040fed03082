//! The encode pipeline.
//!
//! [`PngEncoder`] resolves options against the image and its metadata,
//! quantizes palette output, compresses every frame, then writes chunks in
//! the fixed PNG/APNG order. All validation happens before the first byte is
//! written; after that only the sink can fail.

use std::borrow::Cow;
use std::io::Write;
use std::mem;

use log::{debug, warn};

use super::bit_depth::{palette_bit_depth, scale_down};
use super::chunk::{ChunkType, ChunkWriter, Gamma, ImageHeader};
use super::filter::{FilterEngine, FilterType};
use super::frames::{AnimationControl, FrameControl, FrameSequencer};
use super::interlace::{encode_adam7, InterlaceMode};
use super::scanline::ScanlineCodec;
use super::text::{icc_payload, text_chunk, xmp_payload};
use super::{ChunkFilter, PngEncoderOptions, TransparentColorMode};
use crate::color::{BitDepth, PngColorType};
use crate::compress::{validate_level, zlib_sink};
use crate::error::{Error, Result};
use crate::metadata::{ImageMetadata, TransparentColor};
use crate::pixel::{Image, ImageFrame, PixelFormat, PixelRow, RowSamples};
use crate::quantize::{MedianCutQuantizer, PaletteQuantizer, QuantizedFrame, Quantizer};

/// Largest width or height PNG allows.
pub const MAX_DIMENSION: u32 = (1 << 31) - 1;

/// Where a frame's rows come from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FrameSource<'a> {
    /// Pixels converted by the scanline codec.
    Pixels(&'a ImageFrame),
    /// Palette indices.
    Indexed(&'a QuantizedFrame),
}

impl FrameSource<'_> {
    pub(crate) fn width(&self) -> u32 {
        match self {
            FrameSource::Pixels(frame) => frame.width(),
            FrameSource::Indexed(frame) => frame.width(),
        }
    }

    pub(crate) fn height(&self) -> u32 {
        match self {
            FrameSource::Pixels(frame) => frame.height(),
            FrameSource::Indexed(frame) => frame.height(),
        }
    }
}

/// Raw scanline encoding, filtering and the current/previous row pair.
///
/// `current` and `previous` are swapped after every row, never copied.
#[derive(Debug)]
pub(crate) struct RowPipeline {
    codec: ScanlineCodec,
    engine: FilterEngine,
    current: Vec<u8>,
    previous: Vec<u8>,
}

impl RowPipeline {
    pub(crate) fn new(color_type: PngColorType, bit_depth: BitDepth, filter: FilterType) -> Self {
        let codec = ScanlineCodec::new(color_type, bit_depth);
        let engine = FilterEngine::new(filter, codec.bytes_per_pixel());
        Self {
            codec,
            engine,
            current: Vec::new(),
            previous: Vec::new(),
        }
    }

    /// Zero both rows and size them for `width` pixels.
    pub(crate) fn allocate(&mut self, width: usize) {
        let row_bytes = self.codec.row_bytes(width);
        self.current.clear();
        self.current.resize(row_bytes, 0);
        self.previous.clear();
        self.previous.resize(row_bytes, 0);
        self.engine.reset(row_bytes);
    }

    pub(crate) fn push_pixels<W: Write>(&mut self, row: PixelRow<'_>, sink: &mut W) -> Result<()> {
        self.codec.encode_pixels(row, &mut self.current);
        self.emit(sink)
    }

    pub(crate) fn push_indices<W: Write>(&mut self, row: &[u8], sink: &mut W) -> Result<()> {
        self.codec.encode_indices(row, &mut self.current);
        self.emit(sink)
    }

    fn emit<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        let filtered = self.engine.filter_row(&self.current, &self.previous);
        sink.write_all(filtered)?;
        mem::swap(&mut self.current, &mut self.previous);
        Ok(())
    }

    /// Filter and write every row of `source` top to bottom.
    pub(crate) fn encode_progressive<W: Write>(
        &mut self,
        source: FrameSource<'_>,
        sink: &mut W,
    ) -> Result<()> {
        self.allocate(source.width() as usize);
        for y in 0..source.height() as usize {
            match source {
                FrameSource::Pixels(frame) => self.push_pixels(frame.row(y), sink)?,
                FrameSource::Indexed(frame) => self.push_indices(frame.row(y), sink)?,
            }
        }
        Ok(())
    }
}

/// Encoding parameters after resolution against the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Output color type.
    pub color_type: PngColorType,
    /// Output bit depth (palette output may still be raised to fit the palette).
    pub bit_depth: BitDepth,
    /// Requested filter, before per-frame special cases.
    pub filter: FilterType,
    /// Interlace method.
    pub interlace: InterlaceMode,
    /// Ancillary chunks to leave out.
    pub chunk_filter: ChunkFilter,
}

/// Resolve color type, bit depth, filter and interlace for `image`.
///
/// Each setting comes from the explicit option, then the image metadata,
/// then the root frame's pixel format. A (color type, bit depth) pair PNG
/// does not allow is corrected to bit depth 8.
pub fn resolve_options(options: &PngEncoderOptions, image: &Image) -> ResolvedOptions {
    let metadata = &image.metadata;
    let format = image.root_frame().format();

    let color_type = options
        .color_type
        .or(metadata.color_type)
        .unwrap_or_else(|| format.suggested_color_type());
    let mut bit_depth = options
        .bit_depth
        .or(metadata.bit_depth)
        .unwrap_or_else(|| format.suggested_bit_depth());
    if !color_type.supports(bit_depth) {
        warn!(
            "png: bit depth {} is not valid for {:?}, using 8",
            bit_depth.bits(),
            color_type
        );
        bit_depth = BitDepth::Eight;
    }

    let filter = options
        .filter
        .unwrap_or_else(|| FilterType::default_for(color_type));
    let interlace = options.interlace.or(metadata.interlace).unwrap_or_default();
    let chunk_filter = if options.skip_metadata {
        ChunkFilter::EXCLUDE_ALL
    } else {
        options.chunk_filter
    };

    ResolvedOptions {
        color_type,
        bit_depth,
        filter,
        interlace,
        chunk_filter,
    }
}

/// Check canvas size and that every frame lies inside the canvas.
fn validate_frames(image: &Image) -> Result<()> {
    let (width, height) = (image.width(), image.height());
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::InvalidDimensions { width, height });
    }
    for (index, frame) in image.frames().iter().enumerate() {
        let meta = &frame.metadata;
        let fits = if index == 0 {
            meta.x_offset == 0 && meta.y_offset == 0
        } else {
            meta.x_offset as u64 + frame.width() as u64 <= width as u64
                && meta.y_offset as u64 + frame.height() as u64 <= height as u64
        };
        if !fits {
            return Err(Error::FrameOutOfBounds { frame: index });
        }
    }
    Ok(())
}

/// Filter, interlace and compress one frame.
fn compress_frame(source: FrameSource<'_>, resolved: &ResolvedOptions, level: u8) -> Result<Vec<u8>> {
    let filter = resolved
        .filter
        .resolve(resolved.color_type, resolved.bit_depth, source.height());
    let mut pipeline = RowPipeline::new(resolved.color_type, resolved.bit_depth, filter);
    let mut sink = zlib_sink(level);
    match resolved.interlace {
        InterlaceMode::None => pipeline.encode_progressive(source, &mut sink)?,
        InterlaceMode::Adam7 => encode_adam7(&mut pipeline, source, &mut sink)?,
    }
    Ok(sink.finish()?)
}

#[cfg(not(feature = "parallel"))]
fn compress_frames(sources: &[FrameSource<'_>], resolved: &ResolvedOptions, level: u8) -> Result<Vec<Vec<u8>>> {
    sources
        .iter()
        .map(|source| compress_frame(*source, resolved, level))
        .collect()
}

/// Frames are independent until sequencing, so they compress concurrently;
/// `collect` keeps the original order.
#[cfg(feature = "parallel")]
fn compress_frames(sources: &[FrameSource<'_>], resolved: &ResolvedOptions, level: u8) -> Result<Vec<Vec<u8>>> {
    use rayon::prelude::*;

    sources
        .par_iter()
        .map(|source| compress_frame(*source, resolved, level))
        .collect()
}

/// tRNS payload for a color key, or `None` when the color type has no key.
fn transparent_color_payload(
    key: TransparentColor,
    color_type: PngColorType,
    bit_depth: BitDepth,
) -> Result<Option<Vec<u8>>> {
    let samples = [key.r, key.g, key.b];
    let row = PixelRow::new(PixelFormat::Rgb16, RowSamples::U16(&samples))?;
    let payload = match color_type {
        PngColorType::Grayscale => {
            let value = match bit_depth {
                BitDepth::Sixteen => row.luma16(0),
                BitDepth::Eight => row.luma8(0) as u16,
                depth => scale_down(row.luma8(0), depth.bits()) as u16,
            };
            value.to_be_bytes().to_vec()
        }
        PngColorType::Rgb => {
            let wide = bit_depth == BitDepth::Sixteen;
            let rgba16 = row.rgba16(0);
            let rgba8 = row.rgba8(0);
            (0..3)
                .flat_map(|c| {
                    let v = if wide { rgba16[c] } else { rgba8[c] as u16 };
                    v.to_be_bytes()
                })
                .collect()
        }
        _ => return Ok(None),
    };
    Ok(Some(payload))
}

/// Write PLTE and, if any entry is translucent after thresholding, tRNS.
fn write_palette<W: Write>(writer: &mut ChunkWriter<W>, palette: &[[u8; 4]], threshold: u8) -> Result<()> {
    let mut rgb = Vec::with_capacity(palette.len() * 3);
    let mut alpha = Vec::with_capacity(palette.len());
    for &[r, g, b, a] in palette {
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(if a > threshold { u8::MAX } else { a });
    }
    writer.write_chunk(ChunkType::PLTE, &rgb)?;
    if alpha.iter().any(|&a| a < u8::MAX) {
        writer.write_chunk(ChunkType::TRNS, &alpha)?;
    }
    Ok(())
}

/// PNG / APNG encoder.
///
/// # Example
///
/// ```rust
/// use pngframe::{Image, ImageFrame, PixelFormat};
/// use pngframe::png::{PngEncoder, PngEncoderOptions};
///
/// let frame = ImageFrame::from_u8(1, 1, PixelFormat::Rgb8, vec![255, 0, 0]).unwrap();
/// let mut encoder = PngEncoder::new(PngEncoderOptions::default());
/// let bytes = encoder.encode_to_vec(&Image::new(frame)).unwrap();
/// assert_eq!(&bytes[1..4], b"PNG");
/// ```
pub struct PngEncoder {
    options: PngEncoderOptions,
    quantizer: Option<Box<dyn Quantizer>>,
}

impl PngEncoder {
    /// Encoder using `options`.
    pub fn new(options: PngEncoderOptions) -> Self {
        Self {
            options,
            quantizer: None,
        }
    }

    /// Use `quantizer` for palette output instead of the defaults.
    pub fn with_quantizer(mut self, quantizer: impl Quantizer + 'static) -> Self {
        self.quantizer = Some(Box::new(quantizer));
        self
    }

    /// Encoder options.
    pub fn options(&self) -> &PngEncoderOptions {
        &self.options
    }

    /// Options this encoder would use for `image`.
    pub fn resolve(&self, image: &Image) -> ResolvedOptions {
        resolve_options(&self.options, image)
    }

    /// Encode `image` into a new buffer.
    pub fn encode_to_vec(&mut self, image: &Image) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(image, &mut out)?;
        Ok(out)
    }

    /// Encode `image` into `sink`.
    ///
    /// Configuration errors are reported before anything is written. An I/O
    /// error leaves the sink with a partial stream.
    pub fn encode<W: Write>(&mut self, image: &Image, sink: W) -> Result<()> {
        validate_level(self.options.compression_level)?;
        validate_frames(image)?;
        let mut resolved = self.resolve(image);
        let metadata = &image.metadata;
        let level = self.options.compression_level;
        let animated = image.is_animated();

        let frames: Cow<'_, [ImageFrame]> = match self.options.transparent_color_mode {
            TransparentColorMode::Preserve => Cow::Borrowed(image.frames()),
            TransparentColorMode::Clear => Cow::Owned(
                image
                    .frames()
                    .iter()
                    .map(|frame| {
                        let mut frame = frame.clone();
                        frame.clear_transparent_pixels();
                        frame
                    })
                    .collect(),
            ),
        };

        let quantized = if resolved.color_type == PngColorType::Palette {
            let quantized = self.quantize_frames(&frames, metadata, resolved.bit_depth)?;
            let needed = palette_bit_depth(quantized[0].palette().len());
            resolved.bit_depth = resolved.bit_depth.max(needed);
            if !PngColorType::Palette.supports(resolved.bit_depth) {
                return Err(Error::UnsupportedBitDepth {
                    color_type: resolved.color_type,
                    bit_depth: resolved.bit_depth,
                });
            }
            quantized
        } else {
            Vec::new()
        };

        debug!(
            "png: {}x{} {:?} depth {} filter {:?} interlace {:?}, {} frame(s)",
            image.width(),
            image.height(),
            resolved.color_type,
            resolved.bit_depth.bits(),
            resolved.filter,
            resolved.interlace,
            frames.len()
        );

        let chunk_filter = resolved.chunk_filter;
        let icc = match &metadata.icc_profile {
            Some(profile) if !chunk_filter.contains(ChunkFilter::EXCLUDE_COLOR_PROFILE) => {
                Some(icc_payload(profile, level)?)
            }
            _ => None,
        };
        let texts = if chunk_filter.contains(ChunkFilter::EXCLUDE_TEXT) {
            Vec::new()
        } else {
            metadata
                .text
                .iter()
                .map(|text| text_chunk(text, self.options.text_compression_threshold, level))
                .collect::<Result<Vec<_>>>()?
        };
        let transparency = match metadata.transparent_color {
            Some(key) => transparent_color_payload(key, resolved.color_type, resolved.bit_depth)?,
            None => None,
        };

        let sources: Vec<FrameSource<'_>> = if quantized.is_empty() {
            frames.iter().map(FrameSource::Pixels).collect()
        } else {
            quantized.iter().map(FrameSource::Indexed).collect()
        };
        let compressed = compress_frames(&sources, &resolved, level)?;

        let mut writer = ChunkWriter::new(sink);
        writer.write_signature()?;
        writer.write_fixed(&ImageHeader {
            width: image.width(),
            height: image.height(),
            bit_depth: resolved.bit_depth,
            color_type: resolved.color_type,
            interlace: resolved.interlace,
        })?;

        if !chunk_filter.contains(ChunkFilter::EXCLUDE_GAMMA) {
            if let Some(gamma) = self.options.gamma.or(metadata.gamma).filter(|g| *g > 0.0) {
                writer.write_fixed(&Gamma::from_f32(gamma))?;
            }
        }
        if let Some(icc) = &icc {
            writer.write_chunk(ChunkType::ICCP, icc)?;
        }
        if let Some(root) = quantized.first() {
            write_palette(&mut writer, root.palette(), self.options.transparency_threshold)?;
        }
        if let Some(trns) = &transparency {
            writer.write_chunk(ChunkType::TRNS, trns)?;
        }
        if !chunk_filter.contains(ChunkFilter::EXCLUDE_PHYSICAL) {
            if let Some(physical) = &metadata.physical {
                writer.write_fixed(physical)?;
            }
        }
        if !chunk_filter.contains(ChunkFilter::EXCLUDE_EXIF) {
            if let Some(exif) = metadata.exif.as_ref().filter(|e| !e.is_empty()) {
                writer.write_chunk(ChunkType::EXIF, exif)?;
            }
        }
        if !chunk_filter.contains(ChunkFilter::EXCLUDE_TEXT) {
            if let Some(xmp) = metadata.xmp.as_ref().filter(|x| !x.is_empty()) {
                writer.write_chunk(ChunkType::ITXT, &xmp_payload(xmp))?;
            }
        }
        for (chunk_type, payload) in &texts {
            writer.write_chunk(*chunk_type, payload)?;
        }

        if animated {
            writer.write_fixed(&AnimationControl {
                frame_count: u32::try_from(frames.len()).unwrap_or(u32::MAX),
                play_count: metadata.repeat_count,
            })?;
        }

        let mut sequencer = FrameSequencer::new();
        for (index, (frame, data)) in frames.iter().zip(&compressed).enumerate() {
            if animated {
                let control = FrameControl::new(frame.width(), frame.height(), &frame.metadata);
                sequencer.write_frame_control(&mut writer, control)?;
            }
            if index == 0 {
                sequencer.write_image_data(&mut writer, data)?;
            } else {
                sequencer.write_frame_data(&mut writer, data)?;
            }
        }

        writer.write_chunk(ChunkType::IEND, &[])?;
        debug!("png: wrote {} chunks", writer.chunks_written());
        writer.into_inner()?;
        Ok(())
    }

    /// Quantize the root frame, then map later frames onto the root palette.
    fn quantize_frames(
        &mut self,
        frames: &[ImageFrame],
        metadata: &ImageMetadata,
        bit_depth: BitDepth,
    ) -> Result<Vec<QuantizedFrame>> {
        let options = self.options.quantizer;
        let root = &frames[0];
        let root_quantized = match (&mut self.quantizer, &metadata.color_table) {
            (Some(quantizer), _) => {
                quantizer.build_palette(root)?;
                quantizer.quantize(root)?
            }
            (None, Some(table)) => PaletteQuantizer::new(table.clone())?
                .with_dithering(options.dithering)
                .quantize(root)?,
            (None, None) => {
                let max_colors = (options.max_colors as usize).min(bit_depth.color_count());
                let mut quantizer = MedianCutQuantizer::new(max_colors, options.dithering);
                quantizer.build_palette(root)?;
                quantizer.quantize(root)?
            }
        };

        let mut quantized = Vec::with_capacity(frames.len());
        if frames.len() > 1 {
            let mut reuse = PaletteQuantizer::new(root_quantized.palette().to_vec())?
                .with_dithering(options.dithering);
            quantized.push(root_quantized);
            for frame in &frames[1..] {
                quantized.push(reuse.quantize(frame)?);
            }
        } else {
            quantized.push(root_quantized);
        }
        Ok(quantized)
    }
}
