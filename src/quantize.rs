//! Palette quantization.
//!
//! The encoder only needs two capabilities from a quantizer: derive a palette
//! for a frame, and map every pixel of a frame to an index into that palette.
//! [`MedianCutQuantizer`] derives palettes with median cut and can apply
//! Floyd–Steinberg dithering; [`PaletteQuantizer`] maps onto a fixed palette.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::pixel::ImageFrame;

/// Options for the default quantizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizerOptions {
    /// Maximum palette size (1-256). Also capped by the palette bit depth.
    pub max_colors: u16,
    /// Enable Floyd–Steinberg dithering (on RGB channels only).
    pub dithering: bool,
}

impl Default for QuantizerOptions {
    fn default() -> Self {
        Self {
            max_colors: 256,
            dithering: false,
        }
    }
}

/// A palette plus one palette index per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedFrame {
    width: u32,
    height: u32,
    palette: Vec<[u8; 4]>,
    indices: Vec<u8>,
}

impl QuantizedFrame {
    /// Validate and wrap a quantization result.
    ///
    /// The palette must hold 1-256 entries, there must be exactly one index
    /// per pixel, and every index must address a palette entry.
    pub fn new(width: u32, height: u32, palette: Vec<[u8; 4]>, indices: Vec<u8>) -> Result<Self> {
        if palette.is_empty() || palette.len() > 256 {
            return Err(Error::InvalidPaletteLength { len: palette.len() });
        }
        let expected = width as usize * height as usize;
        if indices.len() != expected {
            return Err(Error::InvalidDataLength {
                expected,
                actual: indices.len(),
            });
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= palette.len()) {
            return Err(Error::InvalidPaletteIndex {
                index,
                palette_len: palette.len(),
            });
        }
        Ok(Self {
            width,
            height,
            palette,
            indices,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA palette entries.
    pub fn palette(&self) -> &[[u8; 4]] {
        &self.palette
    }

    /// All indices in row-major order.
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Indices of row `y`.
    pub fn row(&self, y: usize) -> &[u8] {
        let w = self.width as usize;
        &self.indices[y * w..(y + 1) * w]
    }
}

/// Palette derivation and pixel mapping.
pub trait Quantizer {
    /// Derive a palette for `frame` and remember it for [`Quantizer::quantize`].
    fn build_palette(&mut self, frame: &ImageFrame) -> Result<Vec<[u8; 4]>>;

    /// Map every pixel of `frame` onto the current palette.
    ///
    /// Builds a palette first when none has been derived yet.
    fn quantize(&mut self, frame: &ImageFrame) -> Result<QuantizedFrame>;
}

#[inline]
fn pack_rgba(c: [u8; 4]) -> u32 {
    u32::from_be_bytes(c)
}

fn frame_pixels(frame: &ImageFrame) -> impl Iterator<Item = [u8; 4]> + '_ {
    (0..frame.height() as usize).flat_map(move |y| {
        let row = frame.row(y);
        (0..row.len()).map(move |x| row.rgba8(x))
    })
}

#[derive(Clone)]
struct ColorCount {
    rgba: [u8; 4],
    count: u32,
}

/// Distinct colors of `frame` with their frequencies, sorted by color.
fn histogram(frame: &ImageFrame) -> Vec<ColorCount> {
    let mut hist = HashMap::<u32, u32>::new();
    for px in frame_pixels(frame) {
        *hist.entry(pack_rgba(px)).or_insert(0) += 1;
    }
    let mut colors: Vec<ColorCount> = hist
        .into_iter()
        .map(|(key, count)| ColorCount {
            rgba: key.to_be_bytes(),
            count,
        })
        .collect();
    colors.sort_unstable_by_key(|c| pack_rgba(c.rgba));
    colors
}

#[derive(Clone)]
struct ColorBox {
    colors: Vec<ColorCount>,
    min: [u8; 4],
    max: [u8; 4],
}

impl ColorBox {
    fn from_colors(colors: Vec<ColorCount>) -> Self {
        let mut min = [255u8; 4];
        let mut max = [0u8; 4];
        for c in &colors {
            for ch in 0..4 {
                min[ch] = min[ch].min(c.rgba[ch]);
                max[ch] = max[ch].max(c.rgba[ch]);
            }
        }
        Self { colors, min, max }
    }

    /// Channel with the widest spread, and that spread.
    fn range(&self) -> (usize, u8) {
        let mut channel = 0;
        let mut max_range = 0;
        for ch in 0..4 {
            let range = self.max[ch].saturating_sub(self.min[ch]);
            if range > max_range {
                max_range = range;
                channel = ch;
            }
        }
        (channel, max_range)
    }

    fn can_split(&self) -> bool {
        self.colors.len() > 1
    }

    fn split(self) -> (ColorBox, ColorBox) {
        let (channel, _) = self.range();
        let mut colors = self.colors;
        colors.sort_by_key(|c| c.rgba[channel]);

        let total: u32 = colors.iter().map(|c| c.count).sum();
        let mut acc = 0;
        let mut split_idx = 0;
        for (i, c) in colors.iter().enumerate() {
            acc += c.count;
            if acc >= total / 2 {
                split_idx = i;
                break;
            }
        }
        // Keep both halves non-empty.
        split_idx = split_idx.min(colors.len() - 2);
        let right = colors.split_off(split_idx + 1);
        (ColorBox::from_colors(colors), ColorBox::from_colors(right))
    }

    fn palette_entry(&self) -> [u8; 4] {
        let mut sums = [0u64; 4];
        let mut total: u64 = 0;
        for c in &self.colors {
            let cnt = c.count as u64;
            for ch in 0..4 {
                sums[ch] += c.rgba[ch] as u64 * cnt;
            }
            total += cnt;
        }
        if total == 0 {
            return [0, 0, 0, 255];
        }
        sums.map(|s| (s / total) as u8)
    }
}

fn median_cut_palette(colors: Vec<ColorCount>, max_colors: usize) -> Vec<[u8; 4]> {
    if colors.is_empty() {
        return vec![[0, 0, 0, 255]];
    }
    let mut boxes = vec![ColorBox::from_colors(colors)];
    while boxes.len() < max_colors {
        // Split the splittable box with the widest channel spread.
        let Some((idx, _)) = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.can_split())
            .max_by_key(|(_, b)| b.range().1)
        else {
            break;
        };
        let (left, right) = boxes.remove(idx).split();
        boxes.push(left);
        boxes.push(right);
    }
    boxes.iter().map(ColorBox::palette_entry).collect()
}

/// Index of the palette entry closest to `color` (squared RGBA distance).
fn nearest_palette_index(color: [u8; 4], palette: &[[u8; 4]]) -> u8 {
    let mut best_idx = 0u8;
    let mut best_dist = u32::MAX;
    for (i, p) in palette.iter().enumerate() {
        let dist: u32 = (0..4)
            .map(|ch| {
                let d = color[ch] as i32 - p[ch] as i32;
                (d * d) as u32
            })
            .sum();
        if dist < best_dist {
            best_dist = dist;
            best_idx = i as u8;
            if dist == 0 {
                break;
            }
        }
    }
    best_idx
}

/// Map pixels to their nearest palette entry, caching per distinct color.
fn map_nearest(frame: &ImageFrame, palette: &[[u8; 4]]) -> Vec<u8> {
    let mut cache = HashMap::<u32, u8>::new();
    frame_pixels(frame)
        .map(|px| {
            *cache
                .entry(pack_rgba(px))
                .or_insert_with(|| nearest_palette_index(px, palette))
        })
        .collect()
}

/// Map pixels with Floyd–Steinberg error diffusion on RGB; alpha is kept.
fn map_dithered(frame: &ImageFrame, palette: &[[u8; 4]]) -> Vec<u8> {
    let width = frame.width() as usize;
    let mut indices = Vec::with_capacity(width * frame.height() as usize);
    let mut err = vec![[0f32; 3]; width + 2];
    let mut next_err = vec![[0f32; 3]; width + 2];

    for y in 0..frame.height() as usize {
        let row = frame.row(y);
        for x in 0..width {
            let [r, g, b, a] = row.rgba8(x);
            let mut adjusted = [0u8; 4];
            for (ch, v) in [r, g, b].into_iter().enumerate() {
                adjusted[ch] = (v as f32 + err[x + 1][ch]).clamp(0.0, 255.0) as u8;
            }
            adjusted[3] = a;

            let idx = nearest_palette_index(adjusted, palette);
            indices.push(idx);
            let p = palette[idx as usize];

            //       * 7
            // 3 5 1
            for ch in 0..3 {
                let e = adjusted[ch] as f32 - p[ch] as f32;
                err[x + 2][ch] += e * 7.0 / 16.0;
                next_err[x][ch] += e * 3.0 / 16.0;
                next_err[x + 1][ch] += e * 5.0 / 16.0;
                next_err[x + 2][ch] += e / 16.0;
            }
        }
        err.fill([0.0; 3]);
        std::mem::swap(&mut err, &mut next_err);
    }
    indices
}

/// Median-cut palette derivation with optional dithering.
#[derive(Debug, Clone)]
pub struct MedianCutQuantizer {
    max_colors: usize,
    dithering: bool,
    palette: Option<Vec<[u8; 4]>>,
}

impl MedianCutQuantizer {
    /// Quantizer producing at most `max_colors` (clamped to 1-256) entries.
    pub fn new(max_colors: usize, dithering: bool) -> Self {
        Self {
            max_colors: max_colors.clamp(1, 256),
            dithering,
            palette: None,
        }
    }
}

impl Default for MedianCutQuantizer {
    fn default() -> Self {
        let options = QuantizerOptions::default();
        Self::new(options.max_colors as usize, options.dithering)
    }
}

impl Quantizer for MedianCutQuantizer {
    fn build_palette(&mut self, frame: &ImageFrame) -> Result<Vec<[u8; 4]>> {
        let colors = histogram(frame);
        let palette = if colors.len() <= self.max_colors {
            colors.iter().map(|c| c.rgba).collect()
        } else {
            median_cut_palette(colors, self.max_colors)
        };
        self.palette = Some(palette.clone());
        Ok(palette)
    }

    fn quantize(&mut self, frame: &ImageFrame) -> Result<QuantizedFrame> {
        let palette = match &self.palette {
            Some(palette) => palette.clone(),
            None => self.build_palette(frame)?,
        };
        let indices = if self.dithering {
            map_dithered(frame, &palette)
        } else {
            map_nearest(frame, &palette)
        };
        QuantizedFrame::new(frame.width(), frame.height(), palette, indices)
    }
}

/// Maps pixels onto a fixed palette.
#[derive(Debug, Clone)]
pub struct PaletteQuantizer {
    palette: Vec<[u8; 4]>,
    dithering: bool,
}

impl PaletteQuantizer {
    /// Quantizer for `palette` (1-256 entries).
    pub fn new(palette: Vec<[u8; 4]>) -> Result<Self> {
        if palette.is_empty() || palette.len() > 256 {
            return Err(Error::InvalidPaletteLength { len: palette.len() });
        }
        Ok(Self {
            palette,
            dithering: false,
        })
    }

    /// Enable Floyd–Steinberg dithering.
    pub fn with_dithering(mut self, dithering: bool) -> Self {
        self.dithering = dithering;
        self
    }
}

impl Quantizer for PaletteQuantizer {
    fn build_palette(&mut self, _frame: &ImageFrame) -> Result<Vec<[u8; 4]>> {
        Ok(self.palette.clone())
    }

    fn quantize(&mut self, frame: &ImageFrame) -> Result<QuantizedFrame> {
        let indices = if self.dithering {
            map_dithered(frame, &self.palette)
        } else {
            map_nearest(frame, &self.palette)
        };
        QuantizedFrame::new(frame.width(), frame.height(), self.palette.clone(), indices)
    }
}
