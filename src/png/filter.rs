//! PNG filtering implementation.
//!
//! PNG uses filtering to improve compression by exploiting correlations
//! between adjacent pixels. Each filtered scanline is prefixed by a one-byte
//! tag naming the filter used for that row.

use crate::color::{BitDepth, PngColorType};

const FILTER_NONE: u8 = 0;
const FILTER_SUB: u8 = 1;
const FILTER_UP: u8 = 2;
const FILTER_AVERAGE: u8 = 3;
const FILTER_PAETH: u8 = 4;

/// Scanline filter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    /// Store raw bytes.
    None,
    /// Difference from the left pixel.
    Sub,
    /// Difference from the pixel above.
    Up,
    /// Difference from the mean of left and above.
    Average,
    /// Difference from the Paeth predictor.
    Paeth,
    /// Per row, the cheapest of Sub, Up, Average and Paeth.
    Adaptive,
}

impl FilterType {
    /// Wire tag, or `None` for the adaptive meta-filter.
    pub const fn tag(self) -> Option<u8> {
        match self {
            FilterType::None => Some(FILTER_NONE),
            FilterType::Sub => Some(FILTER_SUB),
            FilterType::Up => Some(FILTER_UP),
            FilterType::Average => Some(FILTER_AVERAGE),
            FilterType::Paeth => Some(FILTER_PAETH),
            FilterType::Adaptive => None,
        }
    }

    /// Default filter for a color type when none is requested.
    pub const fn default_for(color_type: PngColorType) -> Self {
        match color_type {
            PngColorType::Palette => FilterType::None,
            _ => FilterType::Adaptive,
        }
    }

    /// Replace adaptive selection with `None` where prediction does not help:
    /// palette images, sub-byte depths and single-row images.
    pub fn resolve(self, color_type: PngColorType, bit_depth: BitDepth, height: u32) -> Self {
        let degenerate = color_type == PngColorType::Palette
            || bit_depth < BitDepth::Eight
            || height == 1;
        if self == FilterType::Adaptive && degenerate {
            FilterType::None
        } else {
            self
        }
    }
}

/// Candidates tried by adaptive selection, in tie-breaking order.
const ADAPTIVE_CANDIDATES: [FilterType; 4] = [
    FilterType::Sub,
    FilterType::Up,
    FilterType::Average,
    FilterType::Paeth,
];

/// Filters one scanline at a time, owning its output buffers.
///
/// The filtered row (tag + payload) is kept in `filtered`; adaptive selection
/// writes each candidate into `attempt` and swaps it in when it scores lower.
#[derive(Debug)]
pub struct FilterEngine {
    filter: FilterType,
    bpp: usize,
    filtered: Vec<u8>,
    attempt: Vec<u8>,
}

impl FilterEngine {
    /// Engine applying `filter` with a left-neighbor stride of `bpp` bytes.
    pub fn new(filter: FilterType, bpp: usize) -> Self {
        Self {
            filter,
            bpp,
            filtered: Vec::new(),
            attempt: Vec::new(),
        }
    }

    /// Filter applied to every row.
    pub fn filter(&self) -> FilterType {
        self.filter
    }

    /// Zero and resize the output buffers for rows of `row_bytes` bytes.
    pub fn reset(&mut self, row_bytes: usize) {
        self.filtered.clear();
        self.filtered.resize(row_bytes + 1, 0);
        self.attempt.clear();
        self.attempt.resize(row_bytes + 1, 0);
    }

    /// Filter `row` against `prev` and return tag + payload.
    ///
    /// `prev` must be the same length as `row` (all zeros for the first row).
    pub fn filter_row(&mut self, row: &[u8], prev: &[u8]) -> &[u8] {
        debug_assert_eq!(row.len(), prev.len(), "scanline length mismatch");
        if self.filtered.len() != row.len() + 1 {
            self.reset(row.len());
        }
        match self.filter {
            FilterType::Adaptive => {
                let mut best_score = u64::MAX;
                for kind in ADAPTIVE_CANDIDATES {
                    let tag = apply_filter(kind, row, prev, self.bpp, &mut self.attempt[1..]);
                    self.attempt[0] = tag;
                    let score = score_filter(&self.attempt[1..]);
                    if score < best_score {
                        best_score = score;
                        std::mem::swap(&mut self.filtered, &mut self.attempt);
                    }
                }
            }
            kind => {
                let tag = apply_filter(kind, row, prev, self.bpp, &mut self.filtered[1..]);
                self.filtered[0] = tag;
            }
        }
        &self.filtered
    }
}

/// Apply a concrete filter to `row`, writing the payload to `out`.
///
/// Returns the filter's wire tag. `Adaptive` is treated as `None`.
pub fn apply_filter(kind: FilterType, row: &[u8], prev: &[u8], bpp: usize, out: &mut [u8]) -> u8 {
    match kind {
        FilterType::Sub => filter_sub(row, bpp, out),
        FilterType::Up => filter_up(row, prev, out),
        FilterType::Average => filter_average(row, prev, bpp, out),
        FilterType::Paeth => filter_paeth(row, prev, bpp, out),
        FilterType::None | FilterType::Adaptive => {
            out.copy_from_slice(row);
            return FILTER_NONE;
        }
    }
    kind.tag().unwrap_or(FILTER_NONE)
}

/// Sub filter: difference from left pixel.
fn filter_sub(row: &[u8], bpp: usize, out: &mut [u8]) {
    for (i, (dst, &byte)) in out.iter_mut().zip(row).enumerate() {
        let left = if i >= bpp { row[i - bpp] } else { 0 };
        *dst = byte.wrapping_sub(left);
    }
}

/// Up filter: difference from above pixel.
fn filter_up(row: &[u8], prev: &[u8], out: &mut [u8]) {
    for ((dst, &byte), &above) in out.iter_mut().zip(row).zip(prev) {
        *dst = byte.wrapping_sub(above);
    }
}

/// Average filter: difference from average of left and above.
fn filter_average(row: &[u8], prev: &[u8], bpp: usize, out: &mut [u8]) {
    for (i, (dst, &byte)) in out.iter_mut().zip(row).enumerate() {
        let left = if i >= bpp { row[i - bpp] as u16 } else { 0 };
        let above = prev[i] as u16;
        *dst = byte.wrapping_sub(((left + above) / 2) as u8);
    }
}

/// Paeth filter: difference from Paeth predictor.
fn filter_paeth(row: &[u8], prev: &[u8], bpp: usize, out: &mut [u8]) {
    for (i, (dst, &byte)) in out.iter_mut().zip(row).enumerate() {
        let left = if i >= bpp { row[i - bpp] } else { 0 };
        let above = prev[i];
        let upper_left = if i >= bpp { prev[i - bpp] } else { 0 };
        *dst = byte.wrapping_sub(paeth_predictor(left, above, upper_left));
    }
}

/// Paeth predictor function.
///
/// Selects the value (a, b, or c) closest to p = a + b - c.
#[inline]
pub fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let a_i = a as i16;
    let b_i = b as i16;
    let c_i = c as i16;

    let p = a_i + b_i - c_i;
    let pa = (p - a_i).abs();
    let pb = (p - b_i).abs();
    let pc = (p - c_i).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Score a filtered payload using sum of absolute signed values.
///
/// Lower scores typically result in better compression.
#[inline]
pub fn score_filter(filtered: &[u8]) -> u64 {
    filtered
        .iter()
        .map(|&b| (b as i8).unsigned_abs() as u64)
        .sum()
}
