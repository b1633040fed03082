//! Adam7 interlacing.
//!
//! An interlaced image is stored as seven reduced sub-images. Each pass takes
//! every `column_step`-th pixel of every `row_step`-th row, starting at a
//! fixed offset, and is filtered as an image of its own.

use std::io::Write;

use log::trace;

use crate::error::Result;
use crate::pixel::PixelBlock;
use crate::png::encoder::{FrameSource, RowPipeline};

/// Interlace method written to IHDR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterlaceMode {
    /// Rows are stored top to bottom.
    #[default]
    None,
    /// Seven-pass Adam7 interlacing.
    Adam7,
}

impl InterlaceMode {
    /// IHDR interlace method byte.
    pub const fn code(self) -> u8 {
        match self {
            InterlaceMode::None => 0,
            InterlaceMode::Adam7 => 1,
        }
    }
}

/// Geometry of one Adam7 pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adam7Pass {
    /// First row sampled.
    pub first_row: usize,
    /// First column sampled.
    pub first_column: usize,
    /// Distance between sampled rows.
    pub row_step: usize,
    /// Distance between sampled columns.
    pub column_step: usize,
}

/// The seven Adam7 passes in stream order.
pub const ADAM7_PASSES: [Adam7Pass; 7] = [
    Adam7Pass::new(0, 0, 8, 8),
    Adam7Pass::new(0, 4, 8, 8),
    Adam7Pass::new(4, 0, 8, 4),
    Adam7Pass::new(0, 2, 4, 4),
    Adam7Pass::new(2, 0, 4, 2),
    Adam7Pass::new(0, 1, 2, 2),
    Adam7Pass::new(1, 0, 2, 1),
];

impl Adam7Pass {
    const fn new(first_row: usize, first_column: usize, row_step: usize, column_step: usize) -> Self {
        Self {
            first_row,
            first_column,
            row_step,
            column_step,
        }
    }

    /// Pixels per pass row for an image `width` pixels wide.
    #[inline]
    pub const fn block_width(&self, width: usize) -> usize {
        (width + self.column_step - 1 - self.first_column) / self.column_step
    }

    /// Rows in the pass for an image `height` pixels tall.
    #[inline]
    pub const fn block_height(&self, height: usize) -> usize {
        (height + self.row_step - 1 - self.first_row) / self.row_step
    }

    /// Source rows visited by the pass.
    pub fn rows(&self, height: usize) -> impl Iterator<Item = usize> {
        (self.first_row..height).step_by(self.row_step)
    }

    /// Source `(x, y)` coordinates visited by the pass, in stream order.
    pub fn pixels(&self, width: usize, height: usize) -> impl Iterator<Item = (usize, usize)> {
        let pass = *self;
        self.rows(height)
            .flat_map(move |y| (pass.first_column..width).step_by(pass.column_step).map(move |x| (x, y)))
    }
}

/// Filter and write all seven passes of `source` into `sink`.
///
/// Scanline buffers are reallocated and zeroed at the start of every pass.
/// Passes with no pixels contribute no scanlines.
pub(crate) fn encode_adam7<W: Write>(
    pipeline: &mut RowPipeline,
    source: FrameSource<'_>,
    sink: &mut W,
) -> Result<()> {
    let width = source.width() as usize;
    let height = source.height() as usize;
    let mut block = PixelBlock::default();

    for (index, pass) in ADAM7_PASSES.iter().enumerate() {
        let block_width = pass.block_width(width);
        trace!(
            "png: adam7 pass {} is {}x{}",
            index + 1,
            block_width,
            pass.block_height(height)
        );
        if block_width == 0 {
            continue;
        }
        pipeline.allocate(block_width);
        for y in pass.rows(height) {
            match source {
                FrameSource::Pixels(frame) => {
                    let row = block.gather(frame.row(y), pass.first_column, pass.column_step);
                    pipeline.push_pixels(row, sink)?;
                }
                FrameSource::Indexed(frame) => {
                    let row = block.gather_indices(frame.row(y), pass.first_column, pass.column_step);
                    pipeline.push_indices(row, sink)?;
                }
            }
        }
    }
    Ok(())
}
