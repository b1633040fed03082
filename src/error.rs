//! Error types for the pngframe library.

use std::fmt;
use std::io;

use crate::color::{BitDepth, PngColorType};

/// Result type alias for pngframe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during image encoding.
#[derive(Debug)]
pub enum Error {
    /// Invalid image dimensions (zero, or larger than 2^31 - 1).
    InvalidDimensions {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },
    /// Pixel data length doesn't match expected size.
    InvalidDataLength {
        /// Expected number of samples.
        expected: usize,
        /// Actual number of samples provided.
        actual: usize,
    },
    /// Sample width of the buffer doesn't match the pixel format.
    SampleWidthMismatch,
    /// Invalid compression level (must be 1-9).
    InvalidCompressionLevel(u8),
    /// The resolved color type / bit depth pair is not allowed by PNG.
    UnsupportedBitDepth {
        /// Resolved color type.
        color_type: PngColorType,
        /// Resolved bit depth.
        bit_depth: BitDepth,
    },
    /// A chunk payload does not fit the 31-bit length field.
    ChunkTooLarge {
        /// Chunk type tag.
        chunk_type: [u8; 4],
        /// Payload length in bytes.
        len: usize,
    },
    /// Palette must have between 1 and 256 entries.
    InvalidPaletteLength {
        /// Palette length provided.
        len: usize,
    },
    /// A quantized pixel refers past the end of its palette.
    InvalidPaletteIndex {
        /// Offending index.
        index: u8,
        /// Palette length.
        palette_len: usize,
    },
    /// An animation frame does not fit inside the canvas.
    FrameOutOfBounds {
        /// Frame number (0 is the root frame).
        frame: usize,
    },
    /// The image holds no frames.
    NoFrames,
    /// Text keywords must be 1-79 Latin-1 characters.
    InvalidTextKeyword(String),
    /// Error reported by the output sink or the compressor.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDimensions { width, height } => {
                write!(f, "Invalid image dimensions: {}x{}", width, height)
            }
            Error::InvalidDataLength { expected, actual } => {
                write!(
                    f,
                    "Invalid pixel data length: expected {} samples, got {}",
                    expected, actual
                )
            }
            Error::SampleWidthMismatch => {
                write!(f, "Sample buffer width does not match the pixel format")
            }
            Error::InvalidCompressionLevel(level) => {
                write!(f, "Invalid compression level {}: must be 1-9", level)
            }
            Error::UnsupportedBitDepth {
                color_type,
                bit_depth,
            } => {
                write!(
                    f,
                    "Bit depth {} is not supported for color type {:?}",
                    bit_depth.bits(),
                    color_type
                )
            }
            Error::ChunkTooLarge { chunk_type, len } => {
                write!(
                    f,
                    "Chunk {} payload of {} bytes exceeds the PNG length limit",
                    String::from_utf8_lossy(chunk_type),
                    len
                )
            }
            Error::InvalidPaletteLength { len } => {
                write!(f, "Invalid palette length {}: must be 1-256", len)
            }
            Error::InvalidPaletteIndex { index, palette_len } => {
                write!(
                    f,
                    "Palette index {} out of range for palette of {} entries",
                    index, palette_len
                )
            }
            Error::FrameOutOfBounds { frame } => {
                write!(f, "Frame {} does not fit inside the canvas", frame)
            }
            Error::NoFrames => write!(f, "Image has no frames"),
            Error::InvalidTextKeyword(keyword) => {
                write!(f, "Invalid text keyword {:?}", keyword)
            }
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
