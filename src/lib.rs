//! # pngframe
//!
//! A PNG and APNG encoder.
//!
//! Pixels go in as 8- or 16-bit grayscale, gray+alpha, RGB or RGBA samples;
//! out comes a PNG stream at any valid color type and bit depth, optionally
//! palettized, Adam7-interlaced or animated.
//!
//! ## Features
//!
//! - **All five PNG filters** plus per-row adaptive selection
//! - **Sub-byte output** (1, 2 and 4-bit grayscale and palette)
//! - **Palette quantization** with median cut and optional dithering
//! - **APNG** with per-frame offsets, delays, dispose and blend operations
//! - **Metadata chunks**: gAMA, iCCP, tRNS, pHYs, eXIf, tEXt, zTXt, iTXt
//! - Optional parallel frame compression via the `parallel` feature
//!
//! ## Example
//!
//! ```rust
//! use pngframe::{png, PixelFormat};
//!
//! let pixels: Vec<u8> = vec![255, 0, 0, 255]; // 1x1 red RGBA pixel
//! let png_data = png::encode(&pixels, 1, 1, PixelFormat::Rgba8).unwrap();
//! assert_eq!(&png_data[1..4], b"PNG");
//! ```
//!
//! Animations are built from frames:
//!
//! ```rust
//! use pngframe::{FrameMetadata, Image, ImageFrame, PixelFormat};
//! use pngframe::png::{PngEncoder, PngEncoderOptions};
//!
//! let red = ImageFrame::from_u8(1, 1, PixelFormat::Rgb8, vec![255, 0, 0]).unwrap();
//! let blue = ImageFrame::from_u8(1, 1, PixelFormat::Rgb8, vec![0, 0, 255])
//!     .unwrap()
//!     .with_metadata(FrameMetadata::with_delay_ms(500));
//! let image = Image::from_frames(vec![red, blue]).unwrap();
//! let apng = PngEncoder::new(PngEncoderOptions::default())
//!     .encode_to_vec(&image)
//!     .unwrap();
//! assert!(apng.windows(4).any(|w| w == b"acTL"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod color;
pub mod compress;
pub mod error;
pub mod metadata;
pub mod pixel;
pub mod png;
pub mod quantize;

pub use color::{BitDepth, PngColorType};
pub use error::{Error, Result};
pub use metadata::{
    BlendOp, DisposeOp, FrameMetadata, ImageMetadata, PhysicalDimensions, PhysicalUnit, TextData,
    TransparentColor,
};
pub use pixel::{Image, ImageFrame, PixelFormat, PixelRow, RowSamples, Samples};
pub use quantize::{
    MedianCutQuantizer, PaletteQuantizer, QuantizedFrame, Quantizer, QuantizerOptions,
};
