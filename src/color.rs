//! PNG color types, bit depths and the combinations PNG allows between them.

/// PNG color type as written to the IHDR chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PngColorType {
    /// Grayscale, one sample per pixel.
    Grayscale = 0,
    /// Red, green, blue.
    Rgb = 2,
    /// Palette indices.
    Palette = 3,
    /// Grayscale followed by alpha.
    GrayscaleAlpha = 4,
    /// Red, green, blue, alpha.
    RgbAlpha = 6,
}

/// Number of bits per sample (or per palette index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum BitDepth {
    /// 1 bit.
    One = 1,
    /// 2 bits.
    Two = 2,
    /// 4 bits.
    Four = 4,
    /// 8 bits.
    Eight = 8,
    /// 16 bits.
    Sixteen = 16,
}

/// Allowed bit depths per color type (PNG specification, table 11.1).
const GRAYSCALE_DEPTHS: &[BitDepth] = &[
    BitDepth::One,
    BitDepth::Two,
    BitDepth::Four,
    BitDepth::Eight,
    BitDepth::Sixteen,
];
const PALETTE_DEPTHS: &[BitDepth] = &[BitDepth::One, BitDepth::Two, BitDepth::Four, BitDepth::Eight];
const WIDE_DEPTHS: &[BitDepth] = &[BitDepth::Eight, BitDepth::Sixteen];

impl PngColorType {
    /// Returns the PNG color type value.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Bit depths PNG permits for this color type.
    pub const fn allowed_bit_depths(self) -> &'static [BitDepth] {
        match self {
            PngColorType::Grayscale => GRAYSCALE_DEPTHS,
            PngColorType::Palette => PALETTE_DEPTHS,
            PngColorType::Rgb | PngColorType::GrayscaleAlpha | PngColorType::RgbAlpha => {
                WIDE_DEPTHS
            }
        }
    }

    /// Whether `(self, depth)` is a legal IHDR combination.
    pub fn supports(self, depth: BitDepth) -> bool {
        self.allowed_bit_depths().contains(&depth)
    }

    /// Number of samples per pixel.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            PngColorType::Grayscale | PngColorType::Palette => 1,
            PngColorType::GrayscaleAlpha => 2,
            PngColorType::Rgb => 3,
            PngColorType::RgbAlpha => 4,
        }
    }

    /// Bytes per complete pixel, rounded up to 1 for sub-byte depths.
    ///
    /// This is the stride the scanline filters use for their left neighbor.
    #[inline]
    pub const fn bytes_per_pixel(self, use_16_bit: bool) -> usize {
        match self {
            PngColorType::Palette => 1,
            other => other.channels() * if use_16_bit { 2 } else { 1 },
        }
    }

    /// Whether the color type carries an alpha channel.
    #[inline]
    pub const fn has_alpha(self) -> bool {
        matches!(self, PngColorType::GrayscaleAlpha | PngColorType::RgbAlpha)
    }
}

impl BitDepth {
    /// Bits per sample.
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Number of distinct values a sample of this depth can take.
    #[inline]
    pub const fn color_count(self) -> usize {
        1usize << self.bits()
    }

    /// Parse a raw bit count.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(BitDepth::One),
            2 => Some(BitDepth::Two),
            4 => Some(BitDepth::Four),
            8 => Some(BitDepth::Eight),
            16 => Some(BitDepth::Sixteen),
            _ => None,
        }
    }
}

impl TryFrom<u8> for PngColorType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PngColorType::Grayscale),
            2 => Ok(PngColorType::Rgb),
            3 => Ok(PngColorType::Palette),
            4 => Ok(PngColorType::GrayscaleAlpha),
            6 => Ok(PngColorType::RgbAlpha),
            other => Err(other),
        }
    }
}

impl From<PngColorType> for u8 {
    fn from(color: PngColorType) -> Self {
        color as u8
    }
}
