//! Sub-byte sample packing for PNG.
//!
//! Grayscale and palette images at 1, 2 or 4 bits store several samples per
//! byte, most significant bits first. Grayscale samples are first scaled
//! from 8 bits down to the target range; palette indices are packed as is.

use crate::color::BitDepth;

/// Divisor mapping an 8-bit sample onto a `bits`-wide sample.
#[inline]
pub const fn scale_factor(bits: u8) -> u8 {
    (255 / ((1u16 << bits) - 1)) as u8
}

/// Scale an 8-bit sample down to `bits` bits.
#[inline]
pub const fn scale_down(v: u8, bits: u8) -> u8 {
    (v / scale_factor(bits)) & ((1u16 << bits) - 1) as u8
}

/// Pack `data` into `out`, `8 / bits` samples per byte, MSB first.
///
/// Sample bits above `bits` are discarded. Trailing bits of the final byte
/// are zero. `out` must hold at least `ceil(data.len() * bits / 8)` bytes.
pub fn pack_bits_into(data: &[u8], bits: u8, out: &mut [u8]) {
    debug_assert!(
        matches!(bits, 1 | 2 | 4 | 8),
        "pack_bits expected bit depth 1, 2, 4, or 8"
    );
    if bits == 8 {
        out[..data.len()].copy_from_slice(data);
        return;
    }
    let per_byte = (8 / bits) as usize;
    let mask = (1u8 << bits) - 1;
    for (dst, group) in out.iter_mut().zip(data.chunks(per_byte)) {
        let mut acc: u8 = 0;
        for &v in group {
            acc = (acc << bits) | (v & mask);
        }
        *dst = acc << (bits as usize * (per_byte - group.len()));
    }
}

/// Pack `data` into a new buffer, `8 / bits` samples per byte, MSB first.
pub fn pack_bits(data: &[u8], bits: u8) -> Vec<u8> {
    let mut out = vec![0u8; (data.len() * bits as usize).div_ceil(8)];
    pack_bits_into(data, bits, &mut out);
    out
}

/// Scale 8-bit samples to `bits` bits and pack them into `out`.
pub fn pack_scaled_into(data: &[u8], bits: u8, out: &mut [u8]) {
    if bits == 8 {
        out[..data.len()].copy_from_slice(data);
        return;
    }
    let per_byte = (8 / bits) as usize;
    for (dst, group) in out.iter_mut().zip(data.chunks(per_byte)) {
        let mut acc: u8 = 0;
        for &v in group {
            acc = (acc << bits) | scale_down(v, bits);
        }
        *dst = acc << (bits as usize * (per_byte - group.len()));
    }
}

/// Smallest palette bit depth able to index `len` entries.
pub fn palette_bit_depth(len: usize) -> BitDepth {
    if len == 0 {
        BitDepth::Eight
    } else if len <= 2 {
        BitDepth::One
    } else if len <= 4 {
        BitDepth::Two
    } else if len <= 16 {
        BitDepth::Four
    } else {
        BitDepth::Eight
    }
}
