//! Helpers for inspecting encoded streams.
//!
//! The chunk walker checks every CRC as it goes, so any test that walks a
//! stream also verifies chunk integrity.

#![allow(dead_code)]

use std::io::Read;

use flate2::read::ZlibDecoder;

pub const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// One chunk read back from a stream.
#[derive(Debug, Clone)]
pub struct RawChunk {
    pub kind: String,
    pub data: Vec<u8>,
}

impl RawChunk {
    pub fn u32_at(&self, offset: usize) -> u32 {
        u32::from_be_bytes(self.data[offset..offset + 4].try_into().unwrap())
    }
}

/// Split a PNG stream into chunks, asserting the signature and every CRC.
pub fn chunks(bytes: &[u8]) -> Vec<RawChunk> {
    assert_eq!(&bytes[..8], &SIGNATURE, "bad signature");
    let mut out = Vec::new();
    let mut pos = 8;
    while pos < bytes.len() {
        let len = u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
        let kind = &bytes[pos + 4..pos + 8];
        let data = &bytes[pos + 8..pos + 8 + len];
        let stored = u32::from_be_bytes(bytes[pos + 8 + len..pos + 12 + len].try_into().unwrap());

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(kind);
        hasher.update(data);
        let kind = String::from_utf8_lossy(kind).into_owned();
        assert_eq!(hasher.finalize(), stored, "CRC mismatch in {kind}");

        out.push(RawChunk {
            kind,
            data: data.to_vec(),
        });
        pos += 12 + len;
    }
    assert_eq!(pos, bytes.len(), "trailing bytes after last chunk");
    out
}

/// Chunk type names in stream order.
pub fn chunk_types(bytes: &[u8]) -> Vec<String> {
    chunks(bytes).into_iter().map(|c| c.kind).collect()
}

/// First chunk of the given type.
pub fn find_chunk(bytes: &[u8], kind: &str) -> Option<RawChunk> {
    chunks(bytes).into_iter().find(|c| c.kind == kind)
}

pub fn inflate(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}

/// Concatenated and inflated IDAT data.
pub fn image_data(bytes: &[u8]) -> Vec<u8> {
    let compressed: Vec<u8> = chunks(bytes)
        .into_iter()
        .filter(|c| c.kind == "IDAT")
        .flat_map(|c| c.data)
        .collect();
    inflate(&compressed)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Reverse one filtered row.
pub fn unfilter_row(tag: u8, filtered: &[u8], prev: &[u8], bpp: usize) -> Vec<u8> {
    let mut out = vec![0u8; filtered.len()];
    for i in 0..filtered.len() {
        let a = if i >= bpp { out[i - bpp] } else { 0 };
        let b = prev[i];
        let c = if i >= bpp { prev[i - bpp] } else { 0 };
        let predictor = match tag {
            0 => 0,
            1 => a,
            2 => b,
            3 => ((a as u16 + b as u16) / 2) as u8,
            4 => paeth(a, b, c),
            other => panic!("unknown filter tag {other}"),
        };
        out[i] = filtered[i].wrapping_add(predictor);
    }
    out
}

/// Split inflated non-interlaced data into raw rows, returning the tags too.
pub fn unfilter(data: &[u8], row_bytes: usize, bpp: usize) -> (Vec<u8>, Vec<Vec<u8>>) {
    let mut tags = Vec::new();
    let mut rows: Vec<Vec<u8>> = Vec::new();
    let zero = vec![0u8; row_bytes];
    for line in data.chunks(row_bytes + 1) {
        assert_eq!(line.len(), row_bytes + 1, "short scanline");
        let prev = rows.last().unwrap_or(&zero);
        let row = unfilter_row(line[0], &line[1..], prev, bpp);
        tags.push(line[0]);
        rows.push(row);
    }
    (tags, rows)
}

/// Unpack MSB-first samples of `bits` width.
pub fn unpack(row: &[u8], bits: u8, count: usize) -> Vec<u8> {
    let per_byte = 8 / bits as usize;
    let mask = ((1u16 << bits) - 1) as u8;
    (0..count)
        .map(|i| {
            let byte = row[i / per_byte];
            let shift = 8 - bits as usize * (i % per_byte + 1);
            (byte >> shift) & mask
        })
        .collect()
}

/// Decoded still image: header info and raw bytes, no transformations.
pub struct Decoded {
    pub width: u32,
    pub height: u32,
    pub color_type: ::png::ColorType,
    pub bit_depth: ::png::BitDepth,
    pub line_size: usize,
    pub data: Vec<u8>,
}

/// Decode the first frame with the `png` crate, keeping the stored layout.
pub fn decode_png(bytes: &[u8]) -> Decoded {
    let mut decoder = ::png::Decoder::new(bytes);
    decoder.set_transformations(::png::Transformations::IDENTITY);
    let mut reader = decoder.read_info().expect("read png header");
    let mut data = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut data).expect("decode png frame");
    data.truncate(info.buffer_size());
    Decoded {
        width: info.width,
        height: info.height,
        color_type: info.color_type,
        bit_depth: info.bit_depth,
        line_size: info.line_size,
        data,
    }
}

/// Decode every frame of an animated stream, returning raw frame bytes.
pub fn decode_frames(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut decoder = ::png::Decoder::new(bytes);
    decoder.set_transformations(::png::Transformations::IDENTITY);
    let mut reader = decoder.read_info().expect("read png header");
    let frame_count = reader
        .info()
        .animation_control
        .map(|actl| actl.num_frames)
        .unwrap_or(1);
    let mut frames = Vec::new();
    for _ in 0..frame_count {
        let mut data = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut data).expect("decode apng frame");
        data.truncate(info.buffer_size());
        frames.push(data);
    }
    frames
}

/// Deterministic noisy bytes.
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = vec![0u8; len];
    rng.fill(out.as_mut_slice());
    out
}

/// Horizontal RGB gradient.
pub fn gradient_rgb(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = ((x * 255) / width.max(1)) as u8;
            let g = ((y * 255) / height.max(1)) as u8;
            let b = (((x + y) * 127) / (width + height)) as u8;
            pixels.extend_from_slice(&[r, g, b]);
        }
    }
    pixels
}
