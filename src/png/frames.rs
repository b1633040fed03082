//! Frame sequencing for still and animated output.
//!
//! A compressed frame is split into bounded blocks and written as IDAT
//! chunks (the root frame) or fdAT chunks (every later frame). Animated
//! streams number every fcTL and fdAT chunk from one running counter; root
//! IDAT chunks take no number.

use std::io::Write;

use log::trace;

use crate::error::Result;
use crate::metadata::{BlendOp, DisposeOp, FrameMetadata};
use crate::png::chunk::{ChunkType, ChunkWriter, FixedChunk};

/// Largest IDAT payload written.
pub const MAX_IDAT_BLOCK: usize = 65535;

/// Largest fdAT data block, leaving room for the sequence number.
pub const MAX_FDAT_BLOCK: usize = MAX_IDAT_BLOCK - 4;

/// acTL payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationControl {
    /// Number of frames, root included.
    pub frame_count: u32,
    /// Times to play the animation; 0 loops forever.
    pub play_count: u32,
}

impl FixedChunk for AnimationControl {
    const CHUNK_TYPE: ChunkType = ChunkType::ACTL;
    const LEN: usize = 8;

    fn encode(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.frame_count.to_be_bytes());
        buf[4..8].copy_from_slice(&self.play_count.to_be_bytes());
    }
}

/// fcTL payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControl {
    /// Position in the chunk sequence.
    pub sequence_number: u32,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Horizontal offset inside the canvas.
    pub x_offset: u32,
    /// Vertical offset inside the canvas.
    pub y_offset: u32,
    /// Delay numerator.
    pub delay_numerator: u16,
    /// Delay denominator.
    pub delay_denominator: u16,
    /// Dispose operation.
    pub dispose: DisposeOp,
    /// Blend operation.
    pub blend: BlendOp,
}

impl FrameControl {
    /// Frame control for a `width` x `height` frame; the sequence number is
    /// assigned when the chunk is written.
    pub fn new(width: u32, height: u32, metadata: &FrameMetadata) -> Self {
        Self {
            sequence_number: 0,
            width,
            height,
            x_offset: metadata.x_offset,
            y_offset: metadata.y_offset,
            delay_numerator: metadata.delay_numerator,
            delay_denominator: metadata.delay_denominator,
            dispose: metadata.dispose,
            blend: metadata.blend,
        }
    }
}

impl FixedChunk for FrameControl {
    const CHUNK_TYPE: ChunkType = ChunkType::FCTL;
    const LEN: usize = 26;

    fn encode(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.sequence_number.to_be_bytes());
        buf[4..8].copy_from_slice(&self.width.to_be_bytes());
        buf[8..12].copy_from_slice(&self.height.to_be_bytes());
        buf[12..16].copy_from_slice(&self.x_offset.to_be_bytes());
        buf[16..20].copy_from_slice(&self.y_offset.to_be_bytes());
        buf[20..22].copy_from_slice(&self.delay_numerator.to_be_bytes());
        buf[22..24].copy_from_slice(&self.delay_denominator.to_be_bytes());
        buf[24] = self.dispose as u8;
        buf[25] = self.blend as u8;
    }
}

/// Assigns sequence numbers and splits compressed frames into chunks.
#[derive(Debug, Default)]
pub struct FrameSequencer {
    next_sequence: u32,
}

impl FrameSequencer {
    /// A sequencer starting at sequence number 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next fcTL or fdAT chunk will carry.
    pub fn next_sequence_number(&self) -> u32 {
        self.next_sequence
    }

    /// Write `control` with the next sequence number; returns that number.
    pub fn write_frame_control<W: Write>(
        &mut self,
        writer: &mut ChunkWriter<W>,
        mut control: FrameControl,
    ) -> Result<u32> {
        control.sequence_number = self.next_sequence;
        writer.write_fixed(&control)?;
        self.next_sequence += 1;
        Ok(control.sequence_number)
    }

    /// Write the root frame's compressed data as IDAT chunks.
    ///
    /// Returns the number of chunks written.
    pub fn write_image_data<W: Write>(
        &mut self,
        writer: &mut ChunkWriter<W>,
        compressed: &[u8],
    ) -> Result<usize> {
        let mut count = 0;
        for block in compressed.chunks(MAX_IDAT_BLOCK) {
            writer.write_chunk(ChunkType::IDAT, block)?;
            count += 1;
        }
        trace!("png: root frame in {} IDAT chunks", count);
        Ok(count)
    }

    /// Write a later frame's compressed data as numbered fdAT chunks.
    ///
    /// Returns the number of chunks written.
    pub fn write_frame_data<W: Write>(
        &mut self,
        writer: &mut ChunkWriter<W>,
        compressed: &[u8],
    ) -> Result<usize> {
        let mut count = 0;
        for block in compressed.chunks(MAX_FDAT_BLOCK) {
            writer.write_sequenced_chunk(ChunkType::FDAT, self.next_sequence, block)?;
            self.next_sequence += 1;
            count += 1;
        }
        trace!("png: frame in {} fdAT chunks", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_types(bytes: &[u8]) -> Vec<(String, usize)> {
        let mut out = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let len = u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
            let ty = String::from_utf8_lossy(&bytes[pos + 4..pos + 8]).into_owned();
            out.push((ty, len));
            pos += 12 + len;
        }
        out
    }

    #[test]
    fn test_frame_control_layout() {
        let control = FrameControl {
            sequence_number: 1,
            width: 2,
            height: 3,
            x_offset: 4,
            y_offset: 5,
            delay_numerator: 6,
            delay_denominator: 7,
            dispose: DisposeOp::Previous,
            blend: BlendOp::Over,
        };
        let mut buf = [0u8; FrameControl::LEN];
        control.encode(&mut buf);
        assert_eq!(
            buf,
            [0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0, 5, 0, 6, 0, 7, 2, 1]
        );
    }

    #[test]
    fn test_idat_split() {
        let mut writer = ChunkWriter::new(Vec::new());
        let mut sequencer = FrameSequencer::new();
        let data = vec![0u8; MAX_IDAT_BLOCK * 2 + 10];
        let count = sequencer.write_image_data(&mut writer, &data).unwrap();
        assert_eq!(count, 3);
        assert_eq!(sequencer.next_sequence_number(), 0);
        let chunks = chunk_types(&writer.into_inner().unwrap());
        assert_eq!(
            chunks,
            vec![
                ("IDAT".to_string(), MAX_IDAT_BLOCK),
                ("IDAT".to_string(), MAX_IDAT_BLOCK),
                ("IDAT".to_string(), 10),
            ]
        );
    }

    #[test]
    fn test_sequence_numbers_continue_across_frames() {
        let mut writer = ChunkWriter::new(Vec::new());
        let mut sequencer = FrameSequencer::new();
        let meta = FrameMetadata::default();

        let first = sequencer
            .write_frame_control(&mut writer, FrameControl::new(1, 1, &meta))
            .unwrap();
        sequencer.write_image_data(&mut writer, &[1, 2, 3]).unwrap();
        let second = sequencer
            .write_frame_control(&mut writer, FrameControl::new(1, 1, &meta))
            .unwrap();
        let data_chunks = sequencer
            .write_frame_data(&mut writer, &vec![0u8; MAX_FDAT_BLOCK + 1])
            .unwrap();
        let third = sequencer
            .write_frame_control(&mut writer, FrameControl::new(1, 1, &meta))
            .unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(data_chunks, 2);
        assert_eq!(third, second + 1 + data_chunks as u32);

        let chunks = chunk_types(&writer.into_inner().unwrap());
        let types: Vec<&str> = chunks.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(types, vec!["fcTL", "IDAT", "fcTL", "fdAT", "fdAT", "fcTL"]);
        assert_eq!(chunks[3].1, MAX_IDAT_BLOCK);
        assert_eq!(chunks[4].1, 5);
    }
}
