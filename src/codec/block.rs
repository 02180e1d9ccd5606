//! Block coding of non-empty rows.
//!
//! A row is cut into groups of [`PIXELS_PER_BLOCK`] pixels. Each group becomes
//! one of three blocks, written as a prefix code:
//!
//! | block   | code | payload            |
//! |---------|------|--------------------|
//! | White   | `0`  | none               |
//! | Black   | `10` | none               |
//! | Literal | `11` | 4 raw sample bytes |
//!
//! A short final group is padded with white before classification. The
//! decoder never writes padding back: it copies only as many samples as the
//! row still needs.

use crate::codec::bits::{BitReader, BitWriter, BitstreamError};
use crate::codec::row_index::RowIndex;
use crate::image::raw_image::{BLACK, WHITE};

pub const PIXELS_PER_BLOCK: usize = 4;

const PAD_PIXEL: u8 = WHITE;

/// The block classes and their bit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    White,
    Black,
    Literal,
}

impl Tag {
    /// `(code, length in bits)`.
    pub const fn code(self) -> (u32, u32) {
        match self {
            Tag::White => (0b0, 1),
            Tag::Black => (0b10, 2),
            Tag::Literal => (0b11, 2),
        }
    }

    pub fn write(self, w: &mut BitWriter) -> Result<(), BitstreamError> {
        let (value, len) = self.code();
        w.put_bits(value, len)
    }

    /// Reads one tag. The code is a complete prefix code, so every bit
    /// sequence maps to a tag; the only failure is running out of data.
    pub fn read(r: &mut BitReader<'_>) -> Result<Tag, BitstreamError> {
        if !r.get_bit()? {
            return Ok(Tag::White);
        }
        Ok(if r.get_bit()? { Tag::Literal } else { Tag::Black })
    }
}

/// One coded group of pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    White,
    Black,
    Literal([u8; PIXELS_PER_BLOCK]),
}

impl Block {
    /// Greedy classification of a full (already padded) group.
    pub fn classify(group: [u8; PIXELS_PER_BLOCK]) -> Block {
        if group.iter().all(|&p| p == WHITE) {
            Block::White
        } else if group.iter().all(|&p| p == BLACK) {
            Block::Black
        } else {
            Block::Literal(group)
        }
    }

    pub fn tag(&self) -> Tag {
        match self {
            Block::White => Tag::White,
            Block::Black => Tag::Black,
            Block::Literal(_) => Tag::Literal,
        }
    }

    pub fn write(&self, w: &mut BitWriter) -> Result<(), BitstreamError> {
        self.tag().write(w)?;
        if let Block::Literal(px) = self {
            for &p in px {
                w.put_byte(p);
            }
        }
        Ok(())
    }

    /// Reads a tag and, for literals, always the full 4-byte payload.
    pub fn read(r: &mut BitReader<'_>) -> Result<Block, BitstreamError> {
        Ok(match Tag::read(r)? {
            Tag::White => Block::White,
            Tag::Black => Block::Black,
            Tag::Literal => {
                let mut px = [0u8; PIXELS_PER_BLOCK];
                for p in px.iter_mut() {
                    *p = r.get_byte()?;
                }
                Block::Literal(px)
            }
        })
    }

    /// Writes the first `out.len()` samples of this block.
    fn fill(&self, out: &mut [u8]) {
        match self {
            Block::White => out.fill(WHITE),
            Block::Black => out.fill(BLACK),
            Block::Literal(px) => out.copy_from_slice(&px[..out.len()]),
        }
    }
}

/// Splits a row into padded groups and classifies each one.
pub fn row_blocks(row: &[u8]) -> impl Iterator<Item = Block> + '_ {
    row.chunks(PIXELS_PER_BLOCK).map(|chunk| {
        let mut group = [PAD_PIXEL; PIXELS_PER_BLOCK];
        group[..chunk.len()].copy_from_slice(chunk);
        Block::classify(group)
    })
}

pub fn encode_row(row: &[u8], w: &mut BitWriter) -> Result<(), BitstreamError> {
    for block in row_blocks(row) {
        block.write(w)?;
    }
    Ok(())
}

/// Encodes every row not flagged empty in `index`; empty rows cost nothing.
pub fn encode_rows<'a, I>(rows: I, index: &RowIndex) -> Result<Vec<u8>, BitstreamError>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut w = BitWriter::new();
    for (y, row) in rows.into_iter().enumerate() {
        if index.is_empty_row(y) {
            continue;
        }
        encode_row(row, &mut w)?;
    }
    Ok(w.finish())
}

/// Fills one non-empty row from the bitstream.
pub fn decode_row(r: &mut BitReader<'_>, row: &mut [u8]) -> Result<(), BitstreamError> {
    let mut written = 0;
    while written < row.len() {
        let n = PIXELS_PER_BLOCK.min(row.len() - written);
        Block::read(r)?.fill(&mut row[written..written + n]);
        written += n;
    }
    Ok(())
}

/// Fewest bits that can encode every non-empty row: one White tag per group.
pub fn min_bitstream_bits(index: &RowIndex, width: u32) -> u64 {
    let coded_rows = (index.rows() - index.empty_row_count()) as u64;
    coded_rows * (width as u64).div_ceil(PIXELS_PER_BLOCK as u64)
}

/// Rebuilds a `width * height` buffer from the row index and bitstream.
///
/// Rows flagged empty are filled with white and consume no bits; every
/// other row is decoded from the bitstream.
pub fn decode_rows(
    bitstream: &[u8],
    index: &RowIndex,
    width: usize,
    height: usize,
) -> Result<Vec<u8>, BitstreamError> {
    let mut out = vec![WHITE; width * height];
    let mut r = BitReader::new(bitstream);
    if width == 0 {
        return Ok(out);
    }
    for (y, row) in out.chunks_exact_mut(width).enumerate() {
        if index.is_empty_row(y) {
            // already white
            continue;
        }
        decode_row(&mut r, row)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::raw_image::RawImage;

    fn bits_of(bytes: &[u8], n: usize) -> String {
        let mut r = BitReader::new(bytes);
        (0..n)
            .map(|_| if r.get_bit().unwrap() { '1' } else { '0' })
            .collect()
    }

    #[test]
    fn classification_is_exhaustive() {
        assert_eq!(Block::classify([255; 4]), Block::White);
        assert_eq!(Block::classify([0; 4]), Block::Black);
        assert_eq!(
            Block::classify([0, 0, 0, 255]),
            Block::Literal([0, 0, 0, 255])
        );
        assert_eq!(
            Block::classify([128; 4]),
            Block::Literal([128; 4])
        );
    }

    #[test]
    fn tag_codes() {
        assert_eq!(Tag::White.code(), (0, 1));
        assert_eq!(Tag::Black.code(), (0b10, 2));
        assert_eq!(Tag::Literal.code(), (0b11, 2));
    }

    #[test]
    fn short_final_group_pads_with_white() {
        let blocks: Vec<Block> = row_blocks(&[0, 0, 0, 0, 0, 0]).collect();
        assert_eq!(
            blocks,
            vec![Block::Black, Block::Literal([0, 0, 255, 255])]
        );
        // a trailing white remainder stays a White block
        let blocks: Vec<Block> = row_blocks(&[0, 0, 0, 0, 255]).collect();
        assert_eq!(blocks, vec![Block::Black, Block::White]);
    }

    #[test]
    fn literal_row_layout() {
        let mut w = BitWriter::new();
        encode_row(&[0, 255, 10, 200], &mut w).unwrap();
        assert_eq!(w.bit_len(), 2 + 32);
        let bytes = w.finish();
        assert_eq!(&bits_of(&bytes, 2), "11");
        let mut r = BitReader::new(&bytes);
        r.get_bits(2).unwrap();
        let payload: Vec<u8> = (0..4).map(|_| r.get_byte().unwrap()).collect();
        assert_eq!(payload, vec![0, 255, 10, 200]);
    }

    #[test]
    fn mixed_tags_are_packed_back_to_back() {
        // White, Black, Black: 0 10 10
        let mut w = BitWriter::new();
        encode_row(&[255, 255, 255, 255, 0, 0, 0, 0, 0, 0, 0, 0], &mut w).unwrap();
        assert_eq!(w.finish(), vec![0b0101_0000]);
    }

    #[test]
    fn decode_row_copies_only_needed_samples() {
        let mut w = BitWriter::new();
        encode_row(&[1, 2, 3, 4, 5], &mut w).unwrap();
        let bytes = w.finish();

        let mut row = [0u8; 5];
        decode_row(&mut BitReader::new(&bytes), &mut row).unwrap();
        assert_eq!(row, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn empty_rows_consume_no_bits() {
        let img = RawImage::from_fn(4, 3, |_, y| if y == 1 { 0 } else { 255 });
        let index = RowIndex::build(&img);
        let bits = encode_rows(img.rows(), &index).unwrap();
        // one Black tag for the single non-empty row
        assert_eq!(bits, vec![0b1000_0000]);

        let out = decode_rows(&bits, &index, 4, 3).unwrap();
        assert_eq!(out, img.pixels());
    }

    // Regression: the empty-row fast-fill must not skip tag decoding for
    // rows that are not empty.
    #[test]
    fn non_empty_rows_are_decoded_from_bitstream() {
        let img = RawImage::from_fn(4, 2, |x, _| x as u8 * 60);
        let index = RowIndex::build(&img);
        assert_eq!(index.empty_row_count(), 0);
        let bits = encode_rows(img.rows(), &index).unwrap();
        let out = decode_rows(&bits, &index, 4, 2).unwrap();
        assert_eq!(out, img.pixels());
        assert!(out.iter().any(|&p| p != WHITE));
    }

    #[test]
    fn min_bits_counts_only_coded_rows() {
        let img = RawImage::from_fn(9, 4, |_, y| if y % 2 == 0 { 255 } else { 0 });
        let index = RowIndex::build(&img);
        // 2 coded rows of 3 groups
        assert_eq!(min_bitstream_bits(&index, 9), 6);
        assert_eq!(min_bitstream_bits(&RowIndex::build(&RawImage::new(9, 4)), 9), 0);
        let bits = encode_rows(img.rows(), &index).unwrap();
        assert!(bits.len() as u64 * 8 >= min_bitstream_bits(&index, 9));
    }

    #[test]
    fn truncated_literal_fails() {
        let mut w = BitWriter::new();
        encode_row(&[9, 9, 9, 9], &mut w).unwrap();
        let mut bytes = w.finish();
        bytes.pop();

        let index = RowIndex::from_bytes(&[0], 1).unwrap();
        let err = decode_rows(&bytes, &index, 4, 1).unwrap_err();
        assert!(matches!(err, BitstreamError::OutOfData { .. }));
    }
}
