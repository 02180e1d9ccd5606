//! Row emptiness index.
//!
//! One bit per image row, set when every pixel of the row is white. Bits are
//! packed LSB-first: row `y` lives in byte `y / 8` at bit `y % 8`.

use bitvec::order::Lsb0;
use bitvec::prelude::*;

use crate::image::raw_image::{RawImage, WHITE};
use crate::utils::error::{BarchError, Result};

/// `true` when the row contains nothing but white samples.
#[inline]
pub fn is_row_empty(row: &[u8]) -> bool {
    row.iter().all(|&p| p == WHITE)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIndex {
    bits: BitVec<u8, Lsb0>,
}

impl RowIndex {
    /// Number of bytes the packed index occupies for `height` rows.
    pub fn byte_len_for(height: u32) -> usize {
        (height as usize).div_ceil(8)
    }

    /// Classifies every row of `image`.
    pub fn build(image: &RawImage) -> Self {
        let mut bits = BitVec::with_capacity(image.height() as usize);
        bits.extend(image.rows().map(is_row_empty));
        RowIndex { bits }
    }

    /// Parses a packed index for `height` rows. Bits past `height` in the
    /// last byte are ignored.
    pub fn from_bytes(bytes: &[u8], height: u32) -> Result<Self> {
        let expected = Self::byte_len_for(height);
        if bytes.len() != expected {
            return Err(BarchError::format(format!(
                "row index is {} bytes, {} rows need {}",
                bytes.len(),
                height,
                expected
            )));
        }
        let mut bits = BitVec::<u8, Lsb0>::from_slice(bytes);
        bits.truncate(height as usize);
        Ok(RowIndex { bits })
    }

    /// Number of rows covered.
    pub fn rows(&self) -> usize {
        self.bits.len()
    }

    /// Whether row `y` is entirely white. Rows outside the index are not.
    #[inline]
    pub fn is_empty_row(&self, y: usize) -> bool {
        self.bits.get(y).map(|b| *b).unwrap_or(false)
    }

    pub fn empty_row_count(&self) -> usize {
        self.bits.count_ones()
    }

    /// The packed bytes, with unused high bits of the last byte cleared.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.bits.set_uninitialized(false);
        self.bits.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::raw_image::BLACK;

    #[test]
    fn row_emptiness() {
        assert!(is_row_empty(&[255, 255, 255]));
        assert!(!is_row_empty(&[255, 254, 255]));
        assert!(is_row_empty(&[]));
    }

    #[test]
    fn packs_lsb_first() {
        // rows 0, 2 and 9 are white
        let img = RawImage::from_fn(3, 10, |_, y| if y == 0 || y == 2 || y == 9 { WHITE } else { BLACK });
        let index = RowIndex::build(&img);
        assert_eq!(index.rows(), 10);
        assert_eq!(index.empty_row_count(), 3);
        assert!(index.is_empty_row(9));
        assert!(!index.is_empty_row(1));
        assert_eq!(index.into_bytes(), vec![0b0000_0101, 0b0000_0010]);
    }

    #[test]
    fn all_white_sets_every_bit() {
        let index = RowIndex::build(&RawImage::new(4, 4));
        assert_eq!(index.into_bytes(), vec![0b0000_1111]);
    }

    #[test]
    fn from_bytes_validates_length() {
        assert!(RowIndex::from_bytes(&[0xFF], 8).is_ok());
        assert!(RowIndex::from_bytes(&[0xFF], 9).unwrap_err().is_format());
        assert!(RowIndex::from_bytes(&[0xFF, 0], 8).unwrap_err().is_format());
    }

    #[test]
    fn from_bytes_ignores_bits_past_height() {
        let index = RowIndex::from_bytes(&[0xFF], 3).unwrap();
        assert_eq!(index.rows(), 3);
        assert_eq!(index.empty_row_count(), 3);
        assert!(!index.is_empty_row(5));
    }

    #[test]
    fn byte_len_is_ceil_of_rows() {
        assert_eq!(RowIndex::byte_len_for(0), 0);
        assert_eq!(RowIndex::byte_len_for(1), 1);
        assert_eq!(RowIndex::byte_len_for(8), 1);
        assert_eq!(RowIndex::byte_len_for(9), 2);
    }
}
