//! The BARCH image codec.
//!
//! ## Pipeline
//!
//! Encode: image → row index (`row_index`) → block coding of non-empty rows
//! (`block`, on top of `bits`) → container framing (`crate::format`).
//!
//! Decode runs the same stages backwards. Both directions are pure functions
//! over caller-owned buffers and may run concurrently on independent images.

pub mod bits;
pub mod block;
pub mod row_index;

use log::debug;

use crate::format::container::{frame, Container};
use crate::image::raw_image::{pixel_count, RawImage};
use crate::utils::error::{BarchError, Result};

pub use bits::{BitReader, BitWriter, BitstreamError};
pub use block::{Block, Tag, PIXELS_PER_BLOCK};
pub use row_index::RowIndex;

/// Compresses an image into a complete BARCH byte stream.
///
/// Fails with `InvalidInput` on a zero-sized image or a pixel buffer that
/// does not hold exactly `width * height` samples.
pub fn encode(image: &RawImage) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(BarchError::invalid_input(format!(
            "encode: invalid image dimensions {}x{}",
            width, height
        )));
    }
    if image.pixels().len() != pixel_count(width, height)? {
        return Err(BarchError::invalid_input(
            "encode: pixel buffer does not match dimensions",
        ));
    }

    let index = RowIndex::build(image);
    let bitstream = block::encode_rows(image.rows(), &index)?;
    debug!(
        "encode {}x{}: {} empty rows, {} bitstream bytes",
        width,
        height,
        index.empty_row_count(),
        bitstream.len()
    );
    frame(width, height, &index.into_bytes(), &bitstream)
}

/// Decompresses a BARCH byte stream.
///
/// The framing is fully validated before any row is decoded, and a failure
/// anywhere returns an error rather than a partially filled image.
pub fn decode(bytes: &[u8]) -> Result<RawImage> {
    let container = Container::parse(bytes)?;
    let header = container.header;
    let index = RowIndex::from_bytes(container.row_index, header.height)?;

    // reject before the output buffer is sized from the header
    let min_bits = block::min_bitstream_bits(&index, header.width);
    let have_bits = container.bitstream.len() as u64 * 8;
    if min_bits > have_bits {
        return Err(BarchError::format(format!(
            "Unexpected end of bitstream: {} rows of width {} need at least {} bits, got {}",
            index.rows() - index.empty_row_count(),
            header.width,
            min_bits,
            have_bits
        )));
    }

    let pixels = block::decode_rows(
        container.bitstream,
        &index,
        header.width as usize,
        header.height as usize,
    )?;
    debug!(
        "decode {}x{}: {} empty rows, {} bitstream bytes",
        header.width,
        header.height,
        index.empty_row_count(),
        container.bitstream.len()
    );
    RawImage::from_vec(header.width, header.height, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::schema::FormatSchema;

    const HDR: usize = FormatSchema::V1.header_len;

    #[test]
    fn all_white_has_empty_bitstream() {
        let bytes = encode(&RawImage::new(4, 4)).unwrap();
        assert_eq!(bytes.len(), HDR + 1);
        assert_eq!(&bytes[15..19], &[0, 0, 0, 0]);
        assert_eq!(bytes[HDR], 0x0F);
        assert_eq!(decode(&bytes).unwrap(), RawImage::new(4, 4));
    }

    #[test]
    fn all_black_row_is_two_black_tags() {
        let img = RawImage::from_pixel(8, 1, 0);
        let bytes = encode(&img).unwrap();
        assert_eq!(bytes[HDR], 0x00, "row is not empty");
        // 10 10 then zero padding
        assert_eq!(&bytes[HDR + 1..], &[0b1010_0000]);
        assert_eq!(decode(&bytes).unwrap(), img);
    }

    #[test]
    fn mixed_literal_row() {
        let img = RawImage::from_vec(4, 1, vec![0, 255, 10, 200]).unwrap();
        let bytes = encode(&img).unwrap();
        let bitstream = &bytes[HDR + 1..];
        assert_eq!(bitstream.len(), 5);

        let mut r = BitReader::new(bitstream);
        assert_eq!(r.get_bits(2).unwrap(), 0b11);
        let literal: Vec<u8> = (0..4).map(|_| r.get_byte().unwrap()).collect();
        assert_eq!(literal, vec![0, 255, 10, 200]);

        assert_eq!(decode(&bytes).unwrap(), img);
    }

    #[test]
    fn width_not_multiple_of_four() {
        let img = RawImage::from_vec(5, 1, vec![10, 20, 30, 40, 50]).unwrap();
        let decoded = decode(&encode(&img).unwrap()).unwrap();
        assert_eq!(decoded.pixels().len(), 5);
        assert_eq!(decoded, img);
    }

    #[test]
    fn zero_sized_images_are_rejected() {
        assert!(encode(&RawImage::new(0, 3)).unwrap_err().is_invalid_input());
        assert!(encode(&RawImage::new(3, 0)).unwrap_err().is_invalid_input());
    }

    #[test]
    fn short_bitstream_fails_with_format_error() {
        let img = RawImage::from_pixel(8, 2, 7);
        let mut bytes = encode(&img).unwrap();
        // declare and supply one byte less of bitstream
        bytes.pop();
        let len = u32::from_le_bytes(bytes[15..19].try_into().unwrap()) - 1;
        bytes[15..19].copy_from_slice(&len.to_le_bytes());
        let err = decode(&bytes).unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("end of bitstream"));
    }
}
