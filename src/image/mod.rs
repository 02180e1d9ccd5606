//! Raster images: the in-memory buffer and its BMP source/sink.

pub mod bmp;
pub mod raw_image;

pub use bmp::{decode_gray_bmp, encode_gray_bmp, load_gray_bmp, write_gray_bmp};
pub use raw_image::{RawImage, BLACK, WHITE};
