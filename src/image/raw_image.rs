// src/image/raw_image.rs

//! In-memory representation of an 8-bit single-channel raster.
//!
//! `RawImage` owns its pixel buffer; dropping it is the only way the buffer
//! is released, so there is no separate free call anywhere in the crate.

use crate::utils::error::{BarchError, Result};

/// Sample value of a white pixel.
pub const WHITE: u8 = 0xFF;
/// Sample value of a black pixel.
pub const BLACK: u8 = 0x00;

/// A row-major, top-to-bottom grayscale image with one byte per pixel.
///
/// Invariant: `data.len() == width * height`, no padding between rows.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RawImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RawImage {
    /// Creates a new image with the given dimensions, initialized to white.
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_pixel(width, height, WHITE)
    }

    /// Creates an image filled with a single sample value.
    pub fn from_pixel(width: u32, height: u32, value: u8) -> Self {
        RawImage {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Wraps an existing row-major buffer.
    ///
    /// Fails with `InvalidInput` when the buffer length is not `width * height`.
    pub fn from_vec(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = pixel_count(width, height)?;
        if data.len() != expected {
            return Err(BarchError::invalid_input(format!(
                "pixel buffer holds {} bytes, {}x{} needs {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(RawImage {
            width,
            height,
            data,
        })
    }

    /// Creates an image by calling a function for each pixel.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> u8,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        RawImage {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the dimensions as a tuple (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> u8 {
        assert!(x < self.width && y < self.height);
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, value: u8) {
        assert!(x < self.width && y < self.height);
        self.data[y as usize * self.width as usize + x as usize] = value;
    }

    /// One row of samples.
    pub fn row(&self, y: u32) -> &[u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.data[start..start + w]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &mut self.data[start..start + w]
    }

    /// Iterates rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.width.max(1) as usize)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

/// `width * height` as a `usize`, or `InvalidInput` if it overflows.
pub(crate) fn pixel_count(width: u32, height: u32) -> Result<usize> {
    (width as usize).checked_mul(height as usize).ok_or_else(|| {
        BarchError::invalid_input(format!("image dimensions {}x{} are too large", width, height))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_checks_length() {
        assert!(RawImage::from_vec(2, 2, vec![0; 4]).is_ok());
        let err = RawImage::from_vec(2, 2, vec![0; 3]).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn rows_are_row_major() {
        let img = RawImage::from_fn(3, 2, |x, y| (y * 10 + x) as u8);
        let rows: Vec<&[u8]> = img.rows().collect();
        assert_eq!(rows, vec![&[0u8, 1, 2][..], &[10u8, 11, 12][..]]);
        assert_eq!(img.row(1), &[10, 11, 12]);
        assert_eq!(img.get_pixel(2, 1), 12);
    }

    #[test]
    fn new_is_white() {
        let img = RawImage::new(4, 4);
        assert!(img.pixels().iter().all(|&p| p == WHITE));
        assert_eq!(img.dimensions(), (4, 4));
    }

    #[test]
    fn put_pixel_writes_through() {
        let mut img = RawImage::new(2, 2);
        img.put_pixel(1, 1, BLACK);
        img.row_mut(0)[0] = 7;
        assert_eq!(img.into_raw(), vec![7, WHITE, WHITE, BLACK]);
    }
}
