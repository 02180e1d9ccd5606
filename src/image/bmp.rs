// src/image/bmp.rs

//! Reading and writing uncompressed 8-bit grayscale BMP files.
//!
//! Only the WinBMPv3 layout (40-byte `BITMAPINFOHEADER`, or a larger header
//! whose first 40 bytes share that layout) with `BI_RGB` storage is
//! accepted. The palette is ignored on read: pixel indices are taken as
//! gray levels. On write an identity gray palette is emitted so other
//! viewers show the same image.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::image::raw_image::RawImage;
use crate::utils::error::{BarchError, Result};

const BMP_MAGIC: u16 = 0x4D42; // "BM"
const FILE_HEADER_LEN: u32 = 14;
const INFO_HEADER_LEN: u32 = 40;
const BI_RGB: u32 = 0;
const PALETTE_ENTRIES: usize = 256;
/// ~72 DPI
const PELS_PER_METER: i32 = 2835;

/// Bytes per stored row: rows are padded to a multiple of 4.
fn stride(width: u32) -> usize {
    (width as usize).div_ceil(4) * 4
}

fn eof_as_format(what: &'static str) -> impl Fn(std::io::Error) -> BarchError {
    move |e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            BarchError::format(format!("BMP: {}", what))
        } else {
            BarchError::from(e)
        }
    }
}

/// Loads an 8-bit grayscale BMP from disk.
pub fn load_gray_bmp<P: AsRef<Path>>(path: P) -> Result<RawImage> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| BarchError::io_at(e, path))?;
    decode_gray_bmp(&bytes)
}

/// Parses an 8-bit grayscale BMP held in memory.
pub fn decode_gray_bmp(bytes: &[u8]) -> Result<RawImage> {
    let mut cur = Cursor::new(bytes);
    let header_err = eof_as_format("header read failed");

    let bf_type = cur.read_u16::<LittleEndian>().map_err(&header_err)?;
    let _bf_size = cur.read_u32::<LittleEndian>().map_err(&header_err)?;
    let _reserved = cur.read_u32::<LittleEndian>().map_err(&header_err)?;
    let bf_off_bits = cur.read_u32::<LittleEndian>().map_err(&header_err)?;

    let bi_size = cur.read_u32::<LittleEndian>().map_err(&header_err)?;
    let bi_width = cur.read_i32::<LittleEndian>().map_err(&header_err)?;
    let bi_height = cur.read_i32::<LittleEndian>().map_err(&header_err)?;
    let _bi_planes = cur.read_u16::<LittleEndian>().map_err(&header_err)?;
    let bi_bit_count = cur.read_u16::<LittleEndian>().map_err(&header_err)?;
    let bi_compression = cur.read_u32::<LittleEndian>().map_err(&header_err)?;

    if bf_type != BMP_MAGIC {
        return Err(BarchError::format("BMP: not a BMP file"));
    }
    if bi_size < INFO_HEADER_LEN {
        return Err(BarchError::format(format!(
            "BMP: unsupported info header size {}",
            bi_size
        )));
    }
    if bi_bit_count != 8 {
        return Err(BarchError::format(format!(
            "BMP: need 8-bit BMP, got {} bits per pixel",
            bi_bit_count
        )));
    }
    if bi_compression != BI_RGB {
        return Err(BarchError::format("BMP: compressed BMP not supported"));
    }
    if bi_width <= 0 || bi_height == 0 {
        return Err(BarchError::format(format!(
            "BMP: invalid dimensions {}x{}",
            bi_width, bi_height
        )));
    }

    let width = bi_width as u32;
    let height = bi_height.unsigned_abs();
    let bottom_up = bi_height > 0;
    let row_size = stride(width);

    // the last row may omit its padding
    let needed = (row_size as u64)
        .checked_mul(height as u64 - 1)
        .and_then(|n| n.checked_add(bf_off_bits as u64 + width as u64))
        .ok_or_else(|| BarchError::format("BMP: invalid dimensions"))?;
    if needed > bytes.len() as u64 {
        return Err(BarchError::format(format!(
            "BMP: pixel read failed: {}x{} needs {} bytes, file has {}",
            width,
            height,
            needed,
            bytes.len()
        )));
    }

    cur.seek(SeekFrom::Start(bf_off_bits as u64))?;

    let mut img = RawImage::from_pixel(width, height, 0);
    let mut padding = vec![0u8; row_size - width as usize];
    let pixel_err = eof_as_format("pixel read failed");
    for y in 0..height {
        let dst = if bottom_up { height - 1 - y } else { y };
        cur.read_exact(img.row_mut(dst)).map_err(&pixel_err)?;
        // the last row may legitimately omit its padding
        if y + 1 < height {
            cur.read_exact(&mut padding).map_err(&pixel_err)?;
        }
    }
    Ok(img)
}

/// Serializes an image as a bottom-up 8-bit BMP with a gray palette.
pub fn encode_gray_bmp(img: &RawImage) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    if img.is_empty() {
        return Err(BarchError::invalid_input(format!(
            "BMP: invalid image {}x{}",
            width, height
        )));
    }
    if width > i32::MAX as u32 || height > i32::MAX as u32 {
        return Err(BarchError::invalid_input("BMP: image too large"));
    }

    let row_size = stride(width);
    let palette_len = (PALETTE_ENTRIES * 4) as u32;
    let pixel_array_len = u32::try_from(row_size as u64 * height as u64)
        .map_err(|_| BarchError::invalid_input("BMP: image too large"))?;
    let off_bits = FILE_HEADER_LEN + INFO_HEADER_LEN + palette_len;
    let file_len = off_bits
        .checked_add(pixel_array_len)
        .ok_or_else(|| BarchError::invalid_input("BMP: image too large"))?;

    let mut out = Vec::with_capacity(file_len as usize);
    out.write_u16::<LittleEndian>(BMP_MAGIC)?;
    out.write_u32::<LittleEndian>(file_len)?;
    out.write_u32::<LittleEndian>(0)?;
    out.write_u32::<LittleEndian>(off_bits)?;

    out.write_u32::<LittleEndian>(INFO_HEADER_LEN)?;
    out.write_i32::<LittleEndian>(width as i32)?;
    out.write_i32::<LittleEndian>(height as i32)?; // positive: bottom-up
    out.write_u16::<LittleEndian>(1)?;
    out.write_u16::<LittleEndian>(8)?;
    out.write_u32::<LittleEndian>(BI_RGB)?;
    out.write_u32::<LittleEndian>(pixel_array_len)?;
    out.write_i32::<LittleEndian>(PELS_PER_METER)?;
    out.write_i32::<LittleEndian>(PELS_PER_METER)?;
    out.write_u32::<LittleEndian>(PALETTE_ENTRIES as u32)?;
    out.write_u32::<LittleEndian>(PALETTE_ENTRIES as u32)?;

    // BGR0 entries
    let palette: Vec<[u8; 4]> = (0..=255u8).map(|i| [i, i, i, 0]).collect();
    out.write_all(bytemuck::cast_slice(&palette))?;

    let padding = vec![0u8; row_size - width as usize];
    for y in (0..height).rev() {
        out.write_all(img.row(y))?;
        out.write_all(&padding)?;
    }
    Ok(out)
}

/// Writes an image to disk as an 8-bit grayscale BMP.
pub fn write_gray_bmp<P: AsRef<Path>>(path: P, img: &RawImage) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_gray_bmp(img)?;
    let mut f = fs::File::create(path).map_err(|e| BarchError::io_at(e, path))?;
    f.write_all(&bytes).map_err(|e| BarchError::io_at(e, path))?;
    Ok(())
}
