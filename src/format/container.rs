// src/format/container.rs

//! Framing of the BARCH file: a fixed header followed by the row index and
//! the block bitstream, with no padding between sections.
//!
//! ```text
//! 0   'B' 'A'
//! 2   version
//! 3   width              u32 LE
//! 7   height             u32 LE
//! 11  row index length   u32 LE  (= ceil(height / 8))
//! 15  bitstream length   u32 LE
//! 19  row index bytes, then bitstream bytes
//! ```

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use log::warn;
use std::io::Write;

use crate::codec::row_index::RowIndex;
use crate::format::schema::FormatSchema;
use crate::image::raw_image::pixel_count;
use crate::utils::error::{BarchError, Result};

/// Parsed fixed-size header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub width: u32,
    pub height: u32,
    pub row_index_len: u32,
    pub bitstream_len: u32,
}

impl Header {
    /// Header for a new file in the current format version.
    pub fn new(width: u32, height: u32, row_index_len: u32, bitstream_len: u32) -> Self {
        Header {
            version: FormatSchema::CURRENT.version,
            width,
            height,
            row_index_len,
            bitstream_len,
        }
    }

    /// Length of the whole file this header describes.
    pub fn total_len(&self) -> u64 {
        FormatSchema::CURRENT.header_len as u64
            + self.row_index_len as u64
            + self.bitstream_len as u64
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let schema = FormatSchema::for_version(self.version).ok_or_else(|| {
            BarchError::invalid_input(format!("cannot write format version {}", self.version))
        })?;
        w.write_all(&schema.magic)?;
        w.write_u8(schema.version)?;
        w.write_u32::<LittleEndian>(self.width)?;
        w.write_u32::<LittleEndian>(self.height)?;
        w.write_u32::<LittleEndian>(self.row_index_len)?;
        w.write_u32::<LittleEndian>(self.bitstream_len)?;
        Ok(())
    }

    /// Validates and parses the header at the start of `bytes`.
    ///
    /// Checks run in a fixed order: minimum length, magic, version. Section
    /// lengths are not checked here, see [`Container::parse`].
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let magic = FormatSchema::CURRENT.magic;
        let min_len = FormatSchema::CURRENT.header_len;
        if bytes.len() < min_len {
            return Err(BarchError::format(format!(
                "file too small: {} bytes, header alone is {}",
                bytes.len(),
                min_len
            )));
        }
        if bytes[..magic.len()] != magic {
            return Err(BarchError::format("bad magic"));
        }
        let schema = FormatSchema::for_version(bytes[FormatSchema::CURRENT.off_version])
            .ok_or_else(|| {
                BarchError::format(format!(
                    "unsupported version {}",
                    bytes[FormatSchema::CURRENT.off_version]
                ))
            })?;

        let field = |off: usize| LittleEndian::read_u32(&bytes[off..off + 4]);
        Ok(Header {
            version: schema.version,
            width: field(schema.off_width),
            height: field(schema.off_height),
            row_index_len: field(schema.off_row_index_len),
            bitstream_len: field(schema.off_bitstream_len),
        })
    }
}

/// A validated view over an encoded file.
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    pub header: Header,
    pub row_index: &'a [u8],
    pub bitstream: &'a [u8],
}

impl<'a> Container<'a> {
    /// Parses and validates the whole framing. Fails before any pixel data
    /// is interpreted.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let header = Header::parse(bytes)?;

        let need = header.total_len();
        if (bytes.len() as u64) < need {
            return Err(BarchError::format(format!(
                "truncated file: header declares {} bytes, got {}",
                need,
                bytes.len()
            )));
        }
        if (bytes.len() as u64) > need {
            warn!(
                "ignoring {} trailing bytes after BARCH payload",
                bytes.len() as u64 - need
            );
        }
        if header.width == 0 || header.height == 0 {
            return Err(BarchError::format(format!(
                "invalid dimensions {}x{}",
                header.width, header.height
            )));
        }
        let expected_index = RowIndex::byte_len_for(header.height);
        if header.row_index_len as usize != expected_index {
            return Err(BarchError::format(format!(
                "row index length {} does not match height {} (expected {})",
                header.row_index_len, header.height, expected_index
            )));
        }
        pixel_count(header.width, header.height)
            .map_err(|_| BarchError::format("image dimensions overflow"))?;

        let start = FormatSchema::CURRENT.header_len;
        let index_end = start + header.row_index_len as usize;
        let end = index_end + header.bitstream_len as usize;
        Ok(Container {
            header,
            row_index: &bytes[start..index_end],
            bitstream: &bytes[index_end..end],
        })
    }
}

/// Assembles header, row index and bitstream into one buffer.
pub fn frame(width: u32, height: u32, row_index: &[u8], bitstream: &[u8]) -> Result<Vec<u8>> {
    let section_len = |name: &str, len: usize| {
        u32::try_from(len)
            .map_err(|_| BarchError::invalid_input(format!("{} of {} bytes exceeds u32", name, len)))
    };
    let header = Header::new(
        width,
        height,
        section_len("row index", row_index.len())?,
        section_len("bitstream", bitstream.len())?,
    );

    let mut out = Vec::with_capacity(header.total_len() as usize);
    header.write_to(&mut out)?;
    out.extend_from_slice(row_index);
    out.extend_from_slice(bitstream);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_byte_exact() {
        let bytes = frame(5, 9, &[0x01, 0x00], &[0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(
            &bytes[..19],
            &[
                b'B', b'A', 1, //
                5, 0, 0, 0, //
                9, 0, 0, 0, //
                2, 0, 0, 0, //
                3, 0, 0, 0,
            ]
        );
        assert_eq!(&bytes[19..], &[0x01, 0x00, 0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn parse_slices_sections() {
        let bytes = frame(5, 9, &[0x01, 0x00], &[0xAA, 0xBB, 0xCC]).unwrap();
        let c = Container::parse(&bytes).unwrap();
        assert_eq!(c.header, Header::new(5, 9, 2, 3));
        assert_eq!(c.row_index, &[0x01, 0x00]);
        assert_eq!(c.bitstream, &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn too_small() {
        let err = Header::parse(&[b'B', b'A', 1]).unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn bad_magic_reported_before_version() {
        let mut bytes = frame(1, 1, &[1], &[]).unwrap();
        bytes[0] = b'X';
        bytes[2] = 9;
        assert!(Container::parse(&bytes).unwrap_err().to_string().contains("bad magic"));
    }

    #[test]
    fn unknown_version() {
        let mut bytes = frame(1, 1, &[1], &[]).unwrap();
        bytes[2] = 2;
        let err = Container::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported version 2"));
    }

    #[test]
    fn row_index_length_must_match_height() {
        let bytes = frame(1, 9, &[0xFF], &[]).unwrap();
        let err = Container::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("row index length"));
    }

    #[test]
    fn zero_dimensions_rejected() {
        let bytes = frame(0, 1, &[1], &[]).unwrap();
        assert!(Container::parse(&bytes).unwrap_err().is_format());
    }

    #[test]
    fn trailing_bytes_are_tolerated() {
        let mut bytes = frame(1, 1, &[1], &[]).unwrap();
        bytes.extend_from_slice(&[0, 0, 0]);
        let c = Container::parse(&bytes).unwrap();
        assert!(c.bitstream.is_empty());
    }

    #[test]
    fn huge_declared_lengths_do_not_overflow() {
        let mut bytes = frame(1, 1, &[1], &[]).unwrap();
        bytes[11..15].copy_from_slice(&u32::MAX.to_le_bytes());
        bytes[15..19].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(Container::parse(&bytes).unwrap_err().to_string().contains("truncated"));
    }
}
