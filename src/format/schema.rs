//! Versioned layout constants of the BARCH container.
//!
//! Every version the crate can read or write has one `FormatSchema` entry.
//! A new revision of the format is a new entry in [`SUPPORTED`], never an
//! edit of an existing one.

/// Layout of one container version. All multi-byte fields are little-endian u32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSchema {
    pub magic: [u8; 2],
    pub version: u8,
    pub off_magic: usize,
    pub off_version: usize,
    pub off_width: usize,
    pub off_height: usize,
    pub off_row_index_len: usize,
    pub off_bitstream_len: usize,
    pub header_len: usize,
}

impl FormatSchema {
    pub const V1: FormatSchema = FormatSchema {
        magic: *b"BA",
        version: 0x01,
        off_magic: 0,
        off_version: 2,
        off_width: 3,
        off_height: 7,
        off_row_index_len: 11,
        off_bitstream_len: 15,
        header_len: 19,
    };

    /// Schema used for newly written files.
    pub const CURRENT: FormatSchema = FormatSchema::V1;

    /// Finds the schema for a version byte, if this build knows it.
    pub fn for_version(version: u8) -> Option<&'static FormatSchema> {
        SUPPORTED.iter().find(|s| s.version == version)
    }
}

/// Every container version this build reads.
pub static SUPPORTED: &[FormatSchema] = &[FormatSchema::V1];
