//! A Rust library for the BARCH grayscale image format.
//!
//! BARCH stores 8-bit single-channel images that are mostly white or black
//! (scans, line art, documents) in a compact bit-packed form, losslessly.
//!
//! # Quick Start
//!
//! ```
//! use barch::{decode, encode, RawImage};
//!
//! // 16x8 white page with a black bar across row 3
//! let img = RawImage::from_fn(16, 8, |_, y| if y == 3 { 0 } else { 255 });
//!
//! let bytes = encode(&img)?;
//! assert_eq!(decode(&bytes)?, img);
//! # Ok::<(), barch::BarchError>(())
//! ```
//!
//! # How it works
//!
//! - **Row index**: one bit per row marks rows that are entirely white; those
//!   rows cost nothing else.
//! - **Blocks**: every other row is cut into groups of 4 pixels, each coded as
//!   White (`0`), Black (`10`) or Literal (`11` + 4 raw bytes).
//! - **Container**: a fixed 19-byte header frames the row index and the
//!   bitstream.
//!
//! # Around the codec
//!
//! - [`image::bmp`]: 8-bit grayscale BMP reading and writing
//! - [`file`]: save/load helpers
//! - [`jobs`]: background conversions reporting over a channel
//! - [`catalog`]: directory listing with per-file job state
//! - **Optional parallelism**: Enable `rayon` feature for parallel batch coding

// Core modules
pub mod codec;
pub mod format;
pub mod image;
pub mod utils;

// Around the codec
pub mod catalog;
pub mod file;
pub mod jobs;

// Codec API
pub use codec::{decode, encode};

// Image types
pub use image::raw_image::{RawImage, BLACK, WHITE};

// Container
pub use format::{FormatSchema, Header};

// Persistence
pub use file::{load_from_file, save_to_file};

// Error types
pub use utils::error::{BarchError, Result};

// Constants
pub const BARCH_VERSION: &str = env!("CARGO_PKG_VERSION");
