//! Thin persistence wrappers around the codec.

use log::debug;
use std::fs;
use std::path::Path;

use crate::codec::{decode, encode};
use crate::image::raw_image::RawImage;
use crate::utils::error::{BarchError, Result};

/// Canonical extension of encoded files.
pub const BARCH_EXTENSION: &str = "barch";

pub fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| BarchError::io_at(e, path))
}

pub fn write_all<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, bytes).map_err(|e| BarchError::io_at(e, path))
}

/// Encodes `img` and writes the result to `path`.
pub fn save_to_file<P: AsRef<Path>>(path: P, img: &RawImage) -> Result<()> {
    let bytes = encode(img)?;
    write_all(&path, &bytes)?;
    debug!("wrote {} bytes to {}", bytes.len(), path.as_ref().display());
    Ok(())
}

/// Reads and decodes a BARCH file.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<RawImage> {
    let bytes = read_all(&path)?;
    if bytes.is_empty() {
        return Err(BarchError::format(format!(
            "empty file: {}",
            path.as_ref().display()
        )));
    }
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("img.barch");
        let img = RawImage::from_fn(7, 5, |x, y| if (x + y) % 3 == 0 { 0 } else { 255 });
        save_to_file(&path, &img).unwrap();
        assert_eq!(load_from_file(&path).unwrap(), img);
    }

    #[test]
    fn empty_file_is_a_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.barch");
        write_all(&path, &[]).unwrap();
        let err = load_from_file(&path).unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("empty file"));
    }

    #[test]
    fn missing_file_is_an_io_error_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.barch");
        let err = load_from_file(&path).unwrap_err();
        assert!(err.is_io());
        assert!(err.to_string().contains("nope.barch"));
    }
}
