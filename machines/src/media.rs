//! ROM, cartridge, and CF backing-file I/O.
//!
//! Everything here is a host-boundary operation: failures are reported
//! (and logged by the callers in `system`), never propagated into a
//! device tick. Sizes are validated strictly; an image of the wrong
//! size is refused and the machine keeps its safe defaults.

use std::path::Path;

use halcyon_core::device::cf_card::STORAGE_SIZE;

/// Errors from loading or saving media images.
#[derive(Debug)]
pub enum MediaError {
    /// Underlying I/O error (file not found, permission denied, etc.)
    Io(std::io::Error),

    /// Image size does not match the expected size.
    SizeMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },
}

impl std::fmt::Display for MediaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::SizeMismatch {
                path,
                expected,
                actual,
            } => write!(f, "{path}: expected {expected} bytes, got {actual}"),
        }
    }
}

impl std::error::Error for MediaError {}

impl From<std::io::Error> for MediaError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Read an image file, validating its exact size.
pub fn load_image(path: &Path, expected: usize) -> Result<Vec<u8>, MediaError> {
    let data = std::fs::read(path)?;
    if data.len() != expected {
        return Err(MediaError::SizeMismatch {
            path: path.display().to_string(),
            expected,
            actual: data.len(),
        });
    }
    Ok(data)
}

/// Load the CF backing file. Only a file of exactly `STORAGE_SIZE` raw
/// sector-ordered bytes is accepted.
pub fn load_backing_file(path: &Path) -> Result<Vec<u8>, MediaError> {
    load_image(path, STORAGE_SIZE)
}

/// Write the full CF store to the backing file, creating it if needed.
pub fn save_backing_file(path: &Path, contents: &[u8]) -> Result<(), MediaError> {
    std::fs::write(path, contents)?;
    Ok(())
}
