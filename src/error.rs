use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::rgb565::Dimensions;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// An anchor sequence could not be found; the firmware layout is not one we know.
    #[error("could not find the {anchor} pattern, this firmware layout is not recognised")]
    PatternNotFound { anchor: &'static str },

    #[error("image is {len} bytes, at least {needed} are required")]
    Truncated { len: usize, needed: usize },

    #[error("firmware is not a recognised stock release")]
    UnsupportedFirmware,

    #[error("patch has already been applied")]
    AlreadyPatched,

    #[error("pixel data is {actual} bytes, expected {expected} for {dims}")]
    MalformedDimensions {
        dims: Dimensions,
        expected: usize,
        actual: usize,
    },

    #[error("malformed index file: {0}")]
    MalformedIndex(String),

    #[error("shortcut table has {lines} lines, at least {needed} are required")]
    MalformedShortcutTable { lines: usize, needed: usize },

    #[error("shortcut slot {0} is out of range (0-3)")]
    InvalidSlot(usize),

    #[error("{} cannot carry a cover, write the result to a .z?? container instead", .0.display())]
    NoCoverSlot(PathBuf),

    #[error("expected file {} is missing", .0.display())]
    MissingFile(PathBuf),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Binary(#[from] binrw::Error),
}

impl Error {
    /// Whether the user can fix this by updating firmware or simply doing nothing.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::PatternNotFound { .. } | Error::UnsupportedFirmware | Error::AlreadyPatched
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_errors_are_distinct_from_io() {
        assert!(Error::PatternNotFound { anchor: "logo" }.is_recoverable());
        assert!(Error::UnsupportedFirmware.is_recoverable());
        assert!(!Error::from(io::Error::new(io::ErrorKind::NotFound, "gone")).is_recoverable());
    }
}
