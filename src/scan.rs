//! Exact byte-pattern search.
//!
//! Region offsets inside the firmware move between releases, so every region
//! is found relative to a fixed byte sequence (an [`Anchor`]) that precedes it.

use log::debug;

use crate::error::{Error, Result};

/// Returns the offset of the first occurrence of `needle` in `haystack` at or
/// after `start`.
pub fn find(needle: &[u8], haystack: &[u8], start: usize) -> Option<usize> {
    if start > haystack.len() {
        return None;
    }

    if needle.is_empty() {
        return Some(start);
    }

    haystack[start..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + start)
}

/// A fixed byte sequence marking a region of the firmware image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub name: &'static str,
    pub bytes: &'static [u8],
}

impl Anchor {
    pub fn find_in(&self, haystack: &[u8], start: usize) -> Option<usize> {
        find(self.bytes, haystack, start)
    }

    /// Like [`Anchor::find_in`], but a missing anchor is an error.
    pub fn locate(&self, haystack: &[u8], start: usize) -> Result<usize> {
        let offset = self
            .find_in(haystack, start)
            .ok_or(Error::PatternNotFound { anchor: self.name })?;

        debug!("found {} anchor at 0x{:08X}", self.name, offset);

        Ok(offset)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Precedes the boot logo. The pixel data starts 16 bytes after the anchor.
pub const LOGO: Anchor = Anchor {
    name: "boot logo",
    bytes: &[
        0x62, 0x61, 0x64, 0x5F, 0x65, 0x78, 0x63, 0x65, 0x70, 0x74, 0x69, 0x6F, 0x6E, 0x00, 0x00,
        0x00,
    ],
};

/// Precedes the emulator button map table.
pub const BUTTON_MAP_START: Anchor = Anchor {
    name: "button map start",
    bytes: &[
        0x00, 0x00, 0x00, 0x71, 0xDB, 0x8E, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ],
};

/// Follows the emulator button map table.
pub const BUTTON_MAP_END: Anchor = Anchor {
    name: "button map end",
    bytes: &[0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00],
};

/// Precedes the battery voltage table.
pub const BATTERY_CURVE: Anchor = Anchor {
    name: "battery curve",
    bytes: &[0x11, 0x05, 0x00, 0x02, 0x24],
};

/// Distance from an anchor's first byte to the data it marks.
pub const LOGO_DATA_OFFSET: usize = 16;
pub const BUTTON_MAP_DATA_OFFSET: usize = 16;
pub const BATTERY_CURVE_DATA_OFFSET: usize = 5;
