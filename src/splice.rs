//! Raw pixel blocks spliced into game files and menu backgrounds.

use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::rgb565::{Raw565, BACKGROUND, ROM_COVER, SHORTCUT_ICON};
use crate::shortcut::SLOTS;

/// How a game file carries its menu cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// The file starts with a 144x208 cover followed by the game payload
    /// (`.zfc`, `.zsf`, `.zgb` and friends). Covers are replaced in place.
    Thumbnailed,
    /// A plain game file with no cover. Writing one produces a new file
    /// with the cover in front of the untouched payload.
    Bare,
}

impl ContainerKind {
    /// Picks the packaging from the file name. This is the only place the
    /// extension matters.
    pub fn classify(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some(e) if e.len() == 3 && e.starts_with('z') && e != "zip" => {
                ContainerKind::Thumbnailed
            }
            _ => ContainerKind::Bare,
        }
    }

    /// The cover stored in `file`, if this kind of file has one.
    pub fn read_cover(&self, file: &[u8]) -> Result<Option<Raw565>> {
        match self {
            ContainerKind::Thumbnailed => {
                let len = ROM_COVER.byte_len();
                let cover = file.get(..len).ok_or(Error::Truncated {
                    len: file.len(),
                    needed: len,
                })?;

                Ok(Some(Raw565::from_bytes(ROM_COVER, cover.to_vec())?))
            }
            ContainerKind::Bare => Ok(None),
        }
    }

    /// Returns the contents of `file` with `cover` spliced in.
    pub fn write_cover(&self, file: &[u8], cover: &Raw565) -> Result<Vec<u8>> {
        if cover.dims() != ROM_COVER {
            return Err(Error::MalformedDimensions {
                dims: ROM_COVER,
                expected: ROM_COVER.byte_len(),
                actual: cover.as_bytes().len(),
            });
        }

        let len = ROM_COVER.byte_len();
        match self {
            ContainerKind::Thumbnailed => {
                if file.len() < len {
                    return Err(Error::Truncated {
                        len: file.len(),
                        needed: len,
                    });
                }

                let mut out = file.to_vec();
                out[..len].copy_from_slice(cover.as_bytes());
                Ok(out)
            }
            ContainerKind::Bare => {
                let mut out = Vec::with_capacity(len + file.len());
                out.extend_from_slice(cover.as_bytes());
                out.extend_from_slice(file);
                Ok(out)
            }
        }
    }
}

/// Top-left corners of the four shortcut icons on a menu background.
pub const SHORTCUT_ICON_POSITIONS: [(u32, u32); SLOTS] =
    [(42, 290), (186, 290), (330, 290), (474, 290)];

/// A system's 640x480 menu background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundCanvas {
    pixels: Raw565,
}

impl BackgroundCanvas {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Ok(Self {
            pixels: Raw565::from_bytes(BACKGROUND, bytes)?,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            pixels: Raw565::load(path, BACKGROUND)?,
        })
    }

    /// Draws `icon` over shortcut `slot`.
    pub fn set_shortcut_icon(&mut self, slot: usize, icon: &Raw565) -> Result<()> {
        let (x, y) = *SHORTCUT_ICON_POSITIONS
            .get(slot)
            .ok_or(Error::InvalidSlot(slot))?;

        if icon.dims() != SHORTCUT_ICON {
            return Err(Error::MalformedDimensions {
                dims: SHORTCUT_ICON,
                expected: SHORTCUT_ICON.byte_len(),
                actual: icon.as_bytes().len(),
            });
        }

        debug!("placing shortcut icon {} at ({}, {})", slot, x, y);
        self.pixels.paste(icon, x, y);

        Ok(())
    }

    pub fn pixels(&self) -> &Raw565 {
        &self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn cover(shade: u8) -> Raw565 {
        Raw565::filled(ROM_COVER, Rgb([shade, shade, shade]))
    }

    #[test]
    fn classifies_by_extension() {
        assert_eq!(ContainerKind::classify(Path::new("a/Game.ZFC")), ContainerKind::Thumbnailed);
        assert_eq!(ContainerKind::classify(Path::new("Game.zgb")), ContainerKind::Thumbnailed);
        assert_eq!(ContainerKind::classify(Path::new("Game.zip")), ContainerKind::Bare);
        assert_eq!(ContainerKind::classify(Path::new("Game.gba")), ContainerKind::Bare);
        assert_eq!(ContainerKind::classify(Path::new("Game")), ContainerKind::Bare);
    }

    #[test]
    fn in_place_overwrite_keeps_payload() {
        let mut file = cover(0x10).into_bytes();
        file.extend_from_slice(b"PK\x03\x04payload");

        let kind = ContainerKind::Thumbnailed;
        let out = kind.write_cover(&file, &cover(0xF0)).unwrap();

        assert_eq!(out.len(), file.len());
        assert_eq!(kind.read_cover(&out).unwrap(), Some(cover(0xF0)));
        assert!(out.ends_with(b"PK\x03\x04payload"));
    }

    #[test]
    fn bare_file_gets_cover_in_front() {
        let payload = b"NES\x1a rom data".to_vec();
        let out = ContainerKind::Bare.write_cover(&payload, &cover(0x80)).unwrap();

        assert_eq!(out.len(), ROM_COVER.byte_len() + payload.len());
        assert_eq!(&out[ROM_COVER.byte_len()..], &payload[..]);
        assert_eq!(
            ContainerKind::Thumbnailed.read_cover(&out).unwrap(),
            Some(cover(0x80))
        );
        assert_eq!(ContainerKind::Bare.read_cover(&payload).unwrap(), None);
    }

    #[test]
    fn cover_size_is_checked() {
        let logo = Raw565::filled(crate::rgb565::BOOT_LOGO, Rgb([0, 0, 0]));
        assert!(ContainerKind::Bare.write_cover(&[], &logo).is_err());
        assert!(ContainerKind::Thumbnailed.write_cover(&[0; 10], &cover(0)).is_err());
        assert!(ContainerKind::Thumbnailed.read_cover(&[0; 10]).is_err());
    }

    #[test]
    fn shortcut_icon_lands_in_slot() {
        let mut canvas =
            BackgroundCanvas::from_bytes(Raw565::filled(BACKGROUND, Rgb([0, 0, 0])).into_bytes())
                .unwrap();
        let icon = Raw565::filled(SHORTCUT_ICON, Rgb([0xFF, 0xFF, 0xFF]));
        canvas.set_shortcut_icon(2, &icon).unwrap();

        let image = canvas.pixels().decode();
        assert_eq!(image.get_pixel(330, 290)[0], 0xFC);
        assert_eq!(image.get_pixel(330 + 123, 290 + 123)[0], 0xFC);
        assert_eq!(image.get_pixel(329, 290)[0], 0x04);
        assert_eq!(image.get_pixel(330 + 124, 290)[0], 0x04);

        assert!(matches!(canvas.set_shortcut_icon(4, &icon), Err(Error::InvalidSlot(4))));
    }
}
