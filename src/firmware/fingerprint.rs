//! Identifying stock firmware releases.
//!
//! The boot logo, the button map, the battery thresholds and the checksum are
//! all things users (or this tool) legitimately change. They are zeroed in a
//! private copy and the rest of the image is hashed, so a patched install
//! still identifies as the release it came from.

use log::{debug, warn};

use super::release::{sha256_hex, BatteryLayout, Catalog, Release};
use super::MutableRegion;
use crate::crc::CRC_FIELD;
use crate::error::{Error, Result};
use crate::rgb565::BOOT_LOGO;
use crate::scan::{
    BATTERY_CURVE, BATTERY_CURVE_DATA_OFFSET, BUTTON_MAP_DATA_OFFSET, BUTTON_MAP_END,
    BUTTON_MAP_START, LOGO, LOGO_DATA_OFFSET,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identification {
    pub release: Release,
    pub battery: BatteryLayout,
}

pub(crate) fn logo_region(image: &[u8]) -> Result<MutableRegion> {
    let anchor = LOGO.locate(image, 0)?;

    Ok(MutableRegion {
        start: anchor + LOGO_DATA_OFFSET,
        len: BOOT_LOGO.byte_len(),
    })
}

pub(crate) fn button_map_region(image: &[u8]) -> Result<MutableRegion> {
    let start = BUTTON_MAP_START.locate(image, 0)? + BUTTON_MAP_DATA_OFFSET;
    let end = BUTTON_MAP_END.locate(image, start)?;

    Ok(MutableRegion {
        start,
        len: end - start,
    })
}

/// Finds the battery anchor and maps the table address after it to a known
/// layout. `Ok(None)` means the anchor exists but at an unknown address.
fn battery_layout(image: &[u8]) -> Result<Option<BatteryLayout>> {
    let address = BATTERY_CURVE.locate(image, 0)? + BATTERY_CURVE_DATA_OFFSET;

    Ok(BatteryLayout::from_table_address(address))
}

/// Zeroes every mutable region of `image` in place, in a fixed order: the
/// checksum, the logo, the button map, then the battery thresholds. Each
/// later anchor is searched for in the already-masked buffer.
fn mask(image: &mut [u8]) -> Result<BatteryLayout> {
    if image.len() < CRC_FIELD.end {
        return Err(Error::Truncated {
            len: image.len(),
            needed: CRC_FIELD.end,
        });
    }
    image[CRC_FIELD].fill(0);

    logo_region(image)?.slice_mut(image)?.fill(0);
    button_map_region(image)?.slice_mut(image)?.fill(0);

    let layout = battery_layout(image)?.ok_or(Error::UnsupportedFirmware)?;
    let len = image.len();
    for offset in layout.offsets() {
        *image.get_mut(offset).ok_or(Error::Truncated {
            len,
            needed: offset + 1,
        })? = 0;
    }

    Ok(layout)
}

/// SHA-256 of the masked image, as lowercase hex.
pub fn masked_digest(image: &[u8]) -> Result<String> {
    let mut copy = image.to_vec();
    mask(&mut copy)?;

    let digest = sha256_hex(&copy);
    debug!("masked firmware digest {}", digest);

    Ok(digest)
}

/// Identifies `image` against `catalog`.
///
/// Fails with [`Error::PatternNotFound`] if a region cannot be located and
/// [`Error::UnsupportedFirmware`] if the layout or digest is unknown.
pub fn identify(image: &[u8], catalog: &Catalog) -> Result<Identification> {
    let mut copy = image.to_vec();
    let battery = mask(&mut copy)?;

    let digest = sha256_hex(&copy);
    match catalog.lookup(&digest) {
        Some(release) => {
            debug!("firmware identified as {}", release);
            Ok(Identification { release, battery })
        }
        None => {
            warn!("unrecognised firmware digest {}", digest);
            Err(Error::UnsupportedFirmware)
        }
    }
}

/// The release `image` was built from, or `None` for anything unrecognised.
pub fn fingerprint(image: &[u8], catalog: &Catalog) -> Option<Release> {
    identify(image, catalog).ok().map(|id| id.release)
}
