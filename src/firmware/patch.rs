//! Boot logo and battery threshold patching.
//!
//! Every edit is made on a copy of the image and followed by a checksum
//! re-patch. Nothing reaches the card unless all of that succeeded, since a
//! device with a bad checksum does not boot and cannot be recovered.

use std::path::{Path, PathBuf};

use log::{info, warn};

use super::fingerprint::{identify, logo_region, Identification};
use super::release::{BatteryLayout, Catalog, Release, PATCHED_CURVE, STOCK_CURVE};
use super::FirmwareImage;
use crate::crc::patch_crc;
use crate::error::{Error, Result};
use crate::rgb565::{Raw565, BOOT_LOGO};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatteryPatch {
    /// The thresholds were already the patched values; nothing to write.
    AlreadyApplied,
    /// The thresholds are neither stock nor patched, so the offsets cannot be
    /// trusted for this image.
    WrongFirmwareVersion,
    Applied(FirmwareImage),
}

fn check_logo(logo: &Raw565) -> Result<()> {
    if logo.dims() != BOOT_LOGO {
        return Err(Error::MalformedDimensions {
            dims: BOOT_LOGO,
            expected: BOOT_LOGO.byte_len(),
            actual: logo.as_bytes().len(),
        });
    }

    Ok(())
}

fn splice_logo(image: &mut [u8], logo: &Raw565) -> Result<()> {
    logo_region(image)?
        .slice_mut(image)?
        .copy_from_slice(logo.as_bytes());

    Ok(())
}

fn read_thresholds(image: &[u8], layout: BatteryLayout) -> Result<[u8; 5]> {
    let mut values = [0u8; 5];

    for (value, offset) in values.iter_mut().zip(layout.offsets()) {
        *value = *image.get(offset).ok_or(Error::Truncated {
            len: image.len(),
            needed: offset + 1,
        })?;
    }

    Ok(values)
}

enum CurveState {
    Stock,
    Patched,
    Unknown,
}

fn curve_state(image: &[u8], layout: BatteryLayout) -> Result<CurveState> {
    let values = read_thresholds(image, layout)?;

    Ok(if values == PATCHED_CURVE.encoded() {
        CurveState::Patched
    } else if values == STOCK_CURVE.encoded() {
        CurveState::Stock
    } else {
        CurveState::Unknown
    })
}

fn write_curve(image: &mut [u8], layout: BatteryLayout) {
    for (offset, value) in layout.offsets().into_iter().zip(PATCHED_CURVE.encoded()) {
        image[offset] = value;
    }
}

/// Replaces the boot logo, returning a new image with a fresh checksum.
///
/// The image must identify as a stock release first.
pub fn apply_boot_logo(
    image: &FirmwareImage,
    logo: &Raw565,
    catalog: &Catalog,
) -> Result<FirmwareImage> {
    check_logo(logo)?;
    identify(image.as_bytes(), catalog)?;

    let mut patched = image.clone();
    splice_logo(patched.bytes_mut(), logo)?;
    patch_crc(patched.bytes_mut())?;

    Ok(patched)
}

/// The boot logo currently in `image`.
pub fn extract_boot_logo(image: &FirmwareImage) -> Result<Raw565> {
    let bytes = logo_region(image.as_bytes())?.slice(image.as_bytes())?;

    Raw565::from_bytes(BOOT_LOGO, bytes.to_vec())
}

/// Swaps the stock battery thresholds for [`PATCHED_CURVE`].
///
/// The image must identify as a stock release first; the offsets written are
/// that release's.
pub fn apply_battery_patch(image: &FirmwareImage, catalog: &Catalog) -> Result<BatteryPatch> {
    let id = identify(image.as_bytes(), catalog)?;

    match curve_state(image.as_bytes(), id.battery)? {
        CurveState::Patched => Ok(BatteryPatch::AlreadyApplied),
        CurveState::Stock => {
            let mut patched = image.clone();
            write_curve(patched.bytes_mut(), id.battery);
            patch_crc(patched.bytes_mut())?;

            Ok(BatteryPatch::Applied(patched))
        }
        CurveState::Unknown => {
            warn!("battery thresholds do not match {}", id.release);
            Ok(BatteryPatch::WrongFirmwareVersion)
        }
    }
}

/// Several patches against one firmware file, loaded and identified once
/// and written once.
#[derive(Debug)]
pub struct FirmwareSession {
    path: PathBuf,
    image: FirmwareImage,
    identification: Identification,
    dirty: bool,
}

impl FirmwareSession {
    pub fn open<P: AsRef<Path>>(path: P, catalog: &Catalog) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let image = FirmwareImage::load(&path)?;

        Self::new(path, image, catalog)
    }

    pub fn new(path: PathBuf, image: FirmwareImage, catalog: &Catalog) -> Result<Self> {
        let identification = identify(image.as_bytes(), catalog)?;

        info!("{} is firmware {}", path.display(), identification.release);

        Ok(Self {
            path,
            image,
            identification,
            dirty: false,
        })
    }

    pub fn release(&self) -> Release {
        self.identification.release
    }

    pub fn set_boot_logo(&mut self, logo: &Raw565) -> Result<()> {
        check_logo(logo)?;
        splice_logo(self.image.bytes_mut(), logo)?;
        self.dirty = true;

        Ok(())
    }

    /// Fails with [`Error::AlreadyPatched`] or [`Error::UnsupportedFirmware`]
    /// rather than returning a [`BatteryPatch`], so sessions compose with `?`.
    pub fn patch_battery(&mut self) -> Result<()> {
        let layout = self.identification.battery;

        match curve_state(self.image.as_bytes(), layout)? {
            CurveState::Patched => Err(Error::AlreadyPatched),
            CurveState::Stock => {
                write_curve(self.image.bytes_mut(), layout);
                self.dirty = true;
                Ok(())
            }
            CurveState::Unknown => Err(Error::UnsupportedFirmware),
        }
    }

    /// Re-checksums and writes the image back if anything changed. Returns
    /// whether the file was written.
    pub fn commit(mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }

        patch_crc(self.image.bytes_mut())?;
        self.image.save(&self.path)?;

        Ok(true)
    }
}
