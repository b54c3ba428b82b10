//! The monolithic firmware image (`bios/bisrv.asd`).

use std::fs;
use std::ops::Range;
use std::path::Path;

use log::info;

use crate::crc;
use crate::error::{Error, Result};

pub mod fingerprint;
pub mod patch;
pub mod release;

#[doc(hidden)]
pub mod fixture;

pub use fingerprint::{fingerprint, identify, masked_digest, Identification};
pub use patch::{
    apply_battery_patch, apply_boot_logo, extract_boot_logo, BatteryPatch, FirmwareSession,
};
pub use release::{BatteryLayout, Catalog, Release, VoltageCurve, PATCHED_CURVE, STOCK_CURVE};

/// A whole firmware file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    bytes: Vec<u8>,
}

impl FirmwareImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }

        Ok(Self::from_bytes(fs::read(path)?))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        fs::write(path, &self.bytes)?;
        info!("wrote {} bytes of firmware to {}", self.bytes.len(), path.display());

        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn stored_crc(&self) -> Result<u32> {
        crc::stored_crc(&self.bytes)
    }

    pub fn verify_crc(&self) -> Result<bool> {
        crc::verify_crc(&self.bytes)
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }
}

/// A byte range of the image whose contents differ between otherwise
/// identical installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutableRegion {
    pub start: usize,
    pub len: usize,
}

impl MutableRegion {
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    /// The region as a slice of `buf`, or an error if `buf` ends first.
    pub fn slice<'a>(&self, buf: &'a [u8]) -> Result<&'a [u8]> {
        self.check(buf.len())?;
        Ok(&buf[self.range()])
    }

    pub fn slice_mut<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8]> {
        self.check(buf.len())?;
        Ok(&mut buf[self.range()])
    }

    fn check(&self, len: usize) -> Result<()> {
        let end = self.start + self.len;

        if end > len {
            return Err(Error::Truncated { len, needed: end });
        }

        Ok(())
    }
}
