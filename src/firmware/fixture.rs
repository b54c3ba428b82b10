//! Synthetic firmware images for tests.
//!
//! The filler is a fixed xorshift stream, so images are identical from run to
//! run, and the anchors are placed at known offsets.

use super::masked_digest;
use super::release::{BatteryLayout, Catalog, Release, STOCK_CURVE};
use crate::crc::patch_crc;
use crate::error::Result;
use crate::scan::{BATTERY_CURVE, BUTTON_MAP_END, BUTTON_MAP_START, LOGO};

pub const LOGO_ANCHOR_AT: usize = 0x1000;
pub const BUTTON_MAP_AT: usize = 0x0004_0000;
pub const BUTTON_MAP_LEN: usize = 0x400;

fn filler(len: usize) -> Vec<u8> {
    let mut x = 0x2545_F491u32;

    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            (x >> 24) as u8
        })
        .collect()
}

fn place(image: &mut [u8], at: usize, bytes: &[u8]) {
    image[at..at + bytes.len()].copy_from_slice(bytes);
}

/// An image with every anchor in place and the battery table at `address`.
/// Addresses that would overlap the button map are moved past it.
pub fn with_battery_anchor_at(address: usize) -> Vec<u8> {
    let address = address.max(BUTTON_MAP_AT + 0x1000);
    let mut image = filler(address + 0x1000);

    place(&mut image, LOGO_ANCHOR_AT, LOGO.bytes);
    place(&mut image, BUTTON_MAP_AT, BUTTON_MAP_START.bytes);
    place(&mut image, BUTTON_MAP_AT + 16 + BUTTON_MAP_LEN, BUTTON_MAP_END.bytes);
    place(&mut image, address - BATTERY_CURVE.len(), BATTERY_CURVE.bytes);

    image
}

/// A stock image for `layout` and a catalog that knows it as `release`.
pub fn stock(layout: BatteryLayout, release: Release) -> Result<(Vec<u8>, Catalog)> {
    let mut image = with_battery_anchor_at(layout.table_address());

    for (offset, value) in layout.offsets().into_iter().zip(STOCK_CURVE.encoded()) {
        image[offset] = value;
    }
    patch_crc(&mut image)?;

    let catalog = Catalog::empty().with(masked_digest(&image)?, release);

    Ok((image, catalog))
}
