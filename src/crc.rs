//! The firmware checksum checked by the bootloader.
//!
//! CRC-32/MPEG-2 (polynomial 0x04C11DB7, all-ones seed, MSB first, no final
//! xor) over everything after the 512-byte header, stored little-endian at
//! header offset 0x18C.

use std::ops::Range;

use crc::{Crc, CRC_32_MPEG_2};
use log::debug;

use crate::error::{Error, Result};

const CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Bytes at the start of the image that are not covered by the checksum.
pub const HEADER_LEN: usize = 512;

/// Location of the stored checksum.
pub const CRC_FIELD: Range<usize> = 0x18C..0x190;

fn check_len(image: &[u8]) -> Result<()> {
    if image.len() < HEADER_LEN {
        return Err(Error::Truncated {
            len: image.len(),
            needed: HEADER_LEN,
        });
    }

    Ok(())
}

/// Computes the checksum of `image[512..]`.
pub fn crc32_variant(image: &[u8]) -> Result<u32> {
    check_len(image)?;

    Ok(CRC.checksum(&image[HEADER_LEN..]))
}

/// Reads the checksum currently stored in the header.
pub fn stored_crc(image: &[u8]) -> Result<u32> {
    check_len(image)?;

    let field = &image[CRC_FIELD];

    Ok(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
}

/// Recomputes the checksum and writes it into the header, returning it.
pub fn patch_crc(image: &mut [u8]) -> Result<u32> {
    let crc = crc32_variant(image)?;

    image[CRC_FIELD].copy_from_slice(&crc.to_le_bytes());

    debug!("patched firmware CRC to {:08X}", crc);

    Ok(crc)
}

/// Whether the stored checksum matches the image contents.
pub fn verify_crc(image: &[u8]) -> Result<bool> {
    Ok(stored_crc(image)? == crc32_variant(image)?)
}
