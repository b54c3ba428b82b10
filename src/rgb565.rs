//! Conversion between ordinary images and the device's raw pixel format.
//!
//! The device stores pixels as packed 16-bit RGB565, little-endian,
//! row-major, with no header. The size is always implied by where the data
//! lives.

use std::fmt;
use std::fs;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};

use crate::error::{Error, Result};

/// Decoded pixels from any source.
pub type PixelImage = RgbImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub const fn byte_len(&self) -> usize {
        self.pixel_count() * 2
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

pub const BOOT_LOGO: Dimensions = Dimensions::new(512, 200);
pub const ROM_COVER: Dimensions = Dimensions::new(144, 208);
pub const BACKGROUND: Dimensions = Dimensions::new(640, 480);
pub const SHORTCUT_ICON: Dimensions = Dimensions::new(124, 124);

pub fn pack(rgb: Rgb<u8>) -> u16 {
    let [r, g, b] = rgb.0;

    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}

/// Expands a packed pixel to the middle of the range of 8-bit values that
/// pack to it, which keeps the error within 4/2/4.
pub fn unpack(px: u16) -> Rgb<u8> {
    let r = ((px >> 11) & 0x1F) as u8;
    let g = ((px >> 5) & 0x3F) as u8;
    let b = (px & 0x1F) as u8;

    Rgb([(r << 3) | 4, (g << 2) | 2, (b << 3) | 4])
}

/// A block of raw RGB565 pixels of known size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw565 {
    dims: Dimensions,
    bytes: Vec<u8>,
}

impl Raw565 {
    pub fn from_bytes(dims: Dimensions, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != dims.byte_len() {
            return Err(Error::MalformedDimensions {
                dims,
                expected: dims.byte_len(),
                actual: bytes.len(),
            });
        }

        Ok(Self { dims, bytes })
    }

    /// A single colour filling the whole block.
    pub fn filled(dims: Dimensions, rgb: Rgb<u8>) -> Self {
        let px = pack(rgb).to_le_bytes();

        Self {
            dims,
            bytes: px.iter().copied().cycle().take(dims.byte_len()).collect(),
        }
    }

    /// Encodes `image`, stretching it to `dims` first if the size differs.
    pub fn encode(image: &DynamicImage, dims: Dimensions) -> Self {
        if image.width() == dims.width && image.height() == dims.height {
            Self::encode_rgb(&image.to_rgb8())
        } else {
            let resized = image.resize_exact(dims.width, dims.height, FilterType::Triangle);
            Self::encode_rgb(&resized.to_rgb8())
        }
    }

    pub fn encode_rgb(image: &PixelImage) -> Self {
        let dims = Dimensions::new(image.width(), image.height());
        let bytes = image
            .pixels()
            .flat_map(|p| pack(*p).to_le_bytes())
            .collect();

        Self { dims, bytes }
    }

    /// Opens any image format the `image` crate understands and encodes it.
    pub fn from_image_file<P: AsRef<Path>>(path: P, dims: Dimensions) -> Result<Self> {
        let image = image::open(path)?;

        Ok(Self::encode(&image, dims))
    }

    pub fn load<P: AsRef<Path>>(path: P, dims: Dimensions) -> Result<Self> {
        Self::from_bytes(dims, fs::read(path)?)
    }

    pub fn decode(&self) -> PixelImage {
        let width = self.dims.width as usize;

        RgbImage::from_fn(self.dims.width, self.dims.height, |x, y| {
            unpack(self.pixel_at(y as usize * width + x as usize))
        })
    }

    fn pixel_at(&self, index: usize) -> u16 {
        u16::from_le_bytes([self.bytes[index * 2], self.bytes[index * 2 + 1]])
    }

    /// Copies `src` over this block with its top-left corner at `(x, y)`,
    /// clipping whatever falls outside.
    pub fn paste(&mut self, src: &Raw565, x: u32, y: u32) {
        if x >= self.dims.width || y >= self.dims.height {
            return;
        }

        let cols = src.dims.width.min(self.dims.width - x) as usize;
        let rows = src.dims.height.min(self.dims.height - y) as usize;

        for row in 0..rows {
            let from = row * src.dims.width as usize * 2;
            let to = ((y as usize + row) * self.dims.width as usize + x as usize) * 2;

            self.bytes[to..to + cols * 2].copy_from_slice(&src.bytes[from..from + cols * 2]);
        }
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(dims: Dimensions) -> PixelImage {
        RgbImage::from_fn(dims.width, dims.height, |x, y| {
            Rgb([(x * 37 + y) as u8, (y * 11 + 5) as u8, (x ^ y) as u8])
        })
    }

    #[test]
    fn packs_little_endian() {
        let raw = Raw565::filled(Dimensions::new(2, 1), Rgb([0xFF, 0x00, 0x00]));
        assert_eq!(raw.as_bytes(), &[0x00, 0xF8, 0x00, 0xF8]);

        let raw = Raw565::encode_rgb(&RgbImage::from_pixel(1, 1, Rgb([0x00, 0xFF, 0x00])));
        assert_eq!(raw.as_bytes(), &[0xE0, 0x07]);
    }

    #[test]
    fn quantized_image_round_trips_exactly() {
        let dims = Dimensions::new(32, 8);
        let quantized = Raw565::encode_rgb(&gradient(dims)).decode();
        let again = Raw565::encode_rgb(&quantized).decode();

        assert_eq!(quantized, again);
    }

    #[test]
    fn arbitrary_image_stays_within_truncation_error() {
        let dims = Dimensions::new(64, 16);
        let original = gradient(dims);
        let decoded = Raw565::encode_rgb(&original).decode();

        for (a, b) in original.pixels().zip(decoded.pixels()) {
            assert!(a[0].abs_diff(b[0]) <= 4);
            assert!(a[1].abs_diff(b[1]) <= 2);
            assert!(a[2].abs_diff(b[2]) <= 4);
        }
        assert_ne!(original, decoded);
    }

    #[test]
    fn encode_stretches_to_target_size() {
        let image = DynamicImage::ImageRgb8(gradient(Dimensions::new(10, 10)));
        let raw = Raw565::encode(&image, ROM_COVER);

        assert_eq!(raw.dims(), ROM_COVER);
        assert_eq!(raw.as_bytes().len(), 144 * 208 * 2);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = Raw565::from_bytes(BOOT_LOGO, vec![0; 100]).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedDimensions { expected: 204800, actual: 100, .. }
        ));
    }

    #[test]
    fn paste_clips_at_edges() {
        let mut canvas = Raw565::filled(Dimensions::new(4, 4), Rgb([0, 0, 0]));
        let icon = Raw565::filled(Dimensions::new(3, 3), Rgb([0xFF, 0xFF, 0xFF]));
        canvas.paste(&icon, 2, 2);

        let white = canvas
            .as_bytes()
            .chunks_exact(2)
            .filter(|px| px == &[0xFF, 0xFF])
            .count();
        assert_eq!(white, 4);
        assert_eq!(&canvas.as_bytes()[(2 * 4 + 2) * 2..(2 * 4 + 4) * 2], &[0xFF; 4]);
        assert_eq!(&canvas.as_bytes()[..8], &[0; 8]);
    }
}
