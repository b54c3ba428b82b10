//! sfcard, a toolkit for the undocumented files on an SF2000 handheld's SD
//! card: the firmware image with its boot logo and battery table, the game
//! list indexes, the shortcut table and cover art.

#![deny(unsafe_code)]

pub mod backup;
pub mod card;
pub mod crc;
pub mod error;
pub mod firmware;
pub mod index;
pub mod progress;
pub mod rgb565;
pub mod scan;
pub mod shortcut;
pub mod splice;
pub mod system;

pub use error::{Error, Result};
