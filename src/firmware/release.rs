use log::debug;
use sha2::{Digest, Sha256};
use strum::{EnumIter, IntoEnumIterator};

/// Stock firmware releases this tool knows how to patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, strum::Display)]
pub enum Release {
    #[strum(serialize = "2023.04.20 (V1.5)")]
    V1_5,
    #[strum(serialize = "2023.08.03 (V1.6)")]
    V1_6,
    #[strum(serialize = "2023.10.07 (V1.71)")]
    V1_71,
}

/// Where a release keeps its battery voltage thresholds.
///
/// Each layout is identified by the exact address of the table that follows
/// the battery anchor. This is a closed list: a new release means a new
/// variant, never a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum BatteryLayout {
    V1_5,
    V1_6,
    V1_71,
}

impl BatteryLayout {
    pub fn table_address(&self) -> usize {
        match self {
            BatteryLayout::V1_5 => 0x0035_3570,
            BatteryLayout::V1_6 => 0x0035_64EC,
            BatteryLayout::V1_71 => 0x0035_6638,
        }
    }

    /// Offsets of the five threshold bytes, from "full" down to "empty".
    pub fn offsets(&self) -> [usize; 5] {
        [4, 8, 12, 16, 20].map(|d| self.table_address() + d)
    }

    pub fn from_table_address(address: usize) -> Option<Self> {
        let layout = Self::iter().find(|l| l.table_address() == address);

        debug!("battery table at 0x{:08X} -> {:?}", address, layout);

        layout
    }
}

/// Battery thresholds in volts, from "full" down to "empty".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageCurve {
    pub full: f64,
    pub high: f64,
    pub half: f64,
    pub low: f64,
    pub empty: f64,
}

impl VoltageCurve {
    /// On-device encoding, `round(volts * 50)`.
    pub fn encoded(&self) -> [u8; 5] {
        [self.full, self.high, self.half, self.low, self.empty].map(|v| (v * 50.0).round() as u8)
    }
}

pub const STOCK_CURVE: VoltageCurve = VoltageCurve {
    full: 4.10,
    high: 3.94,
    half: 3.80,
    low: 3.68,
    empty: 3.50,
};

/// Thresholds matching the discharge curve of the stock cell, so the
/// indicator no longer reads empty while a third of the charge is left.
pub const PATCHED_CURVE: VoltageCurve = VoltageCurve {
    full: 3.98,
    high: 3.84,
    half: 3.72,
    low: 3.58,
    empty: 3.30,
};

/// Masked-image SHA-256 digests of stock releases.
static STOCK_DIGESTS: &[(&str, Release)] = &[
    (
        "b50e50aa4b1b1d41489586e989f09d47c4e2bc27c072cb0112f83e5bc04e2cca",
        Release::V1_5,
    ),
    (
        "d878a99d26242836178b452814e916bef532d05acfcc24d71baa31b8b6f38ffd",
        Release::V1_6,
    ),
    (
        "6aebab0e4da39e0a997df255ad6a1bd12fdd356cdf51a85c614d47109a0d7d2d",
        Release::V1_71,
    ),
];

/// Digest to release lookup.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<(String, Release)>,
}

impl Catalog {
    pub fn stock() -> Self {
        Self {
            entries: STOCK_DIGESTS
                .iter()
                .map(|(d, r)| (d.to_string(), *r))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self { entries: vec![] }
    }

    /// Registers another digest, for releases not in the built-in table.
    pub fn with(mut self, digest: impl Into<String>, release: Release) -> Self {
        self.entries.push((digest.into().to_ascii_lowercase(), release));
        self
    }

    pub fn lookup(&self, digest: &str) -> Option<Release> {
        self.entries
            .iter()
            .find(|(d, _)| d == digest)
            .map(|(_, r)| *r)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::stock()
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_voltages() {
        assert_eq!(STOCK_CURVE.encoded(), [205, 197, 190, 184, 175]);
        assert_eq!(PATCHED_CURVE.encoded(), [199, 192, 186, 179, 165]);
    }

    #[test]
    fn battery_dispatch_is_exact() {
        for layout in BatteryLayout::iter() {
            assert_eq!(
                BatteryLayout::from_table_address(layout.table_address()),
                Some(layout)
            );
            assert_eq!(BatteryLayout::from_table_address(layout.table_address() + 1), None);

            for offset in layout.offsets() {
                assert!(offset > layout.table_address());
            }
        }
    }

    #[test]
    fn catalog_lookup() {
        let catalog = Catalog::empty().with("ABCDEF", Release::V1_6);
        assert_eq!(catalog.lookup("abcdef"), Some(Release::V1_6));
        assert_eq!(catalog.lookup("abcdee"), None);
        assert_eq!(Catalog::stock().lookup(STOCK_DIGESTS[0].0), Some(Release::V1_5));
    }

    #[test]
    fn labels() {
        assert_eq!(Release::V1_6.to_string(), "2023.08.03 (V1.6)");
    }

    #[test]
    fn digest_is_lowercase_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
