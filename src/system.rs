//! The emulated systems the stock menu knows about.

use std::path::Path;

use strum::{EnumIter, EnumString, IntoEnumIterator};

/// Extensions the menu lists as games.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "bkp", "zip", "zfc", "zsf", "zmd", "zgb", "zfb", "smc", "fig", "sfc", "gd3", "gd7", "dx2",
    "bsx", "swc", "nes", "nfc", "fds", "unf", "gba", "agb", "gbz", "gbc", "gb", "sgb", "bin", "md",
    "smd", "gen", "sms",
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, EnumIter, strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum System {
    #[strum(serialize = "ARCADE")]
    Arcade,
    #[strum(serialize = "FC")]
    Fc,
    #[strum(serialize = "GB")]
    Gb,
    #[strum(serialize = "GBA")]
    Gba,
    #[strum(serialize = "GBC")]
    Gbc,
    #[strum(serialize = "MD")]
    Md,
    #[strum(serialize = "SFC")]
    Sfc,
}

impl System {
    /// Block number in the shortcut table, which runs SFC, FC, MD, GB, GBC,
    /// GBA and ends with ARCADE.
    pub fn shortcut_position(&self) -> usize {
        match self {
            System::Sfc => 0,
            System::Fc => 1,
            System::Md => 2,
            System::Gb => 3,
            System::Gbc => 4,
            System::Gba => 5,
            System::Arcade => 6,
        }
    }

    pub fn from_shortcut_position(position: usize) -> Option<Self> {
        Self::iter().find(|s| s.shortcut_position() == position)
    }

    /// Index files under `Resources/`: raw filenames, display names, pinyin.
    pub fn index_files(&self) -> [&'static str; 3] {
        match self {
            System::Arcade => ["mswb7.tax", "msdtc.nec", "mfpmp.bvs"],
            System::Fc => ["rdbui.tax", "fhcfg.nec", "nethn.bvs"],
            System::Gb => ["vdsdc.tax", "umboa.nec", "qdvd6.bvs"],
            System::Gba => ["vfnet.tax", "htuiw.nec", "sppnp.bvs"],
            System::Gbc => ["pnpui.tax", "wjere.nec", "mgdel.bvs"],
            System::Md => ["scksp.tax", "setxa.nec", "wmiui.bvs"],
            System::Sfc => ["urefs.tax", "adsnt.nec", "xvb6c.bvs"],
        }
    }

    /// The 640x480 menu background under `Resources/`.
    pub fn background_file(&self) -> &'static str {
        match self {
            System::Arcade => "hctml.ers",
            System::Fc => "fixas.ctp",
            System::Gb => "xajkg.hsp",
            System::Gba => "irftp.ctp",
            System::Gbc => "qwave.bke",
            System::Md => "icuin.cpl",
            System::Sfc => "drivr.ers",
        }
    }

    /// Leading number of this system's lines in the shortcut table.
    pub fn shortcut_prefix(&self) -> u32 {
        match self {
            System::Arcade => 6,
            _ => 9,
        }
    }
}

/// One system, or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemSelection {
    One(System),
    All,
}

impl SystemSelection {
    pub fn systems(&self) -> Vec<System> {
        match self {
            SystemSelection::One(system) => vec![*system],
            SystemSelection::All => System::iter().collect(),
        }
    }
}

impl std::str::FromStr for SystemSelection {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ALL") {
            Ok(SystemSelection::All)
        } else {
            s.parse().map(SystemSelection::One)
        }
    }
}

/// Whether `path`'s name has a stem and a supported extension.
pub fn is_rom_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => SUPPORTED_EXTENSIONS
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

pub fn is_rom_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_rom_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names() {
        assert_eq!("gba".parse::<System>().unwrap(), System::Gba);
        assert_eq!("ARCADE".parse::<System>().unwrap(), System::Arcade);
        assert!("N64".parse::<System>().is_err());
        assert_eq!(System::Sfc.to_string(), "SFC");

        assert_eq!("all".parse::<SystemSelection>().unwrap(), SystemSelection::All);
        assert_eq!(SystemSelection::All.systems().len(), 7);
        assert_eq!(
            "md".parse::<SystemSelection>().unwrap(),
            SystemSelection::One(System::Md)
        );
    }

    #[test]
    fn shortcut_blocks_end_with_arcade() {
        assert_eq!(System::Sfc.shortcut_position(), 0);
        assert_eq!(System::Arcade.shortcut_position(), 6);
        assert_eq!(System::from_shortcut_position(2), Some(System::Md));
        assert_eq!(System::from_shortcut_position(7), None);

        let mut positions: Vec<usize> = System::iter().map(|s| s.shortcut_position()).collect();
        positions.sort();
        assert_eq!(positions, [0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn shortcut_prefixes() {
        assert_eq!(System::Arcade.shortcut_prefix(), 6);
        assert_eq!(System::Fc.shortcut_prefix(), 9);
    }

    #[test]
    fn rom_names() {
        assert!(is_rom_name("Tetris.GB"));
        assert!(is_rom_name("a.b.zfc"));
        assert!(!is_rom_name(".gba"));
        assert!(!is_rom_name("readme.txt"));
        assert!(!is_rom_name("gba"));
    }
}
