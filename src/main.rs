use std::fs::{read, write};
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use log::{info, warn};
use thiserror::Error;

use sfcard::card::{
    read_cover_file, write_cover_file, CardLayout, RebuildOptions, RebuildReport, FIRMWARE,
};
use sfcard::firmware::{
    apply_battery_patch, extract_boot_logo, identify, masked_digest, BatteryPatch, Catalog,
    FirmwareImage, FirmwareSession,
};
use sfcard::progress::Logged;
use sfcard::rgb565::{Raw565, BOOT_LOGO, ROM_COVER, SHORTCUT_ICON};
use sfcard::scan::find;
use sfcard::system::{System, SystemSelection};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root of the SD card
    #[arg(long, env = "SFCARD_ROOT", global = true, default_value = ".")]
    card: PathBuf,

    /// Firmware image to use instead of the card's bios/bisrv.asd
    #[arg(long, global = true)]
    firmware: Option<PathBuf>,

    /// Enables verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Identify the firmware release
    Identify {
        /// Also print the masked digest, for adding new releases
        #[arg(long)]
        digest: bool,
    },
    /// Check the firmware checksum
    VerifyCrc,
    /// Replace the boot logo with any image (stretched to 512x200)
    BootLogo {
        image: PathBuf,

        /// Apply the battery patch in the same write
        #[arg(long)]
        battery: bool,
    },
    /// Save the current boot logo (.raw for RGB565, anything else is converted)
    ExtractLogo { output: PathBuf },
    /// Patch the battery indicator thresholds
    Battery,
    /// Rebuild the game lists from the ROM folders
    Rebuild {
        /// System to rebuild, or ALL
        system: SystemSelection,

        /// Only compare with the lists on the card
        #[arg(long)]
        check: bool,

        /// Write a list even when the folder has no games
        #[arg(long)]
        allow_empty: bool,
    },
    /// Print a system's game list in menu order
    List {
        system: System,

        /// 0 for file names, 1 for display names, 2 for pinyin
        #[arg(long, default_value_t = 0)]
        which: usize,
    },
    /// Point a shortcut slot at a game
    Shortcut {
        system: System,

        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        slot: u8,

        filename: String,
    },
    /// Draw an icon over a shortcut slot of a system's menu background
    ShortcutIcon {
        system: System,

        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        slot: u8,

        image: PathBuf,
    },
    /// Set the cover art of a game file
    Cover {
        rom: PathBuf,

        image: PathBuf,

        /// Where to write the result, a .z?? container (defaults to the ROM
        /// itself, which must already be one)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Save the cover art of a game file
    ExtractCover { rom: PathBuf, output: PathBuf },
    /// Search a file for a byte pattern
    Find {
        file: PathBuf,

        /// Bytes to look for, in hex
        pattern: HexPattern,

        /// Offset to start searching from
        #[arg(short, long, value_parser = maybe_hex::<usize>, default_value_t = 0)]
        start: usize,
    },
}

impl Command {
    /// Whether the command reads or writes files on the card itself.
    fn uses_card(&self, firmware_given: bool) -> bool {
        match self {
            Command::Rebuild { .. }
            | Command::List { .. }
            | Command::Shortcut { .. }
            | Command::ShortcutIcon { .. } => true,
            Command::Identify { .. }
            | Command::VerifyCrc
            | Command::BootLogo { .. }
            | Command::ExtractLogo { .. }
            | Command::Battery => !firmware_given,
            Command::Cover { .. } | Command::ExtractCover { .. } | Command::Find { .. } => false,
        }
    }
}

#[derive(Debug, Clone)]
struct HexPattern(Vec<u8>);

#[derive(Debug, Error)]
pub enum ParseHexError {
    #[error("hex pattern has an odd number of digits")]
    OddLength,

    #[error(transparent)]
    IntError(#[from] ParseIntError),
}

impl FromStr for HexPattern {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>();

        if digits.len() % 2 != 0 {
            return Err(ParseHexError::OddLength);
        }

        let bytes = (0..digits.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(bytes))
    }
}

fn save_pixels(raw: &Raw565, output: &Path) -> Result<()> {
    if output.extension().is_some_and(|e| e.eq_ignore_ascii_case("raw")) {
        write(output, raw.as_bytes())?;
    } else {
        raw.decode().save(output)?;
    }

    info!("saved {} image to {}", raw.dims(), output.display());

    Ok(())
}

fn run(args: Args) -> Result<()> {
    let layout = CardLayout::new(&args.card);
    if args.command.uses_card(args.firmware.is_some()) && !layout.looks_like_card() {
        bail!(
            "{} does not look like an SF2000 card, {} is missing (use --card)",
            layout.root().display(),
            FIRMWARE
        );
    }

    let firmware = args.firmware.unwrap_or_else(|| layout.firmware());
    let catalog = Catalog::stock();

    match args.command {
        Command::Identify { digest } => {
            let image = FirmwareImage::load(&firmware)?;

            if digest {
                println!("{}", masked_digest(image.as_bytes())?);
            }

            let id = identify(image.as_bytes(), &catalog)?;
            println!("{}", id.release);
        }
        Command::VerifyCrc => {
            let image = FirmwareImage::load(&firmware)?;

            if !image.verify_crc()? {
                bail!("stored checksum {:08X} does not match", image.stored_crc()?);
            }
            println!("checksum {:08X} ok", image.stored_crc()?);
        }
        Command::BootLogo { image, battery } => {
            let logo = Raw565::from_image_file(&image, BOOT_LOGO)
                .with_context(|| format!("loading {}", image.display()))?;

            let mut session = FirmwareSession::open(&firmware, &catalog)?;
            session.set_boot_logo(&logo)?;
            if battery {
                session.patch_battery()?;
            }
            session.commit()?;

            println!("boot logo changed");
        }
        Command::ExtractLogo { output } => {
            let image = FirmwareImage::load(&firmware)?;
            save_pixels(&extract_boot_logo(&image)?, &output)?;
        }
        Command::Battery => {
            let image = FirmwareImage::load(&firmware)?;

            match apply_battery_patch(&image, &catalog)? {
                BatteryPatch::AlreadyApplied => println!("battery patch is already applied"),
                BatteryPatch::WrongFirmwareVersion => {
                    bail!("battery thresholds are not stock, update the firmware first")
                }
                BatteryPatch::Applied(patched) => {
                    patched.save(&firmware)?;
                    println!("battery patch applied");
                }
            }
        }
        Command::Rebuild {
            system,
            check,
            allow_empty,
        } => {
            let opts = RebuildOptions { check, allow_empty };
            let reports = layout.rebuild(system, opts, &mut Logged::default())?;

            for (system, report) in reports {
                match report {
                    RebuildReport::Written { games } => println!("{system}: {games} games"),
                    RebuildReport::Checked { games, matches } => {
                        println!("{system}: {games} games, matching {matches:?}")
                    }
                    RebuildReport::SkippedEmpty => println!("{system}: no games, skipped"),
                }
            }
        }
        Command::List { system, which } => {
            for name in layout.read_index(system, which)?.display_names() {
                println!("{name}");
            }
        }
        Command::Shortcut {
            system,
            slot,
            filename,
        } => {
            layout.set_shortcut(system, slot as usize - 1, &filename)?;
        }
        Command::ShortcutIcon {
            system,
            slot,
            image,
        } => {
            let icon = Raw565::from_image_file(&image, SHORTCUT_ICON)
                .with_context(|| format!("loading {}", image.display()))?;

            layout.set_shortcut_icon(system, slot as usize - 1, &icon)?;
        }
        Command::Cover { rom, image, output } => {
            let cover = Raw565::from_image_file(&image, ROM_COVER)
                .with_context(|| format!("loading {}", image.display()))?;

            let target = write_cover_file(&rom, &cover, output.as_deref())?;
            println!("cover written to {}", target.display());
        }
        Command::ExtractCover { rom, output } => match read_cover_file(&rom)? {
            Some(cover) => save_pixels(&cover, &output)?,
            None => bail!("{} has no cover", rom.display()),
        },
        Command::Find {
            file,
            pattern,
            start,
        } => {
            let data = read(&file)?;
            let mut offset = start;

            while let Some(found) = find(&pattern.0, &data, offset) {
                println!("0x{:08X}", found);
                offset = found + 1;
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let result = run(args);

    if let Err(err) = &result {
        if let Some(err) = err.downcast_ref::<sfcard::Error>() {
            if err.is_recoverable() {
                warn!("nothing was written to the card");
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("sfcard").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn card_commands_need_a_card() {
        let args = command(&["rebuild", "all"]);
        assert!(args.command.uses_card(args.firmware.is_some()));

        let args = command(&["battery"]);
        assert!(args.command.uses_card(args.firmware.is_some()));

        let args = command(&["--firmware", "dump.asd", "battery"]);
        assert!(!args.command.uses_card(args.firmware.is_some()));

        let args = command(&["find", "dump.asd", "625f"]);
        assert!(!args.command.uses_card(args.firmware.is_some()));
    }

    #[test]
    fn bare_rom_cover_is_refused_before_writing() {
        let dir = std::env::temp_dir().join(format!("sfcard-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let rom = dir.join("Game.gba");
        let cover = dir.join("cover.png");
        std::fs::write(&rom, b"rom").unwrap();
        image::RgbImage::new(4, 4).save(&cover).unwrap();

        let args = command(&[
            "cover",
            rom.to_str().unwrap(),
            cover.to_str().unwrap(),
        ]);
        assert!(run(args).is_err());
        assert_eq!(std::fs::read(&rom).unwrap(), b"rom");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn hex_patterns() {
        assert_eq!("62 61 64".parse::<HexPattern>().unwrap().0, [0x62, 0x61, 0x64]);
        assert!(matches!("625".parse::<HexPattern>(), Err(ParseHexError::OddLength)));
        assert!(matches!("zz".parse::<HexPattern>(), Err(ParseHexError::IntError(_))));
    }
}
