//! Operations against a mounted SD card.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::backup::back_up_once;
use crate::error::{Error, Result};
use crate::index::{encode_index, strip_file_extension, IndexFile, SortPolicy};
use crate::progress::Progress;
use crate::rgb565::Raw565;
use crate::shortcut::ShortcutTable;
use crate::splice::{BackgroundCanvas, ContainerKind};
use crate::system::{is_rom_file, System, SystemSelection};

pub const FIRMWARE: &str = "bios/bisrv.asd";
pub const RESOURCES: &str = "Resources";
pub const SHORTCUT_TABLE: &str = "xfgle.hgp";

/// Paths of everything this tool touches, relative to the card root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardLayout {
    root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RebuildOptions {
    /// Compare against the files on the card instead of writing.
    pub check: bool,
    /// Write a list even if the ROM folder has no games.
    pub allow_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReport {
    Written { games: usize },
    /// Whether each of the three files already matched.
    Checked { games: usize, matches: [bool; 3] },
    SkippedEmpty,
}

impl CardLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn firmware(&self) -> PathBuf {
        self.root.join(FIRMWARE)
    }

    pub fn resource(&self, name: &str) -> PathBuf {
        self.root.join(RESOURCES).join(name)
    }

    pub fn index_paths(&self, system: System) -> [PathBuf; 3] {
        system.index_files().map(|name| self.resource(name))
    }

    pub fn shortcut_table(&self) -> PathBuf {
        self.resource(SHORTCUT_TABLE)
    }

    pub fn background(&self, system: System) -> PathBuf {
        self.resource(system.background_file())
    }

    pub fn rom_dir(&self, system: System) -> PathBuf {
        self.root.join(system.to_string())
    }

    /// A card always has the firmware image; anything else is not one.
    pub fn looks_like_card(&self) -> bool {
        self.firmware().is_file()
    }

    /// File names of the games in a system's folder, sorted.
    pub fn list_roms(&self, system: System) -> Result<Vec<String>> {
        let dir = self.rom_dir(system);
        if !dir.is_dir() {
            return Err(Error::MissingFile(dir));
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !is_rom_file(&path) {
                continue;
            }

            match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => names.push(name.to_string()),
                None => warn!("skipping non UTF-8 file name {}", path.display()),
            }
        }
        names.sort();

        debug!("found {} games in {}", names.len(), dir.display());

        Ok(names)
    }

    /// The three index files for `filenames`: raw names sorted without
    /// extension, then display names and pinyin (both extension-stripped
    /// names in plain order).
    pub fn build_game_lists(filenames: &[String]) -> Result<[Vec<u8>; 3]> {
        let files: BTreeMap<String, String> =
            filenames.iter().map(|f| (f.clone(), f.clone())).collect();
        let stripped: BTreeMap<String, String> = filenames
            .iter()
            .map(|f| (f.clone(), strip_file_extension(f).to_string()))
            .collect();

        Ok([
            encode_index(&files, SortPolicy::IgnoreExtension)?,
            encode_index(&stripped, SortPolicy::Plain)?,
            encode_index(&stripped, SortPolicy::Plain)?,
        ])
    }

    pub fn rebuild_game_list(&self, system: System, opts: RebuildOptions) -> Result<RebuildReport> {
        let paths = self.index_paths(system);
        for path in &paths {
            if !path.is_file() {
                return Err(Error::MissingFile(path.clone()));
            }
        }

        let roms = self.list_roms(system)?;
        if roms.is_empty() && !opts.allow_empty {
            warn!("no games found for {}, leaving its list alone", system);
            return Ok(RebuildReport::SkippedEmpty);
        }

        let lists = Self::build_game_lists(&roms)?;

        if opts.check {
            let mut matches = [false; 3];
            for ((m, path), list) in matches.iter_mut().zip(&paths).zip(&lists) {
                *m = fs::read(path)? == *list;
                if !*m {
                    warn!("{} does not match", path.display());
                }
            }

            return Ok(RebuildReport::Checked {
                games: roms.len(),
                matches,
            });
        }

        for path in &paths {
            back_up_once(path)?;
        }
        for (path, list) in paths.iter().zip(&lists) {
            fs::write(path, list)?;
            info!("wrote {} ({} games)", path.display(), roms.len());
        }

        Ok(RebuildReport::Written { games: roms.len() })
    }

    pub fn rebuild(
        &self,
        selection: SystemSelection,
        opts: RebuildOptions,
        progress: &mut dyn Progress,
    ) -> Result<Vec<(System, RebuildReport)>> {
        let systems = selection.systems();
        progress.begin(systems.len());

        let mut reports = Vec::with_capacity(systems.len());
        for system in systems {
            progress.step(&format!("rebuilding {} game list", system));
            reports.push((system, self.rebuild_game_list(system, opts)?));
        }

        Ok(reports)
    }

    /// One of a system's index files, decoded. `which` is 0 for file names,
    /// 1 for display names and 2 for pinyin.
    pub fn read_index(&self, system: System, which: usize) -> Result<IndexFile> {
        let path = self
            .index_paths(system)
            .into_iter()
            .nth(which)
            .ok_or_else(|| Error::MalformedIndex(format!("no index file {which}")))?;

        if !path.is_file() {
            return Err(Error::MissingFile(path));
        }

        IndexFile::decode(&fs::read(path)?)
    }

    pub fn load_shortcuts(&self) -> Result<ShortcutTable> {
        let path = self.shortcut_table();
        if !path.is_file() {
            return Err(Error::MissingFile(path));
        }

        Ok(ShortcutTable::parse(&fs::read_to_string(path)?))
    }

    pub fn set_shortcut(&self, system: System, slot: usize, filename: &str) -> Result<()> {
        let mut table = self.load_shortcuts()?;
        table.set(system, slot, filename)?;

        let path = self.shortcut_table();
        back_up_once(&path)?;
        fs::write(&path, table.to_string())?;
        info!("{} shortcut {} is now {}", system, slot + 1, filename);

        Ok(())
    }

    pub fn set_shortcut_icon(&self, system: System, slot: usize, icon: &Raw565) -> Result<()> {
        let path = self.background(system);
        if !path.is_file() {
            return Err(Error::MissingFile(path));
        }

        let mut canvas = BackgroundCanvas::load(&path)?;
        canvas.set_shortcut_icon(slot, icon)?;

        back_up_once(&path)?;
        fs::write(&path, canvas.into_bytes())?;
        info!("updated {} menu background", system);

        Ok(())
    }
}

/// The cover stored in a game file, if it has one.
pub fn read_cover_file(path: &Path) -> Result<Option<Raw565>> {
    ContainerKind::classify(path).read_cover(&fs::read(path)?)
}

/// Splices `cover` into the game at `path` and writes the result to
/// `output`, or back over `path`. Returns where it was written.
///
/// The target must be a container the menu reads covers from. A bare ROM
/// with a cover in front of it no longer boots, so writing one back over
/// itself (or to another bare name) is refused.
pub fn write_cover_file(path: &Path, cover: &Raw565, output: Option<&Path>) -> Result<PathBuf> {
    let target = output.unwrap_or(path).to_path_buf();
    if ContainerKind::classify(&target) != ContainerKind::Thumbnailed {
        return Err(Error::NoCoverSlot(target));
    }

    let kind = ContainerKind::classify(path);
    let bytes = kind.write_cover(&fs::read(path)?, cover)?;

    fs::write(&target, bytes)?;
    info!("wrote {:?} cover to {}", kind, target.display());

    Ok(target)
}
