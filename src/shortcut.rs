//! The game shortcut table (`Resources/xfgle.hgp`).
//!
//! A text file with four lines per system, in the order of
//! [`System::shortcut_position`]. Line `4 * position + slot` holds that
//! slot's game as `"<prefix> <filename>*"`, where the prefix is 6 for ARCADE
//! (the last block) and 9 for everything else.

use std::fmt;

use crate::error::{Error, Result};
use crate::system::System;

pub const SLOTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutTable {
    /// Lines including their terminators, so untouched lines survive
    /// byte-for-byte.
    lines: Vec<String>,
}

/// Line index of `slot` for `system`.
pub fn line_index(system: System, slot: usize) -> Result<usize> {
    if slot >= SLOTS {
        return Err(Error::InvalidSlot(slot));
    }

    Ok(system.shortcut_position() * SLOTS + slot)
}

/// The `(system, slot)` a line index belongs to.
pub fn locate(line: usize) -> Option<(System, usize)> {
    System::from_shortcut_position(line / SLOTS).map(|system| (system, line % SLOTS))
}

fn parse_line(line: &str) -> Option<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (_, rest) = line.split_once(' ')?;

    rest.strip_suffix('*')
}

impl ShortcutTable {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(String::from).collect(),
        }
    }

    fn line(&self, index: usize) -> Result<&str> {
        self.lines
            .get(index)
            .map(String::as_str)
            .ok_or(Error::MalformedShortcutTable {
                lines: self.lines.len(),
                needed: index + 1,
            })
    }

    /// The filename in `slot` of `system`, if the line holds one.
    pub fn get(&self, system: System, slot: usize) -> Result<Option<&str>> {
        Ok(parse_line(self.line(line_index(system, slot)?)?))
    }

    /// Rewrites exactly one line; the rest of the table is untouched.
    pub fn set(&mut self, system: System, slot: usize, filename: &str) -> Result<()> {
        let index = line_index(system, slot)?;
        self.line(index)?;

        self.lines[index] = format!("{} {}*\n", system.shortcut_prefix(), filename);

        Ok(())
    }

    /// All four slots of `system`.
    pub fn shortcuts(&self, system: System) -> Result<[Option<&str>; SLOTS]> {
        Ok([
            self.get(system, 0)?,
            self.get(system, 1)?,
            self.get(system, 2)?,
            self.get(system, 3)?,
        ])
    }

    /// The slot `filename` occupies in `system`'s block, if any.
    pub fn position_of(&self, system: System, filename: &str) -> Option<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| parse_line(line) == Some(filename))
            .filter_map(|(i, _)| locate(i))
            .find(|(s, _)| *s == system)
            .map(|(_, slot)| slot)
    }
}

impl fmt::Display for ShortcutTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.lines.iter().try_for_each(|line| f.write_str(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn blocks() -> Vec<System> {
        let mut systems: Vec<System> = System::iter().collect();
        systems.sort_by_key(|s| s.shortcut_position());
        systems
    }

    fn stock_table() -> ShortcutTable {
        let text: String = blocks()
            .into_iter()
            .flat_map(|s| {
                (0..SLOTS).map(move |i| format!("{} game{}_{}.zip*\r\n", s.shortcut_prefix(), s, i))
            })
            .collect();

        ShortcutTable::parse(&text)
    }

    #[test]
    fn write_then_read() {
        let mut table = stock_table();
        table.set(System::Gba, 2, "Metroid Fusion.gba").unwrap();

        assert_eq!(table.get(System::Gba, 2).unwrap(), Some("Metroid Fusion.gba"));
        assert_eq!(table.position_of(System::Gba, "Metroid Fusion.gba"), Some(2));
        assert_eq!(table.position_of(System::Gb, "Metroid Fusion.gba"), None);
    }

    #[test]
    fn write_touches_one_line() {
        let original = stock_table();
        let mut table = original.clone();
        table.set(System::Arcade, 0, "kof98.zip").unwrap();

        let before = original.to_string();
        let after = table.to_string();
        let changed: Vec<usize> = before
            .lines()
            .zip(after.lines())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect();

        assert_eq!(changed, [24]);
        assert!(after.ends_with(
            "6 kof98.zip*\n6 gameARCADE_1.zip*\r\n6 gameARCADE_2.zip*\r\n6 gameARCADE_3.zip*\r\n"
        ));
        for system in System::iter().filter(|s| *s != System::Arcade) {
            assert_eq!(table.shortcuts(system).unwrap(), original.shortcuts(system).unwrap());
        }
    }

    #[test]
    fn non_arcade_prefix() {
        let mut table = stock_table();
        table.set(System::Sfc, 3, "Mario.sfc").unwrap();

        assert_eq!(table.to_string().lines().nth(3), Some("9 Mario.sfc*"));
        assert!(table.to_string().starts_with("9 gameSFC_0.zip*\r\n"));
    }

    #[test]
    fn arcade_is_the_last_block() {
        let text: String = (0..28)
            .map(|i| format!("{} g{i}*\n", if i >= 24 { 6 } else { 9 }))
            .collect();
        let mut table = ShortcutTable::parse(&text);

        for slot in 0..SLOTS {
            assert_eq!(line_index(System::Arcade, slot).unwrap(), 24 + slot);
        }
        assert_eq!(table.get(System::Arcade, 0).unwrap(), Some("g24"));
        assert_eq!(table.get(System::Sfc, 0).unwrap(), Some("g0"));
        assert_eq!(locate(27), Some((System::Arcade, 3)));

        table.set(System::Arcade, 0, "kof.zip").unwrap();
        let lines: Vec<String> = table.to_string().lines().map(String::from).collect();
        assert_eq!(lines[0], "9 g0*");
        assert_eq!(lines[24], "6 kof.zip*");
        assert_eq!(table.position_of(System::Arcade, "kof.zip"), Some(0));
    }

    #[test]
    fn addressing_round_trips() {
        for system in System::iter() {
            for slot in 0..SLOTS {
                assert_eq!(locate(line_index(system, slot).unwrap()), Some((system, slot)));
            }
        }
        assert_eq!(locate(4 * 7), None);
        assert!(matches!(line_index(System::Fc, 4), Err(Error::InvalidSlot(4))));
    }

    #[test]
    fn short_table_is_rejected() {
        let mut table = ShortcutTable::parse("6 a.zip*\n");

        assert!(matches!(
            table.set(System::Fc, 1, "b.nes"),
            Err(Error::MalformedShortcutTable { lines: 1, needed: 6 })
        ));
        assert_eq!(table.to_string(), "6 a.zip*\n");
    }
}
