//! Game list index files.
//!
//! Each system's menu is driven by three of these (file names, display
//! names, pinyin initials). A file is a little-endian `u32` count, one `u32`
//! blob offset per game in display order, then the blob: every name as UTF-8
//! followed by a NUL.
//!
//! The blob is always laid out in ascending raw filename order, in all three
//! files, so blob entry `i` is the same game everywhere. Only the pointer
//! table carries the display order.

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

use binrw::{binrw, BinRead, BinWrite};

use crate::error::{Error, Result};

#[binrw]
#[brw(little)]
#[derive(Debug)]
struct IndexHeader {
    #[br(temp)]
    #[bw(calc = pointers.len() as u32)]
    count: u32,
    #[br(count = count)]
    pointers: Vec<u32>,
}

/// How games are ordered in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortPolicy {
    #[default]
    Plain,
    /// Compare names with their file extension removed. The stored names keep
    /// theirs.
    IgnoreExtension,
}

impl SortPolicy {
    pub fn key<'a>(&self, name: &'a str) -> &'a str {
        match self {
            SortPolicy::Plain => name,
            SortPolicy::IgnoreExtension => strip_file_extension(name),
        }
    }
}

/// `"Game.Name.gba"` -> `"Game.Name"`. Names without a dot are unchanged.
pub fn strip_file_extension(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

/// Builds an index file from raw filename -> display name pairs.
pub fn encode_index(entries: &BTreeMap<String, String>, sort: SortPolicy) -> Result<Vec<u8>> {
    let mut blob = Vec::new();
    let mut offsets = Vec::with_capacity(entries.len());
    let mut names = Vec::with_capacity(entries.len());

    for display in entries.values() {
        offsets.push(blob.len() as u32);
        names.push(display.as_str());
        blob.extend_from_slice(display.as_bytes());
        blob.push(0);
    }

    // Ties keep filename order, so equal names still get distinct rows.
    let mut order: Vec<usize> = (0..names.len()).collect();
    order.sort_by(|&a, &b| sort.key(names[a]).cmp(sort.key(names[b])).then(a.cmp(&b)));

    let header = IndexHeader {
        pointers: order.into_iter().map(|i| offsets[i]).collect(),
    };

    let mut out = Cursor::new(Vec::with_capacity(4 + 4 * entries.len() + blob.len()));
    header.write(&mut out)?;

    let mut out = out.into_inner();
    out.extend_from_slice(&blob);

    Ok(out)
}

/// A decoded index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFile {
    /// Names in blob (raw filename) order.
    names: Vec<String>,
    /// Blob entry shown at each menu position.
    order: Vec<usize>,
}

impl IndexFile {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(Error::MalformedIndex(format!(
                "{} bytes is too short for a header",
                bytes.len()
            )));
        }

        let count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let blob_start = 4 + 4 * count;
        if blob_start > bytes.len() {
            return Err(Error::MalformedIndex(format!(
                "{count} entries do not fit in {} bytes",
                bytes.len()
            )));
        }

        let header = IndexHeader::read(&mut Cursor::new(bytes))?;
        let blob = &bytes[blob_start..];

        let mut names = Vec::new();
        let mut by_offset = HashMap::new();
        let mut pos = 0;
        while pos < blob.len() {
            let len = blob[pos..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| Error::MalformedIndex(format!("unterminated name at {pos}")))?;

            let name = std::str::from_utf8(&blob[pos..pos + len])
                .map_err(|e| Error::MalformedIndex(format!("name at {pos}: {e}")))?;

            by_offset.insert(pos as u32, names.len());
            names.push(name.to_string());
            pos += len + 1;
        }

        let order = header
            .pointers
            .iter()
            .map(|p| {
                by_offset
                    .get(p)
                    .copied()
                    .ok_or_else(|| Error::MalformedIndex(format!("pointer {p} is not a name")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { names, order })
    }

    /// Number of games, as stored in the header.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Names in menu order.
    pub fn display_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(|&i| self.names[i].as_str())
    }

    /// Recovers filename -> display name pairs, given the filenames that
    /// were indexed. Fails if the counts disagree.
    pub fn pair_with<'a, I>(&self, filenames: I) -> Result<BTreeMap<String, String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut filenames: Vec<&str> = filenames.into_iter().collect();
        filenames.sort_unstable();

        if filenames.len() != self.names.len() {
            return Err(Error::MalformedIndex(format!(
                "{} names for {} files",
                self.names.len(),
                filenames.len()
            )));
        }

        Ok(filenames
            .into_iter()
            .map(String::from)
            .zip(self.names.iter().cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn exact_layout() {
        let entries = map(&[("b.gb", "Beta"), ("a.gb", "Zeta")]);
        let bytes = encode_index(&entries, SortPolicy::Plain).unwrap();

        // Blob is in filename order: "Zeta\0Beta\0"; display order is Beta, Zeta.
        let mut expected = vec![2, 0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0];
        expected.extend_from_slice(b"Zeta\0Beta\0");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn empty_index() {
        let bytes = encode_index(&BTreeMap::new(), SortPolicy::Plain).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0]);

        let decoded = IndexFile::decode(&bytes).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn decode_recovers_pairs() {
        let entries = map(&[
            ("Super Game (USA).sfc", "Super Game (USA)"),
            ("another.sfc", "another"),
            ("Zelda.smc", "Zelda"),
            ("ゲーム.sfc", "ゲーム"),
            ("dup.smc", "dup"),
            ("dup.sfc", "dup"),
        ]);
        let bytes = encode_index(&entries, SortPolicy::Plain).unwrap();
        let decoded = IndexFile::decode(&bytes).unwrap();

        assert_eq!(decoded.len(), entries.len());
        assert_eq!(
            u32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize,
            entries.len()
        );
        assert_eq!(
            decoded.pair_with(entries.keys().map(String::as_str)).unwrap(),
            entries
        );

        let shown: Vec<&str> = decoded.display_names().collect();
        let mut sorted: Vec<&str> = entries.values().map(String::as_str).collect();
        sorted.sort();
        assert_eq!(shown, sorted);
    }

    #[test]
    fn pointers_land_on_names() {
        let entries = map(&[("x.gba", "x"), ("y.gba", "yy"), ("z.gba", "zzz")]);
        let bytes = encode_index(&entries, SortPolicy::Plain).unwrap();
        let blob = &bytes[4 + 4 * 3..];

        for chunk in bytes[4..16].chunks_exact(4) {
            let p = u32::from_le_bytes(chunk.try_into().unwrap()) as usize;
            assert!(p == 0 || blob[p - 1] == 0);
            assert!(blob[p..].contains(&0));
        }
    }

    #[test]
    fn deterministic() {
        let entries = map(&[("c.nes", "c"), ("a.nes", "a"), ("b.nes", "b")]);
        assert_eq!(
            encode_index(&entries, SortPolicy::IgnoreExtension).unwrap(),
            encode_index(&entries, SortPolicy::IgnoreExtension).unwrap()
        );
    }

    #[test]
    fn extension_is_ignored_for_ordering() {
        // Plain order puts "Game 2.gb" before "Game.gb" (' ' < '.').
        let entries = map(&[("Game.gb", "Game.gb"), ("Game 2.gb", "Game 2.gb")]);

        let plain = IndexFile::decode(&encode_index(&entries, SortPolicy::Plain).unwrap()).unwrap();
        assert_eq!(plain.display_names().collect::<Vec<_>>(), ["Game 2.gb", "Game.gb"]);

        let stripped =
            IndexFile::decode(&encode_index(&entries, SortPolicy::IgnoreExtension).unwrap())
                .unwrap();
        assert_eq!(stripped.display_names().collect::<Vec<_>>(), ["Game.gb", "Game 2.gb"]);
    }

    #[test]
    fn strips_last_extension_only() {
        assert_eq!(strip_file_extension("a.b.zip"), "a.b");
        assert_eq!(strip_file_extension("noext"), "noext");
    }

    #[test]
    fn rejects_malformed() {
        assert!(IndexFile::decode(&[1, 0]).is_err());
        assert!(IndexFile::decode(&[5, 0, 0, 0, 0, 0, 0, 0]).is_err());
        // Pointer into the middle of a name.
        assert!(IndexFile::decode(&[1, 0, 0, 0, 1, 0, 0, 0, b'a', b'b', 0]).is_err());
        // Missing terminator.
        assert!(IndexFile::decode(&[1, 0, 0, 0, 0, 0, 0, 0, b'a']).is_err());
    }
}
