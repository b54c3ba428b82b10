use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};

/// `path` with `_orig` appended to the file name.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push("_orig");

    PathBuf::from(name)
}

/// Copies `path` to its `_orig` backup unless one already exists. An
/// existing backup is never overwritten, so it always holds the first
/// version this tool saw.
///
/// Returns the backup path if one was created.
pub fn back_up_once(path: &Path) -> Result<Option<PathBuf>> {
    if !path.is_file() {
        return Err(Error::MissingFile(path.to_path_buf()));
    }

    let backup = backup_path(path);
    if backup.exists() {
        return Ok(None);
    }

    fs::copy(path, &backup)?;
    info!("backed up {} as {}", path.display(), backup.display());

    Ok(Some(backup))
}
