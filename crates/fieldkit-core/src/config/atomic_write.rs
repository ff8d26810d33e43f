//! Temp-file-and-rename persistence.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

/// Rename step of an atomic write, swappable in tests.
pub type RenameFn = fn(&Path, &Path) -> io::Result<()>;

pub fn std_rename(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Temp file renamed over the target.
    Renamed,
    /// Rename crossed filesystems; the target was overwritten in place.
    InPlace,
}

/// Write `contents` to a sibling temp file and rename it over `path`.
///
/// A cross-device rename falls back to a non-atomic in-place write. Any other
/// failure removes the temp file and is returned.
pub fn write_atomic(path: &Path, contents: &[u8], rename: RenameFn) -> io::Result<WriteOutcome> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_sibling(path);
    if let Err(error) = write_synced(&temp_path, contents) {
        let _ = fs::remove_file(&temp_path);
        return Err(error);
    }

    match rename(&temp_path, path) {
        Ok(()) => Ok(WriteOutcome::Renamed),
        Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
            warn!(
                path = %path.display(),
                "temp file is on another device, writing configuration in place"
            );
            let result = write_synced(path, contents);
            let _ = fs::remove_file(&temp_path);
            result.map(|()| WriteOutcome::InPlace)
        }
        Err(error) => {
            let _ = fs::remove_file(&temp_path);
            Err(error)
        }
    }
}

fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    path.with_file_name(format!(".{file_name}.{:08x}.tmp", rand::random::<u32>()))
}
