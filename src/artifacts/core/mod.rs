//! Core utilities and shared filesystem helpers
//!
//! Every persistent file the repository owns (loose objects, references, the
//! index, the config) is replaced through [`write_atomically`]: the full
//! content lands in a temporary sibling first and is then renamed over the
//! final name, so readers only ever observe complete files.

use fake::rand;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Write `data` to `path` through a temporary sibling file and a rename
///
/// Parent directories are created as needed.
pub fn write_atomically(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        )
    })?;
    std::fs::create_dir_all(parent)?;

    let temp_path = temp_path_for(path);
    let result = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        })
        .and_then(|_| std::fs::rename(&temp_path, path));

    if result.is_err() {
        // leave no stray temp file behind
        let _ = std::fs::remove_file(&temp_path);
    }

    result
}

/// Random temporary name next to `path`
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    path.with_file_name(format!("tmp-{file_name}-{}", rand::random::<u32>()))
}
