use crate::areas::repository::Repository;
use std::io::Write;
use std::path::PathBuf;

/// Unstage the given paths and, unless `cached`, delete them from the
/// working tree
pub fn rm(
    repository: &mut Repository,
    paths: &[PathBuf],
    cached: bool,
    writer: &mut impl Write,
) -> anyhow::Result<()> {
    let mut removed = Vec::new();
    for path in paths {
        removed.extend(repository.remove(path)?);
    }

    if !cached {
        for entry in &removed {
            repository.workspace().remove_file(&entry.path)?;
        }
    }

    repository.save_index()?;

    for entry in removed {
        writeln!(writer, "rm '{}'", entry.path.display())?;
    }

    Ok(())
}
