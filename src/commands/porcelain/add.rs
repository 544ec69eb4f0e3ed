use crate::areas::repository::Repository;
use std::path::PathBuf;

/// Stage every given path, then persist the index once
///
/// Nothing is saved if any path fails, so a bad pathspec leaves the index
/// as it was.
pub fn add(repository: &mut Repository, paths: &[PathBuf]) -> anyhow::Result<()> {
    for path in paths {
        repository.add(path)?;
    }

    repository.save_index()?;

    Ok(())
}
