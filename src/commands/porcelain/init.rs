use crate::areas::config::Config;
use crate::areas::repository::Repository;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

pub fn init(path: &Path, config: Config, writer: &mut impl Write) -> anyhow::Result<Repository> {
    let repository = Repository::create(path, config)
        .with_context(|| format!("failed to initialize a repository in {}", path.display()))?;

    writeln!(
        writer,
        "Initialized empty Cairn repository in {}",
        repository.control_path().display()
    )?;

    Ok(repository)
}
