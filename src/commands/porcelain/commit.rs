use crate::areas::repository::Repository;
use crate::artifacts::objects::person::Person;
use anyhow::Context;
use std::io::Write;

/// Commit the staged files with the configured identity as author and
/// committer
pub fn commit(
    repository: &mut Repository,
    message: &str,
    writer: &mut impl Write,
) -> anyhow::Result<()> {
    let author = Person::from_config(repository.config())
        .context("set user.name and user.email, or CAIRN_AUTHOR_NAME and CAIRN_AUTHOR_EMAIL")?;
    let is_root = repository.head()?.is_none();

    let commit_oid = repository.commit(message.trim(), author.clone(), author)?;
    let commit = repository.database().load_commit(&commit_oid)?;

    let location = match repository.refs().get_head_branch()? {
        Some(branch) => branch.short_name().to_string(),
        None => "detached HEAD".to_string(),
    };
    let root_marker = if is_root { " (root-commit)" } else { "" };

    writeln!(
        writer,
        "[{location}{root_marker} {}] {}",
        commit_oid.to_short_oid(),
        commit.short_message()
    )?;

    Ok(())
}
