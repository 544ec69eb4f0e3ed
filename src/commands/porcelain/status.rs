use crate::areas::repository::Repository;
use crate::artifacts::status::status_info::StatusInfo;
use colored::Colorize;
use std::io::Write;

pub fn status(repository: &Repository, short: bool, writer: &mut impl Write) -> anyhow::Result<()> {
    let status = repository.status()?;

    if short {
        for line in status.short_lines() {
            writeln!(writer, "{line}")?;
        }
        return Ok(());
    }

    match repository.refs().get_head_branch()? {
        Some(branch) => writeln!(writer, "On branch {}", branch.short_name())?,
        None => writeln!(writer, "HEAD detached")?,
    }
    if repository.head()?.is_none() {
        writeln!(writer, "\nNo commits yet")?;
    }

    print_long_format(&status, writer)
}

fn print_long_format(status: &StatusInfo, writer: &mut impl Write) -> anyhow::Result<()> {
    if !status.staged.is_empty() {
        writeln!(writer, "\nChanges to be committed:")?;
        for (path, change) in &status.staged {
            writeln!(writer, "{change}{}", path.display().to_string().green())?;
        }
    }

    if !status.workspace.is_empty() {
        writeln!(writer, "\nChanges not staged for commit:")?;
        for (path, change) in &status.workspace {
            writeln!(writer, "{change}{}", path.display().to_string().red())?;
        }
    }

    if !status.untracked.is_empty() {
        writeln!(writer, "\nUntracked files:")?;
        for path in &status.untracked {
            writeln!(writer, "        {}", path.display().to_string().red())?;
        }
    }

    if status.is_clean() {
        writeln!(writer, "\nnothing to commit, working tree clean")?;
    } else if status.staged.is_empty() {
        writeln!(writer, "\nno changes added to commit")?;
    }

    Ok(())
}
