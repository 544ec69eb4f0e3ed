use crate::areas::repository::Repository;
use colored::Colorize;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchAction {
    List,
    Create { name: String, start: Option<String> },
    Delete { name: String },
}

pub fn branch(
    repository: &Repository,
    action: BranchAction,
    writer: &mut impl Write,
) -> anyhow::Result<()> {
    match action {
        BranchAction::List => list_branches(repository, writer),
        BranchAction::Create { name, start } => {
            repository.create_branch(&name, start.as_deref())?;
            Ok(())
        }
        BranchAction::Delete { name } => {
            let oid = repository.delete_branch(&name)?;
            writeln!(writer, "Deleted branch {name} (was {}).", oid.to_short_oid())?;
            Ok(())
        }
    }
}

fn list_branches(repository: &Repository, writer: &mut impl Write) -> anyhow::Result<()> {
    let current = repository.refs().get_head_branch()?;

    for branch in repository.refs().list_branches()? {
        if current.as_ref() == Some(&branch) {
            writeln!(writer, "* {}", branch.short_name().green())?;
        } else {
            writeln!(writer, "  {}", branch.short_name())?;
        }
    }

    Ok(())
}
