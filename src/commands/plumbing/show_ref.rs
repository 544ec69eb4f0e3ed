use crate::areas::repository::Repository;
use std::io::Write;

/// Print every reference under `refs/` with the id it resolves to
///
/// References that cannot be resolved are skipped.
pub fn show_ref(repository: &Repository, writer: &mut impl Write) -> anyhow::Result<()> {
    for name in repository.refs().list_all()? {
        if let Some(oid) = repository.refs().read(&name)? {
            writeln!(writer, "{oid} {name}")?;
        }
    }

    Ok(())
}
