use crate::areas::repository::Repository;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatFileMode {
    /// Pretty-print the object's content
    Pretty,
    /// Print the object's kind
    Type,
}

/// Print a stored object; `revision` may be a ref or a (possibly abbreviated) id
pub fn cat_file(
    repository: &Repository,
    revision: &str,
    mode: CatFileMode,
    writer: &mut impl Write,
) -> anyhow::Result<()> {
    let oid = repository.resolve_revision(revision)?;
    let object = repository.database().load(&oid)?;

    match mode {
        CatFileMode::Pretty => write!(writer, "{object}")?,
        CatFileMode::Type => writeln!(writer, "{}", object.object_type())?,
    }

    Ok(())
}
