use crate::areas::database::Database;
use crate::artifacts::digest::hasher::Hasher;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

/// Print the blob id of a file, storing the blob when a database is given
pub fn hash_object(
    file: &Path,
    database: Option<&Database>,
    writer: &mut impl Write,
) -> anyhow::Result<ObjectId> {
    let oid = match database {
        Some(database) => {
            let content = std::fs::read(file)
                .with_context(|| format!("could not read {}", file.display()))?;
            database.store(Blob::new(content))?
        }
        None => {
            let handle = std::fs::File::open(file)
                .with_context(|| format!("could not open {}", file.display()))?;
            let len = handle.metadata()?.len();
            Hasher::hash_object_reader(ObjectType::Blob, len, handle)?
        }
    };

    writeln!(writer, "{oid}")?;

    Ok(oid)
}
