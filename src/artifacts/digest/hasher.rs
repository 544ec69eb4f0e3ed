use crate::artifacts::digest::STREAM_CHUNK_SIZE;
use crate::artifacts::objects::OBJECT_ID_BYTES;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, Result};
use sha1::{Digest, Sha1};
use std::io::Read;
use std::path::Path;

/// Streaming SHA-1 hasher
///
/// Feed bytes with [`Hasher::update`] in any chunking and read the digest with
/// [`Hasher::finalize`]. Finalizing is idempotent: later calls return the same
/// cached digest. Updating a finalized hasher fails with `InvalidState`.
#[derive(Debug, Clone, Default)]
pub struct Hasher {
    digest: Sha1,
    finalized: Option<ObjectId>,
}

impl Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: impl AsRef<[u8]>) -> Result<()> {
        if self.finalized.is_some() {
            return Err(Error::InvalidState(
                "hasher was already finalized".to_string(),
            ));
        }

        self.digest.update(data.as_ref());
        Ok(())
    }

    pub fn finalize(&mut self) -> ObjectId {
        if let Some(oid) = self.finalized {
            return oid;
        }

        let digest = std::mem::take(&mut self.digest).finalize();
        let mut bytes = [0u8; OBJECT_ID_BYTES];
        bytes.copy_from_slice(&digest);

        let oid = ObjectId::from_bytes(bytes);
        self.finalized = Some(oid);
        oid
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    /// One-shot digest of an in-memory buffer
    pub fn hash(data: impl AsRef<[u8]>) -> ObjectId {
        let mut hasher = Self::new();
        hasher.digest.update(data.as_ref());
        hasher.finalize()
    }

    /// One-shot digest of several buffers, as if concatenated
    pub fn hash_parts(parts: &[&[u8]]) -> ObjectId {
        let mut hasher = Self::new();
        for part in parts {
            hasher.digest.update(*part);
        }
        hasher.finalize()
    }

    /// Digest everything a reader yields, in fixed-size chunks
    pub fn hash_reader(reader: impl Read) -> Result<ObjectId> {
        let mut hasher = Self::new();
        hasher.consume(reader)?;

        Ok(hasher.finalize())
    }

    pub fn hash_file(path: &Path) -> Result<ObjectId> {
        let file = std::fs::File::open(path)?;
        Self::hash_reader(file)
    }

    /// Digest the canonical encoding `<kind> <len>\0<payload>` of an object
    /// whose payload is streamed from `reader`
    ///
    /// Fails with `InvalidArgument` if the reader does not yield exactly `len` bytes.
    pub fn hash_object_reader(kind: ObjectType, len: u64, reader: impl Read) -> Result<ObjectId> {
        let mut hasher = Self::new();
        hasher.update(kind.header(len))?;

        let consumed = hasher.consume(reader)?;
        if consumed != len {
            return Err(Error::invalid(format!(
                "expected {len} bytes of {kind} content, read {consumed}"
            )));
        }

        Ok(hasher.finalize())
    }

    fn consume(&mut self, mut reader: impl Read) -> Result<u64> {
        let mut buffer = [0u8; STREAM_CHUNK_SIZE];
        let mut total = 0u64;

        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            };

            self.update(&buffer[..read])?;
            total += read as u64;
        }

        Ok(total)
    }
}
