//! Content-addressed object store
//!
//! Objects are stored as individual zlib-compressed files holding their
//! canonical encoding, at `objects/<first-2-hex>/<remaining-38-hex>`.
//! Loads are verified: the decoded object's digest must equal the requested
//! one. An in-memory cache keyed by object id serves repeated reads; callers
//! always receive their own copy.

use crate::artifacts::core::write_atomically;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::errors::{Error, Result};
use bytes::Bytes;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
    compression: flate2::Compression,
    cache: RefCell<HashMap<ObjectId, Object>>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Self::with_compression(path, flate2::Compression::default())
    }

    pub fn with_compression(path: Box<Path>, compression: flate2::Compression) -> Self {
        Database {
            path,
            compression,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    fn object_path(&self, object_id: &ObjectId) -> PathBuf {
        self.path.join(object_id.to_path())
    }

    /// Persist an object and return its id
    ///
    /// Storing an object that is already on disk writes nothing.
    pub fn store(&self, object: impl Into<Object>) -> Result<ObjectId> {
        let object = object.into();
        let object_id = object.object_id();
        let object_path = self.object_path(&object_id);

        if object_path.exists() {
            debug!(oid = %object_id, "object already stored");
        } else {
            let compressed = self.compress(&object.encode())?;
            write_atomically(&object_path, &compressed)?;
            debug!(oid = %object_id, kind = %object.object_type(), "object stored");
        }

        self.cache.borrow_mut().insert(object_id, object);

        Ok(object_id)
    }

    /// Load and verify an object
    pub fn load(&self, object_id: &ObjectId) -> Result<Object> {
        if let Some(object) = self.cache.borrow().get(object_id) {
            debug!(oid = %object_id, "object cache hit");
            return Ok(object.clone());
        }

        let data = self.read_object(object_id)?;
        let object = Object::decode(data)?;

        if object.object_id() != *object_id {
            return Err(Error::corrupt(format!(
                "object {object_id} hashes to {}",
                object.object_id()
            )));
        }

        debug!(oid = %object_id, kind = %object.object_type(), "object loaded");
        self.cache.borrow_mut().insert(*object_id, object.clone());

        Ok(object)
    }

    pub fn exists(&self, object_id: &ObjectId) -> bool {
        self.object_path(object_id).exists()
    }

    pub fn load_blob(&self, object_id: &ObjectId) -> Result<Blob> {
        match self.load(object_id)? {
            Object::Blob(blob) => Ok(blob),
            other => Err(Self::kind_mismatch(object_id, ObjectType::Blob, &other)),
        }
    }

    pub fn load_tree(&self, object_id: &ObjectId) -> Result<Tree> {
        match self.load(object_id)? {
            Object::Tree(tree) => Ok(tree),
            other => Err(Self::kind_mismatch(object_id, ObjectType::Tree, &other)),
        }
    }

    pub fn load_commit(&self, object_id: &ObjectId) -> Result<Commit> {
        match self.load(object_id)? {
            Object::Commit(commit) => Ok(commit),
            other => Err(Self::kind_mismatch(object_id, ObjectType::Commit, &other)),
        }
    }

    fn kind_mismatch(object_id: &ObjectId, expected: ObjectType, found: &Object) -> Error {
        Error::invalid(format!(
            "object {object_id} is a {}, not a {expected}",
            found.object_type()
        ))
    }

    /// Kind of a stored object
    pub fn object_type(&self, object_id: &ObjectId) -> Result<ObjectType> {
        Ok(self.load(object_id)?.object_type())
    }

    /// Find all objects whose id starts with the given hex prefix
    ///
    /// Used to resolve abbreviated ids. More than one match means the prefix
    /// is ambiguous; an empty result means nothing matched.
    ///
    /// For prefixes of 2+ characters only the matching fan-out directory is
    /// scanned; shorter prefixes scan them all.
    pub fn find_objects_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        let prefix = prefix.to_lowercase();
        if prefix.len() > OBJECT_ID_LENGTH || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::invalid(format!("invalid object id prefix {prefix:?}")));
        }

        let dir_names = if prefix.len() >= 2 {
            vec![prefix[..2].to_string()]
        } else {
            (0..=255u8).map(|i| format!("{i:02x}")).collect()
        };

        let mut matches = Vec::new();
        for dir_name in dir_names {
            let dir_path = self.path.join(&dir_name);
            if !dir_path.is_dir() {
                continue;
            }

            for entry in std::fs::read_dir(&dir_path)? {
                let file_name = entry?.file_name();
                let full_oid = format!("{dir_name}{}", file_name.to_string_lossy());

                // temporary files and strays fail to parse and are skipped
                if full_oid.starts_with(&prefix)
                    && let Ok(oid) = ObjectId::try_parse(&full_oid)
                {
                    matches.push(oid);
                }
            }
        }

        matches.sort();
        Ok(matches)
    }

    fn read_object(&self, object_id: &ObjectId) -> Result<Bytes> {
        let object_path = self.object_path(object_id);

        let compressed = match std::fs::read(&object_path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ObjectNotFound(*object_id));
            }
            Err(error) => return Err(error.into()),
        };

        Self::decompress(&compressed)
            .map_err(|error| Error::corrupt(format!("object {object_id}: {error}")))
    }

    fn compress(&self, data: &[u8]) -> Result<Bytes> {
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), self.compression);
        encoder.write_all(data)?;

        Ok(encoder.finish()?.into())
    }

    fn decompress(data: &[u8]) -> std::io::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;

        Ok(decompressed.into())
    }

    /// Number of objects currently held in memory
    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Drop every cached object; later loads go back to disk
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}
