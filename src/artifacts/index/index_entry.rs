//! Index entry representation
//!
//! Each entry in the index represents a tracked file with:
//! - File path, relative to the working tree root, `/`-separated
//! - Content hash (blob object ID)
//! - File metadata (mode, size, modification time)
//!
//! The metadata snapshot lets the index answer "has this file changed?" by
//! comparing it against a fresh `stat`, without rehashing the content.

use crate::artifacts::index::file_mode::FileMode;
use crate::artifacts::index::{ENTRY_FIXED_SIZE, PATH_LENGTH_SIZE};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, Result};
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use is_executable::IsExecutable;
use std::fs::Metadata;
use std::io::{Cursor, Read, Write};
use std::os::unix::prelude::MetadataExt;
use std::path::{Component, Path, PathBuf};

/// Index entry representing a tracked file
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct IndexEntry {
    /// File path relative to repository root
    pub path: PathBuf,
    /// Blob id of the staged content
    pub oid: ObjectId,
    /// Snapshot of the file's metadata when it was staged
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn basename(&self) -> Result<&str> {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::invalid(format!("invalid file name {}", self.path.display())))
    }

    /// Ancestor directories of the entry, outermost first
    ///
    /// `a/b/c` yields `a` and `a/b`.
    pub fn parent_dirs(&self) -> Vec<&Path> {
        let mut dirs = self
            .path
            .ancestors()
            .skip(1)
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect::<Vec<_>>();
        dirs.reverse();
        dirs
    }

    /// The path split into its UTF-8 components
    pub fn path_components(&self) -> Result<Vec<&str>> {
        self.path
            .components()
            .map(|component| match component {
                Component::Normal(name) => name.to_str().ok_or_else(|| {
                    Error::invalid(format!("non UTF-8 path {}", self.path.display()))
                }),
                _ => Err(Error::invalid(format!(
                    "index paths must be relative and normalized: {}",
                    self.path.display()
                ))),
            })
            .collect()
    }

    /// Whether a fresh stat still matches the staged snapshot
    ///
    /// Only mode, size and modification time are compared, so a rewrite that
    /// keeps all three identical goes unnoticed.
    pub fn stat_match(&self, current: &EntryMetadata) -> bool {
        self.metadata.mode == current.mode
            && self.metadata.size == current.size
            && self.metadata.mtime == current.mtime
            && self.metadata.mtime_nsec == current.mtime_nsec
    }

    /// Encoded length of the record, path prefix included
    pub fn encoded_len(&self) -> usize {
        PATH_LENGTH_SIZE + self.path.as_os_str().len() + ENTRY_FIXED_SIZE
    }

    pub fn serialize(&self) -> Result<Bytes> {
        let path = self
            .path
            .to_str()
            .ok_or_else(|| Error::invalid(format!("non UTF-8 path {}", self.path.display())))?;
        let path_len = u16::try_from(path.len())
            .map_err(|_| Error::invalid(format!("path too long for the index: {path}")))?;

        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.write_u16::<NetworkEndian>(path_len)?;
        bytes.write_all(path.as_bytes())?;
        self.oid.write_raw_to(&mut bytes)?;
        bytes.write_u32::<NetworkEndian>(self.metadata.mode.as_u32())?;
        bytes.write_i64::<NetworkEndian>(self.metadata.mtime)?;
        bytes.write_u32::<NetworkEndian>(self.metadata.mtime_nsec)?;
        bytes.write_u64::<NetworkEndian>(self.metadata.size)?;

        Ok(Bytes::from(bytes))
    }

    /// Parse the record that follows a path length prefix
    ///
    /// `bytes` holds the path followed by the fixed-width fields.
    pub fn deserialize(bytes: Bytes, path_len: usize) -> Result<Self> {
        if bytes.len() != path_len + ENTRY_FIXED_SIZE {
            return Err(Error::corrupt("invalid index entry size"));
        }

        let path = std::str::from_utf8(&bytes[..path_len])
            .map_err(|_| Error::corrupt("index entry path is not valid UTF-8"))?;
        if path.is_empty() {
            return Err(Error::corrupt("index entry with an empty path"));
        }

        let mut reader = Cursor::new(&bytes[path_len..]);
        let oid = ObjectId::read_raw_from(&mut reader)?;
        let mode = FileMode::try_from(reader.read_u32::<NetworkEndian>()?)?;
        let mtime = reader.read_i64::<NetworkEndian>()?;
        let mtime_nsec = reader.read_u32::<NetworkEndian>()?;
        let size = reader.read_u64::<NetworkEndian>()?;

        Ok(IndexEntry {
            path: PathBuf::from(path),
            oid,
            metadata: EntryMetadata {
                mode,
                mtime,
                mtime_nsec,
                size,
            },
        })
    }

    /// Read a full record (prefix included) from a plain reader
    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        let path_len = reader.read_u16::<NetworkEndian>()? as usize;
        let mut bytes = vec![0; path_len + ENTRY_FIXED_SIZE];
        reader.read_exact(&mut bytes)?;

        Self::deserialize(Bytes::from(bytes), path_len)
    }
}

impl PartialOrd for IndexEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.path.cmp(&other.path)
    }
}

/// File metadata stored in index entries
///
/// `mtime` is in seconds since the Unix epoch, `mtime_nsec` carries the
/// sub-second part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    pub mode: FileMode,
    pub mtime: i64,
    pub mtime_nsec: u32,
    pub size: u64,
}

impl TryFrom<(&Path, &Metadata)> for EntryMetadata {
    type Error = Error;

    /// Snapshot `lstat`-style metadata of the file at `file_path`
    fn try_from((file_path, metadata): (&Path, &Metadata)) -> Result<Self> {
        let file_type = metadata.file_type();
        let mode = if file_type.is_symlink() {
            FileMode::Symlink
        } else if file_type.is_dir() {
            FileMode::Directory
        } else if file_path.is_executable() {
            FileMode::Executable
        } else {
            FileMode::Regular
        };

        Ok(Self {
            mode,
            mtime: metadata.mtime(),
            mtime_nsec: u32::try_from(metadata.mtime_nsec())
                .map_err(|_| Error::invalid("modification time out of range"))?,
            size: metadata.size(),
        })
    }
}
