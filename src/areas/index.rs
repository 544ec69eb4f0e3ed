//! Staging index
//!
//! The index tracks which files should be included in the next commit, with
//! the blob id of their staged content and a metadata snapshot used to spot
//! modifications cheaply.
//!
//! ## Index File Format
//!
//! The index file contains:
//! - Header: signature, version, and entry count
//! - Entries: sorted list of tracked files with metadata
//! - Checksum: SHA-1 of everything before it, for integrity verification
//!
//! ## Data Structures
//!
//! - `entries`: maps file paths to their index entries
//! - `children`: maps directory paths to the tracked files below them, so a
//!   file replacing a directory (or the reverse) can evict the stale side

use crate::areas::CONTROL_DIR_NAME;
use crate::areas::workspace::Workspace;
use crate::artifacts::core::write_atomically;
use crate::artifacts::digest::hasher::Hasher;
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::file_mode::FileMode;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::{ENTRY_FIXED_SIZE, HEADER_SIZE, PATH_LENGTH_SIZE};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, Result};
use byteorder::{ByteOrder, NetworkEndian};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Index {
    /// Path to the index file (typically `.cairn/index`)
    path: Box<Path>,
    /// Tracked files mapped by path
    entries: BTreeMap<PathBuf, IndexEntry>,
    /// Directory hierarchy for efficient parent-child lookups
    children: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    /// Whether the index has been modified since it was loaded or saved
    changed: bool,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            children: BTreeMap::new(),
            changed: false,
        }
    }

    /// Create an index and load it from `path`
    pub fn open(path: Box<Path>) -> Result<Self> {
        let mut index = Self::new(path);
        index.load()?;
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Replace the in-memory state with the content of the index file
    ///
    /// A missing file loads as an empty index.
    pub fn load(&mut self) -> Result<()> {
        self.entries.clear();
        self.children.clear();
        self.changed = false;

        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no index file, starting empty");
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        };

        let mut reader = Checksum::new(Cursor::new(data));
        let header = IndexHeader::deserialize(&reader.read(HEADER_SIZE)?)?;
        self.parse_entries(header.entries_count, &mut reader)?;
        reader.verify()?;

        debug!(entries = self.entries.len(), "index loaded");
        Ok(())
    }

    fn parse_entries(
        &mut self,
        entries_count: u32,
        reader: &mut Checksum<Cursor<Vec<u8>>>,
    ) -> Result<()> {
        let mut previous: Option<PathBuf> = None;

        for _ in 0..entries_count {
            let path_len = NetworkEndian::read_u16(&reader.read(PATH_LENGTH_SIZE)?) as usize;
            let record = reader.read(path_len + ENTRY_FIXED_SIZE)?;
            let entry = IndexEntry::deserialize(record, path_len)?;
            Self::check_loaded_path(&entry)?;

            if previous.as_ref().is_some_and(|previous| *previous >= entry.path) {
                return Err(Error::corrupt(format!(
                    "index entries are not sorted at {}",
                    entry.path.display()
                )));
            }
            previous = Some(entry.path.clone());

            self.store_entry(entry);
        }

        Ok(())
    }

    /// Loaded paths must be ones `stage` would have accepted
    fn check_loaded_path(entry: &IndexEntry) -> Result<()> {
        let components = entry.path_components().map_err(|error| {
            Error::corrupt(format!("index entry {}: {error}", entry.path.display()))
        })?;

        match components.first() {
            None => Err(Error::corrupt("index entry has an empty path")),
            Some(&first) if first == CONTROL_DIR_NAME => Err(Error::corrupt(format!(
                "index entry {} is inside the control directory",
                entry.path.display()
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Persist the index through a temporary file and a rename
    pub fn save(&mut self) -> Result<()> {
        let entries_count = u32::try_from(self.entries.len())
            .map_err(|_| Error::invalid("too many index entries"))?;
        let header = IndexHeader {
            entries_count,
            ..IndexHeader::empty()
        };

        let mut writer = Checksum::new(Vec::new());
        writer.write(&header.serialize()?)?;
        for entry in self.entries.values() {
            writer.write(&entry.serialize()?)?;
        }
        writer.write_checksum()?;

        write_atomically(&self.path, &writer.into_inner())?;
        self.changed = false;
        debug!(entries = self.entries.len(), "index saved");

        Ok(())
    }

    /// Hash a working-tree file and stage it, returning its blob id
    ///
    /// Symlinks are staged with their link target as content. Directories are
    /// rejected; recursing into them is the caller's decision.
    pub fn add(&mut self, workspace: &Workspace, path: &Path) -> Result<ObjectId> {
        let metadata = workspace.stat_file(path)?;

        let oid = match metadata.mode {
            FileMode::Directory => {
                return Err(Error::invalid(format!(
                    "{} is a directory, not a file",
                    path.display()
                )));
            }
            FileMode::Symlink => {
                let target = workspace.read_file(path)?;
                Hasher::hash_object_reader(ObjectType::Blob, target.len() as u64, &target[..])?
            }
            FileMode::Regular | FileMode::Executable => {
                let file = std::fs::File::open(workspace.path().join(path))?;
                Hasher::hash_object_reader(ObjectType::Blob, metadata.size, file)?
            }
        };

        self.stage(IndexEntry::new(path.to_path_buf(), oid, metadata))?;
        Ok(oid)
    }

    /// Insert or replace an entry
    ///
    /// A file evicts any entries under a directory of the same name, and
    /// any entry sitting where one of its parent directories should be.
    pub fn stage(&mut self, entry: IndexEntry) -> Result<()> {
        entry.path_components()?;

        self.discard_conflicts(&entry);
        self.store_entry(entry);
        self.changed = true;

        Ok(())
    }

    /// Unstage a file, or every file under a directory
    pub fn remove(&mut self, path: &Path) -> Result<Vec<IndexEntry>> {
        let mut removed = Vec::new();
        removed.extend(self.remove_entry(path));
        removed.extend(self.remove_children(path));

        if removed.is_empty() {
            return Err(Error::IndexEntryNotFound(path.to_path_buf()));
        }

        self.changed = true;
        Ok(removed)
    }

    pub fn has(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Whether the path is a tracked file or a directory containing one
    pub fn is_tracked(&self, path: &Path) -> bool {
        self.entries.contains_key(path) || self.children.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Result<&IndexEntry> {
        self.entries
            .get(path)
            .ok_or_else(|| Error::IndexEntryNotFound(path.to_path_buf()))
    }

    /// Entries in path order
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.children.clear();
        self.changed = true;
    }

    /// Tracked paths whose file no longer matches the staged snapshot
    ///
    /// Only mode, size and modification time are compared; content is not
    /// rehashed, so a same-size rewrite within the same timestamp is missed.
    /// Deleted files count as modified.
    pub fn modified_paths(&self, workspace: &Workspace) -> Result<Vec<PathBuf>> {
        let mut modified = Vec::new();

        for entry in self.entries.values() {
            match workspace.try_stat_file(&entry.path)? {
                Some(current) if entry.stat_match(&current) => {}
                _ => modified.push(entry.path.clone()),
            }
        }

        Ok(modified)
    }

    /// Working-tree files that are not in the index, in path order
    pub fn untracked_paths(&self, workspace: &Workspace) -> Result<Vec<PathBuf>> {
        Ok(workspace
            .list_files(None)?
            .into_iter()
            .filter(|path| !self.entries.contains_key(path))
            .collect())
    }

    fn discard_conflicts(&mut self, entry: &IndexEntry) {
        for parent in entry.parent_dirs() {
            self.remove_entry(parent);
        }
        self.remove_children(&entry.path);
    }

    fn store_entry(&mut self, entry: IndexEntry) {
        for parent in entry.parent_dirs() {
            self.children
                .entry(parent.to_path_buf())
                .or_default()
                .insert(entry.path.clone());
        }

        self.entries.insert(entry.path.clone(), entry);
    }

    fn remove_children(&mut self, path: &Path) -> Vec<IndexEntry> {
        match self.children.remove(path) {
            Some(children) => children
                .into_iter()
                .filter_map(|child| self.remove_entry(&child))
                .collect(),
            None => Vec::new(),
        }
    }

    fn remove_entry(&mut self, path: &Path) -> Option<IndexEntry> {
        let entry = self.entries.remove(path)?;

        for parent in entry.parent_dirs() {
            if let Some(children) = self.children.get_mut(parent) {
                children.remove(path);
                if children.is_empty() {
                    self.children.remove(parent);
                }
            }
        }

        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::index_entry::EntryMetadata;
    use crate::artifacts::objects::blob::Blob;
    use crate::artifacts::objects::OBJECT_ID_BYTES;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use filetime::FileTime;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    struct Scratch {
        dir: TempDir,
        workspace: Workspace,
        index: Index,
    }

    #[fixture]
    fn scratch() -> Scratch {
        let dir = TempDir::new().unwrap();
        dir.child(".cairn").create_dir_all().unwrap();
        let workspace = Workspace::new(dir.path().into());
        let index = Index::new(dir.path().join(".cairn/index").into_boxed_path());

        Scratch {
            dir,
            workspace,
            index,
        }
    }

    fn entry(path: &str) -> IndexEntry {
        IndexEntry::new(
            PathBuf::from(path),
            Blob::new(path.to_string()).object_id(),
            EntryMetadata::default(),
        )
    }

    #[rstest]
    fn add_hashes_like_a_blob(mut scratch: Scratch) {
        scratch.dir.child("a.txt").write_str("hello").unwrap();

        let oid = scratch
            .index
            .add(&scratch.workspace, Path::new("a.txt"))
            .unwrap();

        assert_eq!(oid, Blob::new("hello").object_id());
        let staged = scratch.index.get(Path::new("a.txt")).unwrap();
        assert_eq!(staged.metadata.size, 5);
        assert_eq!(staged.metadata.mode, FileMode::Regular);
    }

    #[rstest]
    fn add_rejects_directories(mut scratch: Scratch) {
        scratch.dir.child("dir/file").write_str("x").unwrap();

        assert!(matches!(
            scratch.index.add(&scratch.workspace, Path::new("dir")),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[rstest]
    fn add_stages_symlinks_by_target(mut scratch: Scratch) {
        std::os::unix::fs::symlink("a.txt", scratch.dir.path().join("link")).unwrap();

        let oid = scratch
            .index
            .add(&scratch.workspace, Path::new("link"))
            .unwrap();

        assert_eq!(oid, Blob::new("a.txt").object_id());
        assert_eq!(
            scratch.index.get(Path::new("link")).unwrap().metadata.mode,
            FileMode::Symlink
        );
    }

    #[rstest]
    fn entries_come_out_in_path_order(mut scratch: Scratch) {
        for path in ["zeta", "alpha/b", "alpha/a", "beta"] {
            scratch.index.stage(entry(path)).unwrap();
        }

        let paths = scratch
            .index
            .entries()
            .map(|entry| entry.path.to_string_lossy().into_owned())
            .collect::<Vec<_>>();

        assert_eq!(paths, vec!["alpha/a", "alpha/b", "beta", "zeta"]);
    }

    #[rstest]
    fn restaging_replaces_the_entry(mut scratch: Scratch) {
        scratch.index.stage(entry("a")).unwrap();
        let mut replacement = entry("a");
        replacement.oid = Blob::new("new").object_id();

        scratch.index.stage(replacement.clone()).unwrap();

        assert_eq!(scratch.index.len(), 1);
        assert_eq!(scratch.index.get(Path::new("a")).unwrap(), &replacement);
    }

    #[rstest]
    fn file_replaces_directory_and_back(mut scratch: Scratch) {
        scratch.index.stage(entry("a/b/c")).unwrap();
        scratch.index.stage(entry("a/d")).unwrap();

        scratch.index.stage(entry("a")).unwrap();
        assert_eq!(scratch.index.len(), 1);
        assert!(scratch.index.has(Path::new("a")));

        scratch.index.stage(entry("a/x")).unwrap();
        assert!(!scratch.index.has(Path::new("a")));
        assert!(scratch.index.is_tracked(Path::new("a")));
    }

    #[rstest]
    fn remove_untracked_path_fails(mut scratch: Scratch) {
        scratch.index.stage(entry("dir/one")).unwrap();
        scratch.index.stage(entry("dir/two")).unwrap();

        assert!(matches!(
            scratch.index.remove(Path::new("ghost")),
            Err(Error::IndexEntryNotFound(_))
        ));
        assert_eq!(scratch.index.remove(Path::new("dir")).unwrap().len(), 2);
        assert!(scratch.index.is_empty());
    }

    #[rstest]
    fn save_and_load_preserve_every_field(mut scratch: Scratch) {
        scratch.dir.child("x/y.txt").write_str("content").unwrap();
        scratch
            .index
            .add(&scratch.workspace, Path::new("x/y.txt"))
            .unwrap();
        let mut exotic = entry("z");
        exotic.metadata = EntryMetadata {
            mode: FileMode::Executable,
            mtime: -1,
            mtime_nsec: 999_999_999,
            size: u64::MAX,
        };
        scratch.index.stage(exotic).unwrap();
        scratch.index.save().unwrap();

        let loaded = Index::open(scratch.index.path().into()).unwrap();

        assert_eq!(
            loaded.entries().collect::<Vec<_>>(),
            scratch.index.entries().collect::<Vec<_>>()
        );
        assert!(!loaded.is_changed());
    }

    #[rstest]
    fn flipped_bytes_fail_the_checksum(mut scratch: Scratch) {
        scratch.index.stage(entry("a")).unwrap();
        scratch.index.save().unwrap();
        let mut data = std::fs::read(scratch.index.path()).unwrap();
        data[HEADER_SIZE + 3] ^= 0xff;
        std::fs::write(scratch.index.path(), data).unwrap();

        assert!(matches!(
            Index::open(scratch.index.path().into()),
            Err(Error::CorruptObject(_))
        ));
    }

    #[rstest]
    #[case("../x")]
    #[case("/b/x")]
    #[case("./xy")]
    #[case(".cairn/HEAD")]
    fn escaping_paths_fail_to_load(mut scratch: Scratch, #[case] stored_path: &str) {
        scratch.index.stage(entry(&"p".repeat(stored_path.len()))).unwrap();
        scratch.index.save().unwrap();

        // swap the path in place and re-seal the trailer
        let mut data = std::fs::read(scratch.index.path()).unwrap();
        let start = HEADER_SIZE + PATH_LENGTH_SIZE;
        data[start..start + stored_path.len()].copy_from_slice(stored_path.as_bytes());
        let body_len = data.len() - OBJECT_ID_BYTES;
        let trailer = Hasher::hash(&data[..body_len]);
        data[body_len..].copy_from_slice(trailer.as_bytes());
        std::fs::write(scratch.index.path(), data).unwrap();

        assert!(matches!(
            Index::open(scratch.index.path().into()),
            Err(Error::CorruptObject(_))
        ));
    }

    #[rstest]
    fn missing_index_loads_empty(scratch: Scratch) {
        let index = Index::open(scratch.index.path().into()).unwrap();

        assert!(index.is_empty());
    }

    #[rstest]
    fn modified_paths_follow_size_and_mtime(mut scratch: Scratch) {
        let file = scratch.dir.child("a.txt");
        file.write_str("hello").unwrap();
        scratch.dir.child("b.txt").write_str("stay").unwrap();
        scratch.dir.child("c.txt").write_str("gone").unwrap();
        for path in ["a.txt", "b.txt", "c.txt"] {
            scratch.index.add(&scratch.workspace, Path::new(path)).unwrap();
        }

        let staged_mtime = FileTime::from_last_modification_time(&std::fs::metadata(file.path()).unwrap());
        file.write_str("HELLO").unwrap();
        filetime::set_file_mtime(file.path(), staged_mtime).unwrap();
        std::fs::remove_file(scratch.dir.path().join("c.txt")).unwrap();

        // same size, same mtime: the rewrite of a.txt goes unnoticed
        assert_eq!(
            scratch.index.modified_paths(&scratch.workspace).unwrap(),
            vec![PathBuf::from("c.txt")]
        );

        filetime::set_file_mtime(file.path(), FileTime::from_unix_time(1, 0)).unwrap();
        assert_eq!(
            scratch.index.modified_paths(&scratch.workspace).unwrap(),
            vec![PathBuf::from("a.txt"), PathBuf::from("c.txt")]
        );
    }

    #[rstest]
    fn untracked_paths_skip_the_control_directory(mut scratch: Scratch) {
        scratch.dir.child("tracked").write_str("t").unwrap();
        scratch.dir.child("new/file").write_str("n").unwrap();
        scratch.index.add(&scratch.workspace, Path::new("tracked")).unwrap();
        scratch.index.save().unwrap();

        assert_eq!(
            scratch.index.untracked_paths(&scratch.workspace).unwrap(),
            vec![PathBuf::from("new/file")]
        );
    }
}
