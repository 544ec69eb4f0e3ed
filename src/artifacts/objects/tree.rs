//! Tree object
//!
//! Trees represent directory snapshots. They contain entries for files (blobs)
//! and subdirectories (other trees), along with their names and modes.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-sha1>`, entries sorted by name.
//!
//! ## Tree Building
//!
//! [`TreeBuilder`] turns the flat, path-keyed index into the nested trees a
//! commit points at.

use crate::artifacts::index::file_mode::FileMode;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object::{Packable, Unpackable, compute_object_id};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use derive_new::new;
use std::collections::BTreeMap;

/// A named slot of a tree: what it points at and how
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub oid: ObjectId,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }

    pub fn object_type(&self) -> ObjectType {
        match self.mode {
            FileMode::Directory => ObjectType::Tree,
            _ => ObjectType::Blob,
        }
    }
}

/// Tree object
///
/// Entries are kept ordered by name, so the canonical payload (and therefore
/// the identity) does not depend on insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
    oid: ObjectId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::with_entries(BTreeMap::new())
    }

    /// Build a tree from named entries in one pass
    ///
    /// Later duplicates of a name replace earlier ones.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, TreeEntry)>) -> Result<Self> {
        let entries = entries
            .into_iter()
            .map(|(name, entry)| validate_name(&name).map(|_| (name, entry)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self::with_entries(entries))
    }

    fn with_entries(entries: BTreeMap<String, TreeEntry>) -> Self {
        let mut tree = Tree {
            entries,
            oid: ObjectId::default(),
        };
        tree.oid = compute_object_id(ObjectType::Tree, &tree.serialize());
        tree
    }

    /// Insert or replace the entry called `name`
    ///
    /// Adding an identical entry again is a no-op; a different mode or id
    /// under an existing name replaces it.
    pub fn add_entry(&mut self, mode: FileMode, oid: ObjectId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_name(&name)?;

        let entry = TreeEntry::new(mode, oid);
        if self.entries.get(&name) == Some(&entry) {
            return Ok(());
        }

        self.entries.insert(name, entry);
        self.oid = compute_object_id(ObjectType::Tree, &self.serialize());

        Ok(())
    }

    pub fn remove_entry(&mut self, name: &str) -> Option<TreeEntry> {
        let removed = self.entries.remove(name)?;
        self.oid = compute_object_id(ObjectType::Tree, &self.serialize());

        Some(removed)
    }

    pub fn object_id(&self) -> ObjectId {
        self.oid
    }

    pub fn entry(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }

    /// Entries in name order
    pub fn entries(&self) -> impl Iterator<Item = (&String, &TreeEntry)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, TreeEntry)> {
        self.entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(Error::invalid(format!("invalid tree entry name {name:?}")));
    }

    Ok(())
}

impl Packable for Tree {
    fn serialize(&self) -> Bytes {
        let mut content = BytesMut::new();

        for (name, entry) in &self.entries {
            content.put_slice(entry.mode.as_str().as_bytes());
            content.put_u8(b' ');
            content.put_slice(name.as_bytes());
            content.put_u8(0);
            content.put_slice(entry.oid.as_bytes());
        }

        content.freeze()
    }
}

impl Unpackable for Tree {
    fn deserialize(payload: Bytes) -> Result<Self> {
        let mut entries = BTreeMap::new();
        let mut rest = payload.as_ref();
        let mut previous: Option<String> = None;

        while !rest.is_empty() {
            let space = rest
                .iter()
                .position(|&byte| byte == b' ')
                .ok_or_else(|| Error::corrupt("unexpected end of tree entry mode"))?;
            let mode = std::str::from_utf8(&rest[..space])
                .map_err(|_| Error::corrupt("tree entry mode is not valid UTF-8"))?;
            let mode = FileMode::from_octal_str(mode)?;
            rest = &rest[space + 1..];

            let nul = rest
                .iter()
                .position(|&byte| byte == 0)
                .ok_or_else(|| Error::corrupt("unexpected end of tree entry name"))?;
            let name = std::str::from_utf8(&rest[..nul])
                .map_err(|_| Error::corrupt("tree entry name is not valid UTF-8"))?
                .to_string();
            validate_name(&name).map_err(|error| Error::corrupt(error.to_string()))?;
            rest = &rest[nul + 1..];

            let oid = ObjectId::read_raw_from(&mut rest)
                .map_err(|_| Error::corrupt("unexpected end of tree entry object id"))?;

            // canonical trees are strictly ordered, which also rules out duplicates
            if previous.as_ref().is_some_and(|previous| *previous >= name) {
                return Err(Error::corrupt(format!("tree entry {name:?} is out of order")));
            }
            previous = Some(name.clone());

            entries.insert(name, TreeEntry::new(mode, oid));
        }

        Ok(Self::with_entries(entries))
    }
}

impl std::fmt::Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines = self
            .entries
            .iter()
            .map(|(name, entry)| {
                format!(
                    "{:0>6} {} {}\t{}",
                    entry.mode.as_str(),
                    entry.object_type(),
                    entry.oid,
                    name
                )
            })
            .collect::<Vec<_>>();

        write!(f, "{}", lines.join("\n"))
    }
}

#[derive(Debug)]
enum PendingEntry {
    File(TreeEntry),
    Directory(TreeBuilder),
}

/// Nested tree under construction, built from index entries
#[derive(Debug, Default)]
pub struct TreeBuilder {
    entries: BTreeMap<String, PendingEntry>,
}

impl TreeBuilder {
    /// Organize flat index entries into directories matching their paths
    pub fn build<'e>(entries: impl IntoIterator<Item = &'e IndexEntry>) -> Result<Self> {
        let mut root = Self::default();

        for entry in entries {
            let components = entry.path_components()?;
            root.add_entry(&components, entry)?;
        }

        Ok(root)
    }

    fn add_entry(&mut self, components: &[&str], entry: &IndexEntry) -> Result<()> {
        match components {
            [] => Err(Error::invalid("index entry with an empty path")),
            [name] => {
                if let Some(PendingEntry::Directory(_)) = self.entries.get(*name) {
                    return Err(Error::invalid(format!(
                        "{} is staged both as a file and as a directory",
                        entry.path.display()
                    )));
                }

                self.entries.insert(
                    name.to_string(),
                    PendingEntry::File(TreeEntry::new(entry.metadata.mode, entry.oid)),
                );
                Ok(())
            }
            [parent, rest @ ..] => {
                let pending = self
                    .entries
                    .entry(parent.to_string())
                    .or_insert_with(|| PendingEntry::Directory(TreeBuilder::default()));

                match pending {
                    PendingEntry::Directory(tree) => tree.add_entry(rest, entry),
                    PendingEntry::File(_) => Err(Error::invalid(format!(
                        "{} is staged both as a file and as a directory",
                        entry.path.display()
                    ))),
                }
            }
        }
    }

    /// Materialize the trees depth-first, calling `func` on each one
    ///
    /// Children are visited before their parents, so a store callback never
    /// sees a tree that references an unstored subtree. Returns the root.
    pub fn traverse<F>(&self, func: &mut F) -> Result<Tree>
    where
        F: FnMut(&Tree) -> Result<()>,
    {
        let mut entries = Vec::with_capacity(self.entries.len());

        for (name, pending) in &self.entries {
            let entry = match pending {
                PendingEntry::File(entry) => *entry,
                PendingEntry::Directory(builder) => {
                    let subtree = builder.traverse(func)?;
                    TreeEntry::new(FileMode::Directory, subtree.object_id())
                }
            };
            entries.push((name.clone(), entry));
        }

        let tree = Tree::from_entries(entries)?;
        func(&tree)?;

        Ok(tree)
    }
}
