//! References (branches, HEAD, tags)
//!
//! This module manages references, human-readable names pointing to objects.
//! References can be:
//! - Direct: containing an object id
//! - Symbolic: pointing to another reference (e.g., HEAD -> refs/heads/master)
//!
//! ## Reference Types
//!
//! - HEAD: special reference pointing to the current branch or commit
//! - Branches: `refs/heads/*` pointing to branch tip commits
//! - Tags: `refs/tags/*` pointing to tagged objects
//! - Remote-tracking branches: `refs/remotes/<remote>/*`
//!
//! ## File Format
//!
//! References are stored as text files containing either:
//! - A 40-character hex digest (direct reference)
//! - `ref: <name>` for symbolic references
//!
//! ## Change log
//!
//! Every mutation appends a line to `logs/<name>`. The log is diagnostic: a
//! failed append is reported through `tracing` and never fails the mutation.

use crate::artifacts::core::write_atomically;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::person::Person;
use crate::artifacts::refs::ref_name::RefName;
use crate::artifacts::refs::reference::Reference;
use crate::artifacts::refs::reflog::ReflogEntry;
use crate::artifacts::refs::{HEADS_PREFIX, REMOTES_PREFIX, TAGS_PREFIX};
use crate::errors::{Error, Result};
use file_guard::Lock;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const UNKNOWN_IDENTITY: &str = "unknown";

/// References manager
///
/// Reads and writes references under a control directory. Raw values are
/// cached; every write through this type updates the cache in the same call.
#[derive(Debug)]
pub struct Refs {
    /// Path to the control directory holding `HEAD`, `refs/` and `logs/`
    path: Box<Path>,
    /// Name and email recorded in change-log lines
    identity: (String, String),
    cache: RefCell<HashMap<RefName, Reference>>,
}

impl Refs {
    pub fn new(path: Box<Path>) -> Self {
        Refs {
            path,
            identity: (UNKNOWN_IDENTITY.to_string(), UNKNOWN_IDENTITY.to_string()),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Use this identity for change-log lines
    pub fn with_identity(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.identity = (name.into(), email.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a reference that does not exist yet
    ///
    /// A symbolic reference may only point at an existing reference.
    pub fn create(&self, name: &RefName, target: Reference) -> Result<()> {
        self.create_with_message(name, target, "created")
    }

    pub fn create_with_message(
        &self,
        name: &RefName,
        target: Reference,
        message: &str,
    ) -> Result<()> {
        if self.exists(name)? {
            return Err(Error::RefAlreadyExists(name.to_string()));
        }

        if let Reference::Symbolic(target_name) = &target
            && !self.exists(target_name)?
        {
            return Err(Error::TargetNotFound(target_name.to_string()));
        }

        let new_oid = match &target {
            Reference::Direct(oid) => Some(*oid),
            Reference::Symbolic(target_name) => self.logged_value(target_name),
        };
        let through_head = self.is_checked_out(name);

        self.write(name, &target)?;
        debug!(name = %name, target = %target, "reference created");

        self.append_log(name, None, new_oid, message);
        if through_head {
            self.append_log(&RefName::head(), None, new_oid, message);
        }

        Ok(())
    }

    /// Point an existing reference directly at `oid`
    pub fn update(&self, name: &RefName, oid: ObjectId) -> Result<()> {
        self.update_with_message(name, oid, "updated")
    }

    pub fn update_with_message(&self, name: &RefName, oid: ObjectId, message: &str) -> Result<()> {
        if !self.exists(name)? {
            return Err(Error::RefNotFound(name.to_string()));
        }

        let old_oid = self.logged_value(name);
        let through_head = self.is_checked_out(name);

        self.write(name, &Reference::Direct(oid))?;
        debug!(name = %name, oid = %oid, "reference updated");

        self.append_log(name, old_oid, Some(oid), message);
        if through_head {
            self.append_log(&RefName::head(), old_oid, Some(oid), message);
        }

        Ok(())
    }

    /// Remove a reference, returning its last raw value
    pub fn delete(&self, name: &RefName) -> Result<Reference> {
        let Some(reference) = self.read_raw(name)? else {
            return Err(Error::RefNotFound(name.to_string()));
        };
        let old_oid = self.read(name)?;

        let ref_path = name.to_path(&self.path);
        std::fs::remove_file(&ref_path)?;
        self.cache.borrow_mut().remove(name);
        self.prune_empty_parent_dirs(&ref_path)?;
        debug!(name = %name, "reference deleted");

        self.append_log(name, old_oid, None, "deleted");

        Ok(reference)
    }

    /// Follow symbolic references until a digest is reached
    ///
    /// Fails with `RefNotFound` if `name` itself is absent, with
    /// `DanglingReference` if the chain ends at a missing reference and with
    /// `ReferenceCycle` if a name comes up twice.
    pub fn resolve(&self, name: &RefName) -> Result<ObjectId> {
        let mut visited = HashSet::new();
        let mut current = name.clone();

        loop {
            if !visited.insert(current.clone()) {
                return Err(Error::ReferenceCycle(name.to_string()));
            }

            match self.read_raw(&current)? {
                Some(Reference::Direct(oid)) => return Ok(oid),
                Some(Reference::Symbolic(target)) => current = target,
                None if &current == name => return Err(Error::RefNotFound(name.to_string())),
                None => {
                    return Err(Error::DanglingReference {
                        name: name.to_string(),
                        target: current.to_string(),
                    });
                }
            }
        }
    }

    /// Non-failing lookup: the digest `name` resolves to, if any
    ///
    /// Absent and dangling references read as `None`; cycles and malformed
    /// files are still errors.
    pub fn read(&self, name: &RefName) -> Result<Option<ObjectId>> {
        match self.resolve(name) {
            Ok(oid) => Ok(Some(oid)),
            Err(Error::RefNotFound(_) | Error::DanglingReference { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// The stored value of `name`, without following it
    pub fn read_raw(&self, name: &RefName) -> Result<Option<Reference>> {
        if let Some(reference) = self.cache.borrow().get(name) {
            return Ok(Some(reference.clone()));
        }

        let ref_path = name.to_path(&self.path);
        let content = match std::fs::read_to_string(&ref_path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(_) if ref_path.is_dir() => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        let reference = Reference::parse(name, &content)?;
        self.cache
            .borrow_mut()
            .insert(name.clone(), reference.clone());

        Ok(Some(reference))
    }

    pub fn exists(&self, name: &RefName) -> Result<bool> {
        Ok(self.read_raw(name)?.is_some())
    }

    /// Branch HEAD points at, or `None` when HEAD is detached or malformed
    pub fn get_head_branch(&self) -> Result<Option<RefName>> {
        match self.read_raw(&RefName::head()) {
            Ok(Some(Reference::Symbolic(target))) if target.is_branch() => Ok(Some(target)),
            Ok(_) | Err(Error::MalformedReference { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Point HEAD at a branch (symbolic) or a digest (detached)
    ///
    /// The branch does not need to exist yet: a fresh repository's HEAD
    /// names its default branch before the first commit.
    pub fn set_head(&self, target: Reference) -> Result<()> {
        let head = RefName::head();
        let old_oid = self.logged_value(&head);
        let (new_oid, message) = match &target {
            Reference::Symbolic(branch) => (
                self.logged_value(branch),
                format!("checkout: moving to {}", branch.short_name()),
            ),
            Reference::Direct(oid) => (Some(*oid), format!("checkout: moving to {oid}")),
        };

        self.write(&head, &target)?;
        debug!(target = %target, "HEAD moved");

        self.append_log(&head, old_oid, new_oid, &message);

        Ok(())
    }

    pub fn list_branches(&self) -> Result<Vec<RefName>> {
        self.list_refs(HEADS_PREFIX)
    }

    pub fn list_tags(&self) -> Result<Vec<RefName>> {
        self.list_refs(TAGS_PREFIX)
    }

    pub fn list_remote_branches(&self) -> Result<Vec<RefName>> {
        self.list_refs(REMOTES_PREFIX)
    }

    /// Every reference under `refs/`, in name order
    pub fn list_all(&self) -> Result<Vec<RefName>> {
        self.list_refs("refs/")
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<RefName>> {
        let root = self.path.join(prefix.trim_end_matches('/'));
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.path) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            match RefName::try_parse(relative.as_str()) {
                Ok(name) => names.push(name),
                Err(_) => debug!(path = %entry.path().display(), "skipping invalid ref file"),
            }
        }

        names.sort();
        Ok(names)
    }

    /// Read back the change log of `name`, oldest first
    pub fn reflog(&self, name: &RefName) -> Result<Vec<ReflogEntry>> {
        let log_path = self.log_path(name);
        let content = match std::fs::read_to_string(&log_path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        content.lines().map(ReflogEntry::try_from).collect()
    }

    fn write(&self, name: &RefName, reference: &Reference) -> Result<()> {
        write_atomically(
            &name.to_path(&self.path),
            reference.to_file_content().as_bytes(),
        )?;
        self.cache
            .borrow_mut()
            .insert(name.clone(), reference.clone());

        Ok(())
    }

    /// Digest `name` resolves to for a change-log line
    ///
    /// Collected before the reference file is written, so an unreadable
    /// chain only costs the log its value.
    fn logged_value(&self, name: &RefName) -> Option<ObjectId> {
        self.read(name).unwrap_or_else(|error| {
            warn!(name = %name, %error, "cannot resolve reference for its log");
            None
        })
    }

    /// Whether changes to `name` are also logged under HEAD
    fn is_checked_out(&self, name: &RefName) -> bool {
        if name.is_head() {
            return false;
        }

        match self.get_head_branch() {
            Ok(branch) => branch.as_ref() == Some(name),
            Err(error) => {
                warn!(%error, "cannot read HEAD for the reference log");
                false
            }
        }
    }

    fn log_path(&self, name: &RefName) -> PathBuf {
        name.to_path(&self.path.join("logs"))
    }

    fn append_log(
        &self,
        name: &RefName,
        old_oid: Option<ObjectId>,
        new_oid: Option<ObjectId>,
        message: &str,
    ) {
        let (identity_name, identity_email) = &self.identity;
        let identity = match Person::new(identity_name.clone(), identity_email.clone()) {
            Ok(identity) => identity,
            Err(error) => {
                warn!(name = %name, %error, "skipping reference log entry");
                return;
            }
        };
        let entry = ReflogEntry::new(new_oid, old_oid, identity, message.to_string());

        if let Err(error) = self.try_append_log(name, &entry) {
            warn!(name = %name, %error, "failed to write reference log");
        }
    }

    fn try_append_log(&self, name: &RefName, entry: &ReflogEntry) -> std::io::Result<()> {
        let log_path = self.log_path(name);
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        let mut lock = file_guard::lock(&mut log_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(entry.to_line().as_bytes())
    }

    fn prune_empty_parent_dirs(&self, path: &Path) -> Result<()> {
        let keep = [
            self.path.to_path_buf(),
            self.path.join("refs"),
            self.path.join("refs").join("heads"),
            self.path.join("refs").join("tags"),
            self.path.join("refs").join("remotes"),
        ];

        if let Some(parent) = path.parent()
            && !keep.iter().any(|kept| kept == parent)
            && parent.read_dir()?.next().is_none()
        {
            std::fs::remove_dir(parent)?;
            self.prune_empty_parent_dirs(parent)?;
        }

        Ok(())
    }
}
