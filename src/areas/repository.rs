//! Repository facade
//!
//! Owns the object database, the reference store, the staging index and the
//! working tree of one repository, and implements the operations that need
//! more than one of them (staging files, writing trees, committing, branching,
//! tagging, status).
//!
//! ## Layout
//!
//! ```text
//! <root>/.cairn/
//!     HEAD            ref: refs/heads/<default-branch>
//!     config
//!     index
//!     objects/        loose objects, fanned out by the first two hex digits
//!     refs/heads/     branches
//!     refs/tags/      tags
//!     refs/remotes/   remote-tracking branches
//!     logs/           reference change logs
//! ```

use crate::areas::CONTROL_DIR_NAME;
use crate::areas::config::Config;
use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::person::Person;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::{Tree, TreeBuilder, TreeEntry};
use crate::artifacts::refs::REFS_PREFIX;
use crate::artifacts::refs::ref_name::RefName;
use crate::artifacts::refs::reference::Reference;
use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use crate::artifacts::status::status_info::StatusInfo;
use crate::errors::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Shortest abbreviated object id accepted when resolving revisions
const MIN_ABBREVIATED_OID_LENGTH: usize = 4;

#[derive(Debug)]
pub struct Repository {
    /// Root of the working tree
    path: Box<Path>,
    config: Config,
    database: Database,
    index: Index,
    refs: Refs,
    workspace: Workspace,
}

impl Repository {
    /// Initialize a repository in `path`, creating the directory if needed
    ///
    /// Fails with `AlreadyExists` when a control directory is already there.
    pub fn create(path: &Path, config: Config) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let path = path.canonicalize()?;
        let control_path = path.join(CONTROL_DIR_NAME);

        if control_path.exists() {
            return Err(Error::AlreadyExists(control_path));
        }

        for dir in ["objects", "refs/heads", "refs/tags", "refs/remotes", "logs"] {
            std::fs::create_dir_all(control_path.join(dir))?;
        }

        let mut stored_config = Config::new();
        stored_config.set("core", "repositoryformatversion", "0");
        stored_config.set("core", "bare", "false");
        if let Some(name) = config.user_name() {
            stored_config.set("user", "name", name);
        }
        if let Some(email) = config.user_email() {
            stored_config.set("user", "email", email);
        }
        stored_config.save(&control_path.join("config"))?;

        let mut repository = Self::assemble(path.into_boxed_path(), stored_config, &config)?;

        let default_branch = RefName::branch(repository.config.default_branch())?;
        repository.refs.set_head(Reference::Symbolic(default_branch))?;
        repository.index.save()?;
        debug!(path = %repository.path.display(), "repository created");

        Ok(repository)
    }

    /// Open the repository whose working tree root is `path`
    ///
    /// Values in `config` take precedence over the stored configuration.
    pub fn open(path: &Path, config: Config) -> Result<Self> {
        let path = path
            .canonicalize()
            .map_err(|_| Error::NotARepository(path.to_path_buf()))?;

        if !Self::is_repository_root(&path) {
            return Err(Error::NotARepository(path));
        }

        let stored_config = Config::load(&path.join(CONTROL_DIR_NAME).join("config"))?;
        let mut repository = Self::assemble(path.into_boxed_path(), stored_config, &config)?;
        repository.index.load()?;

        Ok(repository)
    }

    /// Open the repository containing `start`, searching parent directories
    pub fn discover(start: &Path, config: Config) -> Result<Self> {
        let start = start
            .canonicalize()
            .map_err(|_| Error::NotARepository(start.to_path_buf()))?;

        match start.ancestors().find(|dir| Self::is_repository_root(dir)) {
            Some(root) => Self::open(root, config),
            None => Err(Error::NotARepository(start)),
        }
    }

    fn is_repository_root(path: &Path) -> bool {
        let control_path = path.join(CONTROL_DIR_NAME);

        control_path.join("HEAD").is_file()
            && control_path.join("objects").is_dir()
            && control_path.join("refs").is_dir()
    }

    fn assemble(path: Box<Path>, stored_config: Config, overrides: &Config) -> Result<Self> {
        let mut config = stored_config;
        config.merge(overrides);

        let control_path = path.join(CONTROL_DIR_NAME);
        let database = Database::with_compression(
            control_path.join("objects").into_boxed_path(),
            config.compression_level(),
        );
        let index = Index::new(control_path.join("index").into_boxed_path());
        let refs = Refs::new(control_path.clone().into_boxed_path()).with_identity(
            config.user_name().unwrap_or("unknown"),
            config.user_email().unwrap_or("unknown"),
        );
        let workspace = Workspace::new(path.clone());

        Ok(Repository {
            path,
            config,
            database,
            index,
            refs,
            workspace,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn control_path(&self) -> PathBuf {
        self.path.join(CONTROL_DIR_NAME)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut Index {
        &mut self.index
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Persist pending index changes
    pub fn save_index(&mut self) -> Result<()> {
        self.index.save()
    }

    /// Store and stage a file, or every file below a directory
    ///
    /// A path that no longer exists but is still tracked is unstaged. Returns
    /// the affected paths. The index is not saved.
    pub fn add(&mut self, path: &Path) -> Result<Vec<PathBuf>> {
        let path = self.workspace.relativize(path)?;

        if self.workspace.try_stat_file(&path)?.is_none() {
            if self.index.is_tracked(&path) {
                let removed = self.index.remove(&path)?;
                return Ok(removed.into_iter().map(|entry| entry.path).collect());
            }

            return Err(Error::invalid(format!(
                "pathspec {} did not match any files",
                path.display()
            )));
        }

        let files = if self.workspace.is_dir(&path) {
            self.workspace.list_files(Some(&path))?
        } else {
            vec![path]
        };

        for file in &files {
            self.stage_file(file)?;
        }

        Ok(files)
    }

    fn stage_file(&mut self, path: &Path) -> Result<()> {
        let metadata = self.workspace.stat_file(path)?;
        let blob = self.workspace.parse_blob(path)?;
        let oid = self.database.store(blob)?;

        self.index
            .stage(IndexEntry::new(path.to_path_buf(), oid, metadata))?;
        debug!(path = %path.display(), oid = %oid, "file staged");

        Ok(())
    }

    /// Unstage a file or directory; the working tree is left alone
    pub fn remove(&mut self, path: &Path) -> Result<Vec<IndexEntry>> {
        let path = self.workspace.relativize(path)?;
        self.index.remove(&path)
    }

    /// Store the trees described by the index, returning the root tree id
    pub fn write_tree(&self) -> Result<ObjectId> {
        let builder = TreeBuilder::build(self.index.entries())?;
        let root = builder.traverse(&mut |tree: &Tree| self.database.store(tree.clone()).map(|_| ()))?;

        Ok(root.object_id())
    }

    /// Record the staged files as a new commit
    ///
    /// The parent is the commit HEAD resolves to, if any. The checked-out
    /// branch moves to the new commit (and is created on the first commit);
    /// a detached HEAD moves itself. The index is cleared and saved.
    pub fn commit(&mut self, message: &str, author: Person, committer: Person) -> Result<ObjectId> {
        if self.index.is_empty() {
            return Err(Error::invalid("nothing to commit"));
        }

        let tree_oid = self.write_tree()?;
        let parent = self.head()?;
        let commit = Commit::new(
            tree_oid,
            parent.into_iter().collect(),
            author,
            committer,
            message.to_string(),
        );
        let commit_oid = self.database.store(commit.clone())?;

        let log_message = match parent {
            Some(_) => format!("commit: {}", commit.short_message()),
            None => format!("commit (initial): {}", commit.short_message()),
        };

        match self.refs.get_head_branch()? {
            Some(branch) if self.refs.exists(&branch)? => {
                self.refs
                    .update_with_message(&branch, commit_oid, &log_message)?
            }
            Some(branch) => self.refs.create_with_message(
                &branch,
                Reference::Direct(commit_oid),
                &log_message,
            )?,
            None => self
                .refs
                .update_with_message(&RefName::head(), commit_oid, &log_message)?,
        }

        self.index.clear();
        self.index.save()?;
        debug!(oid = %commit_oid, "commit recorded");

        Ok(commit_oid)
    }

    /// Commit HEAD resolves to, `None` before the first commit
    pub fn head(&self) -> Result<Option<ObjectId>> {
        self.refs.read(&RefName::head())
    }

    /// Resolve a reference name, a full object id or an abbreviated one
    ///
    /// References win over object ids when both could match. A bare name is
    /// looked up as a tag first, then as a branch.
    pub fn resolve_revision(&self, revision: &str) -> Result<ObjectId> {
        for name in Self::ref_candidates(revision) {
            if let Some(oid) = self.refs.read(&name)? {
                return Ok(oid);
            }
        }

        if revision.len() < MIN_ABBREVIATED_OID_LENGTH
            || revision.len() > OBJECT_ID_LENGTH
            || !revision.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(Error::invalid(format!("unknown revision {revision:?}")));
        }

        let mut candidates = self.database.find_objects_by_prefix(revision)?;
        match candidates.len() {
            0 => Err(Error::invalid(format!("unknown revision {revision:?}"))),
            1 => Ok(candidates.remove(0)),
            _ => Err(Error::invalid(format!(
                "short object id {revision} is ambiguous: {}",
                candidates
                    .iter()
                    .map(ObjectId::to_short_oid)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    fn ref_candidates(revision: &str) -> Vec<RefName> {
        match RefName::try_parse(revision) {
            Ok(name) if name.is_head() || revision.starts_with(REFS_PREFIX) => vec![name],
            Ok(branch) => RefName::tag(revision).into_iter().chain([branch]).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Create a branch at `start` (a revision) or at HEAD
    pub fn create_branch(&self, name: &str, start: Option<&str>) -> Result<RefName> {
        let branch = RefName::branch(name)?;

        let (target, source) = match start {
            Some(revision) => (self.resolve_revision(revision)?, revision.to_string()),
            None => (
                self.head()?
                    .ok_or_else(|| Error::invalid("HEAD does not point at a commit yet"))?,
                "HEAD".to_string(),
            ),
        };
        self.database.load_commit(&target)?;

        self.refs.create_with_message(
            &branch,
            Reference::Direct(target),
            &format!("branch: Created from {source}"),
        )?;

        Ok(branch)
    }

    /// Delete a branch, returning the commit it pointed at
    ///
    /// The checked-out branch cannot be deleted.
    pub fn delete_branch(&self, name: &str) -> Result<ObjectId> {
        let branch = RefName::branch(name)?;

        if self.refs.get_head_branch()?.as_ref() == Some(&branch) {
            return Err(Error::invalid(format!(
                "cannot delete branch {name} checked out at {}",
                self.path.display()
            )));
        }

        let oid = self.refs.resolve(&branch)?;
        self.refs.delete(&branch)?;

        Ok(oid)
    }

    /// Store an annotated tag object and point `refs/tags/<name>` at it
    pub fn create_tag(
        &self,
        name: &str,
        target: Option<&str>,
        tagger: Person,
        message: &str,
    ) -> Result<ObjectId> {
        let tag_ref = RefName::tag(name)?;
        if self.refs.exists(&tag_ref)? {
            return Err(Error::RefAlreadyExists(tag_ref.to_string()));
        }

        let target = self.tag_target(target)?;
        let tag = Tag::new(
            target,
            self.database.object_type(&target)?,
            name.to_string(),
            tagger,
            message.to_string(),
        )?;
        let tag_oid = self.database.store(tag)?;

        self.refs
            .create_with_message(&tag_ref, Reference::Direct(tag_oid), "tag: created")?;

        Ok(tag_oid)
    }

    /// Point `refs/tags/<name>` straight at an object, without a tag object
    pub fn create_lightweight_tag(&self, name: &str, target: Option<&str>) -> Result<ObjectId> {
        let tag_ref = RefName::tag(name)?;
        let target = self.tag_target(target)?;

        self.refs
            .create_with_message(&tag_ref, Reference::Direct(target), "tag: created")?;

        Ok(target)
    }

    fn tag_target(&self, target: Option<&str>) -> Result<ObjectId> {
        let target = match target {
            Some(revision) => self.resolve_revision(revision)?,
            None => self
                .head()?
                .ok_or_else(|| Error::invalid("HEAD does not point at a commit yet"))?,
        };

        if !self.database.exists(&target) {
            return Err(Error::ObjectNotFound(target));
        }

        Ok(target)
    }

    /// Files of the HEAD commit's tree, flattened to full paths
    pub fn head_tree_entries(&self) -> Result<BTreeMap<PathBuf, TreeEntry>> {
        let mut entries = BTreeMap::new();

        if let Some(head) = self.head()? {
            let commit = self.database.load_commit(&head)?;
            self.collect_tree_entries(commit.tree_oid(), Path::new(""), &mut entries)?;
        }

        Ok(entries)
    }

    fn collect_tree_entries(
        &self,
        tree_oid: &ObjectId,
        prefix: &Path,
        entries: &mut BTreeMap<PathBuf, TreeEntry>,
    ) -> Result<()> {
        let tree = self.database.load_tree(tree_oid)?;

        for (name, entry) in tree.entries() {
            let path = prefix.join(name);
            if entry.is_tree() {
                self.collect_tree_entries(&entry.oid, &path, entries)?;
            } else {
                entries.insert(path, *entry);
            }
        }

        Ok(())
    }

    /// Compare the index with HEAD and with the working tree
    pub fn status(&self) -> Result<StatusInfo> {
        let head_tree = self.head_tree_entries()?;
        let mut status = StatusInfo::default();

        for entry in self.index.entries() {
            match head_tree.get(&entry.path) {
                None => {
                    status
                        .staged
                        .insert(entry.path.clone(), IndexChangeType::Added);
                }
                Some(committed)
                    if committed.oid != entry.oid || committed.mode != entry.metadata.mode =>
                {
                    status
                        .staged
                        .insert(entry.path.clone(), IndexChangeType::Modified);
                }
                Some(_) => {}
            }
        }

        for path in self.index.modified_paths(&self.workspace)? {
            let change = match self.workspace.try_stat_file(&path)? {
                Some(_) => WorkspaceChangeType::Modified,
                None => WorkspaceChangeType::Deleted,
            };
            status.workspace.insert(path, change);
        }

        status.untracked = self
            .index
            .untracked_paths(&self.workspace)?
            .into_iter()
            .filter(|path| !head_tree.contains_key(path))
            .collect();

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::file_mode::FileMode;
    use crate::artifacts::objects::blob::Blob;
    use crate::artifacts::objects::object::Object;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    struct Scratch {
        dir: TempDir,
        repository: Repository,
    }

    #[fixture]
    fn scratch() -> Scratch {
        let dir = TempDir::new().unwrap();
        let mut config = Config::new();
        config.set("user", "name", "Ada Lovelace");
        config.set("user", "email", "ada@example.com");
        let repository = Repository::create(dir.path(), config).unwrap();

        Scratch { dir, repository }
    }

    fn person() -> Person {
        Person::new_with_timestamp(
            "Ada Lovelace".to_string(),
            "ada@example.com".to_string(),
            DateTime::parse_from_rfc3339("2023-11-14T22:13:20+00:00").unwrap(),
        )
        .unwrap()
    }

    fn commit_file(scratch: &mut Scratch, path: &str, content: &str, message: &str) -> ObjectId {
        scratch.dir.child(path).write_str(content).unwrap();
        scratch.repository.add(Path::new(path)).unwrap();
        scratch.repository.commit(message, person(), person()).unwrap()
    }

    #[rstest]
    fn create_lays_out_the_skeleton(scratch: Scratch) {
        let control = scratch.dir.path().join(CONTROL_DIR_NAME);

        assert_eq!(
            std::fs::read_to_string(control.join("HEAD")).unwrap(),
            "ref: refs/heads/master\n"
        );
        assert!(control.join("objects").is_dir());
        assert!(control.join("refs/tags").is_dir());
        assert!(control.join("index").is_file());
        assert!(!control.join("refs/heads/master").exists());
        assert_eq!(scratch.repository.head().unwrap(), None);
    }

    #[rstest]
    fn create_twice_fails(scratch: Scratch) {
        assert!(matches!(
            Repository::create(scratch.dir.path(), Config::new()),
            Err(Error::AlreadyExists(_))
        ));
    }

    #[test]
    fn open_requires_a_repository() {
        let dir = TempDir::new().unwrap();

        assert!(matches!(
            Repository::open(dir.path(), Config::new()),
            Err(Error::NotARepository(_))
        ));
    }

    #[rstest]
    fn discover_walks_up_from_subdirectories(scratch: Scratch) {
        scratch.dir.child("deep/inside").create_dir_all().unwrap();

        let found =
            Repository::discover(&scratch.dir.path().join("deep/inside"), Config::new()).unwrap();

        assert_eq!(found.path(), scratch.repository.path());
        assert_eq!(found.config().user_name(), Some("Ada Lovelace"));
    }

    #[rstest]
    fn first_commit_creates_the_branch(mut scratch: Scratch) {
        let oid = commit_file(&mut scratch, "a.txt", "hello", "msg");

        let master = RefName::branch("master").unwrap();
        assert_eq!(scratch.repository.refs().resolve(&master).unwrap(), oid);
        assert!(scratch.repository.index().is_empty());

        let commit = scratch.repository.database().load_commit(&oid).unwrap();
        assert!(commit.parents().is_empty());
        let tree = scratch
            .repository
            .database()
            .load_tree(commit.tree_oid())
            .unwrap();
        let entry = tree.entry("a.txt").unwrap();
        assert_eq!(entry.oid, Blob::new("hello").object_id());
        assert_eq!(entry.mode, FileMode::Regular);
    }

    #[rstest]
    fn later_commits_chain_parents(mut scratch: Scratch) {
        let first = commit_file(&mut scratch, "a.txt", "one", "first");
        let second = commit_file(&mut scratch, "b.txt", "two", "second");

        let commit = scratch.repository.database().load_commit(&second).unwrap();
        assert_eq!(commit.parents(), &[first]);
        assert_eq!(scratch.repository.head().unwrap(), Some(second));
    }

    #[rstest]
    fn nested_directories_become_subtrees(mut scratch: Scratch) {
        scratch.dir.child("src/lib/mod.rs").write_str("mod").unwrap();
        scratch.dir.child("README").write_str("readme").unwrap();
        scratch.repository.add(Path::new(".")).unwrap();

        let root_oid = scratch.repository.write_tree().unwrap();

        let root = scratch.repository.database().load_tree(&root_oid).unwrap();
        let src = root.entry("src").unwrap();
        assert_eq!(src.mode, FileMode::Directory);
        let src_tree = scratch.repository.database().load_tree(&src.oid).unwrap();
        assert!(src_tree.entry("lib").unwrap().is_tree());
        assert!(root.entry("README").is_some());
    }

    #[rstest]
    fn empty_index_refuses_to_commit(mut scratch: Scratch) {
        assert!(matches!(
            scratch.repository.commit("nothing", person(), person()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[rstest]
    fn detached_head_moves_itself(mut scratch: Scratch) {
        let first = commit_file(&mut scratch, "a.txt", "one", "first");
        scratch
            .repository
            .refs()
            .set_head(Reference::Direct(first))
            .unwrap();

        let second = commit_file(&mut scratch, "b.txt", "two", "second");

        let master = RefName::branch("master").unwrap();
        assert_eq!(scratch.repository.refs().resolve(&master).unwrap(), first);
        assert_eq!(scratch.repository.head().unwrap(), Some(second));
    }

    #[rstest]
    fn branches_can_be_created_and_deleted(mut scratch: Scratch) {
        let first = commit_file(&mut scratch, "a.txt", "one", "first");

        let feature = scratch.repository.create_branch("feature", None).unwrap();
        assert_eq!(scratch.repository.refs().resolve(&feature).unwrap(), first);

        let short = first.to_short_oid();
        scratch
            .repository
            .create_branch("from-oid", Some(&short))
            .unwrap();

        assert_eq!(scratch.repository.delete_branch("feature").unwrap(), first);
        assert!(!scratch.repository.refs().exists(&feature).unwrap());
        assert!(matches!(
            scratch.repository.delete_branch("master"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[rstest]
    fn branches_must_point_at_commits(mut scratch: Scratch) {
        commit_file(&mut scratch, "a.txt", "one", "first");
        let blob = Blob::new("one").object_id();

        assert!(matches!(
            scratch
                .repository
                .create_branch("bad", Some(&blob.to_string())),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[rstest]
    fn annotated_tags_store_a_tag_object(mut scratch: Scratch) {
        let first = commit_file(&mut scratch, "a.txt", "one", "first");

        let tag_oid = scratch
            .repository
            .create_tag("v1.0", None, person(), "release")
            .unwrap();

        let Object::Tag(tag) = scratch.repository.database().load(&tag_oid).unwrap() else {
            panic!("expected a tag object");
        };
        assert_eq!(tag.target(), &first);
        assert_eq!(tag.name(), "v1.0");
        assert_eq!(
            scratch.repository.resolve_revision("refs/tags/v1.0").unwrap(),
            tag_oid
        );
        assert!(matches!(
            scratch.repository.create_tag("v1.0", None, person(), "again"),
            Err(Error::RefAlreadyExists(_))
        ));
    }

    #[rstest]
    fn status_groups_changes(mut scratch: Scratch) {
        commit_file(&mut scratch, "committed.txt", "c", "first");
        scratch.dir.child("staged.txt").write_str("s").unwrap();
        scratch.repository.add(Path::new("staged.txt")).unwrap();
        scratch.dir.child("new.txt").write_str("n").unwrap();
        std::fs::remove_file(scratch.dir.path().join("staged.txt")).unwrap();

        let status = scratch.repository.status().unwrap();

        assert_eq!(
            status.staged,
            [(PathBuf::from("staged.txt"), IndexChangeType::Added)].into()
        );
        assert_eq!(
            status.workspace,
            [(PathBuf::from("staged.txt"), WorkspaceChangeType::Deleted)].into()
        );
        assert_eq!(status.untracked, [PathBuf::from("new.txt")].into());
    }

    #[rstest]
    fn adding_a_deleted_tracked_file_unstages_it(mut scratch: Scratch) {
        scratch.dir.child("gone.txt").write_str("g").unwrap();
        scratch.repository.add(Path::new("gone.txt")).unwrap();
        std::fs::remove_file(scratch.dir.path().join("gone.txt")).unwrap();

        scratch.repository.add(Path::new("gone.txt")).unwrap();

        assert!(!scratch.repository.index().has(Path::new("gone.txt")));
        assert!(matches!(
            scratch.repository.add(Path::new("never.txt")),
            Err(Error::InvalidArgument(_))
        ));
    }
}
