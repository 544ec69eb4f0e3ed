use crate::areas::CONTROL_DIR_NAME;
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::artifacts::objects::blob::Blob;
use crate::errors::{Error, Result};
use bytes::Bytes;
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// The working tree: every file under the repository root except the
/// control directory
#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Turn a user-supplied path into one relative to the root
    ///
    /// Absolute paths must lie inside the working tree, possibly through a
    /// symlinked directory; relative ones are taken as relative to the root.
    /// `.` components are dropped, `..` and the control directory are
    /// rejected.
    pub fn relativize(&self, path: &Path) -> Result<PathBuf> {
        let outside =
            || Error::invalid(format!("{} is outside the working tree", path.display()));

        let resolved;
        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.path) {
                Ok(relative) => relative,
                Err(_) => {
                    resolved = Self::resolve_directories(path).ok_or_else(outside)?;
                    resolved.strip_prefix(&self.path).map_err(|_| outside())?
                }
            }
        } else {
            path
        };

        let mut normalized = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) => normalized.push(name),
                Component::CurDir => {}
                _ => {
                    return Err(Error::invalid(format!(
                        "{} is outside the working tree",
                        path.display()
                    )));
                }
            }
        }

        if Self::is_ignored(&normalized) {
            return Err(Error::invalid(format!(
                "{} is inside the control directory",
                path.display()
            )));
        }

        Ok(normalized)
    }

    /// Files (and symlinks) under `root_path`, relative to the working tree,
    /// in path order
    ///
    /// `None` lists the whole tree; a file path lists just that file.
    pub fn list_files(&self, root_path: Option<&Path>) -> Result<Vec<PathBuf>> {
        let start = match root_path {
            Some(path) => self.path.join(path),
            None => self.path.to_path_buf(),
        };

        let metadata = std::fs::symlink_metadata(&start)?;
        if !metadata.is_dir() {
            return Ok(vec![self.relative_to_root(&start)?]);
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&start)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != CONTROL_DIR_NAME);

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                files.push(self.relative_to_root(entry.path())?);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Resolve the symlinks in the directories leading to `path`
    ///
    /// The last component is kept as is unless it is itself a directory, so
    /// a symlinked file is still staged as a link.
    fn resolve_directories(path: &Path) -> Option<PathBuf> {
        if path.is_dir() {
            return path.canonicalize().ok();
        }

        let parent = path.parent()?.canonicalize().ok()?;
        Some(parent.join(path.file_name()?))
    }

    fn relative_to_root(&self, path: &Path) -> Result<PathBuf> {
        path.strip_prefix(&self.path)
            .map(PathBuf::from)
            .map_err(|_| Error::invalid(format!("{} is outside the working tree", path.display())))
    }

    fn is_ignored(path: &Path) -> bool {
        path.components()
            .next()
            .is_some_and(|component| component.as_os_str() == CONTROL_DIR_NAME)
    }

    /// Content that gets staged for `file_path`
    ///
    /// Regular files yield their bytes; symlinks yield their target path.
    pub fn read_file(&self, file_path: &Path) -> Result<Bytes> {
        let full_path = self.path.join(file_path);

        if std::fs::symlink_metadata(&full_path)?.file_type().is_symlink() {
            let target = std::fs::read_link(&full_path)?;
            return Ok(Bytes::copy_from_slice(target.as_os_str().as_bytes()));
        }

        Ok(std::fs::read(full_path)?.into())
    }

    pub fn parse_blob(&self, file_path: &Path) -> Result<Blob> {
        Ok(Blob::new(self.read_file(file_path)?))
    }

    /// Snapshot the file's metadata without following symlinks
    pub fn stat_file(&self, file_path: &Path) -> Result<EntryMetadata> {
        let full_path = self.path.join(file_path);
        let metadata = std::fs::symlink_metadata(&full_path)?;

        EntryMetadata::try_from((full_path.as_path(), &metadata))
    }

    /// Like [`Workspace::stat_file`], but a missing file is `None`
    pub fn try_stat_file(&self, file_path: &Path) -> Result<Option<EntryMetadata>> {
        match self.stat_file(file_path) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(Error::IoFailure(error)) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        std::fs::symlink_metadata(self.path.join(path)).is_ok_and(|metadata| metadata.is_dir())
    }

    /// Delete a file and any parent directories it leaves empty
    ///
    /// A file that is already gone is not an error.
    pub fn remove_file(&self, file_path: &Path) -> Result<()> {
        match std::fs::remove_file(self.path.join(file_path)) {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }

        for parent in file_path.ancestors().skip(1) {
            if parent.as_os_str().is_empty() {
                break;
            }
            if std::fs::remove_dir(self.path.join(parent)).is_err() {
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::file_mode::FileMode;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        dir.child("b.txt").write_str("b").unwrap();
        dir.child("a/nested.txt").write_str("nested").unwrap();
        dir.child(".cairn/HEAD").write_str("ref: refs/heads/master\n").unwrap();
        dir.child("empty").create_dir_all().unwrap();
        dir
    }

    #[rstest]
    fn lists_files_outside_the_control_directory(tree: TempDir) {
        let workspace = Workspace::new(tree.path().into());

        assert_eq!(
            workspace.list_files(None).unwrap(),
            vec![PathBuf::from("a/nested.txt"), PathBuf::from("b.txt")]
        );
        assert_eq!(
            workspace.list_files(Some(Path::new("a"))).unwrap(),
            vec![PathBuf::from("a/nested.txt")]
        );
    }

    #[rstest]
    fn symlinks_are_read_as_their_target(tree: TempDir) {
        std::os::unix::fs::symlink("b.txt", tree.path().join("link")).unwrap();
        let workspace = Workspace::new(tree.path().into());

        assert_eq!(workspace.read_file(Path::new("link")).unwrap(), "b.txt");
        assert_eq!(
            workspace.stat_file(Path::new("link")).unwrap().mode,
            FileMode::Symlink
        );
    }

    #[rstest]
    #[case("./a/nested.txt", Some("a/nested.txt"))]
    #[case("../escape", None)]
    #[case(".cairn/HEAD", None)]
    fn relativizes_user_paths(tree: TempDir, #[case] input: &str, #[case] expected: Option<&str>) {
        let workspace = Workspace::new(tree.path().into());

        assert_eq!(
            workspace.relativize(Path::new(input)).ok(),
            expected.map(PathBuf::from)
        );
    }

    #[rstest]
    fn missing_files_stat_to_none(tree: TempDir) {
        let workspace = Workspace::new(tree.path().into());

        assert_eq!(workspace.try_stat_file(Path::new("gone")).unwrap(), None);
        assert!(workspace.is_dir(Path::new("empty")));
    }

    #[rstest]
    fn removing_the_last_file_prunes_its_directory(tree: TempDir) {
        let workspace = Workspace::new(tree.path().into());

        workspace.remove_file(Path::new("a/nested.txt")).unwrap();
        workspace.remove_file(Path::new("a/nested.txt")).unwrap();

        assert!(!tree.path().join("a").exists());
        assert!(tree.path().join("b.txt").exists());
    }

    #[rstest]
    fn relativizes_through_a_symlinked_directory(tree: TempDir) {
        let root = tree.path().canonicalize().unwrap();
        let workspace = Workspace::new(root.clone().into());
        let elsewhere = TempDir::new().unwrap();
        let link = elsewhere.path().join("link");
        std::os::unix::fs::symlink(&root, &link).unwrap();
        std::os::unix::fs::symlink("b.txt", root.join("b-link")).unwrap();

        assert_eq!(
            workspace.relativize(&link.join("a/nested.txt")).unwrap(),
            PathBuf::from("a/nested.txt")
        );
        assert_eq!(workspace.relativize(&link.join(".")).unwrap(), PathBuf::new());
        assert_eq!(
            workspace.relativize(&link.join("b-link")).unwrap(),
            PathBuf::from("b-link")
        );
        assert!(workspace.relativize(&elsewhere.path().join("x")).is_err());
    }
}
