use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub type IndexChangeSet = BTreeMap<PathBuf, IndexChangeType>;
pub type WorkspaceChangeSet = BTreeMap<PathBuf, WorkspaceChangeType>;
pub type FileSet = BTreeSet<PathBuf>;

/// Snapshot of the repository state, grouped the way `status` prints it
///
/// - `staged`: index entries that are new or differ from the HEAD tree
/// - `workspace`: tracked files whose working copy no longer matches the
///   staged metadata
/// - `untracked`: files neither staged nor part of the HEAD tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusInfo {
    pub staged: IndexChangeSet,
    pub workspace: WorkspaceChangeSet,
    pub untracked: FileSet,
}

impl StatusInfo {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.workspace.is_empty() && self.untracked.is_empty()
    }

    /// Porcelain-style lines: two status columns, a space, the path
    pub fn short_lines(&self) -> Vec<String> {
        let mut paths = BTreeMap::<&PathBuf, (Option<IndexChangeType>, Option<WorkspaceChangeType>)>::new();

        for (path, change) in &self.staged {
            paths.entry(path).or_default().0 = Some(*change);
        }
        for (path, change) in &self.workspace {
            paths.entry(path).or_default().1 = Some(*change);
        }

        let mut lines = paths
            .into_iter()
            .map(|(path, changes)| {
                let code = match changes {
                    (Some(index), None) => index.short_code().to_string(),
                    (None, Some(workspace)) => workspace.short_code().to_string(),
                    (Some(index), Some(workspace)) => format!(
                        "{}{}",
                        &index.short_code()[..1],
                        &workspace.short_code()[1..]
                    ),
                    (None, None) => "  ".to_string(),
                };
                format!("{code} {}", path.display())
            })
            .collect::<Vec<_>>();

        lines.extend(
            self.untracked
                .iter()
                .map(|path| format!("?? {}", path.display())),
        );

        lines
    }
}
