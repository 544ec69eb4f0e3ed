use colored::Colorize;

const LABEL_WIDTH: usize = 8;

/// How a staged entry differs from the HEAD commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexChangeType {
    Added,
    Modified,
}

/// How a working-tree file differs from its staged snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkspaceChangeType {
    Modified,
    Deleted,
}

impl IndexChangeType {
    /// Two-column short code, index side
    pub fn short_code(&self) -> &'static str {
        match self {
            IndexChangeType::Added => "A ",
            IndexChangeType::Modified => "M ",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            IndexChangeType::Added => "new file:   ",
            IndexChangeType::Modified => "modified:   ",
        }
    }
}

impl WorkspaceChangeType {
    /// Two-column short code, working-tree side
    pub fn short_code(&self) -> &'static str {
        match self {
            WorkspaceChangeType::Modified => " M",
            WorkspaceChangeType::Deleted => " D",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            WorkspaceChangeType::Modified => "modified:   ",
            WorkspaceChangeType::Deleted => "deleted:    ",
        }
    }
}

impl std::fmt::Display for IndexChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>width$}{}", "", self.label().green(), width = LABEL_WIDTH)
    }
}

impl std::fmt::Display for WorkspaceChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>width$}{}", "", self.label().red(), width = LABEL_WIDTH)
    }
}
