//! Working tree status
//!
//! - `file_change`: change categories for staged and working-tree files
//! - `status_info`: the status report produced by the repository

pub mod file_change;
pub mod status_info;
