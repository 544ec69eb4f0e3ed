//! Porcelain commands (user-facing operations)
//!
//! ## Commands
//!
//! - `init`: Initialize a new repository
//! - `add`: Stage files for commit
//! - `rm`: Unstage files and optionally delete them
//! - `commit`: Create a new commit
//! - `branch`: Create, list, or delete branches
//! - `tag`: Create or list tags
//! - `status`: Show working tree status

pub mod add;
pub mod branch;
pub mod commit;
pub mod init;
pub mod rm;
pub mod status;
pub mod tag;
