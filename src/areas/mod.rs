//! Stateful repository components
//!
//! - `config`: Repository configuration values
//! - `database`: Object database for storing blobs, trees, commits and tags
//! - `index`: Staging area for the next commit
//! - `refs`: Reference management (branches, tags, HEAD, change logs)
//! - `repository`: High-level repository operations and coordination
//! - `workspace`: Working directory file system operations

pub mod config;
pub mod database;
pub mod index;
pub mod refs;
pub mod repository;
pub mod workspace;

/// Name of the control directory at the root of the working tree
pub const CONTROL_DIR_NAME: &str = ".cairn";
