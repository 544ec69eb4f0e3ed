//! Command implementations used by the binary
//!
//! Commands are organized into two categories:
//!
//! - `plumbing`: Low-level commands for direct object and reference access
//! - `porcelain`: User-facing commands for version control workflows
//!
//! Every command writes its output to the given writer and reports failures
//! through `anyhow`, so that the binary only has to parse arguments.

pub mod plumbing;
pub mod porcelain;
