//! Data structures and codecs
//!
//! - `core`: Shared utilities (atomic file writes)
//! - `digest`: Incremental SHA-1 hashing
//! - `index`: Index file data structures
//! - `objects`: Object types (blob, tree, commit, tag) and their encodings
//! - `refs`: Reference names, values and change log entries
//! - `status`: Working tree status reporting

pub mod core;
pub mod digest;
pub mod index;
pub mod objects;
pub mod refs;
pub mod status;
