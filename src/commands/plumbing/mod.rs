//! Plumbing commands (low-level operations)
//!
//! ## Commands
//!
//! - `hash-object`: Compute an object id and optionally store the blob
//! - `cat-file`: Print the content or the kind of a stored object
//! - `show-ref`: List references with the ids they resolve to

pub mod cat_file;
pub mod hash_object;
pub mod show_ref;
