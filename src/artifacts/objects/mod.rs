//! Object types and their canonical encodings
//!
//! All content is stored as objects identified by the SHA-1 digest of their
//! canonical encoding. There are four kinds:
//!
//! - **Blob**: File content (raw bytes)
//! - **Tree**: Directory listing (names, modes, and object IDs)
//! - **Commit**: Snapshot with metadata (author, message, parent commits, tree)
//! - **Tag**: Annotated, named pointer to another object
//!
//! Every object encodes as `<kind> <payload-size>\0<payload>`; the digest of
//! that byte string is the object's identity.

pub mod blob;
pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod person;
pub mod tag;
pub mod tree;

/// Length of a SHA-1 digest in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-1 digest in bytes
pub const OBJECT_ID_BYTES: usize = 20;
