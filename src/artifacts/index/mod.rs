//! Staging index file format
//!
//! The index (staging area) records what the next commit will contain.
//!
//! ## File Format (Version 1)
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "SIDX" (4 bytes)
//!   - Version: 1 (4 bytes)
//!   - Entry count (4 bytes)
//!
//! Entries (variable length, sorted by path):
//!   - Path length (2 bytes) followed by the path bytes
//!   - Object ID (20 bytes)
//!   - Mode (4 bytes)
//!   - Modification time: seconds (8 bytes) and nanoseconds (4 bytes)
//!   - Size (8 bytes)
//!
//! Checksum (20 bytes):
//!   - SHA-1 hash of all preceding bytes
//! ```
//!
//! All integers are big-endian.

pub mod checksum;
pub mod file_mode;
pub mod index_entry;
pub mod index_header;

/// Size of SHA-1 checksum in bytes
pub const CHECKSUM_SIZE: usize = 20;

/// Size of index header in bytes
pub const HEADER_SIZE: usize = 12; // 4 bytes for marker, 4 for version, 4 for entries_count

/// Magic signature identifying index files
pub const SIGNATURE: &[u8; 4] = b"SIDX";

/// Index file format version
pub const VERSION: u32 = 1;

/// Size of the path length prefix of an entry
pub const PATH_LENGTH_SIZE: usize = 2;

/// Size of the fixed-width fields following an entry's path
pub const ENTRY_FIXED_SIZE: usize = 20 + 4 + 8 + 4 + 8;
