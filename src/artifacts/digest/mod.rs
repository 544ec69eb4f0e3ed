//! Digest engine
//!
//! Streaming SHA-1 producer used to derive object identities. Pure: nothing in
//! here touches the repository on disk.

pub mod hasher;

/// Chunk size used when streaming readers through the hasher
pub const STREAM_CHUNK_SIZE: usize = 8 * 1024;
