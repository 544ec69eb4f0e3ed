#![allow(dead_code)]

pub mod command;
pub mod file;

/// Pinned identity for commits made through the binary
pub const AUTHOR_NAME: &str = "Ada Lovelace";
pub const AUTHOR_EMAIL: &str = "ada@example.com";
pub const AUTHOR_DATE: &str = "2023-11-14 22:13:20 +0000";
