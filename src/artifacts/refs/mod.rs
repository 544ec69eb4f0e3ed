//! Reference names, values and change-log records
//!
//! - `ref_name`: validated reference names (`HEAD`, `refs/...`, branch shorthand)
//! - `reference`: the on-disk value of a reference, direct or symbolic
//! - `reflog`: one line of a reference's append-only change log

pub mod ref_name;
pub mod reference;
pub mod reflog;

use regex::Regex;
use std::sync::LazyLock;

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

pub const REFS_PREFIX: &str = "refs/";
pub const HEADS_PREFIX: &str = "refs/heads/";
pub const TAGS_PREFIX: &str = "refs/tags/";
pub const REMOTES_PREFIX: &str = "refs/remotes/";

/// Marker that introduces a symbolic reference value
pub const SYMREF_PREFIX: &str = "ref: ";

/// Regex pattern for parsing symbolic references
pub const SYMREF_REGEX: &str = r"^ref: (.+)$";

pub const INVALID_REF_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";

/// Compiled once per process; a bad pattern surfaces as `InvalidState` at use
pub(crate) static SYMREF_PATTERN: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(SYMREF_REGEX));

pub(crate) static INVALID_REF_NAME_PATTERN: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(INVALID_REF_NAME_REGEX));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_patterns_compile() {
        assert!(SYMREF_PATTERN.as_ref().is_ok_and(|re| re.is_match("ref: refs/heads/master")));
        assert!(
            INVALID_REF_NAME_PATTERN
                .as_ref()
                .is_ok_and(|re| re.is_match("a..b") && !re.is_match("feature/x"))
        );
    }
}
