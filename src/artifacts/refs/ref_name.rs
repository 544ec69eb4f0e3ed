use crate::artifacts::refs::{
    HEAD_REF_NAME, HEADS_PREFIX, INVALID_REF_NAME_PATTERN, REFS_PREFIX, REMOTES_PREFIX, TAGS_PREFIX,
};
use crate::errors::{Error, Result};
use std::path::{Path, PathBuf};

/// A validated reference name
///
/// Always holds the full name: `HEAD` or something under `refs/`. Bare
/// shorthand such as `feature` is expanded to `refs/heads/feature` on parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefName(String);

impl RefName {
    pub fn head() -> Self {
        Self(HEAD_REF_NAME.to_string())
    }

    /// Parse a full reference name or a branch shorthand
    pub fn try_parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        if name == HEAD_REF_NAME {
            return Ok(Self::head());
        }

        if name.starts_with(REFS_PREFIX) {
            Self::validate(&name)?;
            return Ok(Self(name));
        }

        Self::branch(&name)
    }

    /// `refs/heads/<name>`
    pub fn branch(name: &str) -> Result<Self> {
        Self::validate(name)?;
        Ok(Self(format!("{HEADS_PREFIX}{name}")))
    }

    /// `refs/tags/<name>`
    pub fn tag(name: &str) -> Result<Self> {
        Self::validate(name)?;
        Ok(Self(format!("{TAGS_PREFIX}{name}")))
    }

    fn validate(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::invalid("reference name cannot be empty"));
        }

        let re = INVALID_REF_NAME_PATTERN.as_ref().map_err(|error| {
            Error::InvalidState(format!("invalid reference name regex: {error}"))
        })?;

        if re.is_match(name) || name.split('/').any(str::is_empty) {
            return Err(Error::invalid(format!("invalid reference name: {name:?}")));
        }

        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_head(&self) -> bool {
        self.0 == HEAD_REF_NAME
    }

    pub fn is_branch(&self) -> bool {
        self.0.starts_with(HEADS_PREFIX)
    }

    pub fn is_tag(&self) -> bool {
        self.0.starts_with(TAGS_PREFIX)
    }

    /// The name without its namespace, e.g. `feature` for `refs/heads/feature`
    pub fn short_name(&self) -> &str {
        [HEADS_PREFIX, TAGS_PREFIX, REMOTES_PREFIX]
            .iter()
            .find_map(|prefix| self.0.strip_prefix(prefix))
            .unwrap_or(&self.0)
    }

    /// Location of the reference file under a control directory
    pub fn to_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
    }
}

impl std::str::FromStr for RefName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_parse(s)
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
