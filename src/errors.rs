//! Error taxonomy of the repository core
//!
//! Every storage and model operation reports one of these variants so that
//! callers can tell retryable conditions (`IoFailure`) from data problems
//! (`CorruptObject`) and from plain misuse (`InvalidArgument`).

use crate::artifacts::objects::object_id::ObjectId;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a repository (or any parent): {0}")]
    NotARepository(PathBuf),

    #[error("repository already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("corrupt object: {0}")]
    CorruptObject(String),

    #[error("reference {0} not found")]
    RefNotFound(String),

    #[error("reference {0} already exists")]
    RefAlreadyExists(String),

    #[error("symbolic reference target {0} does not exist")]
    TargetNotFound(String),

    #[error("reference {name} points at missing target {target}")]
    DanglingReference { name: String, target: String },

    #[error("reference cycle detected while resolving {0}")]
    ReferenceCycle(String),

    #[error("malformed reference {name}: {content:?}")]
    MalformedReference { name: String, content: String },

    #[error("path {0} is not in the index")]
    IndexEntryNotFound(PathBuf),

    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Error::CorruptObject(reason.into())
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidArgument(reason.into())
    }
}

impl From<walkdir::Error> for Error {
    fn from(error: walkdir::Error) -> Self {
        Error::IoFailure(error.into())
    }
}
