//! Error taxonomy shared by the storage, service, and API layers.

use crate::UserId;
use serde::{Deserialize, Serialize};

/// Coarse classification used by transports to pick protocol codes and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Structurally or semantically invalid request. Never retried.
    Validation,
    /// Duplicate create attempt. Reported, not retried.
    Conflict,
    /// Referenced relationship or identity does not exist. Reported, not retried.
    Absence,
    /// Storage or directory failure. The only kind a transport may retry.
    Transient,
}

/// Failure inside a graph storage backend.
#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    /// Uniqueness constraint rejected a write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("graph store error: {0}")]
    Other(String),
}

/// Failure of the external identity directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("identity directory error: {0}")]
    Other(String),
}

/// Errors returned by the social graph engine.
#[derive(Debug, thiserror::Error)]
pub enum SocialGraphError {
    #[error("cannot follow or unfollow yourself")]
    SelfAction,
    #[error("target user not found: {0}")]
    TargetNotFound(UserId),
    #[error("already following user {0}")]
    AlreadyFollowing(UserId),
    #[error("not following user {0}")]
    NotFollowing(UserId),
    #[error("invalid cursor")]
    InvalidCursor,
    #[error("limit must be a positive integer, got {0}")]
    InvalidLimit(i64),
    #[error("store: {0}")]
    Store(#[from] GraphStoreError),
    #[error("directory: {0}")]
    Directory(#[from] DirectoryError),
}

impl SocialGraphError {
    /// Stable tag for transports; never parse the display text.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SelfAction => "SELF_ACTION",
            Self::TargetNotFound(_) => "TARGET_NOT_FOUND",
            Self::AlreadyFollowing(_) => "ALREADY_FOLLOWING",
            Self::NotFollowing(_) => "NOT_FOLLOWING",
            Self::InvalidCursor => "INVALID_CURSOR",
            Self::InvalidLimit(_) => "INVALID_LIMIT",
            Self::Store(_) => "STORE_UNAVAILABLE",
            Self::Directory(_) => "DIRECTORY_UNAVAILABLE",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SelfAction | Self::InvalidCursor | Self::InvalidLimit(_) => ErrorKind::Validation,
            Self::AlreadyFollowing(_) => ErrorKind::Conflict,
            Self::TargetNotFound(_) | Self::NotFollowing(_) => ErrorKind::Absence,
            Self::Store(_) | Self::Directory(_) => ErrorKind::Transient,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
