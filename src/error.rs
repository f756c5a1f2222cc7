//! Error types for synchronization operations.

use crate::channels::DropReason;
use crate::types::{CommentId, TopicId};
use thiserror::Error;

/// Main error type for sync operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Comment body is empty")]
    EmptyBody,

    #[error("Invalid reply target: {0}")]
    InvalidReplyTarget(CommentId),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Comment not found: {0}")]
    CommentNotFound(CommentId),

    #[error("Topic not found: {0}")]
    TopicNotFound(TopicId),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Connection closed")]
    Disconnected,

    #[error("Connection dropped: {0:?}")]
    ConnectionDropped(DropReason),

    #[error("Not subscribed to any topic")]
    NotSubscribed,

    #[error("No active topic")]
    NoActiveTopic,

    #[error("No edit in progress")]
    NotEditing,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Coarse classification used to decide how a failure is surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally, no network call was made.
    Validation,
    Authorization,
    /// The entity vanished; it leaves the view on the next refetch.
    NotFound,
    /// Network or transport failure; the user may retry.
    Transient,
    /// API misuse, such as acting without an active topic.
    Lifecycle,
    Codec,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::EmptyBody | SyncError::InvalidReplyTarget(_) => ErrorKind::Validation,
            SyncError::Unauthorized(_) => ErrorKind::Authorization,
            SyncError::CommentNotFound(_) | SyncError::TopicNotFound(_) => ErrorKind::NotFound,
            SyncError::Transient(_) | SyncError::Disconnected | SyncError::ConnectionDropped(_) => {
                ErrorKind::Transient
            }
            SyncError::NotSubscribed | SyncError::NoActiveTopic | SyncError::NotEditing => {
                ErrorKind::Lifecycle
            }
            SyncError::Serialization(_) | SyncError::Deserialization(_) => ErrorKind::Codec,
        }
    }

    /// Only transient failures are worth repeating unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            SyncError::Deserialization(e.to_string())
        } else {
            SyncError::Serialization(e.to_string())
        }
    }
}

impl From<rmp_serde::encode::Error> for SyncError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for SyncError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        SyncError::Deserialization(e.to_string())
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
