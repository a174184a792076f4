//! Error types for the board sync engine

use thiserror::Error;

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Stage of the cross-column move protocol at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStage {
    /// Writing the pending-move marker
    Mark,
    /// Creating the task copy in the target column
    Copy,
    /// Copying the checklist sub-collection
    Checklist,
    /// Deleting the source document
    Delete,
    /// Rewriting sibling positions in both columns
    Renumber,
    /// Removing the pending-move marker
    Finalize,
}

impl std::fmt::Display for MoveStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Mark => "mark",
            Self::Copy => "copy",
            Self::Checklist => "checklist",
            Self::Delete => "delete",
            Self::Renumber => "renumber",
            Self::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while syncing boards
#[derive(Debug, Error)]
pub enum SyncError {
    /// A write was attempted with an empty team/board/column/task id
    #[error("missing parent id: {what}")]
    MissingParent { what: String },

    /// Entity not found in the cache or the store
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Remote document does not exist (update on a deleted document)
    #[error("document not found: {path}")]
    DocumentNotFound { path: String },

    /// Domain precondition failed; the message is meant for the end user
    #[error("{message}")]
    Validation { message: String },

    /// Network or permission failure reported by the remote store
    #[error("remote {op} failed for {path}: {message}")]
    Remote {
        op: String,
        path: String,
        message: String,
    },

    /// Some of a batch of concurrent position writes failed
    #[error("{failed} of {total} position writes failed")]
    PartialWrite { failed: usize, total: usize },

    /// Cross-column move stopped part way; the pending-move marker is left behind
    #[error("move {token} failed during {stage}: {message}")]
    PartialMove {
        token: String,
        stage: MoveStage,
        message: String,
    },

    /// Container changed remotely since the gesture was computed
    #[error("container {container} changed remotely, reorder rejected")]
    StaleContainer { container: String },

    /// Remote document could not be decoded into an entity
    #[error("cannot decode {path}: {message}")]
    Decode { path: String, message: String },

    /// Configuration could not be loaded
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Background settlement task panicked or was cancelled
    #[error("settlement aborted: {message}")]
    Settlement { message: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a missing parent error
    pub fn missing_parent(what: impl Into<String>) -> Self {
        Self::MissingParent { what: what.into() }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a remote store error
    pub fn remote(
        op: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Remote {
            op: op.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap a failure of the move protocol
    pub fn partial_move(token: impl Into<String>, stage: MoveStage, cause: &SyncError) -> Self {
        Self::PartialMove {
            token: token.into(),
            stage,
            message: cause.to_string(),
        }
    }

    /// Whether the remote store (rather than local state or input) caused this error
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Remote { .. }
                | Self::DocumentNotFound { .. }
                | Self::PartialWrite { .. }
                | Self::PartialMove { .. }
        )
    }
}

impl From<figment::Error> for SyncError {
    fn from(err: figment::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::not_found("task", "abc123");
        assert_eq!(err.to_string(), "task not found: abc123");
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = SyncError::validation("user is already a member of this board");
        assert_eq!(err.to_string(), "user is already a member of this board");
    }

    #[test]
    fn test_partial_move_mentions_stage() {
        let cause = SyncError::remote("delete", "teams/t/boards/b/columns/c/tasks/x", "offline");
        let err = SyncError::partial_move("01TOKEN", MoveStage::Delete, &cause);
        let text = err.to_string();
        assert!(text.contains("during delete"));
        assert!(text.contains("offline"));
    }

    #[test]
    fn test_is_remote() {
        assert!(SyncError::remote("update", "p", "denied").is_remote());
        assert!(SyncError::PartialWrite { failed: 1, total: 3 }.is_remote());
        assert!(!SyncError::validation("nope").is_remote());
        assert!(!SyncError::missing_parent("board").is_remote());
    }
}
