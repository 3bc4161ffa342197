use std::fmt;

use crate::model::ValidationError;

/// Machine-readable error codes surfaced by the CLI and in JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    EntityNotFound,
    InvalidTitle,
    InvalidPosition,
    AmbiguousId,
    SnapshotCorrupt,
    RemoteNotConfigured,
    RemoteUnreachable,
    Unauthorized,
    Forbidden,
    RemoteRejected,
    SnapshotWriteFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::EntityNotFound => "E2001",
            Self::InvalidTitle => "E2002",
            Self::InvalidPosition => "E2003",
            Self::AmbiguousId => "E2004",
            Self::SnapshotCorrupt => "E3001",
            Self::RemoteNotConfigured => "E4001",
            Self::RemoteUnreachable => "E4002",
            Self::Unauthorized => "E4003",
            Self::Forbidden => "E4004",
            Self::RemoteRejected => "E4005",
            Self::SnapshotWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Workspace not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::EntityNotFound => "List or item not found",
            Self::InvalidTitle => "Invalid title",
            Self::InvalidPosition => "Invalid position",
            Self::AmbiguousId => "Ambiguous id",
            Self::SnapshotCorrupt => "Snapshot is corrupt",
            Self::RemoteNotConfigured => "No server configured",
            Self::RemoteUnreachable => "Server unreachable",
            Self::Unauthorized => "Not signed in",
            Self::Forbidden => "Not allowed by the server",
            Self::RemoteRejected => "Server rejected the request",
            Self::SnapshotWriteFailed => "Snapshot write failed",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `tudu init` in this directory first."),
            Self::ConfigParseError => Some("Fix syntax in .tudu/config.toml and retry."),
            Self::EntityNotFound => Some("Run `tudu list ls` or `tudu item ls` to see ids."),
            Self::InvalidTitle => Some("Use a non-empty title of at most 200 characters."),
            Self::InvalidPosition => Some("Positions must be finite numbers."),
            Self::AmbiguousId => Some("Use a longer id prefix to disambiguate."),
            Self::SnapshotCorrupt => {
                Some("Run `tudu reset --force` to discard the snapshot and re-seed.")
            }
            Self::RemoteNotConfigured => {
                Some("Set [remote] base_url in .tudu/config.toml or pass --server to init.")
            }
            Self::RemoteUnreachable => Some("Check the network and retry `tudu sync`."),
            Self::Unauthorized => Some("Sign in again and export the session cookie."),
            Self::Forbidden => Some("Resolve the entity with `tudu resolve <id>`."),
            Self::RemoteRejected => None,
            Self::SnapshotWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => {
                Some("Another `tudu` process holds the workspace lock; retry when it finishes.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the local mutation store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No live entity with this id.
    #[error("no list or item with id '{id}'")]
    NotFound { id: String },

    /// More than one entity matches an id prefix.
    #[error("id prefix '{prefix}' matches {count} entities")]
    Ambiguous { prefix: String, count: usize },

    /// Input rejected before it reached the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::EntityNotFound,
            Self::Ambiguous { .. } => ErrorCode::AmbiguousId,
            Self::Validation(err) => err.code(),
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
