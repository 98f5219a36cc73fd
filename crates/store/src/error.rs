use std::io;
use std::path::PathBuf;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced at the storage-driver boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path does not exist.
    #[error("path not found: '{0}'")]
    NotFound(PathBuf),
    /// The acting identity lacks the permission the operation needs.
    #[error("permission denied: user '{user}' cannot {action} '{path}'")]
    AccessDenied {
        /// Path the operation targeted.
        path: PathBuf,
        /// Operation that was denied.
        action: &'static str,
        /// User the operation ran as.
        user: String,
    },
    /// The underlying storage failed.
    #[error("failed to {action} '{path}': {source}")]
    Io {
        /// Operation being performed.
        action: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Constructs an I/O error with action context.
    #[must_use]
    pub fn io(action: &'static str, path: PathBuf, source: io::Error) -> Self {
        Self::Io {
            action,
            path,
            source,
        }
    }

    /// Constructs an access-denied error.
    #[must_use]
    pub fn access_denied(path: PathBuf, action: &'static str, user: &str) -> Self {
        Self::AccessDenied {
            path,
            action,
            user: user.to_string(),
        }
    }

    /// Returns true for failures worth retrying: connectivity blips and
    /// interrupted calls, never permission or existence problems.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
            ),
            Self::NotFound(_) | Self::AccessDenied { .. } => false,
        }
    }

    /// Returns true when the error reports a missing path.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true when the error reports a permission failure.
    #[must_use]
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}
