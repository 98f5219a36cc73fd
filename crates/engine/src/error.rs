use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use checksums::CompatibilityError;
use store::StoreError;

/// Result type for engine operations.
pub type CopyResult<T> = Result<T, CopyError>;

/// Sentinel substring carried by every length-mismatch verification failure.
///
/// Callers grep for it to distinguish an expected race with a concurrent
/// appender from unexplained corruption.
pub const LENGTH_MISMATCH_ERROR_MSG: &str = "Mismatch in length of source";

/// Sentinel substring carried by every checksum-mismatch verification
/// failure. See [`LENGTH_MISMATCH_ERROR_MSG`].
pub const CHECKSUM_MISMATCH_ERROR_MSG: &str = "Checksum mismatch between";

/// Kind of filesystem entry, for type-conflict diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("directory"),
        }
    }
}

/// Error produced while classifying or executing one copy task.
#[derive(Debug)]
pub struct CopyError {
    kind: CopyErrorKind,
}

impl CopyError {
    fn new(kind: CopyErrorKind) -> Self {
        Self { kind }
    }

    /// Constructs a type-conflict error ("can't replace X with Y").
    #[must_use]
    pub fn type_conflict(target: PathBuf, existing: EntryKind, replacement: EntryKind) -> Self {
        Self::new(CopyErrorKind::TypeConflict {
            target,
            existing,
            replacement,
        })
    }

    /// Constructs a checksum-scheme incompatibility error.
    #[must_use]
    pub fn incompatible(source_path: PathBuf, cause: CompatibilityError) -> Self {
        Self::new(CopyErrorKind::Incompatible { source_path, cause })
    }

    /// Constructs a length-mismatch verification error.
    #[must_use]
    pub fn length_mismatch(source: PathBuf, expected: u64, actual: u64) -> Self {
        Self::new(CopyErrorKind::LengthMismatch {
            source,
            expected,
            actual,
        })
    }

    /// Constructs a checksum-mismatch verification error.
    #[must_use]
    pub fn checksum_mismatch(source: PathBuf, target: PathBuf) -> Self {
        Self::new(CopyErrorKind::ChecksumMismatch { source, target })
    }

    /// Wraps a storage-driver failure.
    #[must_use]
    pub fn store(source: StoreError) -> Self {
        Self::new(CopyErrorKind::Store { source })
    }

    /// Constructs an I/O error with action context.
    #[must_use]
    pub fn io(action: &'static str, path: PathBuf, source: io::Error) -> Self {
        Self::new(CopyErrorKind::Io {
            action,
            path,
            source,
        })
    }

    /// Wraps a failure that exhausted (or was ineligible for) retries.
    #[must_use]
    pub fn retry(operation: &'static str, attempts: u32, source: Self) -> Self {
        Self::new(CopyErrorKind::Retry {
            operation,
            attempts,
            source: Box::new(source),
        })
    }

    /// Wraps a failure with the task it belongs to; the orchestrator-level
    /// wrapping layer.
    #[must_use]
    pub fn task(relative_path: &str, source: Self) -> Self {
        Self::new(CopyErrorKind::Task {
            relative_path: relative_path.to_string(),
            source: Box::new(source),
        })
    }

    /// Provides access to the underlying error kind.
    #[must_use]
    pub fn kind(&self) -> &CopyErrorKind {
        &self.kind
    }

    /// Returns true for failures worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match &self.kind {
            CopyErrorKind::Store { source } => source.is_transient(),
            CopyErrorKind::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// Returns true when this error (or any wrapped cause) is a type
    /// conflict. Type conflicts indicate a structural tree conflict and are
    /// never swallowed by the ignore-failures policy.
    #[must_use]
    pub fn is_type_conflict(&self) -> bool {
        match &self.kind {
            CopyErrorKind::TypeConflict { .. } => true,
            CopyErrorKind::Retry { source, .. } | CopyErrorKind::Task { source, .. } => {
                source.is_type_conflict()
            }
            _ => false,
        }
    }

    /// Returns true when this error reports a permission failure.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        match &self.kind {
            CopyErrorKind::Store { source } => source.is_access_denied(),
            CopyErrorKind::Io { source, .. } => source.kind() == io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    /// Returns true for the two verification failures a concurrent appender
    /// can legitimately cause.
    #[must_use]
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self.kind,
            CopyErrorKind::LengthMismatch { .. } | CopyErrorKind::ChecksumMismatch { .. }
        )
    }
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CopyErrorKind::TypeConflict {
                target,
                existing,
                replacement,
            } => write!(
                f,
                "Can't replace '{}': existing {existing} cannot be replaced by a {replacement}",
                target.display()
            ),
            CopyErrorKind::Incompatible { source_path, cause } => {
                write!(f, "cannot copy '{}': {cause}", source_path.display())
            }
            CopyErrorKind::LengthMismatch {
                source,
                expected,
                actual,
            } => write!(
                f,
                "{LENGTH_MISMATCH_ERROR_MSG} '{}': expected {expected} bytes, target holds {actual}",
                source.display()
            ),
            CopyErrorKind::ChecksumMismatch { source, target } => write!(
                f,
                "{CHECKSUM_MISMATCH_ERROR_MSG} '{}' and '{}': this can be caused by a block-size \
                 difference; preserve block sizes ('b') or skip checksum verification to proceed",
                source.display(),
                target.display()
            ),
            CopyErrorKind::Store { source } => write!(f, "{source}"),
            CopyErrorKind::Io {
                action,
                path,
                source,
            } => write!(f, "failed to {action} '{}': {source}", path.display()),
            CopyErrorKind::Retry {
                operation,
                attempts,
                source,
            } => write!(f, "{operation} failed after {attempts} attempt(s): {source}"),
            CopyErrorKind::Task {
                relative_path,
                source,
            } => write!(f, "copy task '{relative_path}' failed: {source}"),
        }
    }
}

impl Error for CopyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            CopyErrorKind::Retry { source, .. } | CopyErrorKind::Task { source, .. } => {
                Some(source.as_ref())
            }
            CopyErrorKind::Store { source } => Some(source),
            CopyErrorKind::Io { source, .. } => Some(source),
            CopyErrorKind::Incompatible { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<StoreError> for CopyError {
    fn from(source: StoreError) -> Self {
        Self::store(source)
    }
}

/// Classification of copy failures.
#[derive(Debug)]
pub enum CopyErrorKind {
    /// A file/directory swap at the target.
    TypeConflict {
        /// Target path in conflict.
        target: PathBuf,
        /// What exists at the target.
        existing: EntryKind,
        /// What the source would put there.
        replacement: EntryKind,
    },
    /// Source and target checksum schemes cannot be compared.
    Incompatible {
        /// Source file the copy was attempted for.
        source_path: PathBuf,
        /// The scheme incompatibility.
        cause: CompatibilityError,
    },
    /// The transferred byte count does not match the snapshot length.
    LengthMismatch {
        /// Source path.
        source: PathBuf,
        /// Snapshot length the transfer was sized for.
        expected: u64,
        /// Bytes the target actually holds.
        actual: u64,
    },
    /// The post-transfer checksums differ.
    ChecksumMismatch {
        /// Source path.
        source: PathBuf,
        /// Target path.
        target: PathBuf,
    },
    /// The storage driver failed.
    Store {
        /// Underlying store error.
        source: StoreError,
    },
    /// Byte streaming failed.
    Io {
        /// Action being performed.
        action: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// A retried operation ultimately failed.
    Retry {
        /// Operation that was retried.
        operation: &'static str,
        /// Attempts made before giving up.
        attempts: u32,
        /// The last failure.
        source: Box<CopyError>,
    },
    /// A task failed; the outermost wrapping layer.
    Task {
        /// Relative path of the failed task.
        relative_path: String,
        /// The propagated failure.
        source: Box<CopyError>,
    },
}

/// Returns the [`EntryKind`] for a status-like directory flag.
#[must_use]
pub const fn entry_kind(is_directory: bool) -> EntryKind {
    if is_directory {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}
