use metadata::FileStatus;

/// One unit of work: a target-relative path and the source snapshot behind
/// it.
///
/// Built once by the external job driver per enumerated entry and consumed
/// exactly once; the snapshot is never refreshed, even if the live source
/// changes while the task is in flight.
#[derive(Clone, Debug)]
pub struct CopyTask {
    /// Path of the entry relative to the source root, rooted with `/`.
    pub relative_path: String,
    /// Metadata snapshot of the source entry.
    pub source: FileStatus,
}

impl CopyTask {
    /// Creates a task for `relative_path` backed by the `source` snapshot.
    pub fn new(relative_path: impl Into<String>, source: FileStatus) -> Self {
        Self {
            relative_path: relative_path.into(),
            source,
        }
    }
}
