use std::path::{Path, PathBuf};

use metadata::AttributeSet;

use crate::retry::RetryPolicy;

/// Default byte-buffer size for streaming file contents.
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 8192;

/// Options controlling how tasks are processed.
///
/// Values are set once by the job driver and shared read-only by every task.
#[derive(Clone, Debug)]
pub struct CopyConfig {
    pub(crate) target_work_path: PathBuf,
    pub(crate) target_final_path: PathBuf,
    pub(crate) overwrite: bool,
    pub(crate) sync_folders: bool,
    pub(crate) append: bool,
    pub(crate) skip_checksum: bool,
    pub(crate) ignore_failures: bool,
    pub(crate) verbose: bool,
    pub(crate) preserve: AttributeSet,
    pub(crate) copy_buffer_size: usize,
    pub(crate) retry: RetryPolicy,
}

impl CopyConfig {
    /// Creates a configuration with defaults applied.
    ///
    /// `target_work_path` is the root tasks materialize output under;
    /// `target_final_path` is the root the job promotes finished output to.
    /// The two are usually equal except when a job stages output through a
    /// working directory. By default nothing is overwritten, appended,
    /// ignored, or preserved.
    #[must_use]
    pub fn new(target_work_path: impl Into<PathBuf>, target_final_path: impl Into<PathBuf>) -> Self {
        Self {
            target_work_path: target_work_path.into(),
            target_final_path: target_final_path.into(),
            overwrite: false,
            sync_folders: false,
            append: false,
            skip_checksum: false,
            ignore_failures: false,
            verbose: false,
            preserve: AttributeSet::empty(),
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            retry: RetryPolicy::default(),
        }
    }

    /// Rewrites every file regardless of what the target already holds.
    #[must_use]
    pub const fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Enables folder-synchronization mode, where the task list was built
    /// against an existing target tree.
    #[must_use]
    pub const fn sync_folders(mut self, sync: bool) -> Self {
        self.sync_folders = sync;
        self
    }

    /// Extends shorter targets in place when their bytes are a verified
    /// prefix of the source, instead of rewriting from scratch.
    #[must_use]
    pub const fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Trusts file lengths alone and never compares checksums, neither for
    /// skip decisions nor for post-transfer verification.
    #[must_use]
    pub const fn skip_checksum(mut self, skip: bool) -> Self {
        self.skip_checksum = skip;
        self
    }

    /// Absorbs per-task failures (counting and recording them) instead of
    /// aborting on the first one. Type conflicts still abort.
    #[must_use]
    pub const fn ignore_failures(mut self, ignore: bool) -> Self {
        self.ignore_failures = ignore;
        self
    }

    /// Emits `FILE_COPIED`/`FILE_SKIPPED`/`DIR_COPIED` detail records in
    /// addition to the always-on `SKIP` and `FAIL` records.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Selects the attributes to preserve on copied entries.
    #[must_use]
    pub const fn preserve(mut self, preserve: AttributeSet) -> Self {
        self.preserve = preserve;
        self
    }

    /// Sets the streaming buffer size in bytes.
    #[must_use]
    pub const fn copy_buffer_size(mut self, size: usize) -> Self {
        self.copy_buffer_size = size;
        self
    }

    /// Sets the retry policy for byte transfers.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The root tasks materialize output under.
    #[must_use]
    pub fn target_work_path(&self) -> &Path {
        &self.target_work_path
    }

    /// The root the job promotes finished output to.
    #[must_use]
    pub fn target_final_path(&self) -> &Path {
        &self.target_final_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let config = CopyConfig::new("/work", "/final");
        assert!(!config.overwrite);
        assert!(!config.append);
        assert!(!config.skip_checksum);
        assert!(!config.ignore_failures);
        assert!(config.preserve.is_empty());
        assert_eq!(config.copy_buffer_size, DEFAULT_COPY_BUFFER_SIZE);
    }
}
