//! Temp-directory backed store fixtures shared by integration tests.
//!
//! Helpers here panic on setup failures instead of returning errors; they
//! only ever run inside tests.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::io::Write;
use std::path::{Path, PathBuf};

use metadata::{CreateOptions, FileStatus};
use store::{FileStore, Identity, LocalStore, StoreDefaults};
use tempfile::TempDir;

/// A source tree and a target tree, each backed by its own [`LocalStore`]
/// over a shared temporary directory.
pub struct CopyFixture {
    _temp: TempDir,
    /// Store holding the source tree.
    pub source_store: LocalStore,
    /// Store holding the target tree.
    pub target_store: LocalStore,
    source_root: PathBuf,
    target_root: PathBuf,
}

impl CopyFixture {
    /// Creates a fixture where both stores use the default attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_defaults(StoreDefaults::default(), StoreDefaults::default())
    }

    /// Creates a fixture with distinct default attributes per side, for
    /// exercising scheme divergence between storage backends.
    #[must_use]
    pub fn with_defaults(source: StoreDefaults, target: StoreDefaults) -> Self {
        let temp = TempDir::new().expect("create temp directory");
        let source_root = temp.path().join("source");
        let target_root = temp.path().join("target");
        let source_store = LocalStore::new(source);
        let target_store = LocalStore::new(target);
        source_store.mkdirs(&source_root).expect("create source root");
        target_store.mkdirs(&target_root).expect("create target root");
        Self {
            _temp: temp,
            source_store,
            target_store,
            source_root,
            target_root,
        }
    }

    /// Root of the source tree.
    #[must_use]
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Root of the target tree.
    #[must_use]
    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// Absolute source path for a `/`-rooted relative path.
    #[must_use]
    pub fn source_path(&self, relative: &str) -> PathBuf {
        join_relative(&self.source_root, relative)
    }

    /// Absolute target path for a `/`-rooted relative path.
    #[must_use]
    pub fn target_path(&self, relative: &str) -> PathBuf {
        join_relative(&self.target_root, relative)
    }

    /// Creates a directory (and missing ancestors) in the source tree.
    pub fn create_source_dir(&self, relative: &str) {
        self.source_store
            .mkdirs(&self.source_path(relative))
            .expect("create source directory");
    }

    /// Writes a source file with the store's default attributes.
    pub fn write_source(&self, relative: &str, data: &[u8]) {
        self.write_source_with(relative, data, &CreateOptions::default());
    }

    /// Writes a source file with explicit creation attributes.
    pub fn write_source_with(&self, relative: &str, data: &[u8], options: &CreateOptions) {
        write_file(&self.source_store, &self.source_path(relative), data, options);
    }

    /// Writes a pre-existing target file with the store's default attributes.
    pub fn write_target(&self, relative: &str, data: &[u8]) {
        self.write_target_with(relative, data, &CreateOptions::default());
    }

    /// Writes a pre-existing target file with explicit creation attributes.
    pub fn write_target_with(&self, relative: &str, data: &[u8], options: &CreateOptions) {
        write_file(&self.target_store, &self.target_path(relative), data, options);
    }

    /// Status snapshot of a source entry.
    #[must_use]
    pub fn source_status(&self, relative: &str) -> FileStatus {
        self.source_store
            .status(&self.source_path(relative))
            .expect("source status")
    }

    /// Status snapshot of a target entry.
    #[must_use]
    pub fn target_status(&self, relative: &str) -> FileStatus {
        self.target_store
            .status(&self.target_path(relative))
            .expect("target status")
    }
}

impl Default for CopyFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn join_relative(root: &Path, relative: &str) -> PathBuf {
    let trimmed = relative.trim_start_matches('/');
    if trimmed.is_empty() {
        root.to_path_buf()
    } else {
        root.join(trimmed)
    }
}

fn write_file(store: &LocalStore, path: &Path, data: &[u8], options: &CreateOptions) {
    if let Some(parent) = path.parent() {
        store.mkdirs(parent).expect("create parent directories");
    }
    let mut writer = store
        .create(path, options, &Identity::superuser())
        .expect("create file");
    writer.write_all(data).expect("write file contents");
    writer.flush().expect("flush file contents");
}

/// Deterministic, position-dependent test bytes of the given length.
#[must_use]
pub fn pattern_bytes(length: usize) -> Vec<u8> {
    (0..length).map(|i| (i % 251) as u8).collect()
}
