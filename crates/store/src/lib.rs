//! The storage-driver boundary of the copy engine.
//!
//! [`FileStore`] is the seam between the engine and whatever backend holds
//! the bytes: it provides the open/create/append/rename/checksum primitives
//! and the metadata setters the preservation steps need. Data-access and
//! mutation calls take an explicit [`Identity`] instead of consulting any
//! ambient execution context.
//!
//! [`LocalStore`] is the bundled implementation backed by a local directory.
//! It applies permission bits and timestamps to the real files while modeling
//! cluster-only attributes (replication, block size, checksum scheme,
//! ownership, ACLs, extended attributes) in a per-store attribute table, so
//! preservation and divergence are both observable in tests.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod error;
mod identity;
mod local;

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;
use std::time::SystemTime;

use checksums::{ChecksumScheme, DigestAlgorithm, FileChecksum};
use metadata::{AclEntry, CreateOptions, FileStatus};

pub use error::{StoreError, StoreResult};
pub use identity::Identity;
pub use local::LocalStore;

/// Attribute values a store assigns when creation parameters leave them
/// unspecified.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StoreDefaults {
    /// Default block size for new files.
    pub block_size: u64,
    /// Default replication factor for new files.
    pub replication: u16,
    /// Default checksum digest algorithm.
    pub algorithm: DigestAlgorithm,
    /// Default bytes per checksum unit.
    pub bytes_per_unit: u32,
}

impl StoreDefaults {
    /// The default checksum scheme, combining the default algorithm,
    /// bytes-per-unit, and block size.
    #[must_use]
    pub fn checksum_scheme(&self) -> ChecksumScheme {
        ChecksumScheme::new(self.algorithm, self.bytes_per_unit, self.block_size)
    }
}

impl Default for StoreDefaults {
    fn default() -> Self {
        Self {
            block_size: 128 * 1024,
            replication: 3,
            algorithm: DigestAlgorithm::Md5,
            bytes_per_unit: 512,
        }
    }
}

/// Low-level storage primitives the copy engine is built on.
///
/// Implementations may block the calling thread arbitrarily long; the engine
/// adds no timeouts of its own and relies on the surrounding framework to
/// abort stuck calls. All methods are `&self`: a store handle is shared
/// between the engine and, in tests, concurrent writers simulating an
/// independent appender.
pub trait FileStore: Send + Sync {
    /// The attribute values this store assigns by default.
    fn defaults(&self) -> StoreDefaults;

    /// Returns the status of `path`, or [`StoreError::NotFound`].
    fn status(&self, path: &Path) -> StoreResult<FileStatus>;

    /// Returns the status of `path`, or `None` when it does not exist.
    fn try_status(&self, path: &Path) -> StoreResult<Option<FileStatus>> {
        match self.status(path) {
            Ok(status) => Ok(Some(status)),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Opens `path` for reading starting at `offset`, as `identity`.
    fn open(&self, path: &Path, offset: u64, identity: &Identity)
    -> StoreResult<Box<dyn Read + Send>>;

    /// Creates (or truncates) `path` for writing, as `identity`.
    ///
    /// Unspecified creation parameters fall back to [`Self::defaults`].
    fn create(
        &self,
        path: &Path,
        options: &CreateOptions,
        identity: &Identity,
    ) -> StoreResult<Box<dyn Write + Send>>;

    /// Opens `path` for appending, as `identity`.
    fn append(&self, path: &Path, identity: &Identity) -> StoreResult<Box<dyn Write + Send>>;

    /// Creates `path` and any missing ancestors as directories.
    fn mkdirs(&self, path: &Path) -> StoreResult<()>;

    /// Renames `from` to `to`, replacing an existing file at `to`.
    fn rename(&self, from: &Path, to: &Path) -> StoreResult<()>;

    /// Deletes `path` (recursively for directories). Missing paths are not an
    /// error.
    fn delete(&self, path: &Path) -> StoreResult<()>;

    /// Computes the whole-file checksum of the first `length` bytes of
    /// `path` under the file's own scheme.
    ///
    /// Returns `None` when the store cannot produce a checksum for the entry
    /// (directories, or backends without checksum support); callers treat
    /// incomparable checksums as matching.
    fn checksum(&self, path: &Path, length: u64) -> StoreResult<Option<FileChecksum>>;

    /// Sets the permission bits of `path`.
    fn set_permissions(&self, path: &Path, mode: u32, identity: &Identity) -> StoreResult<()>;

    /// Sets the owning user and group of `path`. Requires a privileged
    /// identity.
    fn set_owner(
        &self,
        path: &Path,
        owner: &str,
        group: &str,
        identity: &Identity,
    ) -> StoreResult<()>;

    /// Sets the modification and access times of `path`.
    fn set_times(
        &self,
        path: &Path,
        modification: SystemTime,
        access: SystemTime,
        identity: &Identity,
    ) -> StoreResult<()>;

    /// Replaces the ACL entries of `path`.
    fn set_acl(&self, path: &Path, entries: &[AclEntry], identity: &Identity) -> StoreResult<()>;

    /// Replaces the extended attributes of `path`.
    fn set_xattrs(
        &self,
        path: &Path,
        xattrs: &BTreeMap<String, Vec<u8>>,
        identity: &Identity,
    ) -> StoreResult<()>;
}
