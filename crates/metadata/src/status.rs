use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

use checksums::{ChecksumScheme, DigestAlgorithm};

/// Scope of an ACL entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AclScope {
    /// Applies to the entry itself.
    Access,
    /// Inherited by new children of a directory.
    Default,
}

/// Principal kind an ACL entry grants permissions to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AclEntryKind {
    /// A named or owning user.
    User,
    /// A named or owning group.
    Group,
    /// The mask bounding named entries.
    Mask,
    /// Everyone else.
    Other,
}

/// One ordered ACL entry: (scope, kind, optional principal, rwx bits).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AclEntry {
    /// Entry scope.
    pub scope: AclScope,
    /// Principal kind.
    pub kind: AclEntryKind,
    /// Principal name; `None` for owner/mask/other entries.
    pub name: Option<String>,
    /// Permission bits in the low three bits (r=4, w=2, x=1).
    pub permission: u8,
}

/// Immutable metadata snapshot of one file or directory.
///
/// Captured once by the job driver when the source tree is enumerated and
/// never refreshed: every decision about a task, including the number of
/// bytes to transfer and the length to verify, uses this snapshot even if the
/// live file has changed since.
#[derive(Clone, Debug)]
pub struct FileStatus {
    /// Absolute path of the entry within its store.
    pub path: PathBuf,
    /// Whether the entry is a directory.
    pub is_directory: bool,
    /// Length in bytes; zero for directories.
    pub length: u64,
    /// Block size the file was written with.
    pub block_size: u64,
    /// Replication factor.
    pub replication: u16,
    /// Checksum digest algorithm.
    pub checksum_algorithm: DigestAlgorithm,
    /// Bytes covered by each checksum unit.
    pub bytes_per_unit: u32,
    /// Permission bits (the low nine mode bits).
    pub permissions: u32,
    /// Owning user.
    pub owner: String,
    /// Owning group.
    pub group: String,
    /// Modification time.
    pub modification_time: SystemTime,
    /// Access time.
    pub access_time: SystemTime,
    /// Ordered ACL entries; empty when the entry has no extended ACL.
    pub acl: Vec<AclEntry>,
    /// Extended attributes, name to byte value.
    pub xattrs: BTreeMap<String, Vec<u8>>,
}

impl FileStatus {
    /// The checksum scheme triple of this entry.
    #[must_use]
    pub fn checksum_scheme(&self) -> ChecksumScheme {
        ChecksumScheme::new(
            self.checksum_algorithm,
            self.bytes_per_unit,
            self.block_size,
        )
    }
}
