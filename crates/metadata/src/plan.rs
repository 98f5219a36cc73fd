use std::collections::BTreeMap;
use std::time::SystemTime;

use checksums::DigestAlgorithm;

use crate::attrs::{Attribute, AttributeSet};
use crate::status::{AclEntry, FileStatus};

/// Creation parameters for the target file.
///
/// `None` fields mean "use whatever the target store assigns by default";
/// populated fields carry the source's value because the corresponding
/// attribute is preserved.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CreateOptions {
    /// Block size to create the file with.
    pub block_size: Option<u64>,
    /// Replication factor to create the file with.
    pub replication: Option<u16>,
    /// Checksum algorithm and bytes-per-unit to create the file with.
    pub checksum: Option<(DigestAlgorithm, u32)>,
}

/// Concrete copy obligations resolved from a preserve set and a source
/// snapshot: what to request at creation time and what to apply after the
/// bytes have been transferred.
///
/// Attributes absent from the plan are deliberately left at target defaults.
#[derive(Clone, Debug, Default)]
pub struct PreservationPlan {
    /// Pre-transfer creation parameters.
    pub create: CreateOptions,
    /// Permission bits to apply post-transfer.
    pub permissions: Option<u32>,
    /// Owning user to apply post-transfer.
    pub owner: Option<String>,
    /// Owning group to apply post-transfer.
    pub group: Option<String>,
    /// ACL entries to apply post-transfer.
    pub acl: Option<Vec<AclEntry>>,
    /// Extended attributes to apply post-transfer.
    pub xattrs: Option<BTreeMap<String, Vec<u8>>>,
    /// (modification, access) times to apply post-transfer.
    pub times: Option<(SystemTime, SystemTime)>,
}

impl PreservationPlan {
    /// Resolves the obligations for copying `source` under `set`.
    ///
    /// Selecting [`Attribute::ChecksumType`] forces block-size preservation as
    /// well ([`AttributeSet::preserves`] encodes the coupling), since the
    /// target could otherwise never verify against the source checksum for
    /// multi-block files.
    #[must_use]
    pub fn resolve(set: AttributeSet, source: &FileStatus) -> Self {
        Self {
            create: CreateOptions {
                block_size: set
                    .preserves(Attribute::BlockSize)
                    .then_some(source.block_size),
                replication: set
                    .preserves(Attribute::Replication)
                    .then_some(source.replication),
                checksum: set
                    .preserves(Attribute::ChecksumType)
                    .then_some((source.checksum_algorithm, source.bytes_per_unit)),
            },
            permissions: set
                .preserves(Attribute::Permission)
                .then_some(source.permissions),
            owner: set
                .preserves(Attribute::User)
                .then(|| source.owner.clone()),
            group: set
                .preserves(Attribute::Group)
                .then(|| source.group.clone()),
            acl: set.preserves(Attribute::Acl).then(|| source.acl.clone()),
            xattrs: set
                .preserves(Attribute::Xattr)
                .then(|| source.xattrs.clone()),
            times: set
                .preserves(Attribute::Times)
                .then_some((source.modification_time, source.access_time)),
        }
    }

    /// Returns true when no post-transfer application step is required.
    #[must_use]
    pub const fn is_post_transfer_noop(&self) -> bool {
        self.permissions.is_none()
            && self.owner.is_none()
            && self.group.is_none()
            && self.acl.is_none()
            && self.xattrs.is_none()
            && self.times.is_none()
    }
}
