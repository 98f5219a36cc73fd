use std::error::Error;
use std::fmt;

use crate::scheme::ChecksumScheme;

/// Incompatibility between the source and target checksum schemes.
///
/// Raised before a transfer that will be checksum-verified; the messages name
/// both schemes and the options that would let the copy proceed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CompatibilityError {
    /// Algorithm or bytes-per-unit mismatch: no content on the target side
    /// can ever verify against the source digest.
    SchemeMismatch {
        /// Scheme of the source file.
        source: ChecksumScheme,
        /// Effective scheme the target would be created with.
        target: ChecksumScheme,
    },
    /// Block-size mismatch for a file spanning multiple blocks; the block
    /// composition is part of the digest, so verification would always fail.
    BlockSizeMismatch {
        /// Block size of the source file.
        source: u64,
        /// Effective block size on the target side.
        target: u64,
    },
}

impl fmt::Display for CompatibilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemeMismatch { source, target } => write!(
                f,
                "checksum scheme mismatch between source {source} and target {target}: \
                 preserve the checksum type ('c') or skip checksum verification to copy this file"
            ),
            Self::BlockSizeMismatch { source, target } => write!(
                f,
                "block size mismatch between source ({source}) and target ({target}) \
                 for a multi-block file: preserve block sizes ('b') or skip checksum \
                 verification to copy this file"
            ),
        }
    }
}

impl Error for CompatibilityError {}

/// Decides whether `source` and `target` schemes yield comparable whole-file
/// checksums for a file of `length` bytes.
///
/// Algorithm and bytes-per-unit must always agree. Block sizes must agree
/// only when the file spans more than one block on either side: a
/// single-block checksum does not encode the block composition, so block-size
/// differences are invisible for files that fit within one block everywhere.
pub fn verify_compatible(
    source: &ChecksumScheme,
    target: &ChecksumScheme,
    length: u64,
) -> Result<(), CompatibilityError> {
    if source.algorithm != target.algorithm || source.bytes_per_unit != target.bytes_per_unit {
        return Err(CompatibilityError::SchemeMismatch {
            source: *source,
            target: *target,
        });
    }
    let multi_block = source.is_multi_block(length) || target.is_multi_block(length);
    if multi_block && source.block_size != target.block_size {
        return Err(CompatibilityError::BlockSizeMismatch {
            source: source.block_size,
            target: target.block_size,
        });
    }
    Ok(())
}
