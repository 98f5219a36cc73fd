use std::fmt;
use std::path::Path;

use metadata::FileStatus;
use store::FileStore;

use crate::config::CopyConfig;
use crate::error::{CopyError, CopyResult, entry_kind};

/// Why a file was left untouched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// Lengths match and checksum comparison is disabled.
    LengthMatch,
    /// Lengths match and the whole-file checksums agree (or cannot be
    /// compared).
    LengthAndChecksumMatch,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMatch => f.write_str("length matches"),
            Self::LengthAndChecksumMatch => f.write_str("length and checksum match"),
        }
    }
}

/// What a task must do to bring the target in line with the source.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CopyAction {
    /// Create the directory, or confirm it already exists.
    CreateDirectory,
    /// Leave the existing target untouched.
    Skip(SkipReason),
    /// Extend the existing target in place from `offset`.
    Append {
        /// Length of the already-present verified prefix.
        offset: u64,
    },
    /// Rewrite the target from scratch.
    Overwrite,
}

/// Decides the action for one task given the current state of the target.
///
/// Side-effect-free apart from the reads needed to compute checksums; never
/// writes. A type mismatch between the source and an existing target (file
/// where a directory is expected, or the reverse) is a structural conflict
/// and fails classification outright.
pub fn classify(
    source_store: &dyn FileStore,
    target_store: &dyn FileStore,
    source: &FileStatus,
    target_path: &Path,
    existing: Option<&FileStatus>,
    config: &CopyConfig,
) -> CopyResult<CopyAction> {
    if let Some(existing) = existing
        && existing.is_directory != source.is_directory
    {
        return Err(CopyError::type_conflict(
            target_path.to_path_buf(),
            entry_kind(existing.is_directory),
            entry_kind(source.is_directory),
        ));
    }
    if source.is_directory {
        return Ok(CopyAction::CreateDirectory);
    }
    let Some(existing) = existing else {
        return Ok(CopyAction::Overwrite);
    };
    if config.overwrite {
        return Ok(CopyAction::Overwrite);
    }
    if config.append
        && existing.length < source.length
        && (config.skip_checksum
            || checksums_match(source_store, target_store, source, target_path, existing.length)?)
    {
        return Ok(CopyAction::Append {
            offset: existing.length,
        });
    }
    if config.sync_folders
        && existing.length == source.length
        && (config.skip_checksum
            || checksums_match(source_store, target_store, source, target_path, source.length)?)
    {
        let reason = if config.skip_checksum {
            SkipReason::LengthMatch
        } else {
            SkipReason::LengthAndChecksumMatch
        };
        return Ok(CopyAction::Skip(reason));
    }
    Ok(CopyAction::Overwrite)
}

/// Compares the checksums of the first `length` bytes on both sides.
///
/// A side that cannot produce a checksum is treated as matching; differing
/// schemes produce unequal checksums and are treated as a mismatch, which is
/// the safe direction (the file gets copied).
fn checksums_match(
    source_store: &dyn FileStore,
    target_store: &dyn FileStore,
    source: &FileStatus,
    target_path: &Path,
    length: u64,
) -> CopyResult<bool> {
    let source_sum = source_store.checksum(&source.path, length)?;
    let target_sum = target_store.checksum(target_path, length)?;
    Ok(match (source_sum, target_sum) {
        (Some(source_sum), Some(target_sum)) => source_sum == target_sum,
        _ => true,
    })
}
