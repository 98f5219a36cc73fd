use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use checksums::{ChecksumScheme, verify_compatible};
use metadata::{FileStatus, PreservationPlan};
use store::{FileStore, Identity};
use tracing::debug;

use crate::config::CopyConfig;
use crate::error::{CopyError, CopyResult};
use crate::skip::CopyAction;

/// Process-wide counter feeding unique staging file names.
static NEXT_TEMP_FILE_ID: AtomicUsize = AtomicUsize::new(0);

/// Executes the byte transfer for one file task: stream, verify, and promote
/// into place, retried as a unit under the configured policy.
///
/// Full rewrites stage into a sibling temporary file and finish with an
/// atomic rename, so a reader never observes a partially written target.
/// Appends write in place, since the target is intentionally being extended.
pub struct TransferExecutor<'a> {
    source_store: &'a dyn FileStore,
    target_store: &'a dyn FileStore,
    config: &'a CopyConfig,
    identity: &'a Identity,
}

impl<'a> TransferExecutor<'a> {
    /// Creates an executor over the given stores.
    pub fn new(
        source_store: &'a dyn FileStore,
        target_store: &'a dyn FileStore,
        config: &'a CopyConfig,
        identity: &'a Identity,
    ) -> Self {
        Self {
            source_store,
            target_store,
            config,
            identity,
        }
    }

    /// Transfers `source` to `target_path` according to `action` and returns
    /// the number of bytes actually written.
    ///
    /// The length streamed and verified is the one captured in the `source`
    /// snapshot; a concurrent writer growing the live file past that point is
    /// invisible here.
    pub fn execute(
        &self,
        source: &FileStatus,
        target_path: &Path,
        action: CopyAction,
        plan: &PreservationPlan,
    ) -> CopyResult<u64> {
        match action {
            CopyAction::Append { .. } => self
                .config
                .retry
                .run("append to file", |_| self.append_once(source, target_path)),
            _ => self
                .config
                .retry
                .run("copy file", |_| self.copy_once(source, target_path, plan)),
        }
    }

    fn copy_once(
        &self,
        source: &FileStatus,
        target_path: &Path,
        plan: &PreservationPlan,
    ) -> CopyResult<u64> {
        if !self.config.skip_checksum {
            let target_scheme = self.effective_create_scheme(plan);
            verify_compatible(&source.checksum_scheme(), &target_scheme, source.length)
                .map_err(|cause| CopyError::incompatible(source.path.clone(), cause))?;
        }
        if let Some(parent) = target_path.parent() {
            self.target_store.mkdirs(parent)?;
        }
        let staging_path = staging_sibling(target_path);
        debug!(
            staging = %staging_path.display(),
            target = %target_path.display(),
            "staging full copy"
        );
        let result = self.write_and_promote(source, target_path, &staging_path, plan);
        if result.is_err() {
            // leave the original target untouched, discard the partial staging file
            let _ = self.target_store.delete(&staging_path);
        }
        result
    }

    fn write_and_promote(
        &self,
        source: &FileStatus,
        target_path: &Path,
        staging_path: &Path,
        plan: &PreservationPlan,
    ) -> CopyResult<u64> {
        let mut reader = self.source_store.open(&source.path, 0, self.identity)?;
        let written = {
            let mut writer = self
                .target_store
                .create(staging_path, &plan.create, self.identity)?;
            let written =
                self.stream(reader.as_mut(), writer.as_mut(), source, staging_path, source.length)?;
            writer
                .flush()
                .map_err(|error| CopyError::io("flush", staging_path.to_path_buf(), error))?;
            written
        };
        self.verify(source, staging_path)?;
        self.target_store.rename(staging_path, target_path)?;
        Ok(written)
    }

    fn append_once(&self, source: &FileStatus, target_path: &Path) -> CopyResult<u64> {
        let existing = self.target_store.status(target_path)?;
        if !self.config.skip_checksum {
            verify_compatible(
                &source.checksum_scheme(),
                &existing.checksum_scheme(),
                source.length,
            )
            .map_err(|cause| CopyError::incompatible(source.path.clone(), cause))?;
        }
        // re-read the offset on every attempt so a retried append resumes
        // after whatever the previous attempt managed to write
        let offset = existing.length;
        let Some(remaining) = source.length.checked_sub(offset) else {
            return Err(CopyError::length_mismatch(
                source.path.clone(),
                source.length,
                offset,
            ));
        };
        let mut reader = self.source_store.open(&source.path, offset, self.identity)?;
        let written = {
            let mut writer = self.target_store.append(target_path, self.identity)?;
            let written =
                self.stream(reader.as_mut(), writer.as_mut(), source, target_path, remaining)?;
            writer
                .flush()
                .map_err(|error| CopyError::io("flush", target_path.to_path_buf(), error))?;
            written
        };
        self.verify(source, target_path)?;
        Ok(written)
    }

    /// Streams up to `length` bytes from `reader` to `writer` in
    /// buffer-sized chunks. A short source stops early; the length check in
    /// [`Self::verify`] catches the shortfall.
    fn stream(
        &self,
        reader: &mut dyn Read,
        writer: &mut dyn Write,
        source: &FileStatus,
        target: &Path,
        length: u64,
    ) -> CopyResult<u64> {
        let mut buffer = vec![0u8; self.config.copy_buffer_size.max(1)];
        let mut remaining = length;
        let mut written = 0u64;
        while remaining > 0 {
            let want = usize::try_from(remaining)
                .map_or(buffer.len(), |r| r.min(buffer.len()));
            let read = reader
                .read(&mut buffer[..want])
                .map_err(|error| CopyError::io("read from", source.path.clone(), error))?;
            if read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..read])
                .map_err(|error| CopyError::io("write to", target.to_path_buf(), error))?;
            written += read as u64;
            remaining -= read as u64;
        }
        Ok(written)
    }

    /// Verifies `staged` against the `source` snapshot: length always,
    /// whole-file checksum unless disabled. Both failure modes carry a fixed
    /// sentinel substring so callers can tell an append race from corruption.
    fn verify(&self, source: &FileStatus, staged: &Path) -> CopyResult<()> {
        let staged_length = self.target_store.status(staged)?.length;
        if staged_length != source.length {
            return Err(CopyError::length_mismatch(
                source.path.clone(),
                source.length,
                staged_length,
            ));
        }
        if self.config.skip_checksum || source.length == 0 {
            return Ok(());
        }
        let source_sum = self.source_store.checksum(&source.path, source.length)?;
        let target_sum = self.target_store.checksum(staged, source.length)?;
        if let (Some(expected), Some(actual)) = (source_sum, target_sum)
            && expected != actual
        {
            return Err(CopyError::checksum_mismatch(
                source.path.clone(),
                staged.to_path_buf(),
            ));
        }
        Ok(())
    }

    /// The checksum scheme the target will effectively be created with:
    /// preserved values from the plan, store defaults for the rest.
    fn effective_create_scheme(&self, plan: &PreservationPlan) -> ChecksumScheme {
        let defaults = self.target_store.defaults();
        let (algorithm, bytes_per_unit) = plan
            .create
            .checksum
            .unwrap_or((defaults.algorithm, defaults.bytes_per_unit));
        let block_size = plan.create.block_size.unwrap_or(defaults.block_size);
        ChecksumScheme::new(algorithm, bytes_per_unit, block_size)
    }
}

/// Applies the post-transfer steps of `plan` to `path`.
///
/// Ownership is handed over last: once the entry changes hands the writing
/// identity may no longer be allowed to touch it.
pub(crate) fn apply_preservation(
    store: &dyn FileStore,
    path: &Path,
    plan: &PreservationPlan,
    identity: &Identity,
) -> CopyResult<()> {
    if plan.is_post_transfer_noop() {
        return Ok(());
    }
    if let Some(mode) = plan.permissions {
        store.set_permissions(path, mode, identity)?;
    }
    if let Some(entries) = &plan.acl {
        store.set_acl(path, entries, identity)?;
    }
    if let Some(xattrs) = &plan.xattrs {
        store.set_xattrs(path, xattrs, identity)?;
    }
    if let Some((modification, access)) = plan.times {
        store.set_times(path, modification, access, identity)?;
    }
    if plan.owner.is_some() || plan.group.is_some() {
        let status = store.status(path)?;
        let owner = plan.owner.as_deref().unwrap_or(status.owner.as_str());
        let group = plan.group.as_deref().unwrap_or(status.group.as_str());
        store.set_owner(path, owner, group, identity)?;
    }
    Ok(())
}

/// Builds a unique staging path next to `target`, so the finishing rename
/// stays within one directory.
fn staging_sibling(target: &Path) -> PathBuf {
    let unique = NEXT_TEMP_FILE_ID.fetch_add(1, Ordering::Relaxed);
    let name = target
        .file_name()
        .map_or_else(|| "target".to_string(), |n| n.to_string_lossy().into_owned());
    let staged = format!(".{name}.copying.{}.{unique}", std::process::id());
    target.parent().map_or_else(|| PathBuf::from(&staged), |parent| parent.join(&staged))
}
