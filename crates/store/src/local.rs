use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use checksums::{ChecksumScheme, FileChecksum, compute_file_checksum};
use filetime::FileTime;
use metadata::{AclEntry, CreateOptions, FileStatus};

use crate::error::{StoreError, StoreResult};
use crate::identity::Identity;
use crate::{FileStore, StoreDefaults};

const DEFAULT_FILE_MODE: u32 = 0o644;

/// Attributes the local backing filesystem cannot represent natively.
#[derive(Clone, Debug)]
struct EntryAttrs {
    block_size: u64,
    replication: u16,
    scheme: (checksums::DigestAlgorithm, u32),
    owner: String,
    group: String,
    permissions: u32,
    acl: Vec<AclEntry>,
    xattrs: BTreeMap<String, Vec<u8>>,
}

/// A [`FileStore`] backed by a local directory tree.
///
/// Lengths, timestamps, and directory structure live on the real filesystem;
/// replication, block size, checksum scheme, ownership, ACLs, and extended
/// attributes live in a per-store attribute table keyed by path. Permission
/// checks are evaluated in software against the [`Identity`] passed into each
/// call, so access-denied behavior is deterministic regardless of the user
/// the test process runs as.
pub struct LocalStore {
    defaults: StoreDefaults,
    attrs: Mutex<HashMap<PathBuf, EntryAttrs>>,
}

impl LocalStore {
    /// Creates a store with the given default attributes.
    #[must_use]
    pub fn new(defaults: StoreDefaults) -> Self {
        Self {
            defaults,
            attrs: Mutex::new(HashMap::new()),
        }
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, EntryAttrs>> {
        self.attrs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn default_entry(&self, permissions: u32) -> EntryAttrs {
        EntryAttrs {
            block_size: self.defaults.block_size,
            replication: self.defaults.replication,
            scheme: (self.defaults.algorithm, self.defaults.bytes_per_unit),
            owner: "unknown".to_string(),
            group: "unknown".to_string(),
            permissions,
            acl: Vec::new(),
            xattrs: BTreeMap::new(),
        }
    }

    fn real_mode(path: &Path) -> u32 {
        fs::metadata(path).map_or(DEFAULT_FILE_MODE, |meta| meta.permissions().mode() & 0o777)
    }

    /// Checks `identity` against the tracked permission bits of `path`.
    ///
    /// Untracked paths (never written through this store) are not enforced.
    fn check_access(
        &self,
        path: &Path,
        identity: &Identity,
        write: bool,
        action: &'static str,
    ) -> StoreResult<()> {
        if identity.is_privileged() {
            return Ok(());
        }
        let table = self.table();
        let Some(entry) = table.get(path) else {
            return Ok(());
        };
        let bits = if identity.user() == entry.owner {
            entry.permissions >> 6
        } else if identity.group() == entry.group {
            entry.permissions >> 3
        } else {
            entry.permissions
        };
        let needed = if write { 0o2 } else { 0o4 };
        if bits & needed == 0 {
            return Err(StoreError::access_denied(
                path.to_path_buf(),
                action,
                identity.user(),
            ));
        }
        Ok(())
    }

    /// Checks that `identity` owns `path` or is privileged, for metadata
    /// mutations short of ownership changes.
    fn check_owner(
        &self,
        path: &Path,
        identity: &Identity,
        action: &'static str,
    ) -> StoreResult<()> {
        if identity.is_privileged() {
            return Ok(());
        }
        let table = self.table();
        match table.get(path) {
            Some(entry) if entry.owner != identity.user() => Err(StoreError::access_denied(
                path.to_path_buf(),
                action,
                identity.user(),
            )),
            _ => Ok(()),
        }
    }

    fn metadata_of(path: &Path) -> StoreResult<fs::Metadata> {
        fs::metadata(path).map_err(|error| {
            if error.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(path.to_path_buf())
            } else {
                StoreError::io("stat", path.to_path_buf(), error)
            }
        })
    }
}

impl FileStore for LocalStore {
    fn defaults(&self) -> StoreDefaults {
        self.defaults
    }

    fn status(&self, path: &Path) -> StoreResult<FileStatus> {
        let meta = Self::metadata_of(path)?;
        let modification = meta
            .modified()
            .map_err(|error| StoreError::io("read modification time", path.to_path_buf(), error))?;
        let access = meta.accessed().unwrap_or(modification);

        let table = self.table();
        let entry = table.get(path);
        let fallback = self.default_entry(meta.permissions().mode() & 0o777);
        let entry = entry.unwrap_or(&fallback);

        Ok(FileStatus {
            path: path.to_path_buf(),
            is_directory: meta.is_dir(),
            length: if meta.is_dir() { 0 } else { meta.len() },
            block_size: entry.block_size,
            replication: entry.replication,
            checksum_algorithm: entry.scheme.0,
            bytes_per_unit: entry.scheme.1,
            permissions: entry.permissions,
            owner: entry.owner.clone(),
            group: entry.group.clone(),
            modification_time: modification,
            access_time: access,
            acl: entry.acl.clone(),
            xattrs: entry.xattrs.clone(),
        })
    }

    fn open(
        &self,
        path: &Path,
        offset: u64,
        identity: &Identity,
    ) -> StoreResult<Box<dyn Read + Send>> {
        Self::metadata_of(path)?;
        self.check_access(path, identity, false, "read")?;
        let mut file = File::open(path).map_err(|error| {
            if error.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(path.to_path_buf())
            } else {
                StoreError::io("open", path.to_path_buf(), error)
            }
        })?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))
                .map_err(|error| StoreError::io("seek", path.to_path_buf(), error))?;
        }
        Ok(Box::new(file))
    }

    fn create(
        &self,
        path: &Path,
        options: &CreateOptions,
        identity: &Identity,
    ) -> StoreResult<Box<dyn Write + Send>> {
        if fs::metadata(path).is_ok() {
            self.check_access(path, identity, true, "overwrite")?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|error| StoreError::io("create", path.to_path_buf(), error))?;
        tracing::debug!(path = %path.display(), "created file");

        let mut table = self.table();
        table.insert(
            path.to_path_buf(),
            EntryAttrs {
                block_size: options.block_size.unwrap_or(self.defaults.block_size),
                replication: options.replication.unwrap_or(self.defaults.replication),
                scheme: options
                    .checksum
                    .unwrap_or((self.defaults.algorithm, self.defaults.bytes_per_unit)),
                owner: identity.user().to_string(),
                group: identity.group().to_string(),
                permissions: DEFAULT_FILE_MODE,
                acl: Vec::new(),
                xattrs: BTreeMap::new(),
            },
        );
        Ok(Box::new(file))
    }

    fn append(&self, path: &Path, identity: &Identity) -> StoreResult<Box<dyn Write + Send>> {
        Self::metadata_of(path)?;
        self.check_access(path, identity, true, "append to")?;
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|error| StoreError::io("append", path.to_path_buf(), error))?;
        Ok(Box::new(file))
    }

    fn mkdirs(&self, path: &Path) -> StoreResult<()> {
        fs::create_dir_all(path)
            .map_err(|error| StoreError::io("create directory", path.to_path_buf(), error))
    }

    fn rename(&self, from: &Path, to: &Path) -> StoreResult<()> {
        fs::rename(from, to).map_err(|error| StoreError::io("rename", from.to_path_buf(), error))?;
        tracing::trace!(from = %from.display(), to = %to.display(), "renamed");
        let mut table = self.table();
        if let Some(entry) = table.remove(from) {
            table.insert(to.to_path_buf(), entry);
        }
        Ok(())
    }

    fn delete(&self, path: &Path) -> StoreResult<()> {
        match fs::metadata(path) {
            Ok(meta) => {
                let result = if meta.is_dir() {
                    fs::remove_dir_all(path)
                } else {
                    fs::remove_file(path)
                };
                result.map_err(|error| StoreError::io("delete", path.to_path_buf(), error))?;
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(StoreError::io("stat", path.to_path_buf(), error)),
        }
        let mut table = self.table();
        table.retain(|tracked, _| !tracked.starts_with(path));
        Ok(())
    }

    fn checksum(&self, path: &Path, length: u64) -> StoreResult<Option<FileChecksum>> {
        let meta = Self::metadata_of(path)?;
        if meta.is_dir() {
            return Ok(None);
        }
        let scheme = {
            let table = self.table();
            table.get(path).map_or_else(
                || self.defaults.checksum_scheme(),
                |entry| ChecksumScheme::new(entry.scheme.0, entry.scheme.1, entry.block_size),
            )
        };
        let file = File::open(path)
            .map_err(|error| StoreError::io("open for checksum", path.to_path_buf(), error))?;
        let checksum = compute_file_checksum(file, length, &scheme)
            .map_err(|error| StoreError::io("checksum", path.to_path_buf(), error))?;
        Ok(Some(checksum))
    }

    fn set_permissions(&self, path: &Path, mode: u32, identity: &Identity) -> StoreResult<()> {
        Self::metadata_of(path)?;
        self.check_owner(path, identity, "change permissions of")?;
        rustix::fs::chmod(path, rustix::fs::Mode::from_raw_mode(mode))
            .map_err(|error| StoreError::io("chmod", path.to_path_buf(), error.into()))?;
        let mode_bits = Self::real_mode(path);
        let mut table = self.table();
        let entry = table
            .entry(path.to_path_buf())
            .or_insert_with(|| self.default_entry(mode_bits));
        entry.permissions = mode & 0o777;
        Ok(())
    }

    fn set_owner(
        &self,
        path: &Path,
        owner: &str,
        group: &str,
        identity: &Identity,
    ) -> StoreResult<()> {
        Self::metadata_of(path)?;
        if !identity.is_privileged() {
            return Err(StoreError::access_denied(
                path.to_path_buf(),
                "change ownership of",
                identity.user(),
            ));
        }
        let mode_bits = Self::real_mode(path);
        let mut table = self.table();
        let entry = table
            .entry(path.to_path_buf())
            .or_insert_with(|| self.default_entry(mode_bits));
        entry.owner = owner.to_string();
        entry.group = group.to_string();
        Ok(())
    }

    fn set_times(
        &self,
        path: &Path,
        modification: SystemTime,
        access: SystemTime,
        identity: &Identity,
    ) -> StoreResult<()> {
        Self::metadata_of(path)?;
        self.check_owner(path, identity, "change times of")?;
        filetime::set_file_times(
            path,
            FileTime::from_system_time(access),
            FileTime::from_system_time(modification),
        )
        .map_err(|error| StoreError::io("set times", path.to_path_buf(), error))
    }

    fn set_acl(&self, path: &Path, entries: &[AclEntry], identity: &Identity) -> StoreResult<()> {
        Self::metadata_of(path)?;
        self.check_owner(path, identity, "change the ACL of")?;
        let mode_bits = Self::real_mode(path);
        let mut table = self.table();
        let entry = table
            .entry(path.to_path_buf())
            .or_insert_with(|| self.default_entry(mode_bits));
        entry.acl = entries.to_vec();
        Ok(())
    }

    fn set_xattrs(
        &self,
        path: &Path,
        xattrs: &BTreeMap<String, Vec<u8>>,
        identity: &Identity,
    ) -> StoreResult<()> {
        Self::metadata_of(path)?;
        self.check_owner(path, identity, "change extended attributes of")?;
        let mode_bits = Self::real_mode(path);
        let mut table = self.table();
        let entry = table
            .entry(path.to_path_buf())
            .or_insert_with(|| self.default_entry(mode_bits));
        entry.xattrs = xattrs.clone();
        Ok(())
    }
}
