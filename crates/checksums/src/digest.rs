use std::io::{self, Read};

use md5::{Digest as _, Md5};
use sha2::Sha256;

use crate::scheme::{ChecksumScheme, DigestAlgorithm};

/// Whole-file checksum under a [`ChecksumScheme`].
///
/// The digest is computed hierarchically: per-unit digests are grouped into
/// block digests, and multi-block files fold the block digests into a final
/// file digest. A file that fits within a single block is represented by the
/// block digest alone and `units_per_block` is `None`: such checksums do not
/// encode the block composition, so single-block files with different block
/// sizes still compare equal when their content and unit scheme match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileChecksum {
    /// Digest algorithm the checksum was computed with.
    pub algorithm: DigestAlgorithm,
    /// Bytes covered by each checksum unit.
    pub bytes_per_unit: u32,
    /// Units folded into each block digest; `None` for single-block files.
    pub units_per_block: Option<u64>,
    /// The final digest bytes.
    pub digest: Vec<u8>,
}

enum Hasher {
    Md5(Md5),
    Sha256(Sha256),
}

impl Hasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md5 => Self::Md5(Md5::new()),
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(state) => state.update(data),
            Self::Sha256(state) => state.update(data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            Self::Md5(state) => state.finalize().to_vec(),
            Self::Sha256(state) => state.finalize().to_vec(),
        }
    }
}

fn digest_of(algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Computes the whole-file checksum of exactly `length` bytes from `reader`.
///
/// Reads past `length` are never issued, so a source that has grown beyond
/// the captured length since it was snapshotted digests identically to the
/// snapshot. If the stream ends before `length` bytes were produced the
/// computation fails with [`io::ErrorKind::UnexpectedEof`].
pub fn compute_file_checksum<R: Read>(
    reader: R,
    length: u64,
    scheme: &ChecksumScheme,
) -> io::Result<FileChecksum> {
    let mut limited = reader.take(length);
    let unit_len = scheme.bytes_per_unit as usize;
    let units_per_block = scheme.units_per_block();

    let mut unit = vec![0u8; unit_len];
    let mut block_units: Vec<u8> = Vec::new();
    let mut block_digests: Vec<Vec<u8>> = Vec::new();
    let mut units_in_block = 0u64;
    let mut remaining = length;

    while remaining > 0 {
        let want = unit_len.min(usize::try_from(remaining).unwrap_or(unit_len));
        read_exactly(&mut limited, &mut unit[..want])?;
        remaining -= want as u64;

        block_units.extend_from_slice(&digest_of(scheme.algorithm, &unit[..want]));
        units_in_block += 1;
        if units_in_block == units_per_block {
            block_digests.push(digest_of(scheme.algorithm, &block_units));
            block_units.clear();
            units_in_block = 0;
        }
    }
    if units_in_block > 0 || block_digests.is_empty() {
        block_digests.push(digest_of(scheme.algorithm, &block_units));
    }

    let (units_per_block, digest) = if block_digests.len() == 1 {
        (None, block_digests.pop().unwrap_or_default())
    } else {
        let mut hasher = Hasher::new(scheme.algorithm);
        for block in &block_digests {
            hasher.update(block);
        }
        (Some(units_per_block), hasher.finalize())
    };

    Ok(FileChecksum {
        algorithm: scheme.algorithm,
        bytes_per_unit: scheme.bytes_per_unit,
        units_per_block,
        digest,
    })
}

fn read_exactly<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<()> {
    reader.read_exact(buf).map_err(|error| {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended before the requested checksum length",
            )
        } else {
            error
        }
    })
}
