use std::fmt;

/// Digest algorithm used for checksum units and their composition.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DigestAlgorithm {
    /// MD5 (16-byte digests).
    Md5,
    /// SHA-256 (32-byte digests).
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the digest length in bytes.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha256 => 32,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => f.write_str("MD5"),
            Self::Sha256 => f.write_str("SHA256"),
        }
    }
}

/// The triple determining how a file's integrity digest is computed.
///
/// Two files are checksum-comparable only when their schemes agree; see
/// [`verify_compatible`](crate::verify_compatible) for the exact rules.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChecksumScheme {
    /// Digest algorithm for units, blocks, and the file digest.
    pub algorithm: DigestAlgorithm,
    /// Number of payload bytes covered by one checksum unit.
    pub bytes_per_unit: u32,
    /// Number of payload bytes grouped into one block.
    pub block_size: u64,
}

impl ChecksumScheme {
    /// Creates a scheme.
    ///
    /// `bytes_per_unit` must be non-zero and no larger than `block_size`;
    /// callers are expected to validate configuration before reaching this
    /// layer, so violations are clamped rather than reported.
    #[must_use]
    pub fn new(algorithm: DigestAlgorithm, bytes_per_unit: u32, block_size: u64) -> Self {
        let bytes_per_unit = bytes_per_unit.max(1);
        let block_size = block_size.max(u64::from(bytes_per_unit));
        Self {
            algorithm,
            bytes_per_unit,
            block_size,
        }
    }

    /// Number of checksum units per full block.
    #[must_use]
    pub const fn units_per_block(&self) -> u64 {
        self.block_size / self.bytes_per_unit as u64
    }

    /// Returns true when a file of `length` bytes spans more than one block.
    #[must_use]
    pub const fn is_multi_block(&self, length: u64) -> bool {
        length > self.block_size
    }
}

impl fmt::Display for ChecksumScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} (block size {})",
            self.algorithm, self.bytes_per_unit, self.block_size
        )
    }
}
