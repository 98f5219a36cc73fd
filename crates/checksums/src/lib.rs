//! Checksum schemes and whole-file checksum computation for the copy engine.
//!
//! A file's integrity digest is described by a [`ChecksumScheme`]: the digest
//! algorithm, the number of bytes covered by each checksum unit, and the block
//! size that groups units. [`compute_file_checksum`] folds a byte stream into
//! a [`FileChecksum`] under such a scheme, and [`verify_compatible`] decides
//! up front whether two schemes produce comparable digests for a file of a
//! given length.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod compat;
mod digest;
mod scheme;

pub use compat::{CompatibilityError, verify_compatible};
pub use digest::{FileChecksum, compute_file_checksum};
pub use scheme::{ChecksumScheme, DigestAlgorithm};
