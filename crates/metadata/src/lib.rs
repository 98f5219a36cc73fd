//! File metadata snapshots and preservation resolution.
//!
//! [`FileStatus`] is the immutable metadata snapshot captured when a source
//! entry is listed. [`AttributeSet`] is the configured subset of attributes to
//! preserve, decoded from a packed letter string, and
//! [`PreservationPlan`] maps that set plus a concrete source status to the
//! creation parameters and post-transfer application steps a transfer must
//! honour.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod attrs;
mod plan;
mod status;

pub use attrs::{Attribute, AttributeSet, UnknownAttributeError};
pub use plan::{CreateOptions, PreservationPlan};
pub use status::{AclEntry, AclEntryKind, AclScope, FileStatus};
