//! The per-task copy engine of a distributed file-tree replication job.
//!
//! Given one task at a time ([`CopyTask`]: a relative path plus the source
//! metadata snapshot), [`CopyMapper`] decides whether to create a directory,
//! skip, append, or overwrite at the target ([`classify`]), runs the byte
//! transfer with retries, verification, and atomic promotion
//! ([`TransferExecutor`]), applies the configured attribute preservation,
//! and folds the outcome into its [`Counters`] and structured
//! [`LogRecord`] output.
//!
//! The engine introduces no threads of its own and never discovers its
//! execution identity: the caller passes an explicit [`store::Identity`]
//! into every data-access call.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod config;
mod counters;
mod error;
mod mapper;
mod record;
mod resolve;
mod retry;
mod skip;
mod task;
mod transfer;

pub use config::{CopyConfig, DEFAULT_COPY_BUFFER_SIZE};
pub use counters::Counters;
pub use error::{
    CHECKSUM_MISMATCH_ERROR_MSG, CopyError, CopyErrorKind, CopyResult, EntryKind,
    LENGTH_MISMATCH_ERROR_MSG,
};
pub use mapper::CopyMapper;
pub use record::{LogRecord, RecordSink, RecordTag, VecSink};
pub use resolve::TargetResolver;
pub use retry::RetryPolicy;
pub use skip::{CopyAction, SkipReason, classify};
pub use task::CopyTask;
pub use transfer::TransferExecutor;
