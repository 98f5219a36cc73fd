use std::path::Path;

use metadata::PreservationPlan;
use store::{FileStore, Identity};
use tracing::{debug, info, warn};

use crate::config::CopyConfig;
use crate::counters::Counters;
use crate::error::{CopyError, CopyResult};
use crate::record::{LogRecord, RecordSink, RecordTag};
use crate::resolve::TargetResolver;
use crate::skip::{CopyAction, classify};
use crate::task::CopyTask;
use crate::transfer::{TransferExecutor, apply_preservation};

/// Processes copy tasks one at a time for the lifetime of a worker,
/// accumulating counters and emitting structured records to a sink.
///
/// Tasks are handled strictly sequentially, so the counters need no
/// synchronization. The instance has no terminal state; the surrounding
/// framework feeds it tasks until it is torn down.
pub struct CopyMapper<'a> {
    config: CopyConfig,
    source_store: &'a dyn FileStore,
    target_store: &'a dyn FileStore,
    identity: Identity,
    resolver: TargetResolver,
    counters: Counters,
}

impl<'a> CopyMapper<'a> {
    /// Creates a mapper.
    ///
    /// Probes the final target path up front: when it names an existing file
    /// (not a directory), the destination is that literal file, and every
    /// copy to it overwrites unconditionally.
    pub fn new(
        config: CopyConfig,
        source_store: &'a dyn FileStore,
        target_store: &'a dyn FileStore,
        identity: Identity,
    ) -> CopyResult<Self> {
        let single_file_copy = target_store
            .try_status(&config.target_final_path)?
            .is_some_and(|status| !status.is_directory);
        let config = if single_file_copy {
            config.overwrite(true)
        } else {
            config
        };
        let resolver = TargetResolver::new(config.target_work_path.clone(), single_file_copy);
        Ok(Self {
            config,
            source_store,
            target_store,
            identity,
            resolver,
            counters: Counters::default(),
        })
    }

    /// The counters accumulated so far.
    #[must_use]
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Processes one task.
    ///
    /// Failures are wrapped with the task's relative path before they leave
    /// this method. When the ignore-failures policy is active they are
    /// counted, recorded with a `FAIL:` tag, and absorbed, and the worker
    /// moves on to the next task; type conflicts always propagate.
    pub fn map(&mut self, task: &CopyTask, sink: &mut dyn RecordSink) -> CopyResult<()> {
        let target_path = self.resolver.resolve(&task.relative_path);
        match self.process(task, &target_path, sink) {
            Ok(()) => Ok(()),
            Err(error) => {
                let error = CopyError::task(&task.relative_path, error);
                if self.config.ignore_failures && !error.is_type_conflict() {
                    warn!(task = %task.relative_path, %error, "ignoring task failure");
                    self.counters.fail += 1;
                    sink.record(LogRecord::new(
                        &task.relative_path,
                        RecordTag::Fail,
                        format!(
                            "{} --> {}: {error}",
                            task.source.path.display(),
                            target_path.display()
                        ),
                    ));
                    Ok(())
                } else {
                    Err(error)
                }
            }
        }
    }

    fn process(
        &mut self,
        task: &CopyTask,
        target_path: &Path,
        sink: &mut dyn RecordSink,
    ) -> CopyResult<()> {
        let source = &task.source;
        let existing = self.target_store.try_status(target_path)?;
        let action = classify(
            self.source_store,
            self.target_store,
            source,
            target_path,
            existing.as_ref(),
            &self.config,
        )?;
        let plan = PreservationPlan::resolve(self.config.preserve, source);
        match action {
            CopyAction::CreateDirectory => {
                self.target_store.mkdirs(target_path)?;
                apply_preservation(self.target_store, target_path, &plan, &self.identity)?;
                self.counters.dir_copy += 1;
                debug!(target = %target_path.display(), "directory in place");
                if self.config.verbose {
                    sink.record(LogRecord::new(
                        &task.relative_path,
                        RecordTag::DirCopied,
                        source.path.display().to_string(),
                    ));
                }
            }
            CopyAction::Skip(reason) => {
                info!(
                    source = %source.path.display(),
                    target = %target_path.display(),
                    %reason,
                    "skipping copy"
                );
                apply_preservation(self.target_store, target_path, &plan, &self.identity)?;
                self.counters.skip += 1;
                sink.record(LogRecord::new(
                    &task.relative_path,
                    RecordTag::Skip,
                    format!("{} ({reason})", source.path.display()),
                ));
                if self.config.verbose {
                    sink.record(LogRecord::new(
                        &task.relative_path,
                        RecordTag::FileSkipped,
                        format!("{} to {}", source.path.display(), target_path.display()),
                    ));
                }
            }
            CopyAction::Append { .. } | CopyAction::Overwrite => {
                info!(
                    source = %source.path.display(),
                    target = %target_path.display(),
                    length = source.length,
                    "copying"
                );
                let executor = TransferExecutor::new(
                    self.source_store,
                    self.target_store,
                    &self.config,
                    &self.identity,
                );
                let bytes = executor.execute(source, target_path, action, &plan)?;
                apply_preservation(self.target_store, target_path, &plan, &self.identity)?;
                self.counters.copy += 1;
                self.counters.bytes_copied += bytes;
                if self.config.verbose {
                    sink.record(LogRecord::new(
                        &task.relative_path,
                        RecordTag::FileCopied,
                        format!("{} to {}", source.path.display(), target_path.display()),
                    ));
                }
            }
        }
        Ok(())
    }
}
