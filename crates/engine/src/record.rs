use std::fmt;

/// Tag prefixing a structured per-task record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordTag {
    /// An up-to-date file was left untouched.
    Skip,
    /// A task failed and the failure was absorbed.
    Fail,
    /// A file was copied (emitted only in verbose mode).
    FileCopied,
    /// A file was skipped (emitted only in verbose mode, with target detail).
    FileSkipped,
    /// A directory was put in place (emitted only in verbose mode).
    DirCopied,
}

impl RecordTag {
    /// The literal prefix written in front of the record message.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Skip => "SKIP:",
            Self::Fail => "FAIL:",
            Self::FileCopied => "FILE_COPIED:",
            Self::FileSkipped => "FILE_SKIPPED:",
            Self::DirCopied => "DIR_COPIED:",
        }
    }
}

impl fmt::Display for RecordTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One structured record emitted while processing a task.
#[derive(Clone, Debug)]
pub struct LogRecord {
    /// Relative path of the task the record belongs to.
    pub relative_path: String,
    /// Record tag.
    pub tag: RecordTag,
    /// Free-form detail, naming the paths involved.
    pub message: String,
}

impl LogRecord {
    /// Creates a record for the task at `relative_path`.
    pub fn new(relative_path: impl Into<String>, tag: RecordTag, message: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            tag,
            message: message.into(),
        }
    }

    /// Renders the record as it appears in task output, `TAG: message`.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{} {}", self.tag.prefix(), self.message)
    }
}

/// Consumer of the records a task processor emits.
pub trait RecordSink {
    /// Accepts one record.
    fn record(&mut self, record: LogRecord);
}

/// Sink that collects records in memory, in emission order.
#[derive(Debug, Default)]
pub struct VecSink {
    records: Vec<LogRecord>,
}

impl VecSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All collected records.
    #[must_use]
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Number of collected records carrying `tag`.
    #[must_use]
    pub fn count(&self, tag: RecordTag) -> usize {
        self.records.iter().filter(|r| r.tag == tag).count()
    }

    /// Messages of the collected records carrying `tag`.
    #[must_use]
    pub fn messages(&self, tag: RecordTag) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.tag == tag)
            .map(|r| r.message.as_str())
            .collect()
    }
}

impl RecordSink for VecSink {
    fn record(&mut self, record: LogRecord) {
        self.records.push(record);
    }
}
