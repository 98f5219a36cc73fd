/// Counters one task processor accumulates across the tasks it handles.
///
/// `copy` counts files whose bytes were transferred, whether written from
/// scratch or appended in place; `bytes_copied` counts only the bytes that
/// actually moved, so an append adds the extension, not the whole file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Counters {
    /// Files whose bytes were transferred.
    pub copy: u64,
    /// Directories put in place at the target.
    pub dir_copy: u64,
    /// Files left untouched because the target already matched.
    pub skip: u64,
    /// Failures absorbed by the ignore-failures policy.
    pub fail: u64,
    /// Bytes written to the target.
    pub bytes_copied: u64,
}

impl Counters {
    /// Sums `other` into `self`, for aggregating across task processors.
    pub fn merge(&mut self, other: &Counters) {
        self.copy += other.copy;
        self.dir_copy += other.dir_copy;
        self.skip += other.skip;
        self.fail += other.fail;
        self.bytes_copied += other.bytes_copied;
    }
}
