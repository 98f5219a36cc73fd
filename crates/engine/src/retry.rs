use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::error::{CopyError, CopyResult};

/// Bounded retry with doubling backoff for transient transfer failures.
///
/// Only failures [`CopyError::is_transient`] classifies as transient are
/// retried; everything else fails on the first attempt. The final failure is
/// always wrapped with the operation name and attempt count, so callers see a
/// uniform error shape whether the operation ran once or exhausted its
/// attempts.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing up to `max_attempts` attempts (at least one)
    /// with `base_delay` before the second attempt, doubling thereafter.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A policy that never sleeps and never retries, for tests that exercise
    /// failure paths.
    #[must_use]
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// The attempt bound.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `body`, retrying transient failures until the attempt bound.
    pub fn run<T>(
        &self,
        operation: &'static str,
        mut body: impl FnMut(u32) -> CopyResult<T>,
    ) -> CopyResult<T> {
        let mut attempt = 1;
        loop {
            match body(attempt) {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < self.max_attempts => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt - 1);
                    debug!(operation, attempt, ?delay, %error, "retrying after transient failure");
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(error) => return Err(CopyError::retry(operation, attempt, error)),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    fn transient() -> CopyError {
        CopyError::io(
            "read from",
            PathBuf::from("/src/a"),
            io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
        )
    }

    fn permanent() -> CopyError {
        CopyError::io(
            "read from",
            PathBuf::from("/src/a"),
            io::Error::new(io::ErrorKind::InvalidData, "corrupt"),
        )
    }

    #[test]
    fn transient_failures_are_retried_until_success() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut calls = 0;
        let value = policy
            .run("copy file", |attempt| {
                calls += 1;
                if attempt < 3 { Err(transient()) } else { Ok(42) }
            })
            .expect("third attempt succeeds");
        assert_eq!(value, 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut calls = 0;
        let error = policy
            .run::<()>("copy file", |_| {
                calls += 1;
                Err(permanent())
            })
            .expect_err("fails once");
        assert_eq!(calls, 1);
        assert!(error.to_string().contains("after 1 attempt"));
    }

    #[test]
    fn exhausted_retries_report_the_attempt_count() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let error = policy
            .run::<()>("copy file", |_| Err(transient()))
            .expect_err("exhausts attempts");
        assert!(error.to_string().contains("after 2 attempt"));
    }
}
