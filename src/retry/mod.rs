//! Retry with linear backoff for flaky filesystem probes

use crate::logging::Logger;
use crate::types::SyncError;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Maximum number of attempts before the last error is returned
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Base delay; the wait before attempt `n + 1` is `n * base_delay`
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(10);

/// Errors that can tell whether another attempt could ever succeed
pub trait Retryable {
    /// True when retrying cannot help (the target is gone)
    fn is_permanent(&self) -> bool;
}

impl Retryable for io::Error {
    fn is_permanent(&self) -> bool {
        self.kind() == io::ErrorKind::NotFound
    }
}

impl Retryable for SyncError {
    fn is_permanent(&self) -> bool {
        self.is_not_found()
    }
}

/// Bounded linear-backoff retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Policy that never sleeps, for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Delay after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Run `probe` until it succeeds, fails permanently, or attempts run out
    ///
    /// `is_permanent` decides which errors are returned immediately. Every
    /// retry is logged as a warning naming `operation` and `path`.
    pub fn run_with<T, E, F, P>(
        &self,
        operation: &str,
        path: &Path,
        logger: &dyn Logger,
        is_permanent: P,
        mut probe: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match probe() {
                Ok(value) => return Ok(value),
                Err(err) if is_permanent(&err) => return Err(err),
                Err(err) if attempt >= max_attempts => {
                    logger.debug(&format!(
                        "{} gave up on {} after {} attempts: {}",
                        operation,
                        path.display(),
                        attempt,
                        err
                    ));
                    return Err(err);
                }
                Err(err) => {
                    logger.warn(&format!(
                        "{} failed for {} (attempt {}/{}): {}; retrying",
                        operation,
                        path.display(),
                        attempt,
                        max_attempts,
                        err
                    ));
                    let delay = self.delay_for(attempt);
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// [`run_with`](Self::run_with) using the error's own [`Retryable`] classification
    pub fn run<T, E, F>(
        &self,
        operation: &str,
        path: &Path,
        logger: &dyn Logger,
        probe: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: Retryable + std::fmt::Display,
    {
        self.run_with(operation, path, logger, <E as Retryable>::is_permanent, probe)
    }
}
