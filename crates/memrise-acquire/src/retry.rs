// Bounded retry for flaky connections to Memrise.
//
// Connection resets and garbled status lines are retried with a linear
// backoff. A body that ends early on a kept-alive connection is a known
// quirk of the Memrise servers; those requests are repeated over a fresh
// HTTP/1.0 connection instead of failing the load.

use std::error::Error as _;
use std::io;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

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
    /// Wait before the attempt following `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    pub fn allows_another(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// What to do with a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the backoff.
    Retry,
    /// The body was cut short: try again on a new HTTP/1.0 connection.
    RetryWithFallback,
    /// Give up immediately.
    Fail,
}

/// Sort a transport error into a retry decision.
pub fn classify_error(error: &reqwest::Error) -> RetryDecision {
    if error.is_status() || error.is_builder() || error.is_redirect() {
        return RetryDecision::Fail;
    }
    if error.is_body() || has_io_kind(error, &[io::ErrorKind::UnexpectedEof]) {
        return RetryDecision::RetryWithFallback;
    }
    if error.is_decode() {
        return RetryDecision::Fail;
    }
    if error.is_timeout() || error.is_connect() || error.is_request() {
        // Resets, aborted connections and unparsable status lines all
        // surface as request errors.
        return RetryDecision::Retry;
    }
    if has_io_kind(
        error,
        &[
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::BrokenPipe,
        ],
    ) {
        return RetryDecision::Retry;
    }
    RetryDecision::Fail
}

fn has_io_kind(error: &reqwest::Error, kinds: &[io::ErrorKind]) -> bool {
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if kinds.contains(&io_err.kind()) {
                return true;
            }
        }
        source = err.source();
    }
    false
}
