//! Bounded retry poller.
//!
//! Runs a check up to `attempts` times with a fixed `interval` between
//! attempts, to absorb eventual consistency (a completed write not yet
//! visible to reads). No backoff, no jitter, no cancellation.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Outcome of a poll that never succeeded.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("retry policy allows no attempts")]
    NoAttempts,
    /// Every attempt failed; `last` is the failure of the final attempt.
    #[error("FAILED after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    /// The last failure, if any attempt ran.
    pub fn into_last(self) -> Option<E> {
        match self {
            Self::NoAttempts => None,
            Self::Exhausted { last, .. } => Some(last),
        }
    }
}

/// Fixed-interval, bounded retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Run `check` until it succeeds or the attempts are used up.
    ///
    /// `check` receives the 1-based attempt number. Sleeps happen only
    /// between attempts.
    pub async fn run<T, E, F, Fut>(&self, mut check: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        if self.attempts == 0 {
            return Err(RetryError::NoAttempts);
        }
        let mut attempt = 1;
        loop {
            match check(attempt).await {
                Ok(value) => {
                    self.succeeded(attempt);
                    return Ok(value);
                }
                Err(err) => {
                    if let Some(last) = self.failed(attempt, err) {
                        return Err(last);
                    }
                }
            }
            tokio::time::sleep(self.interval).await;
            attempt += 1;
        }
    }

    /// Blocking variant of [`RetryPolicy::run`]; sleeps the current thread.
    pub fn run_blocking<T, E, F>(&self, mut check: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Result<T, E>,
        E: fmt::Display,
    {
        if self.attempts == 0 {
            return Err(RetryError::NoAttempts);
        }
        let mut attempt = 1;
        loop {
            match check(attempt) {
                Ok(value) => {
                    self.succeeded(attempt);
                    return Ok(value);
                }
                Err(err) => {
                    if let Some(last) = self.failed(attempt, err) {
                        return Err(last);
                    }
                }
            }
            std::thread::sleep(self.interval);
            attempt += 1;
        }
    }

    fn succeeded(&self, attempt: u32) {
        if attempt > 1 {
            log::info!("succeeded on attempt {}/{}", attempt, self.attempts);
        }
    }

    /// Log a failed attempt; returns the terminal error once exhausted.
    fn failed<E: fmt::Display>(&self, attempt: u32, err: E) -> Option<RetryError<E>> {
        log::warn!("attempt {}/{} failed: {}", attempt, self.attempts, err);
        if attempt < self.attempts {
            return None;
        }
        log::error!("FAILED after {} attempts: {}", self.attempts, err);
        Some(RetryError::Exhausted {
            attempts: self.attempts,
            last: err,
        })
    }
}

/// Failures recorded during one attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("attempt {attempt}: {}", .messages.join("; "))]
pub struct AttemptFailed {
    pub attempt: u32,
    pub messages: Vec<String>,
}

/// Per-attempt recorder: collect failures with [`Attempt::errorf`] and let
/// the check keep going, then turn the attempt into a result with
/// [`Attempt::finish`].
#[derive(Debug, Default)]
pub struct Attempt {
    number: u32,
    messages: Vec<String>,
}

impl Attempt {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            messages: Vec::new(),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Record a failure for this attempt.
    pub fn errorf(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn failed(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Failed iff at least one failure was recorded.
    pub fn finish(self) -> Result<(), AttemptFailed> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(AttemptFailed {
                attempt: self.number,
                messages: self.messages,
            })
        }
    }
}
