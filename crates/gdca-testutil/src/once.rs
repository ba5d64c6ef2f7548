//! Run-once guard.
//!
//! Setup shared by several tests (removing leftovers of a previous run,
//! creating a fixture) executes exactly once per process, however many
//! tests reach it and in whatever order. The outcome is memoized, so a
//! failed setup fails every caller without being retried.

use std::future::Future;
use std::sync::OnceLock;
use tokio::sync::OnceCell;

/// Async run-once guard, usable as a `static`.
pub struct RunOnce<T> {
    cell: OnceCell<T>,
}

impl<T> RunOnce<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Run `action` if no caller has yet; return the memoized outcome.
    ///
    /// Concurrent callers wait for the first one to finish.
    pub async fn run<F, Fut>(&self, action: F) -> &T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.cell.get_or_init(action).await
    }

    pub fn has_run(&self) -> bool {
        self.cell.initialized()
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }
}

impl<T> Default for RunOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocking run-once guard, usable as a `static`.
pub struct RunOnceBlocking<T> {
    cell: OnceLock<T>,
}

impl<T> RunOnceBlocking<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn run<F>(&self, action: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.cell.get_or_init(action)
    }

    pub fn has_run(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for RunOnceBlocking<T> {
    fn default() -> Self {
        Self::new()
    }
}
