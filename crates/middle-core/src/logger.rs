//! Logger handle for pipeline components.
//!
//! Components that accept a [`Logger`] emit their events into that logger's
//! subscriber, independent of whatever subscriber is active on the calling
//! thread. Components without one use the ambient subscriber.

use std::fmt;

use tracing::Dispatch;

/// A cloneable handle to a `tracing` subscriber.
///
/// # Example
///
/// ```
/// use middle_core::Logger;
///
/// let logger = Logger::current();
/// logger.in_scope(|| tracing::debug!("inside the logger's subscriber"));
/// ```
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// Creates a logger writing to the given subscriber.
    pub fn new(dispatch: impl Into<Dispatch>) -> Self {
        Self {
            dispatch: dispatch.into(),
        }
    }

    /// Captures the subscriber active on the current thread.
    pub fn current() -> Self {
        Self {
            dispatch: tracing::dispatcher::get_default(Dispatch::clone),
        }
    }

    /// Runs `f` with this logger's subscriber as the default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

/// Runs `f` inside `logger` when one is configured, else in the ambient subscriber.
pub fn log_with<T>(logger: Option<&Logger>, f: impl FnOnce() -> T) -> T {
    match logger {
        Some(logger) => logger.in_scope(f),
        None => f(),
    }
}
