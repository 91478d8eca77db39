/*!
 * Signal Cell
 *
 * State shared by the two endpoints of a kernel object pair, guarded by a
 * parking_lot mutex and paired with a condvar so either side can block until
 * a predicate over the state holds.
 *
 * # Design
 *
 * The predicate is evaluated under the same lock that writers hold when they
 * change state, and writers notify after every change. A waiter can
 * therefore never miss the transition it is waiting for.
 */

use crate::core::types::Deadline;
use parking_lot::{Condvar, Mutex, MutexGuard};
use thiserror::Error;

/// Result type for wait operations
pub type WaitResult<T> = Result<T, WaitError>;

/// Wait operation errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    #[error("Wait operation timed out")]
    Timeout,
}

/// Mutex-protected state with wake-on-change
pub struct SignalCell<S> {
    state: Mutex<S>,
    changed: Condvar,
}

impl<S> SignalCell<S> {
    pub fn new(state: S) -> Self {
        Self {
            state: Mutex::new(state),
            changed: Condvar::new(),
        }
    }

    /// Lock the state without waiting on it
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock()
    }

    /// Wake every waiter so it re-evaluates its predicate
    #[inline]
    pub fn notify(&self) {
        self.changed.notify_all();
    }

    /// Block until `poll` yields a value or the deadline passes
    ///
    /// `poll` runs under the lock, first before any blocking and again
    /// after every wake-up. It is evaluated one final time when the deadline
    /// expires, so a state change that races the timeout is still observed.
    pub fn wait_until<T, F>(&self, deadline: Deadline, mut poll: F) -> WaitResult<T>
    where
        F: FnMut(&mut S) -> Option<T>,
    {
        let mut guard = self.state.lock();

        loop {
            if let Some(value) = poll(&mut guard) {
                return Ok(value);
            }

            match deadline {
                Deadline::Infinite => self.changed.wait(&mut guard),
                Deadline::At(at) => {
                    if self.changed.wait_until(&mut guard, at).timed_out() {
                        return poll(&mut guard).ok_or(WaitError::Timeout);
                    }
                }
            }
        }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for SignalCell<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalCell")
            .field("state", &*self.state.lock())
            .finish()
    }
}
