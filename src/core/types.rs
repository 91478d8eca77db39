/*!
 * Core Types
 * Kernel object identifiers, signal sets and wait deadlines
 */

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// First koid handed out; lower values are reserved for well-known objects
const FIRST_KOID: u64 = 1024;

static NEXT_KOID: AtomicU64 = AtomicU64::new(FIRST_KOID);

/// Kernel object identifier
///
/// Unique for the lifetime of the program. Each endpoint of a pair has its
/// own koid and records its peer's as the related koid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Koid(u64);

impl Koid {
    /// Allocate a fresh koid
    #[inline]
    pub(crate) fn next() -> Self {
        Self(NEXT_KOID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Koid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Observable state of a transport endpoint
    ///
    /// Channels and fifos share the same bit layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Signals: u32 {
        /// At least one message or record is queued for this endpoint
        const READABLE = 1 << 0;
        /// The peer can accept at least one more message or record
        const WRITABLE = 1 << 1;
        /// The peer endpoint has been released
        const PEER_CLOSED = 1 << 2;
    }
}

impl fmt::Display for Signals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        bitflags::parser::to_writer(self, f)
    }
}

/// Point in time after which a wait gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deadline {
    /// Wait forever
    #[default]
    Infinite,
    /// Give up at the given instant
    At(Instant),
}

impl Deadline {
    /// Deadline `timeout` from now
    #[inline]
    pub fn after(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(at) => Self::At(at),
            None => Self::Infinite,
        }
    }

    /// Deadline for an optional timeout, unbounded when `None`
    #[inline]
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or(Self::Infinite, Self::after)
    }

    #[inline]
    pub fn has_passed(&self) -> bool {
        match self {
            Self::Infinite => false,
            Self::At(at) => Instant::now() >= *at,
        }
    }
}
