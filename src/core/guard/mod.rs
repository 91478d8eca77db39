/*!
 * RAII Resource Guards
 *
 * Every kernel object endpoint is a guard: it owns exactly one capability,
 * releases it when dropped, and refuses use after release.
 *
 * ## Example
 *
 * ```rust
 * use handoff_ipc::core::guard::Guard;
 * use handoff_ipc::ipc::Channel;
 *
 * let (mut mine, theirs) = Channel::create();
 * assert!(mine.is_active());
 * mine.release().unwrap();
 * // The peer now observes PEER_CLOSED
 * # drop(theirs);
 * ```
 */

mod traits;

pub use traits::Guard;

use crate::core::types::Koid;

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("Resource already released")]
    AlreadyReleased,
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
    pub koid: Koid,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str, koid: Koid) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
            koid,
        }
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        u64::try_from(self.creation_time.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}
