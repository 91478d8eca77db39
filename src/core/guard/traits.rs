/*!
 * Guard Traits
 *
 * Core abstraction for owned, release-once kernel resources
 */

use super::{GuardMetadata, GuardResult};

/// Core guard trait
///
/// All guards must implement this to provide:
/// - Resource type identification
/// - Metadata access
/// - Manual release capability
///
/// Guards are move-only. Release happens at most once: either through
/// `release` or in `Drop`, whichever comes first.
pub trait Guard: Send {
    /// Resource type name for logging/debugging
    fn resource_type(&self) -> &'static str;

    /// Get guard metadata
    fn metadata(&self) -> &GuardMetadata;

    /// Check if guard is still active
    fn is_active(&self) -> bool;

    /// Manually release the resource
    ///
    /// Returns `Err` if already released
    fn release(&mut self) -> GuardResult<()>;
}

#[cfg(test)]
mod tests {
    use super::super::GuardError;
    use super::*;
    use crate::core::types::Koid;

    struct TestGuard {
        metadata: GuardMetadata,
        active: bool,
    }

    impl Guard for TestGuard {
        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn metadata(&self) -> &GuardMetadata {
            &self.metadata
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn release(&mut self) -> GuardResult<()> {
            if !self.active {
                return Err(GuardError::AlreadyReleased);
            }
            self.active = false;
            Ok(())
        }
    }

    #[test]
    fn test_guard_release() {
        let mut guard = TestGuard {
            metadata: GuardMetadata::new("test", Koid::next()),
            active: true,
        };

        assert!(guard.is_active());
        assert!(guard.release().is_ok());
        assert!(!guard.is_active());
        assert_eq!(guard.release(), Err(GuardError::AlreadyReleased));
    }
}
