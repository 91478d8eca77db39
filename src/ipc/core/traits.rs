/*!
 * IPC Traits
 * Readiness waiting shared by every transport endpoint
 */

use crate::core::errors::TransportResult;
use crate::core::types::{Deadline, Koid, Signals};

/// An endpoint whose state can be observed and waited on
pub trait Waitable {
    /// Koid of this endpoint
    fn koid(&self) -> Koid;

    /// Koid of the peer endpoint
    fn related_koid(&self) -> Koid;

    /// Signals asserted right now, without blocking
    fn signals(&self) -> TransportResult<Signals>;

    /// Block until any of `interest` is asserted or `deadline` passes
    ///
    /// Returns every signal asserted at wake-up, not only the ones asked for.
    /// Fails with `BadHandle` on a released endpoint and `TimedOut` when the
    /// deadline expires first.
    fn wait_one(&self, interest: Signals, deadline: Deadline) -> TransportResult<Signals>;
}
