/*!
 * Session Helpers
 * Wait-then-act building blocks shared by every pattern
 */

use crate::core::errors::{SessionError, SessionResult};
use crate::core::types::{Deadline, Signals};
use crate::ipc::{Channel, Waitable, WireFormat};
use tracing::trace;

/// Wait for `interest` or peer closure, whichever comes first
///
/// `PEER_CLOSED` is always part of the interest set, so the wait cannot
/// outlive the peer. Any failure of the wait itself is `WaitFailed`.
pub fn await_signals<W>(
    object: &W,
    interest: Signals,
    deadline: Deadline,
    stage: &'static str,
) -> SessionResult<Signals>
where
    W: Waitable + ?Sized,
{
    let signals = object
        .wait_one(interest | Signals::PEER_CLOSED, deadline)
        .map_err(|source| SessionError::WaitFailed { stage, source })?;
    trace!(koid = %object.koid(), %signals, stage, "Wait satisfied");
    Ok(signals)
}

/// Read one message that must be exactly `T::WIRE_SIZE` bytes with no handles
pub fn read_wire<T: WireFormat>(channel: &Channel, stage: &'static str) -> SessionResult<T> {
    let mut buf = vec![0u8; T::WIRE_SIZE];
    let incoming = channel
        .read(&mut buf, 0)
        .map_err(|e| SessionError::read(stage, e))?;
    T::from_wire(&buf[..incoming.actual_bytes])
}

/// Write one fixed-layout message with no handles
pub fn write_wire<T: WireFormat>(
    channel: &Channel,
    message: &T,
    stage: &'static str,
) -> SessionResult<()> {
    channel
        .write(&message.to_wire(), Vec::new())
        .map_err(|e| SessionError::write(stage, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::TextMessage;
    use std::time::Duration;

    #[test]
    fn test_await_includes_peer_closed() {
        let (a, b) = Channel::create();
        drop(b);
        let signals = await_signals(&a, Signals::READABLE, Deadline::Infinite, "test").unwrap();
        assert_eq!(signals, Signals::PEER_CLOSED);
    }

    #[test]
    fn test_await_timeout_is_wait_failed() {
        let (a, _b) = Channel::create();
        let err = await_signals(
            &a,
            Signals::READABLE,
            Deadline::after(Duration::from_millis(10)),
            "idle",
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::WaitFailed { stage: "idle", .. }));
    }

    #[test]
    fn test_read_wire_rejects_short_payload() {
        let (a, b) = Channel::create();
        a.write(b"tiny", vec![]).unwrap();
        let err = read_wire::<TextMessage>(&b, "reading text").unwrap_err();
        assert!(matches!(err, SessionError::Decode { expected: 32, actual: 4, .. }));
    }
}
