/*!
 * Capability Handoff
 *
 * Moves ownership of an endpoint across a channel inside a single message.
 * The sender loses the capability the moment the write is accepted.
 */

use super::session::await_signals;
use crate::core::errors::{SessionError, SessionResult};
use crate::core::limits::{CHANNEL_MAX_MSG_BYTES, CHANNEL_MAX_MSG_HANDLES};
use crate::core::types::{Deadline, Signals};
use crate::ipc::{Channel, Envelope, EnvelopeKind, Fifo, Handle, Waitable};
use tracing::{debug, warn};

/// Wait for room, then send `envelope`
pub fn send_capability(channel: &Channel, envelope: Envelope, deadline: Deadline) -> SessionResult<()> {
    let signals = await_signals(channel, Signals::WRITABLE, deadline, "waiting to hand off capability")?;
    if signals.contains(Signals::PEER_CLOSED) {
        warn!("Peer closed, quitting");
        return Err(SessionError::PeerClosed {
            stage: "waiting to hand off capability",
        });
    }

    let (data, handles) = envelope.into_parts();
    channel
        .write(&data, handles)
        .map_err(|e| SessionError::write("handing off capability", e))
}

/// Wait for the next message and require exactly one capability in it
pub fn receive_capability(channel: &Channel, deadline: Deadline) -> SessionResult<Envelope> {
    let signals = await_signals(channel, Signals::READABLE, deadline, "waiting for capability")?;
    if !signals.contains(Signals::READABLE) {
        warn!("Peer closed before sending capability");
        return Err(SessionError::PeerClosed {
            stage: "waiting for capability",
        });
    }

    let mut data = vec![0u8; CHANNEL_MAX_MSG_BYTES];
    let incoming = channel
        .read(&mut data, CHANNEL_MAX_MSG_HANDLES)
        .map_err(|e| SessionError::read("receiving capability", e))?;
    Envelope::decode(
        &data[..incoming.actual_bytes],
        incoming.handles,
        EnvelopeKind::WithCapability,
    )
}

/// Send one fifo endpoint in a zero-byte message
pub fn offer_fifo(channel: &Channel, fifo: Fifo, deadline: Deadline) -> SessionResult<()> {
    debug!(koid = %fifo.koid(), "Offering fifo");
    send_capability(
        channel,
        Envelope::WithCapability {
            data: Vec::new(),
            capability: Handle::from(fifo),
        },
        deadline,
    )
}

/// Receive a fifo endpoint; any other capability is a malformed handoff
pub fn accept_fifo(channel: &Channel, deadline: Deadline) -> SessionResult<Fifo> {
    let (_, mut handles) = receive_capability(channel, deadline)?.into_parts();
    let capability = handles.pop().ok_or(SessionError::MalformedHandoff {
        handles: 0,
        reason: "no capability attached",
    })?;

    capability.into_fifo().map_err(|other| {
        warn!(kind = %other.kind(), "Failed to get fifo handle from remote process");
        SessionError::MalformedHandoff {
            handles: 1,
            reason: "capability is not a fifo",
        }
    })
}
