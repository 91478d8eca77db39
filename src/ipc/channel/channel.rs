/*!
 * Channel Implementation
 * Paired, bidirectional, message-preserving transport with handle transfer
 */

use super::types::{ChannelInfo, Incoming};
use crate::core::errors::{TransportError, TransportResult};
use crate::core::guard::{Guard, GuardError, GuardMetadata, GuardResult};
use crate::core::limits::{
    CHANNEL_MAX_MSG_BYTES, CHANNEL_MAX_MSG_HANDLES, CHANNEL_MAX_PENDING_MESSAGES,
};
use crate::core::sync::{SignalCell, WaitError};
use crate::core::types::{Deadline, Koid, Signals};
use crate::ipc::core::{Side, Waitable};
use crate::ipc::handle::Handle;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace};

/// A queued message: payload and capabilities travel together
struct Message {
    bytes: Vec<u8>,
    handles: Vec<Handle>,
}

/// State shared by both endpoints of a channel
struct ChannelState {
    /// `queues[i]` holds messages waiting to be read by side `i`
    queues: [VecDeque<Message>; 2],
    open: [bool; 2],
    max_pending: usize,
}

impl ChannelState {
    fn signals(&self, side: Side) -> Signals {
        let peer = side.peer().index();
        let mut signals = Signals::empty();
        if !self.queues[side.index()].is_empty() {
            signals |= Signals::READABLE;
        }
        if self.open[peer] {
            if self.queues[peer].len() < self.max_pending {
                signals |= Signals::WRITABLE;
            }
        } else {
            signals |= Signals::PEER_CLOSED;
        }
        signals
    }
}

/// One endpoint of a channel
///
/// Move-only: whoever holds the value owns the capability. Dropping it (or
/// calling [`Channel::close`]) releases the endpoint, discards anything still
/// queued for it, and asserts `PEER_CLOSED` on the other side.
pub struct Channel {
    shared: Arc<SignalCell<ChannelState>>,
    side: Side,
    koid: Koid,
    peer_koid: Koid,
    metadata: GuardMetadata,
    active: bool,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("koid", &self.koid)
            .field("related_koid", &self.peer_koid)
            .field("active", &self.active)
            .finish()
    }
}

impl Channel {
    /// Create a channel pair with the default pending-message bound
    pub fn create() -> (Channel, Channel) {
        Self::pair(CHANNEL_MAX_PENDING_MESSAGES)
    }

    /// Create a channel pair whose endpoints each queue at most `max_pending` messages
    pub fn create_bounded(max_pending: usize) -> TransportResult<(Channel, Channel)> {
        if max_pending == 0 {
            return Err(TransportError::InvalidArgs(
                "a channel must be able to queue at least one message".into(),
            ));
        }
        Ok(Self::pair(max_pending))
    }

    fn pair(max_pending: usize) -> (Channel, Channel) {
        let shared = Arc::new(SignalCell::new(ChannelState {
            queues: [VecDeque::new(), VecDeque::new()],
            open: [true, true],
            max_pending,
        }));
        let first = Koid::next();
        let second = Koid::next();

        debug!(%first, %second, max_pending, "Created channel pair");

        (
            Self::endpoint(shared.clone(), Side::First, first, second),
            Self::endpoint(shared, Side::Second, second, first),
        )
    }

    fn endpoint(
        shared: Arc<SignalCell<ChannelState>>,
        side: Side,
        koid: Koid,
        peer_koid: Koid,
    ) -> Self {
        Self {
            shared,
            side,
            koid,
            peer_koid,
            metadata: GuardMetadata::new("channel", koid),
            active: true,
        }
    }

    #[inline]
    fn ensure_active(&self) -> TransportResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(TransportError::BadHandle)
        }
    }

    /// True when `handle` is either endpoint of this channel
    fn is_same_object(&self, handle: &Handle) -> bool {
        matches!(handle, Handle::Channel(other) if Arc::ptr_eq(&other.shared, &self.shared))
    }

    /// Pull exactly one message without blocking
    ///
    /// Fails with `ShouldWait` when nothing is queued and the peer is open,
    /// `PeerClosed` when nothing is queued and the peer is gone, and
    /// `BufferTooSmall` when the next message has more bytes than `bytes` can
    /// hold or more handles than `handle_capacity`. In the last case the
    /// message stays at the head of the queue.
    pub fn read(&self, bytes: &mut [u8], handle_capacity: usize) -> TransportResult<Incoming> {
        self.ensure_active()?;

        let mut state = self.shared.lock();
        let peer_open = state.open[self.side.peer().index()];
        let queue = &mut state.queues[self.side.index()];

        let Some(message) = queue.pop_front() else {
            return Err(if peer_open {
                TransportError::ShouldWait
            } else {
                TransportError::PeerClosed
            });
        };

        if message.bytes.len() > bytes.len() || message.handles.len() > handle_capacity {
            let err = TransportError::BufferTooSmall {
                needed_bytes: message.bytes.len(),
                needed_handles: message.handles.len(),
            };
            queue.push_front(message);
            return Err(err);
        }
        drop(state);
        // Room opened up in our queue; a blocked writer may proceed
        self.shared.notify();

        let Message {
            bytes: payload,
            handles,
        } = message;
        bytes[..payload.len()].copy_from_slice(&payload);

        trace!(koid = %self.koid, bytes = payload.len(), handles = handles.len(), "Channel read");

        Ok(Incoming {
            actual_bytes: payload.len(),
            handles,
        })
    }

    /// Enqueue one message at the peer without blocking
    ///
    /// Payload and handles are delivered together or not at all. Handles are
    /// consumed either way: on failure they are released.
    pub fn write(&self, bytes: &[u8], handles: Vec<Handle>) -> TransportResult<()> {
        self.ensure_active()?;

        if bytes.len() > CHANNEL_MAX_MSG_BYTES {
            return Err(TransportError::OutOfRange(format!(
                "payload of {} bytes exceeds {}",
                bytes.len(),
                CHANNEL_MAX_MSG_BYTES
            )));
        }
        if handles.len() > CHANNEL_MAX_MSG_HANDLES {
            return Err(TransportError::OutOfRange(format!(
                "{} handles exceed {}",
                handles.len(),
                CHANNEL_MAX_MSG_HANDLES
            )));
        }
        if handles.iter().any(|handle| self.is_same_object(handle)) {
            return Err(TransportError::NotSupported(
                "a channel endpoint cannot be sent through its own channel".into(),
            ));
        }

        let handle_count = handles.len();
        let message = Message {
            bytes: bytes.to_vec(),
            handles,
        };

        // The guard is declared after `message`, so on an early return the
        // lock is released before the rejected handles are dropped.
        let mut state = self.shared.lock();
        let peer = self.side.peer().index();
        if !state.open[peer] {
            return Err(TransportError::PeerClosed);
        }
        if state.queues[peer].len() >= state.max_pending {
            return Err(TransportError::ShouldWait);
        }
        state.queues[peer].push_back(message);
        drop(state);
        self.shared.notify();

        trace!(koid = %self.koid, bytes = bytes.len(), handles = handle_count, "Channel write");
        Ok(())
    }

    /// Snapshot of this endpoint's queues and peer state
    pub fn info(&self) -> TransportResult<ChannelInfo> {
        self.ensure_active()?;
        let state = self.shared.lock();
        Ok(ChannelInfo {
            koid: self.koid,
            related_koid: self.peer_koid,
            pending_messages: state.queues[self.side.index()].len(),
            peer_pending_messages: state.queues[self.side.peer().index()].len(),
            max_pending_messages: state.max_pending,
            peer_closed: !state.open[self.side.peer().index()],
        })
    }

    /// Release this endpoint
    ///
    /// Idempotent. Messages still queued for this endpoint are discarded
    /// along with any handles they carry; the peer observes `PEER_CLOSED`.
    pub fn close(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        let orphaned = {
            let mut state = self.shared.lock();
            state.open[self.side.index()] = false;
            std::mem::take(&mut state.queues[self.side.index()])
        };
        self.shared.notify();

        debug!(
            koid = %self.koid,
            orphaned = orphaned.len(),
            lifetime_us = self.metadata.lifetime_micros(),
            "Channel endpoint closed"
        );
        // Dropped outside the lock: carried handles may close other objects
        drop(orphaned);
    }
}

impl Waitable for Channel {
    fn koid(&self) -> Koid {
        self.koid
    }

    fn related_koid(&self) -> Koid {
        self.peer_koid
    }

    fn signals(&self) -> TransportResult<Signals> {
        self.ensure_active()?;
        Ok(self.shared.lock().signals(self.side))
    }

    fn wait_one(&self, interest: Signals, deadline: Deadline) -> TransportResult<Signals> {
        self.ensure_active()?;
        let side = self.side;
        self.shared
            .wait_until(deadline, |state| {
                let signals = state.signals(side);
                signals.intersects(interest).then_some(signals)
            })
            .map_err(|WaitError::Timeout| TransportError::TimedOut)
    }
}

impl Guard for Channel {
    fn resource_type(&self) -> &'static str {
        "channel"
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
        self.close();
        Ok(())
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}
