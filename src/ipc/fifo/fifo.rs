/*!
 * Fifo Implementation
 * Paired ring buffers of fixed-size elements with ringbuf-based storage
 */

use super::record::FifoRecord;
use super::types::FifoInfo;
use crate::core::errors::{TransportError, TransportResult};
use crate::core::guard::{Guard, GuardError, GuardMetadata, GuardResult};
use crate::core::limits::FIFO_MAX_BYTES;
use crate::core::sync::{SignalCell, WaitError};
use crate::core::types::{Deadline, Koid, Signals};
use crate::ipc::core::{Side, Waitable};
use ringbuf::{traits::*, HeapRb};
use std::sync::Arc;
use tracing::{debug, trace};

/// State shared by both endpoints of a fifo
struct FifoState {
    /// `buffers[i]` holds elements waiting to be read by side `i`
    buffers: [HeapRb<u8>; 2],
    open: [bool; 2],
    elem_size: usize,
    depth: usize,
}

impl FifoState {
    #[inline]
    fn readable(&self, side: Side) -> usize {
        self.buffers[side.index()].occupied_len() / self.elem_size
    }

    #[inline]
    fn writable(&self, side: Side) -> usize {
        let peer = side.peer().index();
        if self.open[peer] {
            self.buffers[peer].vacant_len() / self.elem_size
        } else {
            0
        }
    }

    fn signals(&self, side: Side) -> Signals {
        let mut signals = Signals::empty();
        if self.readable(side) > 0 {
            signals |= Signals::READABLE;
        }
        if self.writable(side) > 0 {
            signals |= Signals::WRITABLE;
        }
        if !self.open[side.peer().index()] {
            signals |= Signals::PEER_CLOSED;
        }
        signals
    }
}

/// One endpoint of a fifo
///
/// Each direction is an independent ring of `depth` elements of
/// `elem_size` bytes. Writes land in the peer's ring, reads drain this
/// endpoint's ring. Move-only; dropping the value releases the endpoint.
pub struct Fifo {
    shared: Arc<SignalCell<FifoState>>,
    side: Side,
    koid: Koid,
    peer_koid: Koid,
    elem_size: usize,
    depth: usize,
    metadata: GuardMetadata,
    active: bool,
}

impl std::fmt::Debug for Fifo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fifo")
            .field("koid", &self.koid)
            .field("related_koid", &self.peer_koid)
            .field("elem_size", &self.elem_size)
            .field("depth", &self.depth)
            .field("active", &self.active)
            .finish()
    }
}

impl Fifo {
    /// Create a fifo pair holding `elem_count` elements of `elem_size` bytes per direction
    ///
    /// Both values must be non-zero and their product at most one page.
    pub fn create(elem_count: usize, elem_size: usize) -> TransportResult<(Fifo, Fifo)> {
        if elem_count == 0 || elem_size == 0 {
            return Err(TransportError::OutOfRange(
                "fifo depth and element size must be non-zero".into(),
            ));
        }
        let bytes = elem_count
            .checked_mul(elem_size)
            .filter(|&bytes| bytes <= FIFO_MAX_BYTES)
            .ok_or_else(|| {
                TransportError::OutOfRange(format!(
                    "{} elements of {} bytes exceed {} bytes",
                    elem_count, elem_size, FIFO_MAX_BYTES
                ))
            })?;

        let shared = Arc::new(SignalCell::new(FifoState {
            buffers: [HeapRb::new(bytes), HeapRb::new(bytes)],
            open: [true, true],
            elem_size,
            depth: elem_count,
        }));
        let first = Koid::next();
        let second = Koid::next();

        debug!(%first, %second, elem_count, elem_size, "Created fifo pair");

        Ok((
            Self::endpoint(shared.clone(), Side::First, first, second, elem_size, elem_count),
            Self::endpoint(shared, Side::Second, second, first, elem_size, elem_count),
        ))
    }

    fn endpoint(
        shared: Arc<SignalCell<FifoState>>,
        side: Side,
        koid: Koid,
        peer_koid: Koid,
        elem_size: usize,
        depth: usize,
    ) -> Self {
        Self {
            shared,
            side,
            koid,
            peer_koid,
            elem_size,
            depth,
            metadata: GuardMetadata::new("fifo", koid),
            active: true,
        }
    }

    /// Validate an element transfer and return its byte length
    fn transfer_len(&self, elem_size: usize, count: usize, available: usize) -> TransportResult<usize> {
        if !self.active {
            return Err(TransportError::BadHandle);
        }
        if elem_size != self.elem_size {
            return Err(TransportError::OutOfRange(format!(
                "element size {} does not match fifo element size {}",
                elem_size, self.elem_size
            )));
        }
        if count == 0 {
            return Err(TransportError::OutOfRange("element count must be non-zero".into()));
        }
        match elem_size.checked_mul(count) {
            Some(len) if len <= available => Ok(len),
            _ => Err(TransportError::InvalidArgs(format!(
                "buffer of {} bytes cannot hold {} elements of {} bytes",
                available, count, elem_size
            ))),
        }
    }

    /// Queue up to `count` elements from `src` at the peer without blocking
    ///
    /// Returns how many whole elements were queued, which is less than
    /// `count` when the peer's ring lacks room. Fails with `ShouldWait` when
    /// not even one element fits and with `PeerClosed` when the peer is gone.
    pub fn write(&self, elem_size: usize, src: &[u8], count: usize) -> TransportResult<usize> {
        self.transfer_len(elem_size, count, src.len())?;

        let mut state = self.shared.lock();
        let peer = self.side.peer().index();
        if !state.open[peer] {
            return Err(TransportError::PeerClosed);
        }

        let room = state.buffers[peer].vacant_len() / elem_size;
        if room == 0 {
            return Err(TransportError::ShouldWait);
        }

        let actual = count.min(room);
        let pushed = state.buffers[peer].push_slice(&src[..actual * elem_size]);
        debug_assert_eq!(pushed, actual * elem_size);
        drop(state);
        self.shared.notify();

        trace!(koid = %self.koid, requested = count, actual, "Fifo write");
        Ok(actual)
    }

    /// Pull up to `count` elements into `dst` without blocking
    ///
    /// Buffered elements remain readable after the peer closes; once they
    /// are exhausted the read fails with `PeerClosed`. With the peer still
    /// open an empty ring fails with `ShouldWait`.
    pub fn read(&self, elem_size: usize, dst: &mut [u8], count: usize) -> TransportResult<usize> {
        self.transfer_len(elem_size, count, dst.len())?;

        let mut state = self.shared.lock();
        let peer_open = state.open[self.side.peer().index()];
        let buffer = &mut state.buffers[self.side.index()];

        let available = buffer.occupied_len() / elem_size;
        if available == 0 {
            return Err(if peer_open {
                TransportError::ShouldWait
            } else {
                TransportError::PeerClosed
            });
        }

        let actual = count.min(available);
        let popped = buffer.pop_slice(&mut dst[..actual * elem_size]);
        debug_assert_eq!(popped, actual * elem_size);
        drop(state);
        self.shared.notify();

        trace!(koid = %self.koid, requested = count, actual, "Fifo read");
        Ok(actual)
    }

    /// Typed [`Fifo::write`]: queue as many of `records` as fit
    pub fn write_records<R: FifoRecord>(&self, records: &[R]) -> TransportResult<usize> {
        let mut bytes = vec![0u8; records.len() * R::SIZE];
        for (record, chunk) in records.iter().zip(bytes.chunks_exact_mut(R::SIZE)) {
            record.encode(chunk);
        }
        self.write(R::SIZE, &bytes, records.len())
    }

    /// Typed [`Fifo::read`]: fill the front of `out`, returning how many were read
    pub fn read_records<R: FifoRecord>(&self, out: &mut [R]) -> TransportResult<usize> {
        let mut bytes = vec![0u8; out.len() * R::SIZE];
        let actual = self.read(R::SIZE, &mut bytes, out.len())?;
        for (slot, chunk) in out.iter_mut().zip(bytes.chunks_exact(R::SIZE)).take(actual) {
            *slot = R::decode(chunk);
        }
        Ok(actual)
    }

    /// Snapshot of this endpoint's ring occupancy and peer state
    pub fn info(&self) -> TransportResult<FifoInfo> {
        if !self.active {
            return Err(TransportError::BadHandle);
        }
        let state = self.shared.lock();
        Ok(FifoInfo {
            koid: self.koid,
            related_koid: self.peer_koid,
            elem_size: state.elem_size,
            depth: state.depth,
            readable: state.readable(self.side),
            writable: state.writable(self.side),
            peer_closed: !state.open[self.side.peer().index()],
        })
    }

    /// Release this endpoint
    ///
    /// Idempotent. Elements already queued for the peer stay readable there;
    /// elements queued for this endpoint are discarded.
    pub fn close(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        let discarded = {
            let mut state = self.shared.lock();
            let elem_size = state.elem_size;
            state.open[self.side.index()] = false;
            let buffer = &mut state.buffers[self.side.index()];
            let len = buffer.occupied_len();
            buffer.skip(len) / elem_size
        };
        self.shared.notify();

        debug!(
            koid = %self.koid,
            discarded,
            lifetime_us = self.metadata.lifetime_micros(),
            "Fifo endpoint closed"
        );
    }
}

impl Waitable for Fifo {
    fn koid(&self) -> Koid {
        self.koid
    }

    fn related_koid(&self) -> Koid {
        self.peer_koid
    }

    fn signals(&self) -> TransportResult<Signals> {
        if !self.active {
            return Err(TransportError::BadHandle);
        }
        Ok(self.shared.lock().signals(self.side))
    }

    fn wait_one(&self, interest: Signals, deadline: Deadline) -> TransportResult<Signals> {
        if !self.active {
            return Err(TransportError::BadHandle);
        }
        let side = self.side;
        self.shared
            .wait_until(deadline, |state| {
                let signals = state.signals(side);
                signals.intersects(interest).then_some(signals)
            })
            .map_err(|WaitError::Timeout| TransportError::TimedOut)
    }
}

impl Guard for Fifo {
    fn resource_type(&self) -> &'static str {
        "fifo"
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

impl Drop for Fifo {
    fn drop(&mut self) {
        self.close();
    }
}
