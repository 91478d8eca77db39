/*!
 * Bulk Transfer Pattern
 *
 * A producer pushes a precomputed record sequence through a fifo, advancing
 * by however many records each write accepts. A consumer drains one record
 * at a time with simulated processing latency until the producer closes.
 */

use super::session::await_signals;
use super::streaming::pause;
use crate::config::SessionConfig;
use crate::core::errors::{SessionError, SessionResult, TransportError};
use crate::core::types::Signals;
use crate::ipc::Fifo;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// The first `count` Fibonacci numbers starting `1, 1, 2, ...`
///
/// Terms past the 93rd do not fit in a `u64` and wrap.
pub fn fibonacci(count: usize) -> Vec<u64> {
    let mut terms = Vec::with_capacity(count);
    let (mut current, mut next) = (1u64, 1u64);
    for _ in 0..count {
        terms.push(current);
        (current, next) = (next, current.wrapping_add(next));
    }
    terms
}

/// Producer session totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerSummary {
    /// Records accepted by the fifo
    pub written: usize,
    /// Successful write calls
    pub batches: usize,
}

/// Writes a fixed record sequence with backpressure, then closes
pub struct RecordProducer {
    fifo: Fifo,
    records: Vec<u64>,
    config: SessionConfig,
}

impl RecordProducer {
    pub fn new(fifo: Fifo, records: Vec<u64>, config: &SessionConfig) -> Self {
        Self {
            fifo,
            records,
            config: config.clone(),
        }
    }

    pub fn run(mut self) -> SessionResult<ProducerSummary> {
        let mut summary = ProducerSummary::default();

        while summary.written < self.records.len() {
            let signals = await_signals(
                &self.fifo,
                Signals::WRITABLE,
                self.config.deadline(),
                "waiting for fifo space",
            )?;
            if signals.contains(Signals::PEER_CLOSED) {
                warn!("Peer closed unexpectedly");
                return Err(SessionError::PeerClosed {
                    stage: "waiting for fifo space",
                });
            }

            let actual = match self.fifo.write_records(&self.records[summary.written..]) {
                Ok(actual) => actual,
                Err(TransportError::ShouldWait) => continue,
                Err(e) => return Err(SessionError::write("writing records", e)),
            };
            summary.written += actual;
            summary.batches += 1;

            let remaining = self.records.len() - summary.written;
            info!(
                actual,
                remaining,
                "Wrote {} {}, {} remaining",
                actual,
                if actual == 1 { "entry" } else { "entries" },
                remaining
            );
        }

        info!("Closing fifo, goodbye!");
        self.fifo.close();
        Ok(summary)
    }
}

/// Drains records one at a time until the producer is gone
pub struct RecordConsumer {
    fifo: Fifo,
    config: SessionConfig,
}

impl RecordConsumer {
    pub fn new(fifo: Fifo, config: &SessionConfig) -> Self {
        Self {
            fifo,
            config: config.clone(),
        }
    }

    /// Returns every record read, in order
    pub fn run(mut self) -> SessionResult<Vec<u64>> {
        let mut records = Vec::new();

        loop {
            pause(self.config.consumer_throttle);

            await_signals(
                &self.fifo,
                Signals::READABLE,
                self.config.deadline(),
                "waiting for records",
            )?;

            let mut element = [0u64; 1];
            match self.fifo.read_records(&mut element) {
                Ok(_) => {
                    // Keeps console lines from interleaving with the producer
                    pause(self.config.consumer_throttle);
                    info!("Fifo Read Returned {}", element[0]);
                    records.push(element[0]);
                }
                Err(TransportError::PeerClosed) => break,
                Err(TransportError::ShouldWait) => debug!("Spurious wake-up"),
                Err(e) => return Err(SessionError::read("reading records", e)),
            }
        }

        info!(received = records.len(), "No more data to process, goodbye!");
        self.fifo.close();
        Ok(records)
    }
}
