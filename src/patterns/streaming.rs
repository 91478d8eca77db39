/*!
 * Streaming Pattern
 *
 * One side pushes fire-and-forget text messages; the other drains and logs
 * them until the producer releases its endpoint.
 */

use super::session::{await_signals, read_wire, write_wire};
use crate::config::SessionConfig;
use crate::core::errors::{SessionError, SessionResult};
use crate::core::types::Signals;
use crate::ipc::{Channel, TextMessage};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// How the consumer decides a stream is over
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ReadShape {
    /// Read while `READABLE` is asserted; stop on `PEER_CLOSED` alone
    #[default]
    CheckSignalsFirst,
    /// Always read after waking; stop when the read reports peer closure
    ReadFirst,
}

/// Text of the `index`-th streamed message (1-based)
pub fn stream_text(index: u32, count: u32) -> String {
    format!("Hello World {} of {}!", index, count)
}

/// Sends `message_count` text messages, then lingers and closes
pub struct StreamProducer {
    channel: Channel,
    config: SessionConfig,
}

impl StreamProducer {
    pub fn new(channel: Channel, config: &SessionConfig) -> Self {
        Self {
            channel,
            config: config.clone(),
        }
    }

    /// Returns the number of messages sent
    pub fn run(mut self) -> SessionResult<u32> {
        let count = self.config.message_count;

        for index in 1..=count {
            let message = TextMessage::new(&stream_text(index, count));
            info!("Sending Message '{}'", message.text());
            pause(self.config.message_interval);

            let signals = await_signals(
                &self.channel,
                Signals::WRITABLE,
                self.config.deadline(),
                "waiting to send message",
            )?;
            if signals.contains(Signals::PEER_CLOSED) {
                warn!("Peer closed unexpectedly");
                return Err(SessionError::PeerClosed {
                    stage: "waiting to send message",
                });
            }

            write_wire(&self.channel, &message, "sending message")?;
            pause(self.config.message_interval);
        }

        info!("Closing channel...");
        pause(self.config.linger);
        self.channel.close();
        Ok(count)
    }
}

/// Drains text messages until the producer goes away
pub struct StreamConsumer {
    channel: Channel,
    config: SessionConfig,
}

impl StreamConsumer {
    pub fn new(channel: Channel, config: &SessionConfig) -> Self {
        Self {
            channel,
            config: config.clone(),
        }
    }

    /// Returns every message received, in order
    pub fn run(self) -> SessionResult<Vec<String>> {
        let mut received = Vec::new();

        loop {
            let signals = await_signals(
                &self.channel,
                Signals::READABLE,
                self.config.deadline(),
                "waiting for message",
            )?;

            let message = match self.config.read_shape {
                ReadShape::CheckSignalsFirst => {
                    if !signals.contains(Signals::READABLE) {
                        break;
                    }
                    read_wire::<TextMessage>(&self.channel, "reading message")?
                }
                ReadShape::ReadFirst => {
                    match read_wire::<TextMessage>(&self.channel, "reading message") {
                        Ok(message) => message,
                        Err(e) if e.is_peer_closed() => break,
                        Err(e) => return Err(e),
                    }
                }
            };

            let text = message.text().into_owned();
            info!("{}", text);
            received.push(text);
        }

        info!(received = received.len(), "Channel closed, goodbye!");
        Ok(received)
    }
}

#[inline]
pub(crate) fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
