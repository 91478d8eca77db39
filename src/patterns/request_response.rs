/*!
 * Request/Response Pattern
 *
 * A client sends `{a, b}` and blocks for `{a + b}`; the server answers one
 * request at a time until the client disconnects. Both sides are explicit
 * per-iteration state machines over wait-then-act steps.
 */

use super::session::{await_signals, read_wire, write_wire};
use crate::config::SessionConfig;
use crate::core::errors::{SessionError, SessionResult};
use crate::core::types::Signals;
use crate::ipc::channel::message::sealed::Codec;
use crate::ipc::{Channel, WireFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const U32_SIZE: usize = std::mem::size_of::<u32>();

#[inline]
fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; U32_SIZE];
    raw.copy_from_slice(&bytes[offset..offset + U32_SIZE]);
    u32::from_ne_bytes(raw)
}

/// Add request: two native-endian `u32`, 8 bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddRequest {
    pub a: u32,
    pub b: u32,
}

impl AddRequest {
    #[inline]
    pub const fn new(a: u32, b: u32) -> Self {
        Self { a, b }
    }

    /// The server's whole computation: 32-bit wrapping addition
    #[inline]
    pub const fn evaluate(&self) -> AddResponse {
        AddResponse {
            result: self.a.wrapping_add(self.b),
        }
    }
}

impl WireFormat for AddRequest {
    const WIRE_SIZE: usize = std::mem::size_of::<AddRequest>();
    const NAME: &'static str = "add request";
}

impl Codec for AddRequest {
    fn write_to(&self, out: &mut [u8]) {
        out[..U32_SIZE].copy_from_slice(&self.a.to_ne_bytes());
        out[U32_SIZE..].copy_from_slice(&self.b.to_ne_bytes());
    }

    fn read_from(bytes: &[u8]) -> Self {
        Self {
            a: u32_at(bytes, 0),
            b: u32_at(bytes, U32_SIZE),
        }
    }
}

/// Add response: one native-endian `u32`, 4 bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddResponse {
    pub result: u32,
}

impl WireFormat for AddResponse {
    const WIRE_SIZE: usize = std::mem::size_of::<AddResponse>();
    const NAME: &'static str = "add response";
}

impl Codec for AddResponse {
    fn write_to(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.result.to_ne_bytes());
    }

    fn read_from(bytes: &[u8]) -> Self {
        Self {
            result: u32_at(bytes, 0),
        }
    }
}

/// The request sequence a default client sends: `{i, i + 1}` for `i` in `0..count`
pub fn default_requests(count: u32) -> impl Iterator<Item = AddRequest> {
    (0..count).map(|i| AddRequest::new(i, i.wrapping_add(1)))
}

/// One completed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub request: AddRequest,
    pub response: AddResponse,
}

/// Progress of a single client call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Sending,
    AwaitingReply,
    Done(AddResponse),
}

/// Client half of the add protocol
pub struct AddClient {
    channel: Channel,
    config: SessionConfig,
}

impl AddClient {
    pub fn new(channel: Channel, config: &SessionConfig) -> Self {
        Self {
            channel,
            config: config.clone(),
        }
    }

    /// Send one request and block for its reply
    ///
    /// A reply already queued is read even if the server has since closed.
    pub fn call(&self, request: AddRequest) -> SessionResult<AddResponse> {
        let mut state = CallState::Sending;
        loop {
            state = match state {
                CallState::Sending => {
                    let signals = await_signals(
                        &self.channel,
                        Signals::WRITABLE,
                        self.config.deadline(),
                        "waiting to send request",
                    )?;
                    if signals.contains(Signals::PEER_CLOSED) {
                        warn!("Server closed channel unexpectedly");
                        return Err(SessionError::PeerClosed {
                            stage: "waiting to send request",
                        });
                    }
                    write_wire(&self.channel, &request, "sending request")?;
                    CallState::AwaitingReply
                }
                CallState::AwaitingReply => {
                    let signals = await_signals(
                        &self.channel,
                        Signals::READABLE,
                        self.config.deadline(),
                        "awaiting reply",
                    )?;
                    if !signals.contains(Signals::READABLE) {
                        warn!("Server closed channel before replying");
                        return Err(SessionError::PeerClosed {
                            stage: "awaiting reply",
                        });
                    }
                    CallState::Done(read_wire(&self.channel, "reading reply")?)
                }
                CallState::Done(response) => return Ok(response),
            };
        }
    }

    /// Issue every request in order, then close the channel
    pub fn run<I>(mut self, requests: I) -> SessionResult<Vec<Exchange>>
    where
        I: IntoIterator<Item = AddRequest>,
    {
        let mut exchanges = Vec::new();
        for request in requests {
            let response = self.call(request)?;
            info!("{} + {} = {}", request.a, request.b, response.result);
            exchanges.push(Exchange { request, response });
        }

        info!(calls = exchanges.len(), "All done, closing connection");
        self.channel.close();
        Ok(exchanges)
    }
}

/// What the server does with requests still queued when the client leaves
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
    /// Stop at the first sign of peer closure; queued requests go unread
    #[default]
    Abandon,
    /// Read and evaluate queued requests before stopping; replies are discarded
    Drain,
}

/// Outcome of a server session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServeSummary {
    /// Requests answered
    pub served: usize,
    /// Requests evaluated after the client left, replies discarded
    pub drained: usize,
    /// Requests left unread in the queue
    pub abandoned: usize,
}

/// Progress of the server loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    WaitingForRequest,
    Replying(AddResponse),
    Finished,
}

/// Server half of the add protocol
pub struct AddServer {
    channel: Channel,
    config: SessionConfig,
}

impl AddServer {
    pub fn new(channel: Channel, config: &SessionConfig) -> Self {
        Self {
            channel,
            config: config.clone(),
        }
    }

    /// Serve until the client disconnects
    ///
    /// Peer closure while waiting for a request ends the session successfully.
    /// Peer closure while replying fails under `Abandon` and discards the
    /// reply under `Drain`.
    pub fn serve(mut self) -> SessionResult<ServeSummary> {
        let policy = self.config.close_policy;
        let mut summary = ServeSummary::default();
        let mut state = ServerState::WaitingForRequest;

        while state != ServerState::Finished {
            state = match state {
                ServerState::WaitingForRequest => {
                    let signals = await_signals(
                        &self.channel,
                        Signals::READABLE,
                        self.config.deadline(),
                        "waiting for request",
                    )?;
                    let peer_closed = signals.contains(Signals::PEER_CLOSED);

                    if !signals.contains(Signals::READABLE)
                        || (peer_closed && policy == ClosePolicy::Abandon)
                    {
                        summary.abandoned = self
                            .channel
                            .info()
                            .map_err(|e| SessionError::read("counting abandoned requests", e))?
                            .pending_messages;
                        info!(abandoned = summary.abandoned, "Peer went away, shutting down");
                        ServerState::Finished
                    } else {
                        let request: AddRequest = read_wire(&self.channel, "reading request")?;
                        let response = request.evaluate();
                        info!(
                            "Child asked what is '{} + {}' respond with {}",
                            request.a, request.b, response.result
                        );
                        ServerState::Replying(response)
                    }
                }
                ServerState::Replying(response) => {
                    let signals = await_signals(
                        &self.channel,
                        Signals::WRITABLE,
                        self.config.deadline(),
                        "waiting to send reply",
                    )?;
                    let delivered = if signals.contains(Signals::PEER_CLOSED) {
                        Err(SessionError::PeerClosed {
                            stage: "waiting to send reply",
                        })
                    } else {
                        write_wire(&self.channel, &response, "sending reply")
                    };

                    match (delivered, policy) {
                        (Ok(()), _) => summary.served += 1,
                        (Err(e), ClosePolicy::Drain) if e.is_peer_closed() => {
                            debug!(result = response.result, "Discarding reply to closed peer");
                            summary.drained += 1;
                        }
                        (Err(e), _) => {
                            warn!(error = %e, "Peer closed before response could be delivered");
                            return Err(e);
                        }
                    }
                    ServerState::WaitingForRequest
                }
                ServerState::Finished => ServerState::Finished,
            };
        }

        info!(
            served = summary.served,
            drained = summary.drained,
            "Closing channel..."
        );
        self.channel.close();
        Ok(summary)
    }
}
