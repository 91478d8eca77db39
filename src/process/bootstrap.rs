/*!
 * Bootstrap
 *
 * Starts the two roles of a program. The parent creates the channel, places
 * one endpoint in the child's startup handles under `USER0`, starts the child
 * on its own named thread, and runs its own role on the calling thread.
 *
 * # Exit status
 *
 * Each role ends with a raw status: `OK` on graceful closure, otherwise the
 * status of the failing operation. The launch exit code is the magnitude of
 * the first failing status, parent first.
 */

use super::role::Role;
use crate::config::SessionConfig;
use crate::core::errors::{exit_code, status, SessionError, SessionResult, TransportError};
use crate::core::limits::FIFO_ELEMENT_SIZE;
use crate::ipc::{Channel, Fifo, Handle};
use crate::monitoring::SessionSpan;
use crate::patterns::{
    accept_fifo, default_requests, fibonacci, offer_fifo, AddClient, AddServer, Exchange,
    ProducerSummary, RecordConsumer, RecordProducer, ServeSummary, StreamConsumer, StreamProducer,
};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::thread;
use thiserror::Error;
use tracing::{error, info};

/// Well-known position in a startup handle table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleSlot(u32);

impl HandleSlot {
    /// First slot reserved for application use
    pub const USER0: HandleSlot = HandleSlot(0xF0);
}

impl fmt::Display for HandleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Handles a child starts with; each can be taken once
#[derive(Debug, Default)]
pub struct StartupHandles {
    handles: HashMap<HandleSlot, Handle>,
}

impl StartupHandles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `handle` at `slot`, returning whatever was there before
    pub fn insert(&mut self, slot: HandleSlot, handle: Handle) -> Option<Handle> {
        self.handles.insert(slot, handle)
    }

    pub fn take(&mut self, slot: HandleSlot) -> Option<Handle> {
        self.handles.remove(&slot)
    }

    /// Take the channel at `slot`
    pub fn take_channel(&mut self, slot: HandleSlot) -> Result<Channel, LaunchError> {
        self.take(slot)
            .ok_or(LaunchError::MissingStartupHandle { slot })?
            .into_channel()
            .map_err(|other| LaunchError::WrongStartupHandle {
                slot,
                kind: other.kind().to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// The demo programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Program {
    /// Parent streams text messages to the child
    OneWay,
    /// Child asks the parent to add numbers
    TwoWay,
    /// Parent hands the child a fifo and drains Fibonacci records from it
    #[value(name = "fifo")]
    FifoTransfer,
}

impl Program {
    pub const fn name(self) -> &'static str {
        match self {
            Self::OneWay => "one-way",
            Self::TwoWay => "two-way",
            Self::FifoTransfer => "fifo",
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a role accomplished before its session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RoleOutcome {
    Streamed { sent: u32 },
    Received { messages: Vec<String> },
    Served(ServeSummary),
    Called { exchanges: Vec<Exchange> },
    Consumed { records: Vec<u64> },
    Produced(ProducerSummary),
}

/// How one role's session ended
#[derive(Debug, Clone, Serialize)]
pub struct RoleReport {
    pub role: Role,
    pub status: i32,
    pub outcome: Option<RoleOutcome>,
    #[serde(skip)]
    pub error: Option<SessionError>,
}

impl RoleReport {
    fn new(role: Role, result: SessionResult<RoleOutcome>) -> Self {
        match result {
            Ok(outcome) => Self {
                role,
                status: status::OK,
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => Self {
                role,
                status: e.status(),
                outcome: None,
                error: Some(e),
            },
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == status::OK
    }
}

/// Both roles' results for one launch
#[derive(Debug, Clone, Serialize)]
pub struct LaunchReport {
    pub program: Program,
    pub parent: RoleReport,
    pub child: RoleReport,
}

impl LaunchReport {
    /// First failing status, parent first; `OK` when both succeeded
    pub fn status(&self) -> i32 {
        [&self.parent, &self.child]
            .into_iter()
            .map(|report| report.status)
            .find(|&status| status != status::OK)
            .unwrap_or(status::OK)
    }

    #[inline]
    pub fn exit_code(&self) -> u8 {
        exit_code(self.status())
    }
}

/// Failures of the bootstrap itself, before or around the sessions
#[derive(Error, Debug, Diagnostic)]
pub enum LaunchError {
    #[error("Failed to create channel: {0}")]
    #[diagnostic(code(launch::channel))]
    Channel(#[source] TransportError),

    #[error("Could not spawn child: {0}")]
    #[diagnostic(code(launch::spawn))]
    Spawn(#[source] std::io::Error),

    #[error("Child panicked")]
    #[diagnostic(
        code(launch::child_panicked),
        help("The child's endpoint was released during unwinding; the parent saw PEER_CLOSED.")
    )]
    ChildPanicked,

    #[error("No startup handle at slot {slot}")]
    #[diagnostic(code(launch::missing_handle))]
    MissingStartupHandle { slot: HandleSlot },

    #[error("Startup handle at slot {slot} is a {kind}, expected a channel")]
    #[diagnostic(code(launch::wrong_handle))]
    WrongStartupHandle { slot: HandleSlot, kind: String },
}

impl LaunchError {
    pub fn status(&self) -> i32 {
        match self {
            Self::Channel(source) => source.status(),
            Self::Spawn(_) | Self::ChildPanicked => status::INTERNAL,
            Self::MissingStartupHandle { .. } | Self::WrongStartupHandle { .. } => {
                status::BAD_HANDLE
            }
        }
    }
}

/// Run both roles of `program` and collect their results
pub fn launch(program: Program, config: &SessionConfig) -> Result<LaunchReport, LaunchError> {
    let (parent_end, child_end) =
        Channel::create_bounded(config.max_pending_messages).map_err(LaunchError::Channel)?;

    let mut startup = StartupHandles::new();
    startup.insert(HandleSlot::USER0, Handle::from(child_end));

    let child_config = config.clone();
    // On spawn failure the closure is dropped, releasing the child's endpoint;
    // `parent_end` is released on return.
    let child = thread::Builder::new()
        .name("child".into())
        .spawn(move || run_child(program, startup, &child_config))
        .map_err(LaunchError::Spawn)?;

    info!(%program, "Started child");
    let parent = run_role(Role::Parent, program, parent_end, config);

    let child = child.join().map_err(|_| LaunchError::ChildPanicked)??;

    Ok(LaunchReport {
        program,
        parent,
        child,
    })
}

/// Child entry point: take the endpoint from `USER0` and run the child role
pub fn run_child(
    program: Program,
    mut startup: StartupHandles,
    config: &SessionConfig,
) -> Result<RoleReport, LaunchError> {
    let channel = startup.take_channel(HandleSlot::USER0)?;
    Ok(run_role(Role::Child, program, channel, config))
}

/// Run one role of `program` over `channel` inside a role-tagged span
pub fn run_role(role: Role, program: Program, channel: Channel, config: &SessionConfig) -> RoleReport {
    let span = SessionSpan::new(role.prefix(), program.name());
    let _entered = span.enter();

    let result = match (program, role) {
        (Program::OneWay, Role::Parent) => StreamProducer::new(channel, config)
            .run()
            .map(|sent| RoleOutcome::Streamed { sent }),
        (Program::OneWay, Role::Child) => StreamConsumer::new(channel, config)
            .run()
            .map(|messages| RoleOutcome::Received { messages }),
        (Program::TwoWay, Role::Parent) => AddServer::new(channel, config)
            .serve()
            .map(RoleOutcome::Served),
        (Program::TwoWay, Role::Child) => AddClient::new(channel, config)
            .run(default_requests(config.request_count))
            .map(|exchanges| RoleOutcome::Called { exchanges }),
        (Program::FifoTransfer, Role::Parent) => consume_over_fifo(&channel, config),
        (Program::FifoTransfer, Role::Child) => produce_over_fifo(&channel, config),
    };

    let report = RoleReport::new(role, result);
    span.record_status(report.status);
    if let Some(e) = &report.error {
        error!(error = %e, status = report.status, "Session failed");
    }
    report
}

/// Create the fifo, hand the peer one end, and drain the other
///
/// The channel stays open until the drain completes.
fn consume_over_fifo(channel: &Channel, config: &SessionConfig) -> SessionResult<RoleOutcome> {
    let (mine, theirs) = Fifo::create(config.fifo_depth, FIFO_ELEMENT_SIZE).map_err(|source| {
        SessionError::CreateFailed {
            object: "fifo",
            source,
        }
    })?;
    offer_fifo(channel, theirs, config.deadline())?;

    RecordConsumer::new(mine, config)
        .run()
        .map(|records| RoleOutcome::Consumed { records })
}

/// Receive the fifo and push the Fibonacci sequence through it
fn produce_over_fifo(channel: &Channel, config: &SessionConfig) -> SessionResult<RoleOutcome> {
    let fifo = accept_fifo(channel, config.deadline())?;
    RecordProducer::new(fifo, fibonacci(config.record_count), config)
        .run()
        .map(RoleOutcome::Produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::Waitable;

    #[test]
    fn test_startup_handles_take_once() {
        let (a, _b) = Channel::create();
        let koid = a.koid();
        let mut startup = StartupHandles::new();
        startup.insert(HandleSlot::USER0, Handle::from(a));

        let taken = startup.take_channel(HandleSlot::USER0).unwrap();
        assert_eq!(taken.koid(), koid);
        assert!(matches!(
            startup.take_channel(HandleSlot::USER0),
            Err(LaunchError::MissingStartupHandle { .. })
        ));
    }

    #[test]
    fn test_startup_handle_must_be_channel() {
        let (fifo, _peer) = Fifo::create(8, 8).unwrap();
        let mut startup = StartupHandles::new();
        startup.insert(HandleSlot::USER0, Handle::from(fifo));
        let err = startup.take_channel(HandleSlot::USER0).unwrap_err();
        assert_eq!(err.status(), status::BAD_HANDLE);
    }

    #[test]
    fn test_missing_handle_child() {
        let err = run_child(Program::OneWay, StartupHandles::new(), &SessionConfig::fast())
            .unwrap_err();
        assert!(matches!(err, LaunchError::MissingStartupHandle { slot } if slot == HandleSlot::USER0));
    }

    #[test]
    fn test_program_names() {
        use clap::ValueEnum;
        assert_eq!(Program::from_str("fifo", false).unwrap(), Program::FifoTransfer);
        assert_eq!(Program::from_str("two-way", false).unwrap(), Program::TwoWay);
        assert_eq!(Program::OneWay.to_string(), "one-way");
    }

    #[test]
    fn test_exit_code_prefers_parent() {
        let report = LaunchReport {
            program: Program::TwoWay,
            parent: RoleReport::new(
                Role::Parent,
                Err(SessionError::PeerClosed { stage: "waiting to send reply" }),
            ),
            child: RoleReport::new(
                Role::Child,
                Err(SessionError::Decode {
                    what: "add response",
                    expected: 4,
                    actual: 2,
                }),
            ),
        };
        assert_eq!(report.status(), status::PEER_CLOSED);
        assert_eq!(report.exit_code(), 24);
    }

    #[test]
    fn test_launch_two_way() {
        let report = launch(Program::TwoWay, &SessionConfig::fast()).unwrap();
        assert_eq!(report.exit_code(), 0);
        match report.child.outcome {
            Some(RoleOutcome::Called { exchanges }) => assert_eq!(exchanges.len(), 10),
            other => panic!("unexpected child outcome: {:?}", other),
        }
    }
}
