/*!
 * Handoff IPC Library
 * Channels, fifos and capability handoff between a parent and a child
 */

pub mod config;
pub mod core;
pub mod ipc;
pub mod monitoring;
pub mod patterns;
pub mod process;

// Re-exports
pub use config::{ConfigError, SessionConfig};
pub use crate::core::errors::{SessionError, SessionResult, TransportError, TransportResult};
pub use crate::core::types::{Deadline, Koid, Signals};
pub use ipc::{Channel, Envelope, Fifo, Handle, Waitable};
pub use monitoring::init_tracing;
pub use patterns::{ClosePolicy, ReadShape};
pub use process::{launch, LaunchError, LaunchReport, Program, Role};
