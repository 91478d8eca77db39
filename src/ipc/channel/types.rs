/*!
 * Channel Types
 * Read results and info snapshots for channels
 */

use crate::core::types::Koid;
use crate::ipc::handle::Handle;
use serde::{Deserialize, Serialize};

/// One message pulled off a channel
///
/// The payload is copied into the caller's buffer; `actual_bytes` says how
/// much of it is valid. Handles are moved out of the message and are now
/// owned by the caller.
#[derive(Debug)]
pub struct Incoming {
    pub actual_bytes: usize,
    pub handles: Vec<Handle>,
}

/// Channel endpoint snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChannelInfo {
    pub koid: Koid,
    pub related_koid: Koid,
    /// Messages queued for this endpoint
    pub pending_messages: usize,
    /// Messages queued for the peer
    pub peer_pending_messages: usize,
    pub max_pending_messages: usize,
    pub peer_closed: bool,
}
