/*!
 * Fifo Types
 * Info snapshots for fifos
 */

use crate::core::types::Koid;
use serde::{Deserialize, Serialize};

/// Fifo endpoint snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FifoInfo {
    pub koid: Koid,
    pub related_koid: Koid,
    pub elem_size: usize,
    pub depth: usize,
    /// Elements queued for this endpoint to read
    pub readable: usize,
    /// Elements this endpoint could write right now
    pub writable: usize,
    pub peer_closed: bool,
}
