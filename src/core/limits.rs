/*!
 * System Limits and Constants
 *
 * Centralized location for transport limits and the default shape of each
 * demo session. Organized by domain.
 */

use std::time::Duration;

// =============================================================================
// CHANNEL LIMITS
// =============================================================================

/// Largest payload a single channel message may carry (64KB)
pub const CHANNEL_MAX_MSG_BYTES: usize = 64 * 1024;

/// Most handles a single channel message may carry
pub const CHANNEL_MAX_MSG_HANDLES: usize = 64;

/// Messages an endpoint may have queued before writes to it should wait
pub const CHANNEL_MAX_PENDING_MESSAGES: usize = 3_500;

// =============================================================================
// FIFO LIMITS
// =============================================================================

/// Upper bound on `depth * element_size` for one direction of a fifo (one page)
pub const FIFO_MAX_BYTES: usize = 4 * 1024;

/// Size of one bulk record (a native-endian u64)
pub const FIFO_ELEMENT_SIZE: usize = std::mem::size_of::<u64>();

/// Depth of the demo fifo
pub const DEFAULT_FIFO_DEPTH: usize = 8;

// =============================================================================
// SESSION DEFAULTS
// =============================================================================

/// Width of a streaming text message, NUL padded
pub const TEXT_MESSAGE_LENGTH: usize = 32;

/// Messages the streaming producer sends before closing
pub const DEFAULT_MESSAGE_COUNT: u32 = 10;

/// Requests the client issues before disconnecting
pub const DEFAULT_REQUEST_COUNT: u32 = 10;

/// Fibonacci records pushed through the fifo
pub const DEFAULT_RECORD_COUNT: usize = 32;

/// Pacing between streamed messages; keeps both roles' console output apart
pub const DEFAULT_MESSAGE_INTERVAL: Duration = Duration::from_millis(100);

/// How long the streaming producer holds the channel open after its last message
pub const DEFAULT_LINGER: Duration = Duration::from_millis(500);

/// Simulated per-record processing cost in the fifo consumer
pub const DEFAULT_CONSUMER_THROTTLE: Duration = Duration::from_millis(50);
