/*!
 * IPC Module
 * Kernel-object transports: message channels, element fifos, and the handles that carry them
 */

pub mod channel;
pub mod core;
pub mod fifo;
pub mod handle;

// Re-export for convenience
pub use channel::{Channel, ChannelInfo, Envelope, EnvelopeKind, Incoming, TextMessage, WireFormat};
pub use self::core::Waitable;
pub use fifo::{Fifo, FifoInfo, FifoRecord};
pub use handle::{Handle, HandleKind};
