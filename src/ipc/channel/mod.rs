/*!
 * Channel Module
 * Message-oriented transport: discrete messages, optionally carrying handles
 */

mod channel;
pub mod message;
pub mod types;

// Re-export public API
pub use channel::Channel;
pub use message::{Envelope, EnvelopeKind, TextMessage, WireFormat};
pub use types::{ChannelInfo, Incoming};
