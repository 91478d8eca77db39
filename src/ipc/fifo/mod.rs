/*!
 * Fifo Module
 * Bounded bulk transport of fixed-size elements with backpressure
 */

mod fifo;
pub mod record;
pub mod types;

// Re-export public API
pub use fifo::Fifo;
pub use record::FifoRecord;
pub use types::FifoInfo;
