/*!
 * Patterns Module
 * Session protocols built on the transports: streaming, request/response,
 * capability handoff and bulk transfer
 */

pub mod bulk;
pub mod handoff;
pub mod request_response;
pub mod session;
pub mod streaming;

// Re-export for convenience
pub use bulk::{fibonacci, ProducerSummary, RecordConsumer, RecordProducer};
pub use handoff::{accept_fifo, offer_fifo, receive_capability, send_capability};
pub use request_response::{
    default_requests, AddClient, AddRequest, AddResponse, AddServer, ClosePolicy, Exchange,
    ServeSummary,
};
pub use session::{await_signals, read_wire, write_wire};
pub use streaming::{stream_text, ReadShape, StreamConsumer, StreamProducer};
