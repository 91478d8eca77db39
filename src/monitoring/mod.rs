/*!
 * Monitoring
 * Tracing subscriber setup and role-tagged session spans
 */

mod tracer;

pub use tracer::{init_tracing, SessionSpan};
