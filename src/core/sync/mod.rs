/*!
 * Synchronization Primitives
 *
 * Condvar-backed wait/notify for kernel object state. `wait` on a transport
 * endpoint is the only place a session ever blocks, and it always blocks
 * here.
 */

mod signal;

pub use signal::{SignalCell, WaitError, WaitResult};
