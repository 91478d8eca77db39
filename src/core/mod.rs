/*!
 * Core Module
 * Fundamental types, limits, guards, synchronization and error handling
 */

pub mod errors;
pub mod guard;
pub mod limits;
pub mod sync;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use guard::{Guard, GuardError, GuardMetadata, GuardResult};
pub use types::*;
