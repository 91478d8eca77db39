/*!
 * IPC Core Module
 * Core IPC types and traits
 */

pub mod traits;
pub(crate) mod types;

// Re-export for convenience
pub use traits::*;
pub(crate) use types::Side;
