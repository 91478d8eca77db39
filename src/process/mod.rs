/*!
 * Process Module
 * Roles, startup handles, and launching both sides of a program
 */

pub mod bootstrap;
pub mod role;

// Re-export for convenience
pub use bootstrap::{
    launch, run_child, run_role, HandleSlot, LaunchError, LaunchReport, Program, RoleOutcome,
    RoleReport, StartupHandles,
};
pub use role::Role;
