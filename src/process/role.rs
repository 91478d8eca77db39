/*!
 * Roles
 * Which side of a session a thread of control plays
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a two-party session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Creates the channel and starts the peer
    Parent,
    /// Started with one channel endpoint in its startup handles
    Child,
}

impl Role {
    /// Console tag carried by every line this role logs
    #[inline]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Parent => "[PARENT]",
            Self::Child => "[CHILD]",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert_eq!(Role::Parent.to_string(), "[PARENT]");
        assert_eq!(Role::Child.prefix(), "[CHILD]");
    }
}
