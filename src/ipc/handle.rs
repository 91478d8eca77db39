/*!
 * Handles
 * Transferable capabilities: any endpoint that can ride inside a channel message
 */

use crate::core::errors::TransportResult;
use crate::core::types::{Deadline, Koid, Signals};
use crate::ipc::channel::Channel;
use crate::ipc::core::Waitable;
use crate::ipc::fifo::Fifo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of object a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    Channel,
    Fifo,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel => write!(f, "channel"),
            Self::Fifo => write!(f, "fifo"),
        }
    }
}

/// An owned endpoint of any kind
///
/// Writing a handle into a channel moves it out of the sender; reading the
/// message moves it into the receiver. Dropping a handle closes the endpoint.
pub enum Handle {
    Channel(Channel),
    Fifo(Fifo),
}

impl Handle {
    #[inline]
    pub fn kind(&self) -> HandleKind {
        match self {
            Self::Channel(_) => HandleKind::Channel,
            Self::Fifo(_) => HandleKind::Fifo,
        }
    }

    /// Take the fifo out, or give the handle back unchanged
    pub fn into_fifo(self) -> Result<Fifo, Handle> {
        match self {
            Self::Fifo(fifo) => Ok(fifo),
            other => Err(other),
        }
    }

    /// Take the channel out, or give the handle back unchanged
    pub fn into_channel(self) -> Result<Channel, Handle> {
        match self {
            Self::Channel(channel) => Ok(channel),
            other => Err(other),
        }
    }

    fn as_waitable(&self) -> &dyn Waitable {
        match self {
            Self::Channel(channel) => channel,
            Self::Fifo(fifo) => fifo,
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(channel) => channel.fmt(f),
            Self::Fifo(fifo) => fifo.fmt(f),
        }
    }
}

impl From<Channel> for Handle {
    fn from(channel: Channel) -> Self {
        Self::Channel(channel)
    }
}

impl From<Fifo> for Handle {
    fn from(fifo: Fifo) -> Self {
        Self::Fifo(fifo)
    }
}

impl Waitable for Handle {
    fn koid(&self) -> Koid {
        self.as_waitable().koid()
    }

    fn related_koid(&self) -> Koid {
        self.as_waitable().related_koid()
    }

    fn signals(&self) -> TransportResult<Signals> {
        self.as_waitable().signals()
    }

    fn wait_one(&self, interest: Signals, deadline: Deadline) -> TransportResult<Signals> {
        self.as_waitable().wait_one(interest, deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_fifo_returns_mismatch() {
        let (a, _b) = Channel::create();
        let handle = Handle::from(a);
        assert_eq!(handle.kind(), HandleKind::Channel);

        let handle = handle.into_fifo().unwrap_err();
        assert!(handle.into_channel().is_ok());
    }

    #[test]
    fn test_handle_dispatches_waitable() {
        let (a, b) = Fifo::create(8, 8).unwrap();
        let koid = a.koid();
        let handle = Handle::from(a);
        assert_eq!(handle.koid(), koid);
        assert_eq!(handle.related_koid(), b.koid());
        assert_eq!(handle.signals().unwrap(), Signals::WRITABLE);
    }
}
