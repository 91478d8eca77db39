/*!
 * Channel Message Codecs
 * Fixed-layout wire types and the data/capability envelope
 */

use crate::core::errors::{SessionError, SessionResult};
use crate::core::limits::TEXT_MESSAGE_LENGTH;
use crate::ipc::handle::Handle;
use std::borrow::Cow;

pub(crate) mod sealed {
    /// Raw encoding for a `WireFormat` type
    ///
    /// Slices are exactly `WIRE_SIZE` bytes; only `to_wire` and `from_wire`
    /// call these, after checking the length.
    pub trait Codec {
        fn write_to(&self, out: &mut [u8]);
        fn read_from(bytes: &[u8]) -> Self;
    }
}

/// A fixed-size, fixed-layout message body
///
/// Encoding is native-endian with no padding beyond natural alignment, so
/// the bytes match the `#[repr(C)]` struct exactly.
pub trait WireFormat: sealed::Codec + Sized {
    /// Exact payload size in bytes
    const WIRE_SIZE: usize;

    /// Name used in decode errors
    const NAME: &'static str;

    fn to_wire(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::WIRE_SIZE];
        self.write_to(&mut out);
        out
    }

    /// Decode a payload, rejecting any size other than `WIRE_SIZE`
    fn from_wire(bytes: &[u8]) -> SessionResult<Self> {
        if bytes.len() != Self::WIRE_SIZE {
            return Err(SessionError::Decode {
                what: Self::NAME,
                expected: Self::WIRE_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self::read_from(bytes))
    }
}

/// Streaming text message: 32 bytes, NUL padded
///
/// Text longer than the buffer is truncated, in which case the buffer carries
/// no terminating NUL.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextMessage([u8; TEXT_MESSAGE_LENGTH]);

impl TextMessage {
    pub fn new(text: &str) -> Self {
        let mut buf = [0u8; TEXT_MESSAGE_LENGTH];
        let len = text.len().min(TEXT_MESSAGE_LENGTH);
        buf[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self(buf)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; TEXT_MESSAGE_LENGTH] {
        &self.0
    }

    /// Text up to the first NUL, or the whole buffer if there is none
    pub fn text(&self) -> Cow<'_, str> {
        let end = self
            .0
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(TEXT_MESSAGE_LENGTH);
        String::from_utf8_lossy(&self.0[..end])
    }
}

impl std::fmt::Debug for TextMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TextMessage").field(&self.text()).finish()
    }
}

impl WireFormat for TextMessage {
    const WIRE_SIZE: usize = TEXT_MESSAGE_LENGTH;
    const NAME: &'static str = "text message";
}

impl sealed::Codec for TextMessage {
    fn write_to(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.0);
    }

    fn read_from(bytes: &[u8]) -> Self {
        let mut buf = [0u8; TEXT_MESSAGE_LENGTH];
        buf.copy_from_slice(bytes);
        Self(buf)
    }
}

/// Expected shape of a message at a given protocol step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    DataOnly,
    WithCapability,
}

/// A channel message, split by whether it carries a capability
#[derive(Debug)]
pub enum Envelope {
    Data(Vec<u8>),
    WithCapability { data: Vec<u8>, capability: Handle },
}

impl Envelope {
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::Data(_) => EnvelopeKind::DataOnly,
            Self::WithCapability { .. } => EnvelopeKind::WithCapability,
        }
    }

    /// Classify a received message against the shape the protocol expects
    ///
    /// A data-only step must carry no handles; a capability step exactly one.
    /// Anything else is a malformed handoff and every handle received is
    /// released.
    pub fn decode(data: &[u8], handles: Vec<Handle>, expected: EnvelopeKind) -> SessionResult<Self> {
        let count = handles.len();
        let mut handles = handles.into_iter();

        match (expected, handles.next()) {
            (EnvelopeKind::DataOnly, None) => Ok(Self::Data(data.to_vec())),
            (EnvelopeKind::WithCapability, Some(capability)) if count == 1 => {
                Ok(Self::WithCapability {
                    data: data.to_vec(),
                    capability,
                })
            }
            (EnvelopeKind::DataOnly, Some(_)) => Err(SessionError::MalformedHandoff {
                handles: count,
                reason: "unexpected capability on a data-only message",
            }),
            (EnvelopeKind::WithCapability, None) => Err(SessionError::MalformedHandoff {
                handles: 0,
                reason: "no capability attached",
            }),
            (EnvelopeKind::WithCapability, Some(_)) => Err(SessionError::MalformedHandoff {
                handles: count,
                reason: "more than one capability attached",
            }),
        }
    }

    /// Split into the payload and handle list `Channel::write` takes
    pub fn into_parts(self) -> (Vec<u8>, Vec<Handle>) {
        match self {
            Self::Data(data) => (data, Vec::new()),
            Self::WithCapability { data, capability } => (data, vec![capability]),
        }
    }
}
