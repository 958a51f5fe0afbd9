//! Session-start handshake.
//!
//! Opening a certifier session is a single fixed exchange: the client writes
//! a [`start_request`] and the certifier answers with one reply byte. Only a
//! [`StartReply::Streaming`] reply puts the session into the bidirectional
//! streaming state that read-set messages require; anything else is a
//! handshake failure.

/// Protocol version this crate speaks.
pub const PROTOCOL_VERSION: u8 = 1;

/// Magic bytes opening a session-start request.
pub const START_MAGIC: [u8; 4] = *b"RXST";

/// Builds the session-start request: magic plus the protocol version.
#[must_use]
pub const fn start_request(version: u8) -> [u8; 5] {
    [
        START_MAGIC[0],
        START_MAGIC[1],
        START_MAGIC[2],
        START_MAGIC[3],
        version,
    ]
}

/// Reply byte indicating the certifier entered streaming mode.
const REPLY_STREAMING: u8 = b'S';

/// The certifier's answer to a session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartReply {
    /// The certifier acknowledged and entered bidirectional streaming.
    Streaming,
    /// Any other reply byte; the session must not proceed.
    Rejected(u8),
}

impl StartReply {
    /// Interprets the certifier's reply byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            REPLY_STREAMING => Self::Streaming,
            other => Self::Rejected(other),
        }
    }

    /// Returns the wire byte for this reply.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Streaming => REPLY_STREAMING,
            Self::Rejected(byte) => byte,
        }
    }

    /// Returns true if the session may proceed.
    #[must_use]
    pub const fn is_streaming(self) -> bool {
        matches!(self, Self::Streaming)
    }
}
