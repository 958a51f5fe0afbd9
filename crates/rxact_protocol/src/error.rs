//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Input ended before the structure was complete.
    #[error("truncated message: {context}")]
    Truncated {
        /// What was being read when input ran out.
        context: &'static str,
    },

    /// Unrecognized relation entry tag.
    #[error("unknown relation tag: 0x{0:02x}")]
    UnknownTag(u8),

    /// The declared section length does not match the bytes present.
    #[error("section length mismatch: declared {declared} bytes, consumed {consumed}")]
    LengthMismatch {
        /// Length declared in the message.
        declared: usize,
        /// Bytes actually consumed by entries.
        consumed: usize,
    },

    /// Bytes remain after the structure was fully decoded.
    #[error("trailing bytes after message: {0} left over")]
    TrailingBytes(usize),

    /// A relation appeared more than once in one message.
    #[error("duplicate relation entry: {0}")]
    DuplicateRelation(u32),

    /// A text field was not valid UTF-8.
    #[error("invalid UTF-8 in {context}")]
    InvalidUtf8 {
        /// The field that failed to decode.
        context: &'static str,
    },
}

impl ProtocolError {
    /// Creates a truncation error for the given read context.
    #[must_use]
    pub const fn truncated(context: &'static str) -> Self {
        Self::Truncated { context }
    }
}
