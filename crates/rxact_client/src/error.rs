//! Error types for the certification client.
//!
//! None of these errors ever reach the host transaction path: the session
//! and hooks degrade every certifier-side failure to best effort. The types
//! exist for the transport seam and for tests.

use rxact_protocol::ProtocolError;
use std::io;
use thiserror::Error;

/// Result type for client operations.
pub type CertifierResult<T> = Result<T, CertifierError>;

/// Errors that can occur while talking to the certifier.
#[derive(Debug, Error)]
pub enum CertifierError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The certifier's session-start reply was not the streaming ack.
    #[error("handshake rejected: {0}")]
    Handshake(String),

    /// Operation requires an established session.
    #[error("not connected to certifier")]
    NotConnected,

    /// Wire format error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CertifierError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } => *retryable,
            Self::Io(_) => true,
            Self::NotConnected => true,
            Self::Handshake(_) | Self::Protocol(_) => false,
        }
    }
}
