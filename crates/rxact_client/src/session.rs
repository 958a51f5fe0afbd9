//! Certifier session management.
//!
//! One session exists per worker process for the lifetime of the process.
//! It is established lazily, reused across transactions, and re-established
//! on the next use after any detected transport failure. No failure here is
//! ever surfaced to the transaction: shipping the read set is best effort.

use crate::error::{CertifierError, CertifierResult};
use crate::transport::{CertifierTransport, Connect};
use tracing::{debug, info, warn};

/// Connection state of the certifier session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No channel; the next `ensure_connected` will attempt one.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The streaming session is established.
    Connected,
}

/// The per-worker connection to the remote certifier.
pub struct CertifierSession<C: Connect> {
    endpoint: String,
    connector: C,
    transport: Option<C::Transport>,
    state: SessionState,
}

impl<C: Connect> CertifierSession<C> {
    /// Creates a disconnected session for the given endpoint.
    pub fn new(endpoint: impl Into<String>, connector: C) -> Self {
        Self {
            endpoint: endpoint.into(),
            connector,
            transport: None,
            state: SessionState::Disconnected,
        }
    }

    /// Returns the current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Ensures an established streaming session, connecting if necessary.
    ///
    /// Returns false when no session could be established; the session stays
    /// `Disconnected` and the next call retries. There is no internal retry
    /// loop.
    pub fn ensure_connected(&mut self) -> bool {
        if self.state == SessionState::Connected {
            match &self.transport {
                Some(transport) if transport.is_broken() => {
                    info!(endpoint = %self.endpoint, "certifier connection broken, reconnecting");
                    self.drop_channel();
                }
                Some(_) => {
                    debug!(endpoint = %self.endpoint, "reusing certifier connection");
                    return true;
                }
                None => self.state = SessionState::Disconnected,
            }
        }

        self.state = SessionState::Connecting;
        match self.establish() {
            Ok(transport) => {
                info!(endpoint = %self.endpoint, "connected to certifier");
                self.transport = Some(transport);
                self.state = SessionState::Connected;
                true
            }
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "could not establish certifier session");
                self.state = SessionState::Disconnected;
                false
            }
        }
    }

    /// Connects and runs the session-start handshake. A reply other than
    /// streaming is a [`CertifierError::Handshake`].
    fn establish(&mut self) -> CertifierResult<C::Transport> {
        let mut transport = self.connector.connect(&self.endpoint)?;
        match transport.start_session() {
            Ok(reply) if reply.is_streaming() => Ok(transport),
            Ok(reply) => {
                transport.close();
                Err(CertifierError::Handshake(format!(
                    "unexpected session-start reply 0x{:02x}",
                    reply.as_byte()
                )))
            }
            Err(e) => {
                transport.close();
                Err(e)
            }
        }
    }

    /// Sends one framed message over the established session.
    ///
    /// Requires a prior successful `ensure_connected`; calling without one is
    /// a safe no-op. A failed send drops the channel and returns false; the
    /// message is not retried.
    pub fn send(&mut self, bytes: &[u8]) -> bool {
        if self.state != SessionState::Connected {
            warn!(error = %CertifierError::NotConnected, "dropping read/write set");
            return false;
        }

        let Some(transport) = self.transport.as_mut() else {
            self.state = SessionState::Disconnected;
            return false;
        };

        match transport.send(bytes) {
            Ok(()) => true,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "failed to send read/write set");
                self.drop_channel();
                false
            }
        }
    }

    fn drop_channel(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.state = SessionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockConnector;
    use rxact_protocol::StartReply;

    fn session(connector: &MockConnector) -> CertifierSession<MockConnector> {
        CertifierSession::new("mock://certifier", connector.clone())
    }

    #[test]
    fn connects_and_reuses() {
        let connector = MockConnector::new();
        let mut session = session(&connector);

        assert!(session.ensure_connected());
        assert!(session.ensure_connected());
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(connector.connect_attempts(), 1);
    }

    #[test]
    fn connect_failure_stays_disconnected() {
        let connector = MockConnector::new();
        connector.refuse_connections(true);
        let mut session = session(&connector);

        assert!(!session.ensure_connected());
        assert_eq!(session.state(), SessionState::Disconnected);

        // No automatic retry loop: the next call attempts again.
        connector.refuse_connections(false);
        assert!(session.ensure_connected());
        assert_eq!(connector.connect_attempts(), 2);
    }

    #[test]
    fn rejected_handshake_stays_disconnected() {
        let connector = MockConnector::new();
        connector.set_start_reply(StartReply::Rejected(b'E'));
        let mut session = session(&connector);

        assert!(!session.ensure_connected());
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn broken_channel_reconnects() {
        let connector = MockConnector::new();
        let mut session = session(&connector);

        assert!(session.ensure_connected());
        connector.break_channel(true);

        assert!(session.ensure_connected());
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(connector.connect_attempts(), 2);
    }

    #[test]
    fn send_requires_connection() {
        let connector = MockConnector::new();
        let mut session = session(&connector);

        assert!(!session.send(&[1, 2, 3]));
        assert!(connector.sent_frames().is_empty());
    }

    #[test]
    fn failed_send_drops_channel() {
        let connector = MockConnector::new();
        let mut session = session(&connector);

        assert!(session.ensure_connected());
        connector.fail_sends(true);

        assert!(!session.send(&[0xab]));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn successful_send() {
        let connector = MockConnector::new();
        let mut session = session(&connector);

        assert!(session.ensure_connected());
        assert!(session.send(&[0xab, 0xcd]));
        assert_eq!(connector.sent_frames(), vec![vec![0xab, 0xcd]]);
    }
}
