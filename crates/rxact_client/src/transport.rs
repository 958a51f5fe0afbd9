//! Transport layer abstraction for the certifier session.
//!
//! The session talks to the certifier through the [`CertifierTransport`]
//! trait so tests can substitute a fake transport for the real TCP stream.

use crate::config::CertifierConfig;
use crate::error::{CertifierError, CertifierResult};
use rxact_protocol::{start_request, StartReply, PROTOCOL_VERSION};
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One established channel to the certifier.
pub trait CertifierTransport: Send {
    /// Performs the session-start handshake and returns the certifier's
    /// reply.
    fn start_session(&mut self) -> CertifierResult<StartReply>;

    /// Writes one framed message and flushes the channel.
    fn send(&mut self, bytes: &[u8]) -> CertifierResult<()>;

    /// Returns true if the channel is known to be broken.
    fn is_broken(&self) -> bool;

    /// Closes the channel. Dropping has the same effect.
    fn close(&mut self);
}

/// Opens transports to a configured endpoint.
pub trait Connect: Send {
    /// The transport type this connector produces.
    type Transport: CertifierTransport;

    /// Opens a new channel to `endpoint`.
    fn connect(&self, endpoint: &str) -> CertifierResult<Self::Transport>;
}

/// Blocking TCP transport.
pub struct TcpTransport {
    stream: TcpStream,
    start_request: [u8; 5],
    broken: bool,
}

impl TcpTransport {
    fn mark_broken<T>(&mut self, result: std::io::Result<T>) -> CertifierResult<T> {
        result.map_err(|e| {
            self.broken = true;
            CertifierError::from(e)
        })
    }
}

impl CertifierTransport for TcpTransport {
    fn start_session(&mut self) -> CertifierResult<StartReply> {
        let request = self.start_request;
        let write = self
            .stream
            .write_all(&request)
            .and_then(|()| self.stream.flush());
        self.mark_broken(write)?;

        let mut reply = [0u8; 1];
        let read = self.stream.read_exact(&mut reply);
        self.mark_broken(read)?;

        Ok(StartReply::from_byte(reply[0]))
    }

    fn send(&mut self, bytes: &[u8]) -> CertifierResult<()> {
        let write = self
            .stream
            .write_all(bytes)
            .and_then(|()| self.stream.flush());
        self.mark_broken(write)
    }

    fn is_broken(&self) -> bool {
        if self.broken {
            return true;
        }
        // A socket error latched by the kernel also counts.
        matches!(self.stream.take_error(), Ok(Some(_)) | Err(_))
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        self.broken = true;
    }
}

/// Connector producing [`TcpTransport`] channels.
pub struct TcpConnector {
    connect_timeout: Duration,
    protocol_version: u8,
}

impl TcpConnector {
    /// Creates a connector with the given connect timeout, speaking
    /// [`PROTOCOL_VERSION`].
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            protocol_version: PROTOCOL_VERSION,
        }
    }

    /// Creates a connector carrying the config's timeout and version.
    #[must_use]
    pub fn from_config(config: &CertifierConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            protocol_version: config.protocol_version,
        }
    }
}

impl Connect for TcpConnector {
    type Transport = TcpTransport;

    fn connect(&self, endpoint: &str) -> CertifierResult<TcpTransport> {
        let mut last_error = None;
        for addr in endpoint.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    return Ok(TcpTransport {
                        stream,
                        start_request: start_request(self.protocol_version),
                        broken: false,
                    });
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(match last_error {
            Some(e) => CertifierError::from(e),
            None => CertifierError::transport_fatal(format!(
                "endpoint resolved to no addresses: {endpoint}"
            )),
        })
    }
}

/// Shared state behind a [`MockConnector`] and its transports.
///
/// Tests keep the connector (or a clone of it) and inspect or script this
/// state while the session owns the transport.
#[derive(Debug, Default)]
struct MockState {
    connect_refused: AtomicBool,
    connect_attempts: AtomicUsize,
    start_reply_byte: Mutex<u8>,
    broken: AtomicBool,
    fail_sends: AtomicBool,
    sent: Mutex<Vec<Vec<u8>>>,
}

/// A scripted in-memory transport for tests.
pub struct MockTransport {
    state: Arc<MockState>,
}

impl CertifierTransport for MockTransport {
    fn start_session(&mut self) -> CertifierResult<StartReply> {
        if self.state.broken.load(Ordering::SeqCst) {
            return Err(CertifierError::transport_retryable("mock channel broken"));
        }
        let byte = *self.state.start_reply_byte.lock().unwrap();
        Ok(StartReply::from_byte(byte))
    }

    fn send(&mut self, bytes: &[u8]) -> CertifierResult<()> {
        if self.state.broken.load(Ordering::SeqCst) || self.state.fail_sends.load(Ordering::SeqCst)
        {
            return Err(CertifierError::transport_retryable("mock send failure"));
        }
        self.state.sent.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    fn is_broken(&self) -> bool {
        self.state.broken.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.state.broken.store(true, Ordering::SeqCst);
    }
}

/// Connector producing [`MockTransport`] channels over shared scripted state.
#[derive(Clone)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Creates a connector whose transports accept sessions and sends.
    #[must_use]
    pub fn new() -> Self {
        let state = MockState {
            start_reply_byte: Mutex::new(StartReply::Streaming.as_byte()),
            ..MockState::default()
        };
        Self {
            state: Arc::new(state),
        }
    }

    /// Makes subsequent connection attempts fail.
    pub fn refuse_connections(&self, refused: bool) {
        self.state.connect_refused.store(refused, Ordering::SeqCst);
    }

    /// Scripts the reply byte for session starts.
    pub fn set_start_reply(&self, reply: StartReply) {
        *self.state.start_reply_byte.lock().unwrap() = reply.as_byte();
    }

    /// Marks the current channel as broken.
    pub fn break_channel(&self, broken: bool) {
        self.state.broken.store(broken, Ordering::SeqCst);
    }

    /// Makes sends fail without breaking the channel.
    pub fn fail_sends(&self, fail: bool) {
        self.state.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Number of connection attempts made so far.
    #[must_use]
    pub fn connect_attempts(&self) -> usize {
        self.state.connect_attempts.load(Ordering::SeqCst)
    }

    /// Frames sent through any transport of this connector.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.state.sent.lock().unwrap().clone()
    }
}

impl Connect for MockConnector {
    type Transport = MockTransport;

    fn connect(&self, _endpoint: &str) -> CertifierResult<MockTransport> {
        self.state.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.connect_refused.load(Ordering::SeqCst) {
            return Err(CertifierError::transport_retryable("mock connect refused"));
        }
        // A fresh channel is not broken even if the previous one was.
        self.state.broken.store(false, Ordering::SeqCst);
        Ok(MockTransport {
            state: Arc::clone(&self.state),
        })
    }
}
