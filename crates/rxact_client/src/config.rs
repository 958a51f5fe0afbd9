//! Configuration for the certification client.

use rxact_protocol::PROTOCOL_VERSION;
use std::time::Duration;

/// Configuration for the certifier connection.
///
/// The endpoint is the one required parameter, read once at worker start.
/// An empty endpoint deactivates the whole subsystem: every collection hook
/// becomes a no-op and no connection is ever attempted.
#[derive(Debug, Clone)]
pub struct CertifierConfig {
    /// Certifier endpoint address, e.g. `127.0.0.1:10000`.
    pub endpoint: String,
    /// Timeout for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Protocol version byte sent in the session-start request.
    pub protocol_version: u8,
}

impl CertifierConfig {
    /// Creates a configuration for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: Duration::from_secs(10),
            protocol_version: PROTOCOL_VERSION,
        }
    }

    /// Creates a configuration with certification disabled.
    #[must_use]
    pub fn inactive() -> Self {
        Self::new("")
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns true if certification is active (endpoint configured).
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.endpoint.is_empty()
    }
}

impl Default for CertifierConfig {
    fn default() -> Self {
        Self::inactive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = CertifierConfig::new("127.0.0.1:10000")
            .with_connect_timeout(Duration::from_secs(3));

        assert!(config.is_active());
        assert_eq!(config.endpoint, "127.0.0.1:10000");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.protocol_version, PROTOCOL_VERSION);
    }

    #[test]
    fn empty_endpoint_is_inactive() {
        assert!(!CertifierConfig::inactive().is_active());
        assert!(!CertifierConfig::default().is_active());
    }
}
