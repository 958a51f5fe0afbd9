//! Logical messages for the durable log.
//!
//! The host engine can persist arbitrary named binary blobs through its
//! durable log so they reach standby nodes via replication. This module
//! defines the record payload: a prefix naming the producer and an opaque
//! payload, plus whether the record is tied to the writing transaction's
//! commit or emitted immediately.

use crate::error::{ProtocolError, ProtocolResult};
use crate::types::DatabaseId;

/// One named binary blob bound for the durable log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalMessage {
    /// Database the message was emitted from.
    pub database_id: DatabaseId,
    /// True if the record becomes visible only when the emitting
    /// transaction commits; false for immediate emission.
    pub transactional: bool,
    /// Namespace prefix identifying the producer.
    pub prefix: String,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
}

impl LogicalMessage {
    /// Creates a transactional message.
    #[must_use]
    pub fn transactional(
        database_id: DatabaseId,
        prefix: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            database_id,
            transactional: true,
            prefix: prefix.into(),
            payload,
        }
    }

    /// Creates a non-transactional (immediate) message.
    #[must_use]
    pub fn immediate(
        database_id: DatabaseId,
        prefix: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            database_id,
            transactional: false,
            prefix: prefix.into(),
            payload,
        }
    }

    /// Serializes the record payload.
    #[must_use]
    pub fn encode_payload(&self) -> Vec<u8> {
        let prefix = self.prefix.as_bytes();
        let mut buf = Vec::with_capacity(13 + prefix.len() + self.payload.len());

        buf.extend_from_slice(&self.database_id.as_u32().to_le_bytes());
        buf.push(u8::from(self.transactional));
        buf.extend_from_slice(&(prefix.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(prefix);
        buf.extend_from_slice(&self.payload);

        buf
    }

    /// Deserializes a record payload.
    pub fn decode_payload(bytes: &[u8]) -> ProtocolResult<Self> {
        if bytes.len() < 13 {
            return Err(ProtocolError::truncated("logical message header"));
        }

        let database_id = DatabaseId::new(u32::from_le_bytes(
            bytes[0..4]
                .try_into()
                .map_err(|_| ProtocolError::truncated("logical message dbid"))?,
        ));
        let transactional = bytes[4] != 0;
        let prefix_len = u32::from_le_bytes(
            bytes[5..9]
                .try_into()
                .map_err(|_| ProtocolError::truncated("logical message prefix length"))?,
        ) as usize;
        let payload_len = u32::from_le_bytes(
            bytes[9..13]
                .try_into()
                .map_err(|_| ProtocolError::truncated("logical message payload length"))?,
        ) as usize;

        let body_end = 13usize
            .checked_add(prefix_len)
            .and_then(|n| n.checked_add(payload_len))
            .ok_or(ProtocolError::truncated("logical message body"))?;
        if body_end != bytes.len() {
            if body_end > bytes.len() {
                return Err(ProtocolError::truncated("logical message body"));
            }
            return Err(ProtocolError::TrailingBytes(bytes.len() - body_end));
        }

        let prefix = std::str::from_utf8(&bytes[13..13 + prefix_len])
            .map_err(|_| ProtocolError::InvalidUtf8 {
                context: "logical message prefix",
            })?
            .to_string();
        let payload = bytes[13 + prefix_len..body_end].to_vec();

        Ok(Self {
            database_id,
            transactional,
            prefix,
            payload,
        })
    }
}
