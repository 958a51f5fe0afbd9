//! Durable-log append seam.
//!
//! The host engine persists logical messages through its write-ahead log so
//! they survive crashes and reach standby nodes through replication. This
//! core only consumes the append primitive; replica streaming and recovery
//! live entirely on the host side.

use crate::error::CertifierResult;
use rxact_protocol::LogicalMessage;
use std::fmt;

/// Position of an appended record in the durable log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPosition(pub u64);

impl LogPosition {
    /// Creates a new log position.
    #[must_use]
    pub const fn new(pos: u64) -> Self {
        Self(pos)
    }

    /// Returns the raw position.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lsn:{}", self.0)
    }
}

/// Append-and-optionally-flush primitive exposed by the host's log.
pub trait DurableLog {
    /// Appends an encoded logical message, optionally forcing it to stable
    /// storage, and returns the position of the record.
    fn append(&mut self, message: &LogicalMessage, flush: bool) -> CertifierResult<LogPosition>;
}

/// In-memory log for tests and embedding; positions are byte offsets of
/// the encoded records.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Vec<(LogPosition, Vec<u8>)>,
    next_position: u64,
    flushed_to: u64,
}

impl MemoryLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of appended records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position everything up to which has been flushed.
    #[must_use]
    pub fn flushed_to(&self) -> LogPosition {
        LogPosition::new(self.flushed_to)
    }

    /// Decodes the record at the given position, if present.
    #[must_use]
    pub fn record_at(&self, position: LogPosition) -> Option<LogicalMessage> {
        self.records
            .iter()
            .find(|(pos, _)| *pos == position)
            .and_then(|(_, bytes)| LogicalMessage::decode_payload(bytes).ok())
    }
}

impl DurableLog for MemoryLog {
    fn append(&mut self, message: &LogicalMessage, flush: bool) -> CertifierResult<LogPosition> {
        let bytes = message.encode_payload();
        let position = LogPosition::new(self.next_position);

        self.next_position += bytes.len() as u64;
        self.records.push((position, bytes));
        if flush {
            self.flushed_to = self.next_position;
        }

        Ok(position)
    }
}
