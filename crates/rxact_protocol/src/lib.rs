//! # rxact Protocol
//!
//! Wire formats for remote transaction certification.
//!
//! This crate provides:
//! - Newtype identifiers shared with the host engine
//! - `TransactionReadSet` / `RelationReadSet` for per-transaction read evidence
//! - The self-describing binary read/write-set message codec
//! - The session-start handshake bytes
//! - `LogicalMessage` records for the durable-log collaborator
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod error;
mod handshake;
mod logical;
mod read_set;
mod types;

pub use codec::{decode, encode};
pub use error::{ProtocolError, ProtocolResult};
pub use handshake::{start_request, StartReply, PROTOCOL_VERSION, START_MAGIC};
pub use logical::LogicalMessage;
pub use read_set::{
    IndexReadSet, PageRead, RelationKind, RelationReadSet, TableReadSet, TransactionReadSet,
    TupleRead,
};
pub use types::{BlockNumber, Csn, DatabaseId, RelationId, SlotNumber, TransactionId};
