//! # rxact Client
//!
//! Client-side half of the remote certification protocol.
//!
//! This crate provides:
//! - `ReadSetCollector` accumulating per-relation read evidence
//! - `CertifierSession` managing the persistent certifier connection
//! - `TransactionHooks`, the five-operation contract the host engine calls
//! - Transport abstraction with TCP and mock implementations
//! - The durable-log append seam for logical messages
//!
//! ## Key invariants
//!
//! - One relation entry per transaction; the entry's kind never changes
//! - Tuples written by the current transaction are never collected
//! - Certifier unavailability degrades to best effort; it never blocks or
//!   fails a local commit

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collector;
mod config;
mod durable_log;
mod error;
mod hooks;
mod session;
mod transport;

pub use collector::{ReadSetCollector, RelationRef};
pub use config::CertifierConfig;
pub use durable_log::{DurableLog, LogPosition, MemoryLog};
pub use error::{CertifierError, CertifierResult};
pub use hooks::{CertifiedHooks, NoopHooks, TransactionHooks};
pub use session::{CertifierSession, SessionState};
pub use transport::{
    CertifierTransport, Connect, MockConnector, MockTransport, TcpConnector, TcpTransport,
};
