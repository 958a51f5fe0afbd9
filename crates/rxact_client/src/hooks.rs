//! Collection hooks: the contract the host transaction manager calls.
//!
//! The host registers one [`TransactionHooks`] implementation and invokes
//! it during query execution (tuple/scan/page hooks), on abort
//! (`transaction_cleanup`) and once per committing transaction
//! (`pre_commit_finalize`). [`CertifiedHooks`] is the concrete
//! implementation; it orchestrates the collector, the codec and the session
//! and contains no protocol logic of its own.

use crate::collector::{ReadSetCollector, RelationRef};
use crate::config::CertifierConfig;
use crate::session::CertifierSession;
use crate::transport::{Connect, TcpConnector};
use rxact_protocol::{decode, encode, BlockNumber, TransactionId, TupleRead};
use tracing::debug;

/// The five-operation contract between the host engine and this core, plus
/// the call telling the core which transaction id is the current one.
pub trait TransactionHooks {
    /// The host starts a transaction with the given id.
    fn set_current_transaction(&mut self, xid: TransactionId);

    /// The executor read a table tuple last written by `writer`.
    fn tuple_read(&mut self, relation: &RelationRef, tuple: TupleRead, writer: TransactionId);

    /// The executor began a full scan of a relation.
    fn scan_start(&mut self, relation: &RelationRef);

    /// The executor accessed an index page.
    fn index_page_read(&mut self, relation: &RelationRef, block: BlockNumber);

    /// The transaction aborted or is being cleaned up.
    fn transaction_cleanup(&mut self);

    /// The transaction is about to commit; ship the read set.
    fn pre_commit_finalize(&mut self);
}

/// Hooks that collect read evidence and ship it to the remote certifier.
pub struct CertifiedHooks<C: Connect> {
    active: bool,
    collector: ReadSetCollector,
    session: CertifierSession<C>,
}

impl<C: Connect> CertifiedHooks<C> {
    /// Creates hooks for the configured endpoint. With an inactive config
    /// every operation is a no-op and no connection is ever attempted.
    pub fn new(config: &CertifierConfig, connector: C) -> Self {
        Self {
            active: config.is_active(),
            collector: ReadSetCollector::new(),
            session: CertifierSession::new(config.endpoint.clone(), connector),
        }
    }

    /// The accumulated read set, for inspection.
    #[must_use]
    pub fn collector(&self) -> &ReadSetCollector {
        &self.collector
    }

    /// The underlying session, for inspection.
    #[must_use]
    pub fn session(&self) -> &CertifierSession<C> {
        &self.session
    }
}

impl CertifiedHooks<TcpConnector> {
    /// Creates hooks that reach the certifier over TCP. The connector
    /// carries the config's connect timeout and protocol version.
    #[must_use]
    pub fn over_tcp(config: &CertifierConfig) -> Self {
        Self::new(config, TcpConnector::from_config(config))
    }
}

impl<C: Connect> TransactionHooks for CertifiedHooks<C> {
    fn set_current_transaction(&mut self, xid: TransactionId) {
        if self.active {
            self.collector.set_current_transaction(xid);
        }
    }

    fn tuple_read(&mut self, relation: &RelationRef, tuple: TupleRead, writer: TransactionId) {
        if self.active {
            self.collector.record_table_read(relation, tuple, writer);
        }
    }

    fn scan_start(&mut self, relation: &RelationRef) {
        if self.active {
            self.collector.record_relation_scan_start(relation);
        }
    }

    fn index_page_read(&mut self, relation: &RelationRef, block: BlockNumber) {
        if self.active {
            self.collector.record_index_page_read(relation, block);
        }
    }

    fn transaction_cleanup(&mut self) {
        self.collector.clear();
    }

    fn pre_commit_finalize(&mut self) {
        if !self.active {
            return;
        }

        // Evidence never outlives the finalize attempt: the buffer is
        // consumed before connecting so a failed session cannot leak one
        // transaction's reads into the next.
        let Some(read_set) = self.collector.take() else {
            return;
        };

        if !self.session.ensure_connected() {
            return;
        }

        let bytes = encode(&read_set);
        self.session.send(&bytes);

        // Self-check: decode what was just framed and log it. Purely
        // informational; a failure here never rises above a log line.
        match decode(&bytes) {
            Ok(decoded) => debug!(read_set = %decoded, "sent read/write set"),
            Err(e) => debug!(error = %e, "read/write set self-check decode failed"),
        }
    }
}

/// Hooks registered when certification is disabled; every call is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl TransactionHooks for NoopHooks {
    fn set_current_transaction(&mut self, _xid: TransactionId) {}

    fn tuple_read(&mut self, _relation: &RelationRef, _tuple: TupleRead, _writer: TransactionId) {}

    fn scan_start(&mut self, _relation: &RelationRef) {}

    fn index_page_read(&mut self, _relation: &RelationRef, _block: BlockNumber) {}

    fn transaction_cleanup(&mut self) {}

    fn pre_commit_finalize(&mut self) {}
}
