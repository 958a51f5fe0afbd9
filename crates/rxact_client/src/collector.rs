//! Per-transaction read-set collection.

use rxact_protocol::{
    BlockNumber, Csn, DatabaseId, RelationId, TransactionId, TransactionReadSet, TupleRead,
};
use tracing::debug;

/// Host-supplied descriptor of the relation an access touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationRef {
    /// Database the relation belongs to.
    pub database_id: DatabaseId,
    /// The relation's identifier.
    pub relation_id: RelationId,
    /// True if the relation is an index.
    pub is_index: bool,
}

impl RelationRef {
    /// Creates a table descriptor.
    #[must_use]
    pub const fn table(database_id: DatabaseId, relation_id: RelationId) -> Self {
        Self {
            database_id,
            relation_id,
            is_index: false,
        }
    }

    /// Creates an index descriptor.
    #[must_use]
    pub const fn index(database_id: DatabaseId, relation_id: RelationId) -> Self {
        Self {
            database_id,
            relation_id,
            is_index: true,
        }
    }
}

/// Accumulates one transaction's read evidence.
///
/// The buffer is created lazily on the first `record_*` call and dropped as
/// a unit by [`clear`](Self::clear), which the host issues on abort and
/// cleanup so a stale buffer never crosses transactions. The first record
/// call also captures the owning relation's database id into the header.
#[derive(Debug, Default)]
pub struct ReadSetCollector {
    current_xid: TransactionId,
    buffer: Option<TransactionReadSet>,
}

impl ReadSetCollector {
    /// Creates a collector with no active buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_xid: TransactionId::INVALID,
            buffer: None,
        }
    }

    /// Tells the collector which transaction id is "ours", so tuples we
    /// wrote ourselves are excluded from collection. The host sets this at
    /// transaction start.
    pub fn set_current_transaction(&mut self, xid: TransactionId) {
        self.current_xid = xid;
    }

    /// Records one observed table tuple.
    ///
    /// No-op if the relation is an index or the tuple was written by the
    /// current transaction; local writes need no external certification.
    pub fn record_table_read(
        &mut self,
        relation: &RelationRef,
        tuple: TupleRead,
        writer: TransactionId,
    ) {
        if relation.is_index || writer == self.current_xid {
            return;
        }

        let buffer = self.buffer_for(relation);
        match buffer.ensure_table(relation.relation_id) {
            Some(table) => table.tuples.push(tuple),
            None => debug!(relation = %relation.relation_id, "tuple read on index-classified relation"),
        }
    }

    /// Records that a full scan of the relation occurred. No item is
    /// appended; the scan is marked independently of individual tuple reads.
    pub fn record_relation_scan_start(&mut self, relation: &RelationRef) {
        let buffer = self.buffer_for(relation);
        match buffer.ensure_table(relation.relation_id) {
            Some(table) => table.scan_csn = Csn::PLACEHOLDER,
            None => debug!(relation = %relation.relation_id, "scan start on index-classified relation"),
        }
    }

    /// Records one observed index page.
    pub fn record_index_page_read(&mut self, relation: &RelationRef, block: BlockNumber) {
        let buffer = self.buffer_for(relation);
        match buffer.ensure_index(relation.relation_id) {
            Some(index) => index.pages.push(rxact_protocol::PageRead {
                block,
                csn: Csn::PLACEHOLDER,
            }),
            None => debug!(relation = %relation.relation_id, "page read on table-classified relation"),
        }
    }

    /// Drops the buffer. Idempotent.
    pub fn clear(&mut self) {
        self.buffer = None;
    }

    /// Returns the accumulated read set, if any record call has happened.
    #[must_use]
    pub fn read_set(&self) -> Option<&TransactionReadSet> {
        self.buffer.as_ref()
    }

    /// Takes the accumulated read set, leaving the collector uninitialized.
    #[must_use]
    pub fn take(&mut self) -> Option<TransactionReadSet> {
        self.buffer.take()
    }

    fn buffer_for(&mut self, relation: &RelationRef) -> &mut TransactionReadSet {
        let buffer = self
            .buffer
            .get_or_insert_with(|| TransactionReadSet::new(relation.database_id));
        // Assumed invariant for the transaction's lifetime.
        buffer.database_id = relation.database_id;
        buffer
    }
}

#[cfg(test)]
pub(crate) fn tuple(block: u32, slot: u16) -> TupleRead {
    TupleRead {
        block: BlockNumber::new(block),
        slot: rxact_protocol::SlotNumber::new(slot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxact_protocol::RelationKind;

    #[test]
    fn lazy_initialization_captures_database() {
        let mut collector = ReadSetCollector::new();
        assert!(collector.read_set().is_none());

        let rel = RelationRef::table(DatabaseId::new(6), RelationId::new(1));
        collector.record_table_read(&rel, tuple(0, 1), TransactionId::new(5));

        let set = collector.read_set().unwrap();
        assert_eq!(set.database_id, DatabaseId::new(6));
        assert_eq!(set.transaction_id, TransactionId::INVALID);
    }

    #[test]
    fn self_written_tuple_is_excluded() {
        let mut collector = ReadSetCollector::new();
        collector.set_current_transaction(TransactionId::new(999));

        let rel = RelationRef::table(DatabaseId::new(1), RelationId::new(42));
        collector.record_table_read(&rel, tuple(7, 3), TransactionId::new(999));

        // Nothing was collected; the buffer was not even initialized.
        assert!(collector.read_set().is_none());
    }

    #[test]
    fn foreign_tuple_is_collected() {
        let mut collector = ReadSetCollector::new();
        collector.set_current_transaction(TransactionId::new(1));

        let rel = RelationRef::table(DatabaseId::new(1), RelationId::new(1));
        collector.record_table_read(&rel, tuple(0, 1), TransactionId::new(5));

        let entry = collector
            .read_set()
            .unwrap()
            .relation(RelationId::new(1))
            .unwrap();
        assert_eq!(entry.item_count(), 1);
    }

    #[test]
    fn index_relation_ref_is_ignored_for_tuples() {
        let mut collector = ReadSetCollector::new();
        let rel = RelationRef::index(DatabaseId::new(1), RelationId::new(9));

        collector.record_table_read(&rel, tuple(1, 1), TransactionId::new(2));
        assert!(collector.read_set().is_none());
    }

    #[test]
    fn one_entry_per_relation() {
        let mut collector = ReadSetCollector::new();
        let rel = RelationRef::table(DatabaseId::new(1), RelationId::new(3));

        collector.record_relation_scan_start(&rel);
        collector.record_table_read(&rel, tuple(1, 1), TransactionId::new(7));
        collector.record_table_read(&rel, tuple(1, 2), TransactionId::new(8));

        let set = collector.read_set().unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.relation(RelationId::new(3)).unwrap().item_count(), 2);
    }

    #[test]
    fn scan_start_marks_without_items() {
        let mut collector = ReadSetCollector::new();
        let rel = RelationRef::table(DatabaseId::new(1), RelationId::new(4));

        collector.record_relation_scan_start(&rel);

        let entry = collector
            .read_set()
            .unwrap()
            .relation(RelationId::new(4))
            .unwrap();
        assert_eq!(entry.kind(), RelationKind::Table);
        assert_eq!(entry.item_count(), 0);
    }

    #[test]
    fn kind_is_stable_across_operations() {
        let mut collector = ReadSetCollector::new();
        let db = DatabaseId::new(1);
        let as_index = RelationRef::index(db, RelationId::new(8));
        let as_table = RelationRef::table(db, RelationId::new(8));

        collector.record_index_page_read(&as_index, BlockNumber::new(1));
        collector.record_relation_scan_start(&as_table);
        collector.record_table_read(&as_table, tuple(2, 2), TransactionId::new(3));

        let entry = collector
            .read_set()
            .unwrap()
            .relation(RelationId::new(8))
            .unwrap();
        assert_eq!(entry.kind(), RelationKind::Index);
        assert_eq!(entry.item_count(), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut collector = ReadSetCollector::new();
        let rel = RelationRef::table(DatabaseId::new(1), RelationId::new(1));
        collector.record_relation_scan_start(&rel);

        collector.clear();
        assert!(collector.read_set().is_none());
        collector.clear();
        assert!(collector.read_set().is_none());
    }
}
