//! Per-transaction read evidence.
//!
//! A [`TransactionReadSet`] accumulates, per relation, the tuples and index
//! pages a transaction observed. The remote certifier uses this evidence to
//! decide whether any observed read was invalidated by a concurrent writer.

use crate::types::{BlockNumber, Csn, DatabaseId, RelationId, SlotNumber, TransactionId};
use std::collections::BTreeMap;
use std::fmt;

/// Whether a relation entry records table tuples or index pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// A heap relation; items are `(block, slot)` tuple locators.
    Table,
    /// An index relation; items are `(block, csn)` page locators.
    Index,
}

/// Locator of one observed table tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupleRead {
    /// Block the tuple lives in.
    pub block: BlockNumber,
    /// Line-pointer slot within the block.
    pub slot: SlotNumber,
}

/// Locator of one observed index page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRead {
    /// The page's block number.
    pub block: BlockNumber,
    /// Watermark for the page; [`Csn::PLACEHOLDER`] today.
    pub csn: Csn,
}

/// Read evidence for one table relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReadSet {
    /// The relation's identifier.
    pub relation_id: RelationId,
    /// Watermark set when a full scan of the relation occurred; zero until
    /// then. A full scan is recorded independently of individual tuple reads.
    pub scan_csn: Csn,
    /// Observed tuple locators, in record order.
    pub tuples: Vec<TupleRead>,
}

/// Read evidence for one index relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReadSet {
    /// The relation's identifier.
    pub relation_id: RelationId,
    /// Observed page locators, in record order.
    pub pages: Vec<PageRead>,
}

/// Read evidence for one relation; the kind is fixed by the first access
/// within a transaction and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationReadSet {
    /// A table relation.
    Table(TableReadSet),
    /// An index relation.
    Index(IndexReadSet),
}

impl RelationReadSet {
    /// Returns the relation's identifier.
    #[must_use]
    pub fn relation_id(&self) -> RelationId {
        match self {
            Self::Table(t) => t.relation_id,
            Self::Index(i) => i.relation_id,
        }
    }

    /// Returns which kind of evidence this entry holds.
    #[must_use]
    pub fn kind(&self) -> RelationKind {
        match self {
            Self::Table(_) => RelationKind::Table,
            Self::Index(_) => RelationKind::Index,
        }
    }

    /// Number of recorded items (tuples for a table, pages for an index).
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self {
            Self::Table(t) => t.tuples.len(),
            Self::Index(i) => i.pages.len(),
        }
    }
}

/// The read set of one transaction: a header plus one entry per relation
/// the transaction observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionReadSet {
    /// Database the transaction runs against; captured from the first
    /// observed relation and assumed invariant for the transaction.
    pub database_id: DatabaseId,
    /// The transaction's identifier; left at [`TransactionId::INVALID`] by
    /// the collection path.
    pub transaction_id: TransactionId,
    relations: BTreeMap<RelationId, RelationReadSet>,
}

impl TransactionReadSet {
    /// Creates an empty read set.
    #[must_use]
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            database_id,
            transaction_id: TransactionId::INVALID,
            relations: BTreeMap::new(),
        }
    }

    /// Returns true if no relation has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Number of relation entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Looks up the entry for a relation, if any.
    #[must_use]
    pub fn relation(&self, relation_id: RelationId) -> Option<&RelationReadSet> {
        self.relations.get(&relation_id)
    }

    /// Iterates over relation entries. Entry order carries no meaning;
    /// consumers must treat the entries as an unordered set.
    pub fn relations(&self) -> impl Iterator<Item = &RelationReadSet> {
        self.relations.values()
    }

    /// Returns the table entry for `relation_id`, creating it on first
    /// access. Returns `None` if the relation was already classified as an
    /// index in this transaction.
    pub fn ensure_table(&mut self, relation_id: RelationId) -> Option<&mut TableReadSet> {
        let entry = self
            .relations
            .entry(relation_id)
            .or_insert_with(|| {
                RelationReadSet::Table(TableReadSet {
                    relation_id,
                    scan_csn: Csn::default(),
                    tuples: Vec::new(),
                })
            });
        match entry {
            RelationReadSet::Table(t) => Some(t),
            RelationReadSet::Index(_) => None,
        }
    }

    /// Returns the index entry for `relation_id`, creating it on first
    /// access. Returns `None` if the relation was already classified as a
    /// table in this transaction.
    pub fn ensure_index(&mut self, relation_id: RelationId) -> Option<&mut IndexReadSet> {
        let entry = self
            .relations
            .entry(relation_id)
            .or_insert_with(|| {
                RelationReadSet::Index(IndexReadSet {
                    relation_id,
                    pages: Vec::new(),
                })
            });
        match entry {
            RelationReadSet::Index(i) => Some(i),
            RelationReadSet::Table(_) => None,
        }
    }

    /// Inserts a decoded entry. Fails if the relation already has one.
    pub(crate) fn insert(&mut self, entry: RelationReadSet) -> Result<(), RelationId> {
        let relation_id = entry.relation_id();
        if self.relations.contains_key(&relation_id) {
            return Err(relation_id);
        }
        self.relations.insert(relation_id, entry);
        Ok(())
    }
}

impl fmt::Display for TransactionReadSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} relations={}",
            self.database_id,
            self.transaction_id,
            self.relations.len()
        )?;
        for entry in self.relations.values() {
            match entry {
                RelationReadSet::Table(t) => {
                    write!(f, " T[{} {} tuples=", t.relation_id, t.scan_csn)?;
                    for (i, tuple) in t.tuples.iter().enumerate() {
                        let sep = if i == 0 { "" } else { "," };
                        write!(f, "{sep}({},{})", tuple.block.as_u32(), tuple.slot.as_u16())?;
                    }
                    write!(f, "]")?;
                }
                RelationReadSet::Index(idx) => {
                    write!(f, " I[{} pages=", idx.relation_id)?;
                    for (i, page) in idx.pages.iter().enumerate() {
                        let sep = if i == 0 { "" } else { "," };
                        write!(f, "{sep}({},{})", page.block.as_u32(), page.csn.as_u32())?;
                    }
                    write!(f, "]")?;
                }
            }
        }
        Ok(())
    }
}
