//! Binary codec for the read/write-set message.
//!
//! Layout (all integers network byte order):
//!
//! ```text
//! dbid(4) xid(4) read_section_len(4)
//! entry*: tag(1) relid(4) nitems(4) [csn(4) if tag 'T'] items
//! item:   'I' -> block(4) csn(4)
//!         'T' -> block(4) slot(2)
//! ```
//!
//! `read_section_len` is the byte length of everything after it. The encoder
//! reserves the field and patches it by absolute offset once all entries are
//! written.

use crate::error::{ProtocolError, ProtocolResult};
use crate::read_set::{
    IndexReadSet, PageRead, RelationReadSet, TableReadSet, TransactionReadSet, TupleRead,
};
use crate::types::{BlockNumber, Csn, DatabaseId, RelationId, SlotNumber, TransactionId};

/// Tag byte for an index relation entry.
const TAG_INDEX: u8 = b'I';
/// Tag byte for a table relation entry.
const TAG_TABLE: u8 = b'T';

/// Byte offset of the read-section length field within a message.
const SECTION_LEN_OFFSET: usize = 8;

/// Encodes a read set into one self-describing message.
#[must_use]
pub fn encode(read_set: &TransactionReadSet) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);

    buf.extend_from_slice(&read_set.database_id.as_u32().to_be_bytes());
    buf.extend_from_slice(&read_set.transaction_id.as_u32().to_be_bytes());

    // Reserved; patched below once the section size is known.
    buf.extend_from_slice(&0u32.to_be_bytes());

    for entry in read_set.relations() {
        match entry {
            RelationReadSet::Index(index) => {
                buf.push(TAG_INDEX);
                buf.extend_from_slice(&index.relation_id.as_u32().to_be_bytes());
                buf.extend_from_slice(&(index.pages.len() as u32).to_be_bytes());
                for page in &index.pages {
                    buf.extend_from_slice(&page.block.as_u32().to_be_bytes());
                    buf.extend_from_slice(&page.csn.as_u32().to_be_bytes());
                }
            }
            RelationReadSet::Table(table) => {
                buf.push(TAG_TABLE);
                buf.extend_from_slice(&table.relation_id.as_u32().to_be_bytes());
                buf.extend_from_slice(&(table.tuples.len() as u32).to_be_bytes());
                buf.extend_from_slice(&table.scan_csn.as_u32().to_be_bytes());
                for tuple in &table.tuples {
                    buf.extend_from_slice(&tuple.block.as_u32().to_be_bytes());
                    buf.extend_from_slice(&tuple.slot.as_u16().to_be_bytes());
                }
            }
        }
    }

    let section_len = (buf.len() - SECTION_LEN_OFFSET - 4) as u32;
    buf[SECTION_LEN_OFFSET..SECTION_LEN_OFFSET + 4].copy_from_slice(&section_len.to_be_bytes());

    buf
}

/// Decodes a message back into an equivalent [`TransactionReadSet`].
pub fn decode(bytes: &[u8]) -> ProtocolResult<TransactionReadSet> {
    let mut cursor = 0usize;

    let read_u8 = |cursor: &mut usize, context: &'static str| -> ProtocolResult<u8> {
        let b = *bytes
            .get(*cursor)
            .ok_or(ProtocolError::truncated(context))?;
        *cursor += 1;
        Ok(b)
    };

    let read_u16 = |cursor: &mut usize, context: &'static str| -> ProtocolResult<u16> {
        if *cursor + 2 > bytes.len() {
            return Err(ProtocolError::truncated(context));
        }
        let value = u16::from_be_bytes(
            bytes[*cursor..*cursor + 2]
                .try_into()
                .map_err(|_| ProtocolError::truncated(context))?,
        );
        *cursor += 2;
        Ok(value)
    };

    let read_u32 = |cursor: &mut usize, context: &'static str| -> ProtocolResult<u32> {
        if *cursor + 4 > bytes.len() {
            return Err(ProtocolError::truncated(context));
        }
        let value = u32::from_be_bytes(
            bytes[*cursor..*cursor + 4]
                .try_into()
                .map_err(|_| ProtocolError::truncated(context))?,
        );
        *cursor += 4;
        Ok(value)
    };

    let database_id = DatabaseId::new(read_u32(&mut cursor, "header dbid")?);
    let transaction_id = TransactionId::new(read_u32(&mut cursor, "header xid")?);
    let section_len = read_u32(&mut cursor, "read section length")? as usize;

    let section_end = cursor
        .checked_add(section_len)
        .filter(|end| *end <= bytes.len())
        .ok_or(ProtocolError::truncated("read section"))?;

    let mut read_set = TransactionReadSet::new(database_id);
    read_set.transaction_id = transaction_id;

    while cursor < section_end {
        let tag = read_u8(&mut cursor, "entry tag")?;
        let relation_id = RelationId::new(read_u32(&mut cursor, "entry relation id")?);
        let item_count = read_u32(&mut cursor, "entry item count")? as usize;

        let entry = match tag {
            TAG_INDEX => {
                let mut pages = Vec::with_capacity(item_count.min(1024));
                for _ in 0..item_count {
                    let block = BlockNumber::new(read_u32(&mut cursor, "page block")?);
                    let csn = Csn::new(read_u32(&mut cursor, "page csn")?);
                    pages.push(PageRead { block, csn });
                }
                RelationReadSet::Index(IndexReadSet { relation_id, pages })
            }
            TAG_TABLE => {
                let scan_csn = Csn::new(read_u32(&mut cursor, "table csn")?);
                let mut tuples = Vec::with_capacity(item_count.min(1024));
                for _ in 0..item_count {
                    let block = BlockNumber::new(read_u32(&mut cursor, "tuple block")?);
                    let slot = SlotNumber::new(read_u16(&mut cursor, "tuple slot")?);
                    tuples.push(TupleRead { block, slot });
                }
                RelationReadSet::Table(TableReadSet {
                    relation_id,
                    scan_csn,
                    tuples,
                })
            }
            other => return Err(ProtocolError::UnknownTag(other)),
        };

        read_set
            .insert(entry)
            .map_err(|rel| ProtocolError::DuplicateRelation(rel.as_u32()))?;
    }

    if cursor != section_end {
        return Err(ProtocolError::LengthMismatch {
            declared: section_len,
            consumed: cursor - SECTION_LEN_OFFSET - 4,
        });
    }
    if cursor != bytes.len() {
        return Err(ProtocolError::TrailingBytes(bytes.len() - cursor));
    }

    Ok(read_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_set() -> TransactionReadSet {
        let mut set = TransactionReadSet::new(DatabaseId::new(9));
        let table = set.ensure_table(RelationId::new(1)).unwrap();
        table.scan_csn = Csn::PLACEHOLDER;
        table.tuples.push(TupleRead {
            block: BlockNumber::new(0),
            slot: SlotNumber::new(1),
        });
        set.ensure_index(RelationId::new(10))
            .unwrap()
            .pages
            .push(PageRead {
                block: BlockNumber::new(5),
                csn: Csn::PLACEHOLDER,
            });
        set
    }

    #[test]
    fn empty_set_layout() {
        let set = TransactionReadSet::new(DatabaseId::new(7));
        let bytes = encode(&set);

        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &7u32.to_be_bytes());
        assert_eq!(&bytes[4..8], &0u32.to_be_bytes());
        assert_eq!(&bytes[8..12], &0u32.to_be_bytes());
    }

    #[test]
    fn section_length_is_patched() {
        let bytes = encode(&sample_set());

        let declared = u32::from_be_bytes(bytes[8..12].try_into().unwrap()) as usize;
        assert_eq!(declared, bytes.len() - 12);
    }

    #[test]
    fn table_entry_layout() {
        let mut set = TransactionReadSet::new(DatabaseId::new(1));
        let table = set.ensure_table(RelationId::new(2)).unwrap();
        table.tuples.push(TupleRead {
            block: BlockNumber::new(3),
            slot: SlotNumber::new(4),
        });

        let bytes = encode(&set);
        // tag relid nitems csn block slot
        assert_eq!(bytes[12], b'T');
        assert_eq!(&bytes[13..17], &2u32.to_be_bytes());
        assert_eq!(&bytes[17..21], &1u32.to_be_bytes());
        assert_eq!(&bytes[21..25], &0u32.to_be_bytes());
        assert_eq!(&bytes[25..29], &3u32.to_be_bytes());
        assert_eq!(&bytes[29..31], &4u16.to_be_bytes());
    }

    #[test]
    fn roundtrip_sample() {
        let set = sample_set();
        let decoded = decode(&encode(&set)).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn index_scenario_roundtrip() {
        let mut set = TransactionReadSet::new(DatabaseId::new(1));
        let pages = &mut set.ensure_index(RelationId::new(10)).unwrap().pages;
        pages.push(PageRead {
            block: BlockNumber::new(5),
            csn: Csn::PLACEHOLDER,
        });
        pages.push(PageRead {
            block: BlockNumber::new(6),
            csn: Csn::PLACEHOLDER,
        });

        let decoded = decode(&encode(&set)).unwrap();
        let entry = decoded.relation(RelationId::new(10)).unwrap();
        assert_eq!(entry.item_count(), 2);
        match entry {
            RelationReadSet::Index(index) => {
                assert_eq!(index.pages[0].block.as_u32(), 5);
                assert_eq!(index.pages[1].block.as_u32(), 6);
                assert!(index.pages.iter().all(|p| p.csn == Csn::PLACEHOLDER));
            }
            RelationReadSet::Table(_) => panic!("expected index entry"),
        }
    }

    #[test]
    fn truncated_header() {
        assert!(matches!(
            decode(&[0, 0, 0]),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn truncated_section() {
        let mut bytes = encode(&sample_set());
        bytes.truncate(bytes.len() - 1);
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn unknown_tag_rejected() {
        let mut bytes = encode(&sample_set());
        bytes[12] = b'X';
        assert!(matches!(decode(&bytes), Err(ProtocolError::UnknownTag(b'X'))));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = encode(&sample_set());
        bytes.push(0xff);
        assert!(matches!(
            decode(&bytes),
            Err(ProtocolError::TrailingBytes(1))
        ));
    }

    fn arb_read_set() -> impl Strategy<Value = TransactionReadSet> {
        let tuple = (any::<u32>(), any::<u16>()).prop_map(|(b, s)| TupleRead {
            block: BlockNumber::new(b),
            slot: SlotNumber::new(s),
        });
        let page = (any::<u32>(), any::<u32>()).prop_map(|(b, c)| PageRead {
            block: BlockNumber::new(b),
            csn: Csn::new(c),
        });

        let table = (any::<u32>(), proptest::bool::ANY, proptest::collection::vec(tuple, 0..8));
        let index = (any::<u32>(), proptest::collection::vec(page, 0..8));

        (
            any::<u32>(),
            proptest::collection::vec(table, 0..4),
            proptest::collection::vec(index, 0..4),
        )
            .prop_map(|(dbid, tables, indexes)| {
                let mut set = TransactionReadSet::new(DatabaseId::new(dbid));
                for (relid, scanned, tuples) in tables {
                    if let Some(entry) = set.ensure_table(RelationId::new(relid)) {
                        if scanned {
                            entry.scan_csn = Csn::PLACEHOLDER;
                        }
                        entry.tuples.extend(tuples);
                    }
                }
                for (relid, pages) in indexes {
                    if let Some(entry) = set.ensure_index(RelationId::new(relid)) {
                        entry.pages.extend(pages);
                    }
                }
                set
            })
    }

    proptest! {
        #[test]
        fn roundtrip_law(set in arb_read_set()) {
            let decoded = decode(&encode(&set)).unwrap();
            prop_assert_eq!(decoded, set);
        }
    }
}
