use std::collections::BTreeMap;

use crate::objects::ObjectId;

/// One row of a cross-reference table or stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// The slot is free. Records the next free object number and the
    /// generation to use if the slot is ever reused.
    Free {
        next_free: u32,
        next_generation: u16,
    },
    /// The object lives uncompressed at an absolute byte offset.
    InUse { offset: u64, generation: u16 },
    /// The object lives inside an object stream, addressed by its
    /// zero-based index within that stream's payload.
    Compressed { container: u32, index: u32 },
}

impl XrefEntry {
    pub fn is_free(&self) -> bool {
        matches!(self, XrefEntry::Free { .. })
    }

    /// The generation under which this entry is keyed in the merged map.
    /// Compressed objects always have generation zero.
    pub(crate) fn keyed_generation(&self) -> u16 {
        match self {
            XrefEntry::Free { next_generation, .. } => *next_generation,
            XrefEntry::InUse { generation, .. } => *generation,
            XrefEntry::Compressed { .. } => 0,
        }
    }
}

/// A contiguous run of entries starting at a first object number.
#[derive(Debug, Clone, PartialEq)]
pub struct XrefSubsection {
    pub start: u32,
    pub entries: Vec<XrefEntry>,
}

/// One cross-reference table (or stream) as found in the file. A document
/// with incremental updates contains several; the merged view is built by
/// [`merge_xref_tables`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XrefTable {
    pub subsections: Vec<XrefSubsection>,
}

impl XrefTable {
    pub fn new() -> Self {
        XrefTable::default()
    }

    /// All `(object number, entry)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, XrefEntry)> + '_ {
        self.subsections.iter().flat_map(|section| {
            section
                .entries
                .iter()
                .enumerate()
                .map(move |(idx, entry)| (section.start + idx as u32, *entry))
        })
    }

    /// Total number of entries across subsections.
    pub fn len(&self) -> usize {
        self.subsections.iter().map(|s| s.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Merges the update tables into a single mapping keyed by object number
/// and generation. `tables` is ordered most recent first, the way the
/// `Prev` chain is walked; newer entries shadow older ones.
pub fn merge_xref_tables(tables: &[XrefTable]) -> BTreeMap<ObjectId, XrefEntry> {
    let mut merged = BTreeMap::new();
    for table in tables.iter().rev() {
        for (number, entry) in table.iter() {
            merged.insert((number, entry.keyed_generation()), entry);
        }
    }
    merged
}
