//! In-memory reader adapter
//!
//! A fully decoded entry tree held in an arena, exposed through the
//! `ReaderAdapter` contract. Used by the test suite and by embedders
//! that already hold a decoded tree. `TreeBuilder` assembles trees with
//! explicit offsets and validates the offset ordering invariant at
//! `finish()` time — a violated invariant is rejected at ingestion, not
//! silently navigated.

use std::collections::{HashMap, HashSet};

use super::{AdapterError, Attribute, AttrValue, EntryRef, Offset, ReaderAdapter, UnitHeader};
use crate::tag::{AttrId, Tag};

const NO_NODE: usize = usize::MAX;

/// One entry in the arena.
#[derive(Debug)]
struct EntryData {
    offset: Offset,
    tag: Tag,
    unit_offset: Offset,
    first_child: usize,
    next_sibling: usize,
    attrs: Vec<Attribute>,
}

/// Single-owner handle to one arena entry.
#[derive(Debug)]
pub struct MemEntry {
    idx: usize,
    offset: Offset,
    tag: Tag,
    unit_offset: Offset,
}

impl EntryRef for MemEntry {
    #[inline]
    fn offset(&self) -> Offset {
        self.offset
    }

    #[inline]
    fn tag(&self) -> Tag {
        self.tag
    }

    #[inline]
    fn unit_offset(&self) -> Offset {
        self.unit_offset
    }
}

/// In-memory reader session over a fixed entry tree.
#[derive(Debug)]
pub struct MemoryReader {
    entries: Vec<EntryData>,
    by_offset: HashMap<Offset, usize>,
    units: Vec<UnitHeader>,
    /// Arena index of each unit's root entry, parallel to `units`
    unit_roots: Vec<usize>,
    /// Unit cursor: `None` = before the first unit, `Some(i)` = at unit
    /// `i` (or exhausted when `i == units.len()`)
    cursor: Option<usize>,
    /// Offsets that fault instead of resolving (testing aid)
    poisoned: HashSet<Offset>,
}

impl MemoryReader {
    /// Start assembling a tree
    pub fn builder() -> TreeBuilder {
        TreeBuilder::new()
    }

    /// Make every access to `offset` report a decode fault.
    ///
    /// Lets callers exercise the fault-propagation path without a
    /// malformed backing file.
    pub fn poison(&mut self, offset: Offset) {
        self.poisoned.insert(offset);
    }

    /// Total number of entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of compilation units
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    fn handle(&self, idx: usize) -> MemEntry {
        let e = &self.entries[idx];
        MemEntry {
            idx,
            offset: e.offset,
            tag: e.tag,
            unit_offset: e.unit_offset,
        }
    }

    fn check(&self, offset: Offset) -> Result<(), AdapterError> {
        if self.poisoned.contains(&offset) {
            Err(AdapterError::Decode {
                offset,
                reason: "poisoned entry".into(),
            })
        } else {
            Ok(())
        }
    }
}

impl ReaderAdapter for MemoryReader {
    type Entry = MemEntry;

    fn first_entry(&mut self) -> Result<Option<MemEntry>, AdapterError> {
        match self.cursor {
            Some(i) if i < self.units.len() => {
                let idx = self.unit_roots[i];
                self.check(self.entries[idx].offset)?;
                Ok(Some(self.handle(idx)))
            }
            _ => Ok(None),
        }
    }

    fn child(&mut self, entry: &MemEntry) -> Result<Option<MemEntry>, AdapterError> {
        self.check(entry.offset)?;
        let idx = self.entries[entry.idx].first_child;
        if idx == NO_NODE {
            return Ok(None);
        }
        self.check(self.entries[idx].offset)?;
        Ok(Some(self.handle(idx)))
    }

    fn sibling(&mut self, entry: &MemEntry) -> Result<Option<MemEntry>, AdapterError> {
        self.check(entry.offset)?;
        let idx = self.entries[entry.idx].next_sibling;
        // unit roots chain to the next unit internally; the contract
        // keeps siblings within one unit
        if idx == NO_NODE || self.entries[idx].unit_offset != entry.unit_offset {
            return Ok(None);
        }
        self.check(self.entries[idx].offset)?;
        Ok(Some(self.handle(idx)))
    }

    fn entry_at_offset(&mut self, offset: Offset) -> Result<Option<MemEntry>, AdapterError> {
        self.check(offset)?;
        Ok(self.by_offset.get(&offset).map(|&idx| self.handle(idx)))
    }

    fn attributes(&mut self, entry: &MemEntry) -> Result<Vec<Attribute>, AdapterError> {
        self.check(entry.offset)?;
        Ok(self.entries[entry.idx].attrs.clone())
    }

    fn advance_unit(&mut self) -> Result<Option<UnitHeader>, AdapterError> {
        let next = match self.cursor {
            None => 0,
            Some(i) => i + 1,
        };
        self.cursor = Some(next.min(self.units.len()));
        if next < self.units.len() {
            Ok(Some(self.units[next]))
        } else {
            Ok(None)
        }
    }

    fn reset_units(&mut self) -> Result<(), AdapterError> {
        self.cursor = None;
        Ok(())
    }
}

/// Identifier for an entry being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryId(usize);

/// Assembles a `MemoryReader` tree with explicit offsets.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    entries: Vec<EntryData>,
    units: Vec<UnitHeader>,
    unit_roots: Vec<usize>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a compilation unit rooted at `offset`, named `name`.
    ///
    /// Header fields get fixed defaults; tests only care about offsets.
    pub fn unit(&mut self, offset: Offset, name: &str) -> EntryId {
        let idx = self.entries.len();
        self.entries.push(EntryData {
            offset,
            tag: Tag::CompileUnit,
            unit_offset: offset,
            first_child: NO_NODE,
            next_sibling: NO_NODE,
            attrs: vec![Attribute::new(AttrId::Name, AttrValue::String(name.into()))],
        });
        if let Some(&prev) = self.unit_roots.last() {
            self.entries[prev].next_sibling = idx;
        }
        self.unit_roots.push(idx);
        self.units.push(UnitHeader {
            offset,
            version: 4,
            address_size: 8,
            offset_size: 4,
            header_length: 7,
            abbrev_offset: 0,
            next_unit: None,
        });
        EntryId(idx)
    }

    /// Add an entry as the last child of `parent`.
    pub fn entry(
        &mut self,
        parent: EntryId,
        offset: Offset,
        tag: Tag,
        name: Option<&str>,
    ) -> EntryId {
        let idx = self.entries.len();
        let unit_offset = self.entries[parent.0].unit_offset;
        let mut attrs = Vec::new();
        if let Some(n) = name {
            attrs.push(Attribute::new(AttrId::Name, AttrValue::String(n.into())));
        }
        self.entries.push(EntryData {
            offset,
            tag,
            unit_offset,
            first_child: NO_NODE,
            next_sibling: NO_NODE,
            attrs,
        });
        // link as last child
        let mut child = self.entries[parent.0].first_child;
        if child == NO_NODE {
            self.entries[parent.0].first_child = idx;
        } else {
            while self.entries[child].next_sibling != NO_NODE {
                child = self.entries[child].next_sibling;
            }
            self.entries[child].next_sibling = idx;
        }
        EntryId(idx)
    }

    /// Attach an extra attribute to an entry.
    pub fn attr(&mut self, id: EntryId, attr: AttrId, value: AttrValue) {
        self.entries[id.0].attrs.push(Attribute::new(attr, value));
    }

    /// Finish assembly, validating the offset ordering invariant.
    ///
    /// Offsets must be strictly increasing in document (preorder) order;
    /// the lookup pruning algorithm depends on this.
    pub fn finish(mut self) -> Result<MemoryReader, AdapterError> {
        // fill next_unit links
        for i in 0..self.units.len() {
            self.units[i].next_unit = self.units.get(i + 1).map(|u| u.offset);
        }

        let mut by_offset = HashMap::with_capacity(self.entries.len());
        let mut last: Option<Offset> = None;

        // preorder over all units; unit roots chain via sibling links,
        // so seeding the first one covers the whole forest
        let mut stack: Vec<usize> = self.unit_roots.first().copied().into_iter().collect();
        let mut visited = 0usize;
        while let Some(idx) = stack.pop() {
            visited += 1;
            let e = &self.entries[idx];
            if e.offset == 0 {
                return Err(AdapterError::Decode {
                    offset: 0,
                    reason: "offset 0 is reserved for the root sentinel".into(),
                });
            }
            if let Some(prev) = last {
                if e.offset <= prev {
                    return Err(AdapterError::Decode {
                        offset: e.offset,
                        reason: format!(
                            "offsets must strictly increase in document order \
                             ({:#x} follows {:#x})",
                            e.offset, prev
                        ),
                    });
                }
            }
            last = Some(e.offset);
            if by_offset.insert(e.offset, idx).is_some() {
                return Err(AdapterError::Decode {
                    offset: e.offset,
                    reason: "duplicate offset".into(),
                });
            }
            if e.next_sibling != NO_NODE {
                stack.push(e.next_sibling);
            }
            if e.first_child != NO_NODE {
                stack.push(e.first_child);
            }
        }
        debug_assert_eq!(visited, self.entries.len());

        Ok(MemoryReader {
            entries: self.entries,
            by_offset,
            units: self.units,
            unit_roots: self.unit_roots,
            cursor: None,
            poisoned: HashSet::new(),
        })
    }
}
