//! Reader adapter boundary
//!
//! The engine consumes raw entry handles from an external reader that
//! decodes the on-disk format. The adapter contract:
//! - absence ("no such entry") is `Ok(None)`, never an error
//! - decode/I/O faults are `Err(AdapterError)`
//! - unit enumeration is stateful: a sequential cursor, no random access
//!
//! Handles returned by an adapter are single-owner and non-shareable;
//! sharing happens one level up, after promotion to a cached payload.

pub mod memory;

use crate::tag::{AttrId, Tag};

/// Position identifier for an entry within a root's address space.
///
/// Offsets are unique and order-preserving: every descendant's offset is
/// strictly greater than its ancestor's, and strictly less than the
/// offset of any entry after the subtree in document order. Offset 0 is
/// reserved for the root sentinel.
pub type Offset = u64;

/// Attribute value as decoded by the reader.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    String(String),
    Unsigned(u64),
    Signed(i64),
    Flag(bool),
    Address(u64),
    /// Reference to another entry, by offset
    Ref(Offset),
    Bytes(Vec<u8>),
}

/// One attribute on an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub id: AttrId,
    pub value: AttrValue,
}

impl Attribute {
    pub fn new(id: AttrId, value: AttrValue) -> Self {
        Self { id, value }
    }
}

/// Header of one compilation unit, as produced by the unit cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitHeader {
    /// Offset of the unit's root entry
    pub offset: Offset,
    pub version: u16,
    pub address_size: u8,
    pub offset_size: u8,
    pub header_length: u64,
    pub abbrev_offset: u64,
    /// Offset of the next unit's root entry, if any
    pub next_unit: Option<Offset>,
}

/// Fault reported by a reader adapter, distinct from absence.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The backing structure is malformed at the given offset.
    #[error("malformed entry data at {offset:#x}: {reason}")]
    Decode { offset: Offset, reason: String },

    /// The backing store could not be read.
    #[error("backing store read failed")]
    Io(#[from] std::io::Error),
}

/// Cheap queries carried by an entry handle itself.
///
/// No `Clone` bound: handles are single-owner resources. Anything that
/// needs a second view of the same entry goes through promotion or a
/// fresh `entry_at_offset` call.
pub trait EntryRef: std::fmt::Debug {
    /// Offset of this entry
    fn offset(&self) -> Offset;
    /// Category tag of this entry
    fn tag(&self) -> Tag;
    /// Offset of the enclosing compilation unit's root entry
    fn unit_offset(&self) -> Offset;
}

/// The external reader session the engine navigates through.
///
/// One session per root; sessions hold their own state (unit cursor,
/// last-error channel) and must not be shared across threads.
pub trait ReaderAdapter {
    type Entry: EntryRef;

    /// First entry of the current unit (requires a positioned cursor).
    fn first_entry(&mut self) -> Result<Option<Self::Entry>, AdapterError>;

    /// First child of an entry.
    fn child(&mut self, entry: &Self::Entry) -> Result<Option<Self::Entry>, AdapterError>;

    /// Next sibling of an entry, within the same unit.
    fn sibling(&mut self, entry: &Self::Entry) -> Result<Option<Self::Entry>, AdapterError>;

    /// Entry at an exact offset, in any unit.
    fn entry_at_offset(&mut self, offset: Offset) -> Result<Option<Self::Entry>, AdapterError>;

    /// Ordered attribute list of an entry.
    fn attributes(&mut self, entry: &Self::Entry) -> Result<Vec<Attribute>, AdapterError>;

    /// Advance the unit cursor; `None` when units are exhausted.
    fn advance_unit(&mut self) -> Result<Option<UnitHeader>, AdapterError>;

    /// Rewind the unit cursor to before the first unit.
    fn reset_units(&mut self) -> Result<(), AdapterError>;
}
