//! diewalk - Lazy navigation and caching over debug-entry trees
//!
//! Capabilities:
//! A: Dual-representation nodes, ephemeral until promoted (Node)
//! B: Session root with identity and parent caches (Root)
//! C: Offset lookup, direct and ordered-search (pos, find)
//! D: Depth-first / breadth-first / sibling traversal cursors
//! E: Path and lexical-scope name resolution (resolve, scoped_resolve)
//!
//! Entries come from a [`ReaderAdapter`] session; absence is always a
//! sentinel or `Ok(None)`, reader faults surface as [`Error::Adapter`].

pub mod adapter;
pub mod error;
pub mod node;
pub mod payload;
pub mod resolve;
pub mod root;
pub mod tag;
pub mod traverse;

// ============================================================================
// Public surface
// ============================================================================

pub use adapter::memory::{MemoryReader, TreeBuilder};
pub use adapter::{
    AdapterError, AttrValue, Attribute, EntryRef, Offset, ReaderAdapter, UnitHeader,
};
pub use error::{Error, Result};
pub use node::{Node, ROOT_OFFSET};
pub use payload::{Payload, PayloadDetail, StickyPolicy};
pub use resolve::split_path;
pub use root::Root;
pub use tag::{AttrId, Tag};
pub use traverse::{BreadthFirst, DepthFirst, SiblingWalk};
