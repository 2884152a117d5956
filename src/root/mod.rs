//! Session root: caches, policy, and primitive navigation
//!
//! A `Root` wraps one open reader session and owns everything shared
//! across the nodes derived from it:
//!
//! - the identity cache (offset -> sticky payload),
//! - the parent-pointer cache (offset -> parent offset, hint only),
//! - the stickiness policy,
//! - the compilation-unit cursor mirroring the reader's stateful
//!   unit-iteration API.
//!
//! All interior mutability is `RefCell`; a root and its nodes belong to
//! one thread. Navigation primitives (`parent`, `first_child`,
//! `next_sibling`) live here so every traversal strategy shares one
//! cache-aware implementation.

mod lookup;

use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;
use tracing::{debug, trace};

use crate::adapter::{AdapterError, Attribute, EntryRef, Offset, ReaderAdapter, UnitHeader};
use crate::error::{Error, Result};
use crate::node::{Node, ROOT_OFFSET};
use crate::payload::{Payload, PayloadDetail, StickyPolicy};

/// Bound on remembered parent links. Eviction is harmless; a miss
/// falls back to recomputation by traversal.
const PARENT_CACHE_CAP: usize = 8192;

/// Stateful compilation-unit cursor, replayed on rewind.
struct UnitCursor {
    /// Unit the reader is currently positioned on, if any
    current: Option<Offset>,
    /// Every header seen so far, keyed by unit root offset
    headers: HashMap<Offset, UnitHeader>,
}

/// One reader session and the caches scoped to it.
pub struct Root<A: ReaderAdapter> {
    adapter: RefCell<A>,
    sticky: RefCell<HashMap<Offset, Rc<Payload<A::Entry>>>>,
    parent_of: RefCell<LruCache<Offset, Offset>>,
    cursor: RefCell<UnitCursor>,
    policy: StickyPolicy,
}

impl<A: ReaderAdapter> Root<A> {
    pub fn new(adapter: A) -> Self {
        Self::with_policy(adapter, StickyPolicy::new())
    }

    pub fn with_policy(adapter: A, policy: StickyPolicy) -> Self {
        let cap = NonZeroUsize::new(PARENT_CACHE_CAP).unwrap_or(NonZeroUsize::MIN);
        Root {
            adapter: RefCell::new(adapter),
            sticky: RefCell::new(HashMap::new()),
            parent_of: RefCell::new(LruCache::new(cap)),
            cursor: RefCell::new(UnitCursor {
                current: None,
                headers: HashMap::new(),
            }),
            policy,
        }
    }

    /// The root sentinel node, depth 0.
    pub fn begin(&self) -> Node<'_, A> {
        Node::at_root(self)
    }

    #[inline]
    pub fn policy(&self) -> &StickyPolicy {
        &self.policy
    }

    // === Identity cache ===

    pub(crate) fn sticky_payload(&self, offset: Offset) -> Option<Rc<Payload<A::Entry>>> {
        self.sticky.borrow().get(&offset).cloned()
    }

    pub(crate) fn register_sticky(&self, payload: Rc<Payload<A::Entry>>) {
        trace!(offset = payload.offset(), "registering sticky payload");
        self.sticky.borrow_mut().insert(payload.offset(), payload);
    }

    /// Number of payloads held by the identity cache.
    pub fn sticky_count(&self) -> usize {
        self.sticky.borrow().len()
    }

    // === Parent cache ===

    pub(crate) fn remember_parent(&self, child: Offset, parent: Offset) {
        self.parent_of.borrow_mut().put(child, parent);
    }

    pub(crate) fn cached_parent(&self, child: Offset) -> Option<Offset> {
        self.parent_of.borrow_mut().get(&child).copied()
    }

    // === Unit cursor ===

    fn clear_cu_context(&self) -> Result<()> {
        self.adapter
            .borrow_mut()
            .reset_units()
            .map_err(|e| self.fault(ROOT_OFFSET, e))?;
        self.cursor.borrow_mut().current = None;
        Ok(())
    }

    fn advance_cu_context(&self) -> Result<Option<UnitHeader>> {
        let header = self
            .adapter
            .borrow_mut()
            .advance_unit()
            .map_err(|e| self.fault(ROOT_OFFSET, e))?;
        if let Some(h) = header {
            let mut cur = self.cursor.borrow_mut();
            cur.current = Some(h.offset);
            cur.headers.insert(h.offset, h);
        }
        Ok(header)
    }

    /// Position the reader on the unit rooted at `target`.
    ///
    /// The adapter's unit API is strictly sequential, so rewinding
    /// replays advances from the start. O(units), paid only on unit
    /// switches. Returns false when no unit has that root offset.
    fn set_cu_context(&self, target: Offset) -> Result<bool> {
        if self.cursor.borrow().current == Some(target) {
            return Ok(true);
        }
        debug!(unit = target, "replaying unit cursor");
        self.clear_cu_context()?;
        while let Some(h) = self.advance_cu_context()? {
            if h.offset == target {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Header of the unit rooted at `unit_offset`.
    pub fn unit_header(&self, unit_offset: Offset) -> Result<UnitHeader> {
        if let Some(h) = self.cursor.borrow().headers.get(&unit_offset) {
            return Ok(*h);
        }
        if self.set_cu_context(unit_offset)? {
            if let Some(h) = self.cursor.borrow().headers.get(&unit_offset) {
                return Ok(*h);
            }
        }
        Err(Error::UnknownUnit(unit_offset))
    }

    // === Reader access ===

    fn fault(&self, offset: Offset, source: AdapterError) -> Error {
        Error::Adapter { offset, source }
    }

    pub(crate) fn entry_attrs(&self, entry: &A::Entry) -> Result<Vec<Attribute>> {
        self.adapter
            .borrow_mut()
            .attributes(entry)
            .map_err(|e| self.fault(entry.offset(), e))
    }

    pub(crate) fn payload_detail(
        &self,
        tag: crate::tag::Tag,
        offset: Offset,
    ) -> Result<PayloadDetail> {
        if tag.is_unit() {
            Ok(PayloadDetail::Unit(self.unit_header(offset)?))
        } else {
            Ok(PayloadDetail::General)
        }
    }

    /// Wrap a fresh reader handle in a node, routing sticky entries
    /// through the identity cache so they come back already promoted.
    fn adopt_entry(&self, entry: A::Entry, depth: u16) -> Result<Node<'_, A>> {
        let offset = entry.offset();
        if let Some(p) = self.sticky_payload(offset) {
            return Ok(Node::cached(p, depth, self));
        }
        let tag = entry.tag();
        if self.policy.is_sticky(tag) {
            let detail = self.payload_detail(tag, offset)?;
            let payload = crate::payload::make_payload(entry, detail);
            self.register_sticky(payload.clone());
            return Ok(Node::cached(payload, depth, self));
        }
        Ok(Node::ephemeral(entry, depth, self))
    }

    // === Primitive navigation ===

    /// First child of `it`. From the root sentinel this is the first
    /// unit's root entry; absence is the end sentinel.
    pub fn first_child<'r>(&'r self, it: &Node<'r, A>) -> Result<Node<'r, A>> {
        assert!(!it.is_end_position(), "navigation from end position");
        if it.is_root_position() {
            self.clear_cu_context()?;
            if self.advance_cu_context()?.is_none() {
                return Ok(Node::end());
            }
            let first = self
                .adapter
                .borrow_mut()
                .first_entry()
                .map_err(|e| self.fault(ROOT_OFFSET, e))?;
            return match first {
                Some(e) => {
                    self.remember_parent(e.offset(), ROOT_OFFSET);
                    self.adopt_entry(e, 1)
                }
                None => Ok(Node::end()),
            };
        }
        let parent_offset = it.offset();
        let child = self
            .adapter
            .borrow_mut()
            .child(it.entry())
            .map_err(|e| self.fault(parent_offset, e))?;
        match child {
            Some(c) => {
                debug_assert!(c.offset() > parent_offset, "child offset must follow parent");
                self.remember_parent(c.offset(), parent_offset);
                self.adopt_entry(c, it.depth() + 1)
            }
            None => Ok(Node::end()),
        }
    }

    /// Next sibling of `it`. At unit level this crosses to the next
    /// unit's root entry; the root sentinel has no siblings.
    pub fn next_sibling<'r>(&'r self, it: &Node<'r, A>) -> Result<Node<'r, A>> {
        assert!(!it.is_end_position(), "navigation from end position");
        if it.is_root_position() {
            return Ok(Node::end());
        }
        if it.depth() == 1 {
            // unit roots are siblings of each other under the sentinel
            if !self.set_cu_context(it.unit_offset())? {
                return Err(Error::UnknownUnit(it.unit_offset()));
            }
            if self.advance_cu_context()?.is_none() {
                return Ok(Node::end());
            }
            let first = self
                .adapter
                .borrow_mut()
                .first_entry()
                .map_err(|e| self.fault(ROOT_OFFSET, e))?;
            return match first {
                Some(e) => {
                    self.remember_parent(e.offset(), ROOT_OFFSET);
                    self.adopt_entry(e, 1)
                }
                None => Ok(Node::end()),
            };
        }
        let here = it.offset();
        let sib = self
            .adapter
            .borrow_mut()
            .sibling(it.entry())
            .map_err(|e| self.fault(here, e))?;
        match sib {
            Some(s) => {
                debug_assert!(s.offset() > here, "sibling offset must follow entry");
                if let Some(p) = self.cached_parent(here) {
                    self.remember_parent(s.offset(), p);
                }
                self.adopt_entry(s, it.depth())
            }
            None => Ok(Node::end()),
        }
    }

    /// Parent of `it`. Consults the parent cache; a miss recomputes by
    /// re-finding the entry, which repopulates the cache along the way.
    /// The parent of a unit root is the root sentinel; the sentinel
    /// itself has no parent (end).
    pub fn parent<'r>(&'r self, it: &Node<'r, A>) -> Result<Node<'r, A>> {
        assert!(!it.is_end_position(), "navigation from end position");
        if it.is_root_position() {
            return Ok(Node::end());
        }
        let offset = it.offset();
        if let Some(p) = self.cached_parent(offset) {
            return if p == ROOT_OFFSET {
                Ok(self.begin())
            } else {
                self.pos(p, it.depth() - 1, None)
            };
        }
        debug!(offset, "parent cache miss, recomputing by traversal");
        let _ = self.find(offset)?;
        match self.cached_parent(offset) {
            Some(p) if p == ROOT_OFFSET => Ok(self.begin()),
            Some(p) => self.pos(p, it.depth() - 1, None),
            None => Ok(Node::end()),
        }
    }

    /// Linear scan over `parent`'s direct children for one named
    /// `name`. Fallback path for nodes with no name index.
    pub(crate) fn find_named_child<'r>(
        &'r self,
        parent: &Node<'r, A>,
        name: &str,
    ) -> Result<Node<'r, A>> {
        let mut cur = self.first_child(parent)?;
        while !cur.is_end_position() {
            if cur.name()?.as_deref() == Some(name) {
                return Ok(cur);
            }
            cur = self.next_sibling(&cur)?;
        }
        Ok(Node::end())
    }
}
