//! Dual-representation tree node
//!
//! A node is a transient position in the entry tree: the root sentinel,
//! the end sentinel, or a live entry held either as a single-owner
//! ephemeral handle or as a shared reference to a cached payload. Both
//! representations answer the same query contract identically.
//!
//! Promotion (ephemeral -> cached) happens in place and is one-way.
//! Because an ephemeral handle cannot be shared, there is no `Clone`
//! impl: duplicating a node is the explicit, upgrading `duplicate`
//! operation. Moves are always cheap and representation-preserving.

use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::adapter::{Attribute, AttrValue, EntryRef, Offset, ReaderAdapter};
use crate::error::Result;
use crate::payload::Payload;
use crate::root::Root;
use crate::tag::{AttrId, Tag};
use crate::traverse::SiblingWalk;

/// Offset reported for the root sentinel; real entries never use it.
pub const ROOT_OFFSET: Offset = 0;

/// Position and representation of a node.
pub(crate) enum NodeState<E: EntryRef> {
    /// Root sentinel, depth 0
    Root,
    /// End sentinel (past the last entry of some traversal)
    End,
    /// Live entry, single-owner adapter handle
    Ephemeral(E),
    /// Live entry, shared cached payload
    Cached(Rc<Payload<E>>),
}

/// A position in one root's entry tree.
pub struct Node<'r, A: ReaderAdapter> {
    state: NodeState<A::Entry>,
    depth: u16,
    /// Owning root; `None` only for the end sentinel
    root: Option<&'r Root<A>>,
}

impl<'r, A: ReaderAdapter> Node<'r, A> {
    pub(crate) fn at_root(root: &'r Root<A>) -> Self {
        Node {
            state: NodeState::Root,
            depth: 0,
            root: Some(root),
        }
    }

    /// The end sentinel. Belongs to no root; equal to every other end.
    pub fn end() -> Self {
        Node {
            state: NodeState::End,
            depth: 0,
            root: None,
        }
    }

    pub(crate) fn ephemeral(entry: A::Entry, depth: u16, root: &'r Root<A>) -> Self {
        Node {
            state: NodeState::Ephemeral(entry),
            depth,
            root: Some(root),
        }
    }

    pub(crate) fn cached(payload: Rc<Payload<A::Entry>>, depth: u16, root: &'r Root<A>) -> Self {
        Node {
            state: NodeState::Cached(payload),
            depth,
            root: Some(root),
        }
    }

    // === Position predicates ===

    #[inline]
    pub fn is_root_position(&self) -> bool {
        matches!(self.state, NodeState::Root)
    }

    #[inline]
    pub fn is_end_position(&self) -> bool {
        matches!(self.state, NodeState::End)
    }

    /// True for a live entry position (neither sentinel)
    #[inline]
    pub fn is_real(&self) -> bool {
        matches!(self.state, NodeState::Ephemeral(_) | NodeState::Cached(_))
    }

    /// Is this node currently backed by a cached payload?
    #[inline]
    pub fn is_promoted(&self) -> bool {
        matches!(self.state, NodeState::Cached(_))
    }

    /// The owning root. Panics on the end sentinel.
    pub fn root(&self) -> &'r Root<A> {
        match self.root {
            Some(r) => r,
            None => panic!("end position has no owning root"),
        }
    }

    /// Tree depth; 0 at the root sentinel
    #[inline]
    pub fn depth(&self) -> u16 {
        self.depth
    }

    // === Query contract (identical across representations) ===

    /// Offset of this position; the root sentinel reports 0.
    /// Panics on the end sentinel.
    pub fn offset(&self) -> Offset {
        match &self.state {
            NodeState::Root => ROOT_OFFSET,
            NodeState::End => panic!("offset query on end position"),
            NodeState::Ephemeral(e) => e.offset(),
            NodeState::Cached(p) => p.offset(),
        }
    }

    /// Category tag. Panics unless this is a live entry.
    pub fn tag(&self) -> Tag {
        match &self.state {
            NodeState::Ephemeral(e) => e.tag(),
            NodeState::Cached(p) => p.tag(),
            _ => panic!("tag query on sentinel position"),
        }
    }

    /// Offset of the enclosing compilation unit's root entry.
    /// Panics unless this is a live entry.
    pub fn unit_offset(&self) -> Offset {
        match &self.state {
            NodeState::Ephemeral(e) => e.unit_offset(),
            NodeState::Cached(p) => p.unit_offset(),
            _ => panic!("unit query on sentinel position"),
        }
    }

    /// Entry name, if it has one. The root sentinel has none.
    pub fn name(&self) -> Result<Option<String>> {
        match &self.state {
            NodeState::Root => Ok(None),
            NodeState::End => panic!("name query on end position"),
            NodeState::Ephemeral(e) => {
                // served directly from the reader, one call per query
                let root = self.root();
                Ok(root.entry_attrs(e)?.into_iter().find_map(|a| {
                    match (a.id, a.value) {
                        (AttrId::Name, AttrValue::String(s)) => Some(s),
                        _ => None,
                    }
                }))
            }
            NodeState::Cached(p) => {
                let root = self.root();
                p.name_with(|| root.entry_attrs(p.entry()))
            }
        }
    }

    /// Value of one attribute, if present.
    pub fn attr(&self, id: AttrId) -> Result<Option<AttrValue>> {
        match &self.state {
            NodeState::Root => Ok(None),
            NodeState::End => panic!("attribute query on end position"),
            NodeState::Ephemeral(e) => {
                let root = self.root();
                Ok(root
                    .entry_attrs(e)?
                    .into_iter()
                    .find(|a| a.id == id)
                    .map(|a| a.value))
            }
            NodeState::Cached(p) => {
                let root = self.root();
                Ok(p.attrs_with(|| root.entry_attrs(p.entry()))?
                    .iter()
                    .find(|a| a.id == id)
                    .map(|a| a.value.clone()))
            }
        }
    }

    pub fn has_attr(&self, id: AttrId) -> Result<bool> {
        Ok(self.attr(id)?.is_some())
    }

    /// The full ordered attribute list.
    pub fn attrs(&self) -> Result<Vec<Attribute>> {
        match &self.state {
            NodeState::Root => Ok(Vec::new()),
            NodeState::End => panic!("attribute query on end position"),
            NodeState::Ephemeral(e) => self.root().entry_attrs(e),
            NodeState::Cached(p) => {
                let root = self.root();
                Ok(p.attrs_with(|| root.entry_attrs(p.entry()))?.to_vec())
            }
        }
    }

    /// The adapter handle backing this live entry, from either
    /// representation. Panics on sentinels.
    pub(crate) fn entry(&self) -> &A::Entry {
        match &self.state {
            NodeState::Ephemeral(e) => e,
            NodeState::Cached(p) => p.entry(),
            _ => panic!("no entry handle at a sentinel position"),
        }
    }

    // === Promotion ===

    /// Promote this node to its cached payload, in place.
    ///
    /// Idempotent: an already-promoted node returns its existing
    /// payload. Sticky entries are registered in the root's identity
    /// cache so later visits share the same payload; non-sticky
    /// promotions stay private to the nodes holding them.
    /// Panics on sentinel positions.
    pub fn promote(&mut self) -> Result<Rc<Payload<A::Entry>>> {
        match &self.state {
            NodeState::Cached(p) => return Ok(p.clone()),
            NodeState::Ephemeral(_) => {}
            _ => panic!("promote on sentinel position"),
        }
        let root = self.root();
        let (offset, tag) = {
            let NodeState::Ephemeral(e) = &self.state else {
                unreachable!()
            };
            (e.offset(), e.tag())
        };
        // someone else may have promoted this offset since we were built
        if let Some(p) = root.sticky_payload(offset) {
            self.state = NodeState::Cached(p.clone());
            return Ok(p);
        }
        // resolve the fallible category detail before consuming the handle
        let detail = root.payload_detail(tag, offset)?;
        let NodeState::Ephemeral(entry) = mem::replace(&mut self.state, NodeState::End) else {
            unreachable!()
        };
        let payload = crate::payload::make_payload(entry, detail);
        if root.policy().is_sticky(tag) {
            root.register_sticky(payload.clone());
        }
        self.state = NodeState::Cached(payload.clone());
        Ok(payload)
    }

    /// Take a second node at this position.
    ///
    /// Copying an ephemeral node is an upgrading operation: the handle
    /// is single-owner, so this promotes first and then shares the
    /// payload. Sentinels duplicate trivially.
    pub fn duplicate(&mut self) -> Result<Node<'r, A>> {
        match &self.state {
            NodeState::Root => Ok(Node::at_root(self.root())),
            NodeState::End => Ok(Node::end()),
            _ => {
                let payload = self.promote()?;
                Ok(Node::cached(payload, self.depth, self.root()))
            }
        }
    }

    // === Navigation conveniences (delegate to the root) ===

    pub fn parent(&self) -> Result<Node<'r, A>> {
        self.root().parent(self)
    }

    pub fn first_child(&self) -> Result<Node<'r, A>> {
        self.root().first_child(self)
    }

    pub fn next_sibling(&self) -> Result<Node<'r, A>> {
        self.root().next_sibling(self)
    }

    /// Walk over this node's direct children.
    pub fn children(&self) -> Result<SiblingWalk<'r, A>> {
        Ok(SiblingWalk::new(self.first_child()?))
    }

    /// The compilation-unit node enclosing this entry.
    pub fn enclosing_unit(&self) -> Result<Node<'r, A>> {
        self.root().pos(self.unit_offset(), 1, None)
    }

    /// Child of this node with the given name.
    ///
    /// A cached payload answers through its lazily built name index; an
    /// ephemeral node (and the root sentinel) falls back to the root's
    /// linear scan. Absence is the end sentinel.
    pub fn named_child(&self, name: &str) -> Result<Node<'r, A>> {
        match &self.state {
            NodeState::End => panic!("named_child on end position"),
            NodeState::Cached(p) => {
                let root = self.root();
                if p.child_names().is_none() {
                    let mut index = std::collections::HashMap::new();
                    let mut walk = root.first_child(self)?;
                    while !walk.is_end_position() {
                        if let Some(n) = walk.name()? {
                            // first occurrence wins, matching document order
                            index.entry(n).or_insert(walk.offset());
                        }
                        walk = root.next_sibling(&walk)?;
                    }
                    p.set_child_names(index);
                }
                match p.child_names().and_then(|ix| ix.get(name)) {
                    Some(&off) => root.pos(off, self.depth + 1, Some(self.offset())),
                    None => Ok(Node::end()),
                }
            }
            _ => self.root().find_named_child(self, name),
        }
    }
}

/// Two nodes are equal iff both are the end sentinel, or they share the
/// same owning root and the same offset. A fresh handle re-derived at
/// the same offset compares equal to the original.
impl<A: ReaderAdapter> PartialEq for Node<'_, A> {
    fn eq(&self, other: &Self) -> bool {
        match (self.root, other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::eq(a, b) && self.offset() == other.offset(),
            _ => false,
        }
    }
}

impl<A: ReaderAdapter> Eq for Node<'_, A> {}

impl<A: ReaderAdapter> fmt::Debug for Node<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            NodeState::Root => write!(f, "Node(root)"),
            NodeState::End => write!(f, "Node(end)"),
            NodeState::Ephemeral(e) => write!(
                f,
                "Node({:#x}, depth {}, ephemeral)",
                e.offset(),
                self.depth
            ),
            NodeState::Cached(p) => {
                write!(f, "Node({:#x}, depth {}, cached)", p.offset(), self.depth)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::memory::{MemoryReader, TreeBuilder};
    use crate::payload::StickyPolicy;

    fn small_tree() -> MemoryReader {
        let mut b = TreeBuilder::new();
        let cu = b.unit(0x0b, "a.c");
        let f = b.entry(cu, 0x10, Tag::Subprogram, Some("f"));
        b.entry(f, 0x18, Tag::Variable, Some("local"));
        b.entry(cu, 0x30, Tag::Variable, Some("global"));
        b.finish().unwrap()
    }

    #[test]
    fn test_query_contract_same_in_both_representations() {
        let root = Root::new(small_tree());
        let mut eph = root.find(0x30).unwrap();
        assert!(!eph.is_promoted());
        let before = (eph.offset(), eph.tag(), eph.name().unwrap());
        eph.promote().unwrap();
        assert!(eph.is_promoted());
        let after = (eph.offset(), eph.tag(), eph.name().unwrap());
        assert_eq!(before, after);
        assert_eq!(after.2.as_deref(), Some("global"));
    }

    #[test]
    fn test_duplicate_then_drop_original() {
        let root = Root::new(small_tree());
        let mut original = root.find(0x18).unwrap();
        let copy = original.duplicate().unwrap();
        // promotion left the original's observable state unchanged
        assert_eq!(original.offset(), 0x18);
        assert!(original.is_promoted());
        drop(original);
        assert_eq!(copy.offset(), 0x18);
        assert_eq!(copy.name().unwrap().as_deref(), Some("local"));
        assert_eq!(copy.tag(), Tag::Variable);
    }

    #[test]
    fn test_promotion_idempotent() {
        let root = Root::new(small_tree());
        let mut n = root.find(0x10).unwrap();
        let p1 = n.promote().unwrap();
        let p2 = n.promote().unwrap();
        assert!(Rc::ptr_eq(&p1, &p2));
        let d = n.duplicate().unwrap();
        let NodeState::Cached(p3) = &d.state else {
            panic!("duplicate of promoted node must share the payload")
        };
        assert!(Rc::ptr_eq(&p1, p3));
    }

    #[test]
    fn test_sticky_visits_share_payload() {
        let policy = StickyPolicy::new().also_sticky(Tag::Subprogram);
        let root = Root::with_policy(small_tree(), policy);
        let a = root.find(0x10).unwrap();
        let b = root.find(0x10).unwrap();
        let (NodeState::Cached(pa), NodeState::Cached(pb)) = (&a.state, &b.state) else {
            panic!("sticky entries must come back promoted")
        };
        assert!(Rc::ptr_eq(pa, pb));
    }

    #[test]
    fn test_non_sticky_visits_are_independent() {
        let root = Root::new(small_tree());
        let mut a = root.find(0x30).unwrap();
        let mut b = root.find(0x30).unwrap();
        assert!(!a.is_promoted() && !b.is_promoted());
        let pa = a.promote().unwrap();
        let pb = b.promote().unwrap();
        assert!(!Rc::ptr_eq(&pa, &pb));
    }

    #[test]
    fn test_equality() {
        let root = Root::new(small_tree());
        let a = root.find(0x10).unwrap();
        let b = root.pos(0x10, 2, None).unwrap();
        assert_eq!(a, b); // distinct handles, same offset, same root
        assert_eq!(Node::<MemoryReader>::end(), Node::end());
        assert_ne!(a, Node::end());
        assert_ne!(root.begin(), a);

        let other = Root::new(small_tree());
        let c = other.find(0x10).unwrap();
        assert_ne!(a, c); // same offset, different root
    }

    #[test]
    fn test_root_sentinel_queries() {
        let root = Root::new(small_tree());
        let begin = root.begin();
        assert!(begin.is_root_position());
        assert_eq!(begin.offset(), ROOT_OFFSET);
        assert_eq!(begin.name().unwrap(), None);
        assert_eq!(begin.attrs().unwrap(), Vec::new());
        assert_eq!(begin.depth(), 0);
    }

    #[test]
    #[should_panic(expected = "offset query on end position")]
    fn test_end_offset_panics() {
        let n = Node::<MemoryReader>::end();
        let _ = n.offset();
    }

    #[test]
    fn test_named_child_fast_path_matches_fallback() {
        let policy = StickyPolicy::new().also_sticky(Tag::CompileUnit);
        let root = Root::with_policy(small_tree(), policy);
        let cu = root.pos(0x0b, 1, None).unwrap();
        assert!(cu.is_promoted());
        // first lookup builds the index, second hits it
        let f = cu.named_child("f").unwrap();
        assert_eq!(f.offset(), 0x10);
        let g = cu.named_child("global").unwrap();
        assert_eq!(g.offset(), 0x30);
        assert!(cu.named_child("nope").unwrap().is_end_position());

        // ephemeral node takes the linear fallback, same answers
        let mut f2 = root.find(0x10).unwrap();
        let local = f2.named_child("local").unwrap();
        assert_eq!(local.offset(), 0x18);
        let _ = f2.promote();
    }

    #[test]
    fn test_enclosing_unit() {
        let root = Root::new(small_tree());
        let local = root.find(0x18).unwrap();
        let cu = local.enclosing_unit().unwrap();
        assert_eq!(cu.offset(), 0x0b);
        assert_eq!(cu.depth(), 1);
        assert_eq!(cu.tag(), Tag::CompileUnit);
    }
}
