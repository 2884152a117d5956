//! Traversal strategies over one root's entry tree
//!
//! Three cursors built uniformly on the root's navigation primitives:
//!
//! - [`DepthFirst`]: preorder, child before sibling, ancestors retried
//!   on exhaustion.
//! - [`BreadthFirst`]: sibling before child, pending subtrees queued;
//!   offers a subtree-skipping advance for pruned walks.
//! - [`SiblingWalk`]: one parent's direct children only.
//!
//! The cursors are fallible, so they expose `next() -> Result<Option>`
//! rather than implementing `Iterator`; `position`/`increment` give
//! in-place stepping without yielding ownership.

use std::collections::VecDeque;
use std::mem;

use crate::adapter::ReaderAdapter;
use crate::error::Result;
use crate::node::Node;
use crate::root::Root;

/// Preorder depth-first cursor.
pub struct DepthFirst<'r, A: ReaderAdapter> {
    root: &'r Root<A>,
    pos: Node<'r, A>,
}

impl<'r, A: ReaderAdapter> DepthFirst<'r, A> {
    /// Start at the root sentinel; the first `next` yields the first
    /// unit's root entry.
    pub fn new(root: &'r Root<A>) -> Self {
        DepthFirst {
            root,
            pos: root.begin(),
        }
    }

    /// Resume preorder from an arbitrary position.
    pub fn from(root: &'r Root<A>, pos: Node<'r, A>) -> Self {
        DepthFirst { root, pos }
    }

    #[inline]
    pub fn position(&self) -> &Node<'r, A> {
        &self.pos
    }

    pub fn into_position(self) -> Node<'r, A> {
        self.pos
    }

    /// Advance one preorder step; at the end this is a no-op.
    pub fn increment(&mut self) -> Result<()> {
        let cur = mem::replace(&mut self.pos, Node::end());
        if cur.is_end_position() {
            return Ok(());
        }
        self.pos = self.step(&cur)?;
        Ok(())
    }

    /// Advance and yield the position stepped over. The root sentinel
    /// is never yielded.
    pub fn next(&mut self) -> Result<Option<Node<'r, A>>> {
        loop {
            let cur = mem::replace(&mut self.pos, Node::end());
            if cur.is_end_position() {
                return Ok(None);
            }
            self.pos = self.step(&cur)?;
            if cur.is_root_position() {
                continue;
            }
            return Ok(Some(cur));
        }
    }

    /// Preorder successor: first child, else next sibling, else the
    /// nearest ancestor's next sibling.
    fn step(&self, cur: &Node<'r, A>) -> Result<Node<'r, A>> {
        let child = self.root.first_child(cur)?;
        if !child.is_end_position() {
            return Ok(child);
        }
        let sib = self.root.next_sibling(cur)?;
        if !sib.is_end_position() {
            return Ok(sib);
        }
        let mut up = self.root.parent(cur)?;
        while up.is_real() {
            let sib = self.root.next_sibling(&up)?;
            if !sib.is_end_position() {
                return Ok(sib);
            }
            up = self.root.parent(&up)?;
        }
        Ok(Node::end())
    }
}

/// Breadth-first cursor: visits siblings before descending, queueing
/// each position's first child for a later pass.
pub struct BreadthFirst<'r, A: ReaderAdapter> {
    root: &'r Root<A>,
    pos: Node<'r, A>,
    pending: VecDeque<Node<'r, A>>,
}

impl<'r, A: ReaderAdapter> BreadthFirst<'r, A> {
    pub fn new(root: &'r Root<A>) -> Self {
        BreadthFirst {
            root,
            pos: root.begin(),
            pending: VecDeque::new(),
        }
    }

    #[inline]
    pub fn position(&self) -> &Node<'r, A> {
        &self.pos
    }

    pub fn into_position(self) -> Node<'r, A> {
        self.pos
    }

    /// Advance one level-order step: queue the current first child,
    /// move to the next sibling, or fall back to the queue.
    pub fn increment(&mut self) -> Result<()> {
        let cur = mem::replace(&mut self.pos, Node::end());
        if cur.is_end_position() {
            return Ok(());
        }
        self.advance_from(&cur, false)
    }

    /// Advance without queueing the current subtree. The entries below
    /// the current position will never be visited.
    pub fn increment_skipping_subtree(&mut self) -> Result<()> {
        let cur = mem::replace(&mut self.pos, Node::end());
        if cur.is_end_position() {
            return Ok(());
        }
        self.advance_from(&cur, true)
    }

    fn advance_from(&mut self, cur: &Node<'r, A>, skip_subtree: bool) -> Result<()> {
        if !skip_subtree {
            let child = self.root.first_child(cur)?;
            if !child.is_end_position() {
                self.pending.push_back(child);
            }
        }
        let sib = self.root.next_sibling(cur)?;
        self.pos = if sib.is_end_position() {
            self.pending.pop_front().unwrap_or_else(Node::end)
        } else {
            sib
        };
        Ok(())
    }

    /// Advance and yield the position stepped over; the root sentinel
    /// is never yielded.
    pub fn next(&mut self) -> Result<Option<Node<'r, A>>> {
        loop {
            let cur = mem::replace(&mut self.pos, Node::end());
            if cur.is_end_position() {
                return Ok(None);
            }
            self.advance_from(&cur, false)?;
            if cur.is_root_position() {
                continue;
            }
            return Ok(Some(cur));
        }
    }
}

/// Walk over one parent's direct children, in document order.
pub struct SiblingWalk<'r, A: ReaderAdapter> {
    pos: Node<'r, A>,
}

impl<'r, A: ReaderAdapter> SiblingWalk<'r, A> {
    /// Walk starting from `first` (usually a `first_child` result; the
    /// end sentinel gives an empty walk).
    pub fn new(first: Node<'r, A>) -> Self {
        SiblingWalk { pos: first }
    }

    #[inline]
    pub fn position(&self) -> &Node<'r, A> {
        &self.pos
    }

    pub fn next(&mut self) -> Result<Option<Node<'r, A>>> {
        let cur = mem::replace(&mut self.pos, Node::end());
        if cur.is_end_position() {
            return Ok(None);
        }
        self.pos = cur.next_sibling()?;
        Ok(Some(cur))
    }
}
