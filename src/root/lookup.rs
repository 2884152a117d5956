//! Offset lookup: direct positioning and ordered search
//!
//! Two entry points, per how much the caller already knows:
//!
//! - `pos`/`at`/`cu_pos`: offset and depth known, O(1) modulo one
//!   reader call.
//! - `find`: offset alone. Exploits the preorder-offset ordering to
//!   prune: a subtree is entered only when the target offset falls
//!   strictly between the subtree root and its next sibling.

use tracing::trace;

use crate::adapter::{EntryRef, Offset, ReaderAdapter};
use crate::error::Result;
use crate::node::{Node, ROOT_OFFSET};
use crate::root::Root;
use crate::traverse::BreadthFirst;

impl<A: ReaderAdapter> Root<A> {
    /// Node at a known offset and depth.
    ///
    /// One reader call at most; the identity cache short-circuits
    /// sticky entries. Fills the parent cache when the parent is
    /// implied (depth 1 under the sentinel, depth 2 under the unit
    /// root) or supplied via `parent_hint`. Absence is the end
    /// sentinel, never an error.
    pub fn pos(
        &self,
        offset: Offset,
        depth: u16,
        parent_hint: Option<Offset>,
    ) -> Result<Node<'_, A>> {
        if offset == ROOT_OFFSET {
            return Ok(self.begin());
        }
        if let Some(p) = self.sticky_payload(offset) {
            self.fill_parent_hint(offset, depth, parent_hint, p.unit_offset());
            return Ok(Node::cached(p, depth, self));
        }
        let entry = self
            .adapter
            .borrow_mut()
            .entry_at_offset(offset)
            .map_err(|e| self.fault(offset, e))?;
        match entry {
            Some(e) => {
                self.fill_parent_hint(offset, depth, parent_hint, e.unit_offset());
                self.adopt_entry(e, depth)
            }
            None => Ok(Node::end()),
        }
    }

    /// `pos` without a parent hint.
    #[inline]
    pub fn at(&self, offset: Offset, depth: u16) -> Result<Node<'_, A>> {
        self.pos(offset, depth, None)
    }

    /// Node of a unit's root entry.
    #[inline]
    pub fn cu_pos(&self, unit_offset: Offset) -> Result<Node<'_, A>> {
        self.pos(unit_offset, 1, None)
    }

    fn fill_parent_hint(
        &self,
        offset: Offset,
        depth: u16,
        hint: Option<Offset>,
        unit_offset: Offset,
    ) {
        if let Some(h) = hint {
            self.remember_parent(offset, h);
        } else if depth == 1 {
            self.remember_parent(offset, ROOT_OFFSET);
        } else if depth == 2 {
            self.remember_parent(offset, unit_offset);
        }
    }

    /// Search for the entry at `target`, depth unknown.
    ///
    /// Breadth-first walk that prunes on the offset ordering: a
    /// subtree is entered only when the target offset falls strictly
    /// between the subtree root and its next sibling, and skipped
    /// whole otherwise. Cost scales with the path and sibling fan-out
    /// toward the target, not with the population of skipped subtrees.
    /// The walk also repopulates the parent cache along the way. An
    /// absent offset yields the end sentinel; the walk always
    /// terminates.
    pub fn find(&self, target: Offset) -> Result<Node<'_, A>> {
        if target == ROOT_OFFSET {
            return Ok(self.begin());
        }
        let mut walk = BreadthFirst::new(self);
        walk.increment()?; // step off the sentinel onto the first unit
        while !walk.position().is_end_position() {
            let here = walk.position().offset();
            if here == target {
                return Ok(walk.into_position());
            }
            if here > target {
                // ordering: nothing below here can hold the target
                trace!(here, sought = target, "skipping overshot subtree");
                walk.increment_skipping_subtree()?;
                continue;
            }
            let sib = self.next_sibling(walk.position())?;
            if !sib.is_end_position() && target >= sib.offset() {
                trace!(here, sought = target, "skipping subtree");
                walk.increment_skipping_subtree()?;
            } else {
                trace!(here, sought = target, "descending into subtree");
                walk.increment()?;
            }
        }
        Ok(Node::end())
    }
}

#[cfg(test)]
mod tests {
    use crate::adapter::memory::{MemoryReader, TreeBuilder};
    use crate::root::Root;
    use crate::tag::Tag;

    /// Sentinel R, unit A at 10 holding B at 20, unit C at 50.
    fn pruning_tree() -> MemoryReader {
        let mut b = TreeBuilder::new();
        let a = b.unit(10, "a.c");
        b.entry(a, 20, Tag::Variable, Some("b"));
        let _c = b.unit(50, "c.c");
        b.finish().unwrap()
    }

    #[test]
    fn test_find_descends_when_target_inside_span() {
        let root = Root::new(pruning_tree());
        let b = root.find(20).unwrap();
        assert_eq!(b.offset(), 20);
        assert_eq!(b.depth(), 2);
        assert_eq!(b.name().unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_find_skips_subtree_when_target_at_sibling() {
        let mut reader = pruning_tree();
        // the pruned lookup must never touch A's interior
        reader.poison(20);
        let root = Root::new(reader);
        let c = root.find(50).unwrap();
        assert_eq!(c.offset(), 50);
        assert_eq!(c.depth(), 1);
    }

    #[test]
    fn test_find_absent_offset_terminates_with_end() {
        let root = Root::new(pruning_tree());
        assert!(root.find(15).unwrap().is_end_position()); // gap inside A
        assert!(root.find(21).unwrap().is_end_position()); // gap after B
        assert!(root.find(999).unwrap().is_end_position()); // past last unit
    }

    #[test]
    fn test_find_of_zero_is_root_sentinel() {
        let root = Root::new(pruning_tree());
        assert!(root.find(0).unwrap().is_root_position());
    }

    #[test]
    fn test_pos_absent_is_end() {
        let root = Root::new(pruning_tree());
        assert!(root.pos(15, 2, None).unwrap().is_end_position());
    }

    #[test]
    fn test_pos_fills_parent_cache_for_shallow_depths() {
        let root = Root::new(pruning_tree());
        let _ = root.at(20, 2).unwrap();
        assert_eq!(root.cached_parent(20), Some(10)); // depth 2 implies the unit
        let _ = root.cu_pos(50).unwrap();
        assert_eq!(root.cached_parent(50), Some(0));
    }

    #[test]
    fn test_pos_honors_parent_hint() {
        let mut b = TreeBuilder::new();
        let cu = b.unit(0x0b, "d.c");
        let f = b.entry(cu, 0x10, Tag::Subprogram, Some("f"));
        let blk = b.entry(f, 0x14, Tag::LexicalBlock, None);
        b.entry(blk, 0x16, Tag::Variable, Some("deep"));
        let root = Root::new(b.finish().unwrap());
        let _ = root.pos(0x16, 4, Some(0x14)).unwrap();
        assert_eq!(root.cached_parent(0x16), Some(0x14));
    }

    #[test]
    fn test_find_hits_second_unit() {
        let root = Root::new(pruning_tree());
        let c = root.find(50).unwrap();
        assert_eq!(c.tag(), Tag::CompileUnit);
        assert_eq!(c.name().unwrap().as_deref(), Some("c.c"));
    }
}
