//! Name resolution: path descent and lexical-scope search
//!
//! Paths are sequences of name segments, descended one named-child hop
//! per segment. Cached payloads answer named-child queries through
//! their lazily built name index; ephemeral nodes fall back to the
//! root's linear sibling scan. Scoped resolution retries the same path
//! from enclosing scopes outward, the innermost match winning.

use memchr::memmem;

use crate::adapter::ReaderAdapter;
use crate::error::Result;
use crate::node::Node;
use crate::root::Root;

/// Segment separator in rendered paths.
const PATH_SEP: &str = "::";

/// Split `path` on `::` into segments. Empty segments are preserved
/// (an empty or malformed path simply fails to resolve).
pub fn split_path(path: &str) -> Vec<&str> {
    let bytes = path.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    for hit in memmem::find_iter(bytes, PATH_SEP.as_bytes()) {
        segments.push(&path[start..hit]);
        start = hit + PATH_SEP.len();
    }
    segments.push(&path[start..]);
    segments
}

impl<A: ReaderAdapter> Root<A> {
    /// Descend from `start` one named child per segment. Any miss
    /// short-circuits to the end sentinel; an empty path never
    /// matches.
    pub fn resolve<'r>(&'r self, start: &Node<'r, A>, path: &[&str]) -> Result<Node<'r, A>> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(Node::end());
        };
        let mut cur = start.named_child(first)?;
        for seg in rest {
            if cur.is_end_position() {
                return Ok(cur);
            }
            cur = cur.named_child(seg)?;
        }
        Ok(cur)
    }

    /// `resolve` with a `::`-separated path string.
    pub fn resolve_path<'r>(&'r self, start: &Node<'r, A>, path: &str) -> Result<Node<'r, A>> {
        self.resolve(start, &split_path(path))
    }

    /// Resolve `path` the way a lexically scoped language would: try
    /// the scope at `from`, then each enclosing ancestor scope that
    /// can hold named children, innermost first. Returns the first
    /// match or the end sentinel.
    pub fn scoped_resolve<'r>(&'r self, from: &Node<'r, A>, path: &[&str]) -> Result<Node<'r, A>> {
        let mut hits = self.scoped_resolve_all(from, path, 1)?;
        Ok(match hits.pop() {
            Some(n) => n,
            None => Node::end(),
        })
    }

    /// All scoped matches of `path`, innermost scope first, up to
    /// `max` results (`0` = unlimited). The root sentinel is not a
    /// scope; the search stops below it.
    pub fn scoped_resolve_all<'r>(
        &'r self,
        from: &Node<'r, A>,
        path: &[&str],
        max: usize,
    ) -> Result<Vec<Node<'r, A>>> {
        let mut out = Vec::new();
        let full = |out: &Vec<_>| max != 0 && out.len() >= max;

        let hit = self.resolve(from, path)?;
        if hit.is_real() {
            out.push(hit);
        }
        let mut scope = self.parent(from)?;
        while scope.is_real() && !full(&out) {
            if scope.tag().has_named_children() {
                let hit = self.resolve(&scope, path)?;
                if hit.is_real() {
                    out.push(hit);
                }
            }
            scope = self.parent(&scope)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::memory::{MemoryReader, TreeBuilder};
    use crate::payload::StickyPolicy;
    use crate::tag::Tag;

    /// One unit with nested namespaces and a shadowed name:
    ///
    /// cu "m.c"
    ///   namespace outer
    ///     variable v        (0x14)
    ///     namespace inner
    ///       variable v      (0x20)
    ///       subprogram f    (0x28)
    ///   structure pair      (0x30)
    ///     member first      (0x34)
    fn scoped_tree() -> MemoryReader {
        let mut b = TreeBuilder::new();
        let cu = b.unit(0x0b, "m.c");
        let outer = b.entry(cu, 0x10, Tag::Namespace, Some("outer"));
        b.entry(outer, 0x14, Tag::Variable, Some("v"));
        let inner = b.entry(outer, 0x18, Tag::Namespace, Some("inner"));
        b.entry(inner, 0x20, Tag::Variable, Some("v"));
        b.entry(inner, 0x28, Tag::Subprogram, Some("f"));
        let pair = b.entry(cu, 0x30, Tag::StructureType, Some("pair"));
        b.entry(pair, 0x34, Tag::Member, Some("first"));
        b.finish().unwrap()
    }

    #[test]
    fn test_resolve_hits_and_misses() {
        let root = Root::new(scoped_tree());
        let cu = root.cu_pos(0x0b).unwrap();
        let v = root.resolve(&cu, &["outer", "inner", "v"]).unwrap();
        assert_eq!(v.offset(), 0x20);
        let miss = root.resolve(&cu, &["outer", "nope"]).unwrap();
        assert!(miss.is_end_position());
        assert!(root.resolve(&cu, &[]).unwrap().is_end_position());
    }

    #[test]
    fn test_resolve_from_sentinel_crosses_units() {
        let root = Root::new(scoped_tree());
        let begin = root.begin();
        let pair = root.resolve(&begin, &["m.c", "pair", "first"]).unwrap();
        assert_eq!(pair.offset(), 0x34);
    }

    #[test]
    fn test_resolve_path_string() {
        let root = Root::new(scoped_tree());
        let cu = root.cu_pos(0x0b).unwrap();
        let f = root.resolve_path(&cu, "outer::inner::f").unwrap();
        assert_eq!(f.offset(), 0x28);
        assert!(root.resolve_path(&cu, "").unwrap().is_end_position());
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("a::b::c"), vec!["a", "b", "c"]);
        assert_eq!(split_path("lone"), vec!["lone"]);
        assert_eq!(split_path("::x"), vec!["", "x"]);
        assert_eq!(split_path(""), vec![""]);
    }

    #[test]
    fn test_scoped_resolve_prefers_innermost() {
        let root = Root::new(scoped_tree());
        let inner = root.find(0x18).unwrap();
        let v = root.scoped_resolve(&inner, &["v"]).unwrap();
        assert_eq!(v.offset(), 0x20);
    }

    #[test]
    fn test_scoped_resolve_falls_back_to_enclosing_scope() {
        let root = Root::new(scoped_tree());
        let inner = root.find(0x18).unwrap();
        let f_scope = root.find(0x28).unwrap();
        // from inside f there is no local "pair"; the unit scope has it
        let pair = root.scoped_resolve(&f_scope, &["pair"]).unwrap();
        assert_eq!(pair.offset(), 0x30);
        // and an unknown name misses everywhere
        assert!(root
            .scoped_resolve(&inner, &["ghost"])
            .unwrap()
            .is_end_position());
    }

    #[test]
    fn test_scoped_resolve_all_collects_shadowed_names() {
        let root = Root::new(scoped_tree());
        let inner = root.find(0x18).unwrap();
        let all = root.scoped_resolve_all(&inner, &["v"], 0).unwrap();
        let offs: Vec<_> = all.iter().map(|n| n.offset()).collect();
        assert_eq!(offs, vec![0x20, 0x14]); // innermost first
        let capped = root.scoped_resolve_all(&inner, &["v"], 1).unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].offset(), 0x20);
    }

    #[test]
    fn test_resolution_same_through_cached_index() {
        // promote the namespaces so lookups go through the name index
        let policy = StickyPolicy::new().also_sticky(Tag::Namespace);
        let root = Root::with_policy(scoped_tree(), policy);
        let cu = root.cu_pos(0x0b).unwrap();
        let v1 = root.resolve_path(&cu, "outer::inner::v").unwrap();
        let v2 = root.resolve_path(&cu, "outer::inner::v").unwrap();
        assert_eq!(v1, v2);
        assert_eq!(v1.offset(), 0x20);
    }
}
