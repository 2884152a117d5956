//! Cached entry payloads and the stickiness policy
//!
//! A payload is the shareable, reference-counted representation of one
//! entry: the adapter handle moved in at promotion time plus lazily
//! populated state (attribute list, name, named-child index). Payloads
//! for compilation units additionally carry the unit header, filled in
//! at construction. Promotion is one-way: an ephemeral handle becomes a
//! payload and never goes back.

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::adapter::{Attribute, AttrValue, EntryRef, Offset, UnitHeader};
use crate::error::Result;
use crate::tag::{AttrId, Tag};

/// Category-specific payload state, a closed dispatch over entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadDetail {
    /// Compilation-unit entries carry their unit header
    Unit(UnitHeader),
    /// Everything else
    General,
}

/// Cached, shareable representation of one entry.
///
/// Owned jointly by the identity cache (sticky entries only) and every
/// node currently pointing at the entry. Lazy fields are populated on
/// first use and never mutated afterwards; single-threaded by design.
#[derive(Debug)]
pub struct Payload<E: EntryRef> {
    entry: E,
    offset: Offset,
    tag: Tag,
    unit_offset: Offset,
    detail: PayloadDetail,
    attrs: OnceCell<Vec<Attribute>>,
    name: OnceCell<Option<String>>,
    child_names: OnceCell<HashMap<String, Offset>>,
}

impl<E: EntryRef> Payload<E> {
    #[inline]
    pub fn offset(&self) -> Offset {
        self.offset
    }

    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    #[inline]
    pub fn unit_offset(&self) -> Offset {
        self.unit_offset
    }

    #[inline]
    pub fn detail(&self) -> &PayloadDetail {
        &self.detail
    }

    /// Unit header, for compilation-unit payloads
    pub fn unit_header(&self) -> Option<&UnitHeader> {
        match &self.detail {
            PayloadDetail::Unit(h) => Some(h),
            PayloadDetail::General => None,
        }
    }

    /// The handle this payload was promoted from; used as the probe for
    /// further adapter calls on this entry.
    pub(crate) fn entry(&self) -> &E {
        &self.entry
    }

    /// Attribute list, fetched through `fetch` on first use.
    pub(crate) fn attrs_with<F>(&self, fetch: F) -> Result<&[Attribute]>
    where
        F: FnOnce() -> Result<Vec<Attribute>>,
    {
        if let Some(v) = self.attrs.get() {
            return Ok(v);
        }
        let v = fetch()?;
        Ok(self.attrs.get_or_init(|| v))
    }

    /// Entry name, derived from the attribute list on first use.
    pub(crate) fn name_with<F>(&self, fetch: F) -> Result<Option<String>>
    where
        F: FnOnce() -> Result<Vec<Attribute>>,
    {
        if self.name.get().is_none() {
            let name = self.attrs_with(fetch)?.iter().find_map(|a| {
                match (&a.id, &a.value) {
                    (AttrId::Name, AttrValue::String(s)) => Some(s.clone()),
                    _ => None,
                }
            });
            let _ = self.name.set(name);
        }
        Ok(self.name.get().cloned().unwrap_or(None))
    }

    /// Name-to-offset index over direct children, if already built
    pub(crate) fn child_names(&self) -> Option<&HashMap<String, Offset>> {
        self.child_names.get()
    }

    pub(crate) fn set_child_names(&self, index: HashMap<String, Offset>) {
        let _ = self.child_names.set(index);
    }
}

/// Construct a payload from an ephemeral handle, taking ownership.
///
/// The factory is a pure function of (handle, detail); the caller has
/// already resolved the category-specific detail.
pub(crate) fn make_payload<E: EntryRef>(entry: E, detail: PayloadDetail) -> Rc<Payload<E>> {
    let offset = entry.offset();
    let tag = entry.tag();
    let unit_offset = entry.unit_offset();
    debug_assert!(tag.is_unit() == matches!(detail, PayloadDetail::Unit(_)));
    Rc::new(Payload {
        entry,
        offset,
        tag,
        unit_offset,
        detail,
        attrs: OnceCell::new(),
        name: OnceCell::new(),
        child_names: OnceCell::new(),
    })
}

/// Decides which entry categories are cached for the root's lifetime.
///
/// Compilation units are always sticky; embedders may pin further
/// categories. Everything else stays ephemeral and is freed once the
/// last node referencing it goes away.
#[derive(Debug, Clone, Default)]
pub struct StickyPolicy {
    extra: HashSet<Tag>,
}

impl StickyPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also keep entries with this tag cached for the root's lifetime.
    pub fn also_sticky(mut self, tag: Tag) -> Self {
        self.extra.insert(tag);
        self
    }

    #[inline]
    pub fn is_sticky(&self, tag: Tag) -> bool {
        tag.is_unit() || self.extra.contains(&tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::memory::{MemoryReader, TreeBuilder};
    use crate::adapter::ReaderAdapter;

    fn one_entry() -> (MemoryReader, crate::adapter::memory::MemEntry) {
        let mut b = TreeBuilder::new();
        let cu = b.unit(0x0b, "a.c");
        b.entry(cu, 0x10, Tag::Variable, Some("v"));
        let mut r = b.finish().unwrap();
        let e = r.entry_at_offset(0x10).unwrap().unwrap();
        (r, e)
    }

    #[test]
    fn test_payload_lazy_attrs_fetched_once() {
        let (mut r, e) = one_entry();
        let p = make_payload(e, PayloadDetail::General);
        let mut fetches = 0;
        for _ in 0..3 {
            let probe = p.entry();
            let attrs = r.attributes(probe).unwrap();
            let got = p
                .attrs_with(|| {
                    fetches += 1;
                    Ok(attrs.clone())
                })
                .unwrap();
            assert_eq!(got.len(), 1);
        }
        assert_eq!(fetches, 1);
    }

    #[test]
    fn test_payload_name() {
        let (mut r, e) = one_entry();
        let p = make_payload(e, PayloadDetail::General);
        let attrs = r.attributes(p.entry()).unwrap();
        let name = p.name_with(|| Ok(attrs)).unwrap();
        assert_eq!(name.as_deref(), Some("v"));
        // second call served from cache, fetch not invoked
        let name = p.name_with(|| panic!("must not refetch")).unwrap();
        assert_eq!(name.as_deref(), Some("v"));
    }

    #[test]
    fn test_sticky_policy() {
        let policy = StickyPolicy::new();
        assert!(policy.is_sticky(Tag::CompileUnit));
        assert!(!policy.is_sticky(Tag::Variable));
        let policy = policy.also_sticky(Tag::Subprogram);
        assert!(policy.is_sticky(Tag::Subprogram));
        assert!(!policy.is_sticky(Tag::Variable));
    }

    #[test]
    fn test_unit_detail() {
        let mut b = TreeBuilder::new();
        b.unit(0x0b, "a.c");
        let mut r = b.finish().unwrap();
        let header = r.advance_unit().unwrap().unwrap();
        let e = r.first_entry().unwrap().unwrap();
        let p = make_payload(e, PayloadDetail::Unit(header));
        assert_eq!(p.unit_header().unwrap().version, 4);
        assert_eq!(p.unit_header().unwrap().offset, 0x0b);
    }
}
