//! Child Registry - Record identity → child view.
//!
//! One entry per live child, iterated in insertion order. The empty
//! placeholder lives in its own slot and is never keyed by a record id.

use std::collections::HashMap;

use crate::types::{Record, RecordId};
use crate::view::ViewHandle;

/// A tracked child and the record it is bound to.
#[derive(Clone)]
pub struct ChildEntry {
    pub record: Record,
    pub view: ViewHandle,
}

impl ChildEntry {
    pub fn new(record: Record, view: ViewHandle) -> Self {
        Self { record, view }
    }
}

impl std::fmt::Debug for ChildEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildEntry")
            .field("record", &self.record.id())
            .finish_non_exhaustive()
    }
}

/// Keyed store of child views.
#[derive(Debug, Default)]
pub struct ChildRegistry {
    entries: HashMap<RecordId, ChildEntry>,
    order: Vec<RecordId>,
    placeholder: Option<ChildEntry>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry. A duplicate id is rejected and the entry handed back.
    pub fn insert(&mut self, entry: ChildEntry) -> Result<(), ChildEntry> {
        let id = entry.record.id();
        if self.entries.contains_key(&id) {
            return Err(entry);
        }
        self.entries.insert(id, entry);
        self.order.push(id);
        Ok(())
    }

    pub fn get(&self, id: &RecordId) -> Option<&ChildEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.entries.contains_key(id)
    }

    /// Remove and return an entry.
    pub fn take(&mut self, id: &RecordId) -> Option<ChildEntry> {
        let entry = self.entries.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(entry)
    }

    /// Remove every record entry and the placeholder, in insertion order
    /// (placeholder last).
    pub fn drain(&mut self) -> Vec<ChildEntry> {
        let mut drained: Vec<ChildEntry> = self
            .order
            .drain(..)
            .filter_map(|id| self.entries.remove(&id))
            .collect();
        drained.extend(self.placeholder.take());
        drained
    }

    /// Number of record entries (placeholder excluded).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record views in insertion order.
    pub fn views(&self) -> Vec<ViewHandle> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|entry| entry.view.clone())
            .collect()
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.order.clone()
    }

    // -------------------------------------------------------------------------
    // Placeholder
    // -------------------------------------------------------------------------

    /// Install the placeholder, returning the previous one.
    pub fn set_placeholder(&mut self, entry: ChildEntry) -> Option<ChildEntry> {
        self.placeholder.replace(entry)
    }

    pub fn placeholder(&self) -> Option<&ChildEntry> {
        self.placeholder.as_ref()
    }

    pub fn take_placeholder(&mut self) -> Option<ChildEntry> {
        self.placeholder.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{rendered, ChildView, RenderFuture, ViewBase, ViewContext};
    use std::rc::Rc;

    struct Stub {
        base: ViewBase,
    }

    impl ChildView for Stub {
        fn base(&self) -> &ViewBase {
            &self.base
        }

        fn render(&self) -> RenderFuture {
            rendered()
        }
    }

    fn entry(record: &Record) -> ChildEntry {
        let view = Rc::new(Stub {
            base: ViewBase::for_record(record.clone(), &ViewContext::default()),
        });
        ChildEntry::new(record.clone(), view)
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = ChildRegistry::new();
        let a = Record::anonymous();

        registry.insert(entry(&a)).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&a.id()));
        assert_eq!(registry.get(&a.id()).map(|e| e.record.clone()), Some(a));
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut registry = ChildRegistry::new();
        let a = Record::anonymous();

        registry.insert(entry(&a)).unwrap();
        let rejected = registry.insert(entry(&a));
        assert!(rejected.is_err());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.views().len(), 1);
    }

    #[test]
    fn test_take_removes_entry() {
        let mut registry = ChildRegistry::new();
        let a = Record::anonymous();
        let b = Record::anonymous();
        registry.insert(entry(&a)).unwrap();
        registry.insert(entry(&b)).unwrap();

        assert!(registry.take(&a.id()).is_some());
        assert!(registry.take(&a.id()).is_none());
        assert_eq!(registry.ids(), vec![b.id()]);
    }

    #[test]
    fn test_drain_preserves_order_and_includes_placeholder() {
        let mut registry = ChildRegistry::new();
        let records: Vec<Record> = (0..3).map(|_| Record::anonymous()).collect();
        for record in &records {
            registry.insert(entry(record)).unwrap();
        }
        let placeholder = Record::anonymous();
        assert!(registry.set_placeholder(entry(&placeholder)).is_none());

        let drained: Vec<_> = registry.drain().into_iter().map(|e| e.record.id()).collect();
        let mut expected: Vec<_> = records.iter().map(Record::id).collect();
        expected.push(placeholder.id());

        assert_eq!(drained, expected);
        assert!(registry.is_empty());
        assert!(registry.placeholder().is_none());
    }

    #[test]
    fn test_placeholder_not_counted() {
        let mut registry = ChildRegistry::new();
        registry.set_placeholder(entry(&Record::anonymous()));

        assert_eq!(registry.len(), 0);
        assert!(registry.views().is_empty());
        assert!(registry.take_placeholder().is_some());
    }

    #[test]
    fn test_drain_empty_registry() {
        let mut registry = ChildRegistry::new();
        assert!(registry.drain().is_empty());
    }
}
