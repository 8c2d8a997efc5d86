//! Collection - Observable ordered container of records.
//!
//! Mutations are applied first, then listeners are notified in subscription
//! order. No borrow is held while a listener runs, so listeners may read or
//! mutate the collection again.
//!
//! Every listener is notified even if an earlier one fails. The first error
//! is returned to the caller of the mutating operation.
//!
//! # Example
//!
//! ```ignore
//! let todos = Collection::new();
//! let sub = todos.subscribe(|event| {
//!     println!("{:?}", event);
//!     Ok(())
//! });
//!
//! todos.add(Record::new([("title", "write docs")]))?;
//! sub.cancel();
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use spark_signals::{signal, Signal};

use crate::error::ViewError;
use crate::events::Subscription;
use crate::types::{Record, RecordId};

/// Membership notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionEvent {
    Added(Record),
    Removed(Record),
    Reset,
}

/// Collection listener.
pub type CollectionListener = Rc<dyn Fn(&CollectionEvent) -> Result<(), ViewError>>;

struct CollectionInner {
    records: RefCell<Vec<Record>>,
    listeners: RefCell<Vec<(usize, CollectionListener)>>,
    next_id: Cell<usize>,
    length: Signal<usize>,
}

/// Shared handle to an observable collection. Clones share state.
#[derive(Clone)]
pub struct Collection {
    inner: Rc<CollectionInner>,
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl Collection {
    pub fn new() -> Self {
        Self::from_records(Vec::new())
    }

    /// Collection pre-filled without notifications.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut unique: Vec<Record> = Vec::new();
        for record in records {
            if !unique.contains(&record) {
                unique.push(record);
            }
        }
        let length = signal(unique.len());
        Self {
            inner: Rc::new(CollectionInner {
                records: RefCell::new(unique),
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                length,
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn len(&self) -> usize {
        self.inner.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.records.borrow().is_empty()
    }

    /// Snapshot of the records in order.
    pub fn records(&self) -> Vec<Record> {
        self.inner.records.borrow().clone()
    }

    pub fn at(&self, index: usize) -> Option<Record> {
        self.inner.records.borrow().get(index).cloned()
    }

    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.inner
            .records
            .borrow()
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.inner.records.borrow().contains(record)
    }

    /// Reactive length. Reading it inside an effect or derived tracks it.
    pub fn length(&self) -> usize {
        self.inner.length.get()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Append a record. Adding a member again is a no-op.
    pub fn add(&self, record: Record) -> Result<(), ViewError> {
        {
            let mut records = self.inner.records.borrow_mut();
            if records.contains(&record) {
                return Ok(());
            }
            records.push(record.clone());
        }
        self.sync_length();
        self.trigger(&CollectionEvent::Added(record))
    }

    /// Remove a record. Removing a non-member is a no-op.
    pub fn remove(&self, record: &Record) -> Result<(), ViewError> {
        let removed = {
            let mut records = self.inner.records.borrow_mut();
            let Some(position) = records.iter().position(|r| r == record) else {
                return Ok(());
            };
            records.remove(position)
        };
        self.sync_length();
        self.trigger(&CollectionEvent::Removed(removed))
    }

    /// Replace every record, then notify once.
    pub fn reset(&self, records: impl IntoIterator<Item = Record>) -> Result<(), ViewError> {
        {
            let mut current = self.inner.records.borrow_mut();
            current.clear();
            for record in records {
                if !current.contains(&record) {
                    current.push(record);
                }
            }
        }
        self.sync_length();
        self.trigger(&CollectionEvent::Reset)
    }

    fn sync_length(&self) {
        let len = self.len();
        if self.inner.length.get() != len {
            self.inner.length.set(len);
        }
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Register a listener.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CollectionEvent) -> Result<(), ViewError> + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        let weak: Weak<CollectionInner> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .listeners
                    .borrow_mut()
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Notify listeners without mutating. Returns the first listener error.
    pub fn trigger(&self, event: &CollectionEvent) -> Result<(), ViewError> {
        let snapshot: Vec<CollectionListener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        let mut first_error = None;
        for listener in snapshot {
            let result = listener(event);
            if first_error.is_none() {
                first_error = result.err();
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("records", &*self.inner.records.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(collection: &Collection) -> (Subscription, Rc<RefCell<Vec<CollectionEvent>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let sub = collection.subscribe(move |event| {
            seen_clone.borrow_mut().push(event.clone());
            Ok(())
        });
        (sub, seen)
    }

    #[test]
    fn test_add_notifies_once() {
        let collection = Collection::new();
        let (_sub, seen) = recorder(&collection);
        let a = Record::anonymous();

        collection.add(a.clone()).unwrap();
        collection.add(a.clone()).unwrap();

        assert_eq!(collection.len(), 1);
        assert_eq!(*seen.borrow(), vec![CollectionEvent::Added(a)]);
    }

    #[test]
    fn test_remove_non_member_is_silent() {
        let collection = Collection::new();
        let (_sub, seen) = recorder(&collection);

        collection.remove(&Record::anonymous()).unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_reset_replaces_and_notifies() {
        let a = Record::anonymous();
        let b = Record::anonymous();
        let collection = Collection::from_records([a.clone()]);
        let (_sub, seen) = recorder(&collection);

        collection.reset([b.clone(), b.clone()]).unwrap();

        assert_eq!(collection.records(), vec![b]);
        assert_eq!(*seen.borrow(), vec![CollectionEvent::Reset]);
    }

    #[test]
    fn test_cancelled_listener_not_called() {
        let collection = Collection::new();
        let (sub, seen) = recorder(&collection);
        sub.cancel();

        collection.add(Record::anonymous()).unwrap();
        assert!(seen.borrow().is_empty());
        assert_eq!(collection.listener_count(), 0);
    }

    #[test]
    fn test_listener_error_propagates() {
        let collection = Collection::new();
        let _sub = collection.subscribe(|_| Err(ViewError::MissingChildView));

        let err = collection.add(Record::anonymous()).unwrap_err();
        assert!(matches!(err, ViewError::MissingChildView));
        // The mutation itself still happened
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_failing_listener_does_not_starve_later_listeners() {
        let collection = Collection::new();
        let _failing = collection.subscribe(|_| Err(ViewError::MissingChildView));
        let _also_failing = collection.subscribe(|_| Err(ViewError::Superseded));
        let (_sub, seen) = recorder(&collection);

        let a = Record::anonymous();
        let err = collection.add(a.clone()).unwrap_err();

        assert!(matches!(err, ViewError::MissingChildView));
        assert_eq!(*seen.borrow(), vec![CollectionEvent::Added(a)]);
    }

    #[test]
    fn test_listener_may_mutate_collection() {
        let collection = Collection::new();
        let handle = collection.clone();
        let _sub = collection.subscribe(move |event| match event {
            CollectionEvent::Added(record) if record.get("transient").is_some() => {
                handle.remove(record)
            }
            _ => Ok(()),
        });

        collection.add(Record::new([("transient", "yes")])).unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_length_signal_tracks_size() {
        use spark_signals::effect;

        let collection = Collection::new();
        let observed = Rc::new(Cell::new(usize::MAX));
        let observed_clone = observed.clone();
        let tracked = collection.clone();
        let _effect = effect(move || {
            observed_clone.set(tracked.length());
        });
        assert_eq!(observed.get(), 0);

        let a = Record::anonymous();
        collection.add(a.clone()).unwrap();
        assert_eq!(observed.get(), 1);

        collection.remove(&a).unwrap();
        assert_eq!(observed.get(), 0);
    }
}
