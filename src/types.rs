//! Core types - Record identity and attributes.
//!
//! A [`Record`] is the data unit a collection holds and a child view is bound
//! to. Records are cheap handles (`Rc` inside): cloning a record never copies
//! its attributes, and two clones always share identity.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

// =============================================================================
// RecordId
// =============================================================================

thread_local! {
    /// Counter for generating record ids.
    static ID_COUNTER: Cell<u64> = const { Cell::new(0) };
}

/// Stable identity token of a record (`c0`, `c1`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

impl RecordId {
    /// Generate the next id for this thread.
    pub fn next() -> Self {
        ID_COUNTER.with(|counter| {
            let id = counter.get();
            counter.set(id + 1);
            RecordId(id)
        })
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

// =============================================================================
// Record
// =============================================================================

struct RecordInner {
    id: RecordId,
    attributes: RefCell<BTreeMap<String, String>>,
}

/// Identity-bearing data unit.
///
/// Equality is identity: two records are equal only if they share an id.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RecordInner>,
}

impl Record {
    /// Create a record with the given attributes.
    pub fn new<K, V>(attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let attributes = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            inner: Rc::new(RecordInner {
                id: RecordId::next(),
                attributes: RefCell::new(attributes),
            }),
        }
    }

    /// Create a fresh record with no attributes and no collection membership.
    ///
    /// Used for the empty placeholder view.
    pub fn anonymous() -> Self {
        Self::new(std::iter::empty::<(String, String)>())
    }

    pub fn id(&self) -> RecordId {
        self.inner.id
    }

    /// Get an attribute value.
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.attributes.borrow().get(key).cloned()
    }

    /// Set an attribute value, returning the previous one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.inner
            .attributes
            .borrow_mut()
            .insert(key.into(), value.into())
    }

    /// Snapshot of all attributes.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.inner.attributes.borrow().clone()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Record {}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.inner.id)
            .field("attributes", &*self.inner.attributes.borrow())
            .finish()
    }
}
