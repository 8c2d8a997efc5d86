//! Event Bus - Typed events with per-name and any-event subscriptions.
//!
//! # API
//!
//! - `on(kind, fn)` - Subscribe to one event kind
//! - `on_any(fn)` - Subscribe to every event this bus emits
//! - `emit(kind, args)` - Dispatch to named listeners, then any-event listeners
//! - `off_all()` - Drop every listener
//!
//! Listeners are snapshotted before dispatch, so a listener may subscribe,
//! unsubscribe or emit again on the same bus without a borrow conflict.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::subscription::Subscription;
use crate::types::Record;
use crate::view::ViewHandle;

// =============================================================================
// TYPES
// =============================================================================

/// Lifecycle and custom event kinds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `collection:before:render`
    BeforeRender,
    /// `collection:rendered`
    Rendered,
    /// `item:added` with the new child view
    ItemAdded,
    /// `item:removed` with the closed child view, or `Undefined`
    ItemRemoved,
    /// `item:render:failed` with the record and the failure message
    ItemRenderFailed,
    /// `collection:before:close`
    BeforeClose,
    /// `collection:closed`
    Closed,
    /// `before:close` on a single view
    ViewBeforeClose,
    /// `close` on a single view
    ViewClose,
    /// Any other event name.
    Custom(String),
}

impl EventKind {
    pub fn name(&self) -> &str {
        match self {
            EventKind::BeforeRender => "collection:before:render",
            EventKind::Rendered => "collection:rendered",
            EventKind::ItemAdded => "item:added",
            EventKind::ItemRemoved => "item:removed",
            EventKind::ItemRenderFailed => "item:render:failed",
            EventKind::BeforeClose => "collection:before:close",
            EventKind::Closed => "collection:closed",
            EventKind::ViewBeforeClose => "before:close",
            EventKind::ViewClose => "close",
            EventKind::Custom(name) => name,
        }
    }

    /// Parse a name, mapping known lifecycle names back to their variant.
    pub fn from_name(name: &str) -> Self {
        match name {
            "collection:before:render" => EventKind::BeforeRender,
            "collection:rendered" => EventKind::Rendered,
            "item:added" => EventKind::ItemAdded,
            "item:removed" => EventKind::ItemRemoved,
            "item:render:failed" => EventKind::ItemRenderFailed,
            "collection:before:close" => EventKind::BeforeClose,
            "collection:closed" => EventKind::Closed,
            "before:close" => EventKind::ViewBeforeClose,
            "close" => EventKind::ViewClose,
            other => EventKind::Custom(other.to_string()),
        }
    }
}

impl From<&str> for EventKind {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event argument.
#[derive(Clone)]
pub enum Arg {
    /// No value (e.g. removal of an untracked record).
    Undefined,
    Bool(bool),
    Int(i64),
    Text(String),
    Record(Record),
    View(ViewHandle),
}

impl Arg {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Arg::Undefined)
    }

    pub fn as_view(&self) -> Option<&ViewHandle> {
        match self {
            Arg::View(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Arg::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Arg::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Undefined => f.write_str("Undefined"),
            Arg::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Arg::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Arg::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Arg::Record(r) => f.debug_tuple("Record").field(&r.id()).finish(),
            Arg::View(v) => f
                .debug_tuple("View")
                .field(&v.base().record().map(|r| r.id()))
                .finish(),
        }
    }
}

impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Arg::Undefined, Arg::Undefined) => true,
            (Arg::Bool(a), Arg::Bool(b)) => a == b,
            (Arg::Int(a), Arg::Int(b)) => a == b,
            (Arg::Text(a), Arg::Text(b)) => a == b,
            (Arg::Record(a), Arg::Record(b)) => a == b,
            (Arg::View(a), Arg::View(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Text(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Text(value)
    }
}

impl From<Record> for Arg {
    fn from(value: Record) -> Self {
        Arg::Record(value)
    }
}

impl From<ViewHandle> for Arg {
    fn from(value: ViewHandle) -> Self {
        Arg::View(value)
    }
}

impl From<Option<ViewHandle>> for Arg {
    fn from(value: Option<ViewHandle>) -> Self {
        value.map_or(Arg::Undefined, Arg::View)
    }
}

/// An emitted event.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub args: Vec<Arg>,
}

impl Event {
    pub fn new(kind: impl Into<EventKind>, args: Vec<Arg>) -> Self {
        Self {
            kind: kind.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn arg(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }
}

/// Event listener.
pub type Listener = Rc<dyn Fn(&Event)>;

// =============================================================================
// LISTENER REGISTRY
// =============================================================================

#[derive(Default)]
struct Listeners {
    named: HashMap<EventKind, Vec<(usize, Listener)>>,
    any: Vec<(usize, Listener)>,
    next_id: usize,
}

impl Listeners {
    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn snapshot(&self, kind: &EventKind) -> Vec<Listener> {
        let named = self.named.get(kind).into_iter().flatten();
        named
            .chain(self.any.iter())
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.named.values().map(Vec::len).sum::<usize>() + self.any.len()
    }
}

/// Emitter owned by a view. Clones share the same listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Rc<RefCell<Listeners>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event kind.
    pub fn on<F>(&self, kind: impl Into<EventKind>, listener: F) -> Subscription
    where
        F: Fn(&Event) + 'static,
    {
        let kind = kind.into();
        let id = {
            let mut listeners = self.listeners.borrow_mut();
            let id = listeners.next_id();
            listeners
                .named
                .entry(kind.clone())
                .or_default()
                .push((id, Rc::new(listener)));
            id
        };

        let weak = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            with_listeners(&weak, |listeners| {
                if let Some(list) = listeners.named.get_mut(&kind) {
                    list.retain(|(listener_id, _)| *listener_id != id);
                    if list.is_empty() {
                        listeners.named.remove(&kind);
                    }
                }
            });
        })
    }

    /// Subscribe to every event.
    pub fn on_any<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Event) + 'static,
    {
        let id = {
            let mut listeners = self.listeners.borrow_mut();
            let id = listeners.next_id();
            listeners.any.push((id, Rc::new(listener)));
            id
        };

        let weak = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            with_listeners(&weak, |listeners| {
                listeners.any.retain(|(listener_id, _)| *listener_id != id);
            });
        })
    }

    /// Dispatch an event.
    pub fn trigger(&self, event: &Event) {
        let snapshot = self.listeners.borrow().snapshot(&event.kind);
        for listener in snapshot {
            listener(event);
        }
    }

    /// Build and dispatch an event.
    pub fn emit(&self, kind: impl Into<EventKind>, args: Vec<Arg>) {
        self.trigger(&Event::new(kind, args));
    }

    /// Drop every listener on this bus.
    pub fn off_all(&self) {
        let mut listeners = self.listeners.borrow_mut();
        listeners.named.clear();
        listeners.any.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

fn with_listeners(weak: &Weak<RefCell<Listeners>>, f: impl FnOnce(&mut Listeners)) {
    if let Some(listeners) = weak.upgrade() {
        f(&mut listeners.borrow_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_named_listener_receives_only_its_kind() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let _sub = bus.on("foo", move |event| {
            seen_clone.borrow_mut().push(event.name().to_string());
        });

        bus.emit("foo", vec![]);
        bus.emit("bar", vec![]);

        assert_eq!(*seen.borrow(), vec!["foo".to_string()]);
    }

    #[test]
    fn test_any_listener_receives_everything_after_named() {
        let bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let order_any = order.clone();
        let _any = bus.on_any(move |event| {
            order_any.borrow_mut().push(format!("any:{}", event.name()));
        });
        let order_named = order.clone();
        let _named = bus.on(EventKind::Rendered, move |event| {
            order_named.borrow_mut().push(format!("named:{}", event.name()));
        });

        bus.emit(EventKind::Rendered, vec![]);
        bus.emit("other", vec![Arg::Int(1)]);

        assert_eq!(
            *order.borrow(),
            vec![
                "named:collection:rendered".to_string(),
                "any:collection:rendered".to_string(),
                "any:other".to_string(),
            ]
        );
    }

    #[test]
    fn test_cancel_detaches_listener() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();

        let sub = bus.on_any(move |_| count_clone.set(count_clone.get() + 1));
        bus.emit("a", vec![]);
        sub.cancel();
        bus.emit("a", vec![]);

        assert_eq!(count.get(), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_reenter_bus() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));

        let bus_clone = bus.clone();
        let count_clone = count.clone();
        let _sub = bus.on("ping", move |_| {
            count_clone.set(count_clone.get() + 1);
            // Subscribing during dispatch must not panic
            bus_clone.on("pong", |_| {}).forget();
            bus_clone.emit("pong", vec![]);
        });

        bus.emit("ping", vec![]);
        assert_eq!(count.get(), 1);
        assert_eq!(bus.listener_count(), 2);
    }

    #[test]
    fn test_off_all_clears_listeners() {
        let bus = EventBus::new();
        bus.on("a", |_| {}).forget();
        bus.on_any(|_| {}).forget();
        assert_eq!(bus.listener_count(), 2);

        bus.off_all();
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_known_names_round_trip_to_kinds() {
        assert_eq!(EventKind::from_name("item:added"), EventKind::ItemAdded);
        assert_eq!(EventKind::from_name("close"), EventKind::ViewClose);
        assert_eq!(
            EventKind::from_name("childview:foo"),
            EventKind::Custom("childview:foo".to_string())
        );
    }

    #[test]
    fn test_arg_conversions() {
        assert_eq!(Arg::from(42i64).as_int(), Some(42));
        assert_eq!(Arg::from("x").as_text(), Some("x"));
        assert!(Arg::from(None::<ViewHandle>).is_undefined());
    }
}
