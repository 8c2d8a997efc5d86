//! Base View - The single-view contract every child implements.
//!
//! A child view owns a [`ViewBase`]: its record, its event bus, the bindings
//! it holds on other emitters, and the UI trigger map. Closing the base is
//! idempotent and runs in a fixed order:
//!
//! 1. `before:close` is emitted
//! 2. view-specific teardown runs
//! 3. bindings on other emitters are cancelled
//! 4. `close` is emitted
//! 5. every listener on the view's own bus is dropped (relays included)

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::error::RenderError;
use crate::events::{Arg, Bindings, Event, EventBus, EventKind, FeatureFlags, Subscription};
use crate::types::Record;

// =============================================================================
// Render Types
// =============================================================================

/// Outcome of a child render. Synchronous renders resolve immediately.
pub type RenderFuture = LocalBoxFuture<'static, Result<(), RenderError>>;

/// Shared handle to a child view.
pub type ViewHandle = Rc<dyn ChildView>;

/// A render that already succeeded.
pub fn rendered() -> RenderFuture {
    future::ready(Ok(())).boxed_local()
}

/// A render that already failed.
pub fn render_failed(error: RenderError) -> RenderFuture {
    future::ready(Err(error)).boxed_local()
}

// =============================================================================
// ChildView
// =============================================================================

/// A renderable, closeable unit bound to one record.
pub trait ChildView {
    fn base(&self) -> &ViewBase;

    /// Start rendering. The returned future must not borrow `self`.
    fn render(&self) -> RenderFuture;

    /// Close the view. Returns `false` if it was already closed.
    fn close(&self) -> bool {
        self.base().close()
    }
}

/// Context a parent hands to every child it builds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewContext {
    pub flags: FeatureFlags,
}

// =============================================================================
// UiEvent
// =============================================================================

/// Low-level UI event that triggers can map to view events.
#[derive(Debug, Default)]
pub struct UiEvent {
    name: String,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl UiEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

// =============================================================================
// ViewBase
// =============================================================================

/// State and helpers shared by every view.
pub struct ViewBase {
    record: Option<Record>,
    events: EventBus,
    bindings: RefCell<Bindings>,
    triggers: RefCell<HashMap<String, EventKind>>,
    flags: FeatureFlags,
    closed: Cell<bool>,
}

impl ViewBase {
    pub fn new(record: Option<Record>, context: &ViewContext) -> Self {
        Self {
            record,
            events: EventBus::new(),
            bindings: RefCell::new(Bindings::new()),
            triggers: RefCell::new(HashMap::new()),
            flags: context.flags,
            closed: Cell::new(false),
        }
    }

    /// Base for a view bound to `record`.
    pub fn for_record(record: Record, context: &ViewContext) -> Self {
        Self::new(Some(record), context)
    }

    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Emit an event on this view.
    pub fn trigger(&self, kind: impl Into<EventKind>, args: Vec<Arg>) {
        self.events.emit(kind, args);
    }

    pub fn on<F>(&self, kind: impl Into<EventKind>, listener: F) -> Subscription
    where
        F: Fn(&Event) + 'static,
    {
        self.events.on(kind, listener)
    }

    pub fn on_any<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Event) + 'static,
    {
        self.events.on_any(listener)
    }

    /// Keep a subscription on another emitter until this view closes.
    pub fn bind(&self, subscription: Subscription) {
        self.bindings.borrow_mut().push(subscription);
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.borrow().len()
    }

    /// Cancel every binding this view holds.
    pub fn unbind_all(&self) {
        // Take first: a cancel callback may reach back into this view
        let mut bindings = std::mem::take(&mut *self.bindings.borrow_mut());
        bindings.unbind_all();
    }

    // -------------------------------------------------------------------------
    // Triggers
    // -------------------------------------------------------------------------

    /// Map a UI event name to a view event.
    pub fn add_trigger(&self, ui_event: impl Into<String>, view_event: impl Into<EventKind>) {
        self.triggers
            .borrow_mut()
            .insert(ui_event.into(), view_event.into());
    }

    /// Translate a UI event through the trigger map.
    ///
    /// Returns true if a trigger fired. Propagation and default handling of
    /// the UI event follow the flags the view was built with.
    pub fn handle_ui_event(&self, ui_event: &UiEvent) -> bool {
        if self.is_closed() {
            return false;
        }
        let Some(kind) = self.triggers.borrow().get(ui_event.name()).cloned() else {
            return false;
        };

        if self.flags.contains(FeatureFlags::TRIGGERS_STOP_PROPAGATION) {
            ui_event.stop_propagation();
        }
        if self.flags.contains(FeatureFlags::TRIGGERS_PREVENT_DEFAULT) {
            ui_event.prevent_default();
        }

        let args = self.record.iter().cloned().map(Arg::Record).collect();
        self.trigger(kind, args);
        true
    }

    // -------------------------------------------------------------------------
    // Close
    // -------------------------------------------------------------------------

    /// Close with no extra teardown.
    pub fn close(&self) -> bool {
        self.close_with(|| {}, || {})
    }

    /// Close, running `teardown` before bindings are cancelled and `finished`
    /// after `close` is emitted but while listeners are still attached.
    pub fn close_with(&self, teardown: impl FnOnce(), finished: impl FnOnce()) -> bool {
        if self.closed.replace(true) {
            return false;
        }

        self.trigger(EventKind::ViewBeforeClose, vec![]);
        teardown();
        self.unbind_all();
        self.trigger(EventKind::ViewClose, vec![]);
        finished();
        self.events.off_all();
        true
    }
}
