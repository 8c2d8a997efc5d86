//! Collection View - One child view per record, kept in sync.
//!
//! # Lifecycle
//!
//! ## Construction
//! - If a collection is present, subscribe to `Added` / `Removed` / `Reset`.
//!   The subscription is a binding of the view's base and is cancelled on close.
//!
//! ## render()
//! 1. Resolve what to build (a missing child view type fails here, before
//!    anything is torn down)
//! 2. `before_render` hook, `collection:before:render`
//! 3. Close every tracked child
//! 4. Build one child per record, or the empty placeholder
//! 5. Each child: relay its events, store it, emit `item:added`, start its render
//! 6. A task on the executor joins all renders, then fires `on_render` and
//!    `collection:rendered` once
//!
//! ## Reactions
//! - `Added`: build and render one child (replaces the placeholder)
//! - `Removed`: close and forget the child, emit `item:removed` (the view arg is
//!   `Undefined` for untracked records), show the placeholder if now empty
//! - `Reset`: `render()`
//!
//! ## Render cycles
//! Every `render()` and `close()` starts a new generation. A joint completion
//! from an older generation fires no hooks and resolves to
//! [`ViewError::Superseded`] (or [`ViewError::Closed`]).

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::channel::oneshot;
use futures::task::{LocalSpawn, LocalSpawnExt};
use spark_signals::{signal, Signal};
use tracing::{debug, warn};

use super::base::{ChildView, ViewBase, ViewContext, ViewHandle};
use super::factory::{build_child_view, resolve_child_view_type, ChildViewType};
use super::render::{self, PendingRender, RenderHandle, RenderReport};
use crate::engine::{ChildEntry, ChildRegistry, Collection, CollectionEvent};
use crate::error::{ChildRenderFailure, RenderError, ViewError};
use crate::events::{
    relay_child_events, Arg, Event, EventBus, EventKind, FeatureFlags, Subscription,
    DEFAULT_CHILD_VIEW_EVENT_PREFIX,
};
use crate::types::Record;

// =============================================================================
// Configuration
// =============================================================================

/// Overridable steps of a collection view.
pub trait CollectionBehavior {
    /// Runs before `collection:before:render`.
    fn before_render(&self, _view: &CollectionView) {}

    /// Runs once all children of a render have settled, before
    /// `collection:rendered`.
    fn on_render(&self, _view: &CollectionView) {}

    /// Attach a child whose render succeeded to the parent's output.
    fn append_child(&self, _view: &CollectionView, _child: &ViewHandle) {}
}

/// Behavior with every step left empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultBehavior;

impl CollectionBehavior for DefaultBehavior {}

/// Defaults shared by every instance of a kind of collection view.
#[derive(Clone)]
pub struct CollectionViewConfig {
    pub child_view: Option<ChildViewType>,
    pub empty_view: Option<ChildViewType>,
    pub flags: FeatureFlags,
    /// Namespace of relayed child events (`childview:foo`).
    pub child_view_event_prefix: String,
    pub behavior: Rc<dyn CollectionBehavior>,
}

impl Default for CollectionViewConfig {
    fn default() -> Self {
        Self {
            child_view: None,
            empty_view: None,
            flags: FeatureFlags::default(),
            child_view_event_prefix: DEFAULT_CHILD_VIEW_EVENT_PREFIX.to_string(),
            behavior: Rc::new(DefaultBehavior),
        }
    }
}

/// Per-instance options. View types set here win over the config.
#[derive(Clone)]
pub struct CollectionViewOptions {
    pub collection: Option<Collection>,
    pub child_view: Option<ChildViewType>,
    pub empty_view: Option<ChildViewType>,
    /// Executor that drives child renders and the joint completion.
    pub spawner: Rc<dyn LocalSpawn>,
}

impl CollectionViewOptions {
    pub fn new(spawner: impl LocalSpawn + 'static) -> Self {
        Self {
            collection: None,
            child_view: None,
            empty_view: None,
            spawner: Rc::new(spawner),
        }
    }
}

// =============================================================================
// CollectionView
// =============================================================================

/// Parent view keeping one child per record of a collection.
pub struct CollectionView {
    base: ViewBase,
    config: CollectionViewConfig,
    options: CollectionViewOptions,
    children: RefCell<ChildRegistry>,
    child_count: Signal<usize>,
    generation: Cell<u64>,
    this: Weak<CollectionView>,
}

impl CollectionView {
    pub fn new(config: CollectionViewConfig, options: CollectionViewOptions) -> Rc<Self> {
        let context = ViewContext {
            flags: config.flags,
        };
        let view = Rc::new_cyclic(|this| Self {
            base: ViewBase::new(None, &context),
            config,
            options,
            children: RefCell::new(ChildRegistry::new()),
            child_count: signal(0),
            generation: Cell::new(0),
            this: this.clone(),
        });
        view.initial_events();
        view
    }

    fn initial_events(&self) {
        let Some(collection) = &self.options.collection else {
            return;
        };

        let this = self.this.clone();
        let subscription = collection.subscribe(move |event| {
            let Some(view) = this.upgrade() else {
                return Ok(());
            };
            match event {
                CollectionEvent::Added(record) => view.add_child_view(record),
                CollectionEvent::Removed(record) => view.remove_child_view(record),
                CollectionEvent::Reset => view.render().map(|_handle| ()),
            }
        });
        self.base.bind(subscription);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn base(&self) -> &ViewBase {
        &self.base
    }

    pub fn events(&self) -> &EventBus {
        self.base.events()
    }

    pub fn on<F>(&self, kind: impl Into<EventKind>, listener: F) -> Subscription
    where
        F: Fn(&Event) + 'static,
    {
        self.base.on(kind, listener)
    }

    pub fn on_any<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Event) + 'static,
    {
        self.base.on_any(listener)
    }

    pub fn collection(&self) -> Option<&Collection> {
        self.options.collection.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.base.is_closed()
    }

    /// Current render generation.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Number of record children (placeholder excluded).
    ///
    /// Reactive: reading it inside an effect or derived tracks it.
    pub fn child_count(&self) -> usize {
        self.child_count.get()
    }

    /// The child count signal, for deriveds that outlive a borrow of the view.
    pub fn child_count_signal(&self) -> Signal<usize> {
        self.child_count.clone()
    }

    /// Record children in the order they were added.
    pub fn children(&self) -> Vec<ViewHandle> {
        self.children.borrow().views()
    }

    pub fn child_for(&self, record: &Record) -> Option<ViewHandle> {
        self.children
            .borrow()
            .get(&record.id())
            .map(|entry| entry.view.clone())
    }

    /// The empty placeholder, if shown.
    pub fn empty_view(&self) -> Option<ViewHandle> {
        self.children
            .borrow()
            .placeholder()
            .map(|entry| entry.view.clone())
    }

    pub fn has_empty_view(&self) -> bool {
        self.children.borrow().placeholder().is_some()
    }

    // =========================================================================
    // Child View Factory
    // =========================================================================

    /// Child view type for ordinary records.
    pub fn resolve_child_view_type(&self) -> Result<ChildViewType, ViewError> {
        resolve_child_view_type(
            self.options.child_view.as_ref(),
            self.config.child_view.as_ref(),
        )
    }

    /// Empty placeholder type, if one is configured.
    pub fn resolve_empty_view_type(&self) -> Option<ChildViewType> {
        self.options
            .empty_view
            .as_ref()
            .or(self.config.empty_view.as_ref())
            .cloned()
    }

    /// Build a child and relay its events to this view.
    fn build_child(&self, record: Record, view_type: &ChildViewType) -> ViewHandle {
        let context = ViewContext {
            flags: self.config.flags,
        };
        let view = build_child_view(record, view_type, &context);

        // Dropped by the child's own close
        relay_child_events(
            self.base.events(),
            &view,
            &self.config.child_view_event_prefix,
            self.config.flags,
        )
        .forget();

        view
    }

    // =========================================================================
    // Render
    // =========================================================================

    /// Tear down and rebuild every child.
    ///
    /// Returns immediately; the handle resolves once every child render has
    /// settled. A missing child view type is returned here, synchronously, and
    /// leaves the current children untouched.
    pub fn render(&self) -> Result<RenderHandle, ViewError> {
        if self.is_closed() {
            return Err(ViewError::Closed);
        }
        self.options.spawner.status_local()?;

        let records = self
            .options
            .collection
            .as_ref()
            .map(Collection::records)
            .unwrap_or_default();

        let placeholder = if records.is_empty() {
            self.resolve_empty_view_type()
        } else {
            None
        };
        let child_view = if records.is_empty() {
            None
        } else {
            Some(self.resolve_child_view_type()?)
        };

        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        debug!(generation, records = records.len(), "rendering collection view");

        self.config.behavior.before_render(self);
        self.base.trigger(EventKind::BeforeRender, vec![]);

        self.close_children();

        let mut pending = Vec::new();
        if let Some(empty_view) = placeholder {
            pending.extend(self.show_empty_view(&empty_view));
        } else if let Some(child_view) = child_view {
            for record in records {
                // `item:added` listeners may mutate the collection or this view
                if self.is_closed() || self.generation.get() != generation {
                    break;
                }
                if !self.is_member(&record) {
                    debug!(record = %record.id(), "record left the collection during render");
                    continue;
                }
                pending.extend(self.add_item_view(record, &child_view));
            }
        }

        let rendered = pending.len();
        let (sender, receiver) = oneshot::channel();
        let this = self.this.clone();
        self.options.spawner.spawn_local(async move {
            let failures = render::settle_all(pending, this.clone()).await;
            let result = match this.upgrade() {
                Some(view) => view.finish_render(generation, rendered, failures),
                None => Err(ViewError::Closed),
            };
            // The caller may have dropped the handle
            let _ = sender.send(result);
        })?;

        Ok(RenderHandle::new(generation, receiver))
    }

    fn finish_render(
        &self,
        generation: u64,
        rendered: usize,
        failures: Vec<ChildRenderFailure>,
    ) -> Result<RenderReport, ViewError> {
        if self.is_closed() {
            return Err(ViewError::Closed);
        }
        if generation != self.generation.get() {
            debug!(generation, current = self.generation.get(), "discarding stale render");
            return Err(ViewError::Superseded);
        }

        if !failures.is_empty() {
            warn!(generation, failed = failures.len(), rendered, "collection render finished with failures");
        }

        self.config.behavior.on_render(self);
        self.base.trigger(EventKind::Rendered, vec![]);
        debug!(generation, rendered, "collection view rendered");

        if failures.is_empty() {
            Ok(RenderReport {
                generation,
                rendered,
            })
        } else {
            Err(ViewError::ChildRenders(failures))
        }
    }

    /// Called by the aggregator as each child settles.
    pub(crate) fn child_settled(
        &self,
        record: &Record,
        view: &ViewHandle,
        error: Option<&RenderError>,
    ) {
        if self.is_closed() || view.base().is_closed() {
            return;
        }
        match error {
            None => self.config.behavior.append_child(self, view),
            Some(error) => {
                warn!(record = %record.id(), %error, "child view failed to render");
                self.base.trigger(
                    EventKind::ItemRenderFailed,
                    vec![Arg::Record(record.clone()), Arg::Text(error.to_string())],
                );
            }
        }
    }

    /// Build, relay, store and start rendering a child for `record`.
    fn add_item_view(&self, record: Record, view_type: &ChildViewType) -> Option<PendingRender> {
        if self.children.borrow().contains(&record.id()) {
            warn!(record = %record.id(), "record already has a child view, ignoring");
            return None;
        }

        let view = self.build_child(record.clone(), view_type);
        let inserted = self
            .children
            .borrow_mut()
            .insert(ChildEntry::new(record.clone(), view.clone()));
        if let Err(entry) = inserted {
            warn!(record = %record.id(), "record already has a child view, ignoring");
            entry.view.close();
            return None;
        }
        self.sync_child_count();

        self.base
            .trigger(EventKind::ItemAdded, vec![Arg::View(view.clone())]);

        let future = view.render();
        Some(PendingRender {
            record,
            view,
            future,
        })
    }

    /// Build the placeholder bound to a throwaway record.
    fn show_empty_view(&self, view_type: &ChildViewType) -> Option<PendingRender> {
        let record = Record::anonymous();
        let view = self.build_child(record.clone(), view_type);

        let previous = self
            .children
            .borrow_mut()
            .set_placeholder(ChildEntry::new(record.clone(), view.clone()));
        if let Some(previous) = previous {
            previous.view.close();
        }

        self.base
            .trigger(EventKind::ItemAdded, vec![Arg::View(view.clone())]);

        let future = view.render();
        Some(PendingRender {
            record,
            view,
            future,
        })
    }

    /// Settle a single child on the executor.
    ///
    /// If the executor refuses, the child is forgotten and closed again.
    fn spawn_settle(&self, pending: PendingRender) -> Result<(), ViewError> {
        let record = pending.record.clone();
        let this = self.this.clone();
        let spawned = self.options.spawner.spawn_local(async move {
            render::settle(pending, this).await;
        });

        if let Err(error) = spawned {
            warn!(record = %record.id(), %error, "executor refused child render");
            self.discard_child(&record);
            return Err(error.into());
        }
        Ok(())
    }

    fn discard_child(&self, record: &Record) {
        let entry = {
            let mut children = self.children.borrow_mut();
            let is_placeholder = children
                .placeholder()
                .is_some_and(|entry| entry.record == *record);
            if is_placeholder {
                children.take_placeholder()
            } else {
                children.take(&record.id())
            }
        };
        if let Some(entry) = entry {
            self.sync_child_count();
            entry.view.close();
        }
    }

    fn is_member(&self, record: &Record) -> bool {
        self.options
            .collection
            .as_ref()
            .is_some_and(|collection| collection.contains(record))
    }

    // =========================================================================
    // Collection Reactions
    // =========================================================================

    /// React to `Added`.
    fn add_child_view(&self, record: &Record) -> Result<(), ViewError> {
        if self.is_closed() {
            return Ok(());
        }
        let view_type = self.resolve_child_view_type()?;
        self.close_empty_view();

        match self.add_item_view(record.clone(), &view_type) {
            Some(pending) => self.spawn_settle(pending),
            None => Ok(()),
        }
    }

    /// React to `Removed`.
    fn remove_child_view(&self, record: &Record) -> Result<(), ViewError> {
        if self.is_closed() {
            return Ok(());
        }

        let entry = self.children.borrow_mut().take(&record.id());
        let view = entry.map(|entry| {
            self.sync_child_count();
            entry.view.close();
            entry.view
        });
        if view.is_none() {
            debug!(record = %record.id(), "removed record had no child view");
        }

        self.base.trigger(EventKind::ItemRemoved, vec![Arg::from(view)]);
        self.check_empty()
    }

    /// Show the placeholder if the collection just became empty.
    ///
    /// A view that was never rendered shows nothing.
    fn check_empty(&self) -> Result<(), ViewError> {
        let Some(collection) = &self.options.collection else {
            return Ok(());
        };
        if self.generation.get() == 0 || self.is_closed() {
            return Ok(());
        }
        if !collection.is_empty() || self.has_empty_view() {
            return Ok(());
        }
        let Some(empty_view) = self.resolve_empty_view_type() else {
            return Ok(());
        };

        match self.show_empty_view(&empty_view) {
            Some(pending) => self.spawn_settle(pending),
            None => Ok(()),
        }
    }

    fn close_empty_view(&self) {
        let placeholder = self.children.borrow_mut().take_placeholder();
        if let Some(entry) = placeholder {
            entry.view.close();
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Close every child and the placeholder, then forget them.
    pub fn close_children(&self) {
        let drained = self.children.borrow_mut().drain();
        self.sync_child_count();
        for entry in drained {
            entry.view.close();
        }
    }

    /// Close children, detach from the collection, and stop emitting.
    ///
    /// Returns `false` if the view was already closed.
    pub fn close(&self) -> bool {
        let closed = self.base.close_with(
            || {
                self.generation.set(self.generation.get() + 1);
                self.base.trigger(EventKind::BeforeClose, vec![]);
                self.close_children();
            },
            || self.base.trigger(EventKind::Closed, vec![]),
        );
        if closed {
            debug!("collection view closed");
        }
        closed
    }

    fn sync_child_count(&self) {
        let len = self.children.borrow().len();
        if self.child_count.get() != len {
            self.child_count.set(len);
        }
    }
}

impl Drop for CollectionView {
    fn drop(&mut self) {
        // Cancel the collection subscription if close() never ran
        self.base.unbind_all();
    }
}
