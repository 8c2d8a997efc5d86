//! # spark-collection-view
//!
//! Keep one child view per record of an observable collection.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for the
//! reactive counts a UI can bind to.
//!
//! ## Architecture
//!
//! ```text
//! Collection ──Added/Removed/Reset──→ CollectionView ──build──→ ChildView × N
//!                                          ↑                        │
//!                                          └──── relayed events ────┘
//! ```
//!
//! Rendering is asynchronous: every child render is a future, and the
//! collection view reports one joint completion per render cycle through a
//! [`RenderHandle`]. Everything is single-threaded (`Rc`, not `Arc`); futures
//! run on an injected [`futures::task::LocalSpawn`] executor.
//!
//! ## Modules
//!
//! - [`types`] - Records and record identity
//! - [`engine`] - Observable collection, child registry
//! - [`events`] - Event bus, subscriptions, feature flags, child relay
//! - [`view`] - Child view contract, factory, render aggregation, collection view
//! - [`error`] - Render and view errors

pub mod engine;
pub mod error;
pub mod events;
pub mod types;
pub mod view;

// Re-export commonly used items
pub use types::*;

pub use error::{ChildRenderFailure, RenderError, ViewError};

pub use engine::{ChildEntry, ChildRegistry, Collection, CollectionEvent, CollectionListener};

pub use events::{
    // Bus
    Arg, Event, EventBus, EventKind, Listener,
    // Subscriptions
    Bindings, Cleanup, Subscription,
    // Flags & relay
    FeatureFlags, relay_child_events, relayed_name, DEFAULT_CHILD_VIEW_EVENT_PREFIX,
};

pub use view::{
    // Child views
    ChildView, RenderFuture, UiEvent, ViewBase, ViewContext, ViewHandle, render_failed,
    rendered,
    // Factory
    BuildView, ChildViewType, ViewConstructor, build_child_view, resolve_child_view_type,
    // Collection view
    CollectionBehavior, CollectionView, CollectionViewConfig, CollectionViewOptions,
    DefaultBehavior, RenderHandle, RenderReport,
};
