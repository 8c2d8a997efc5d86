//! Events - Typed bus, subscriptions, feature flags and the child relay.
//!
//! - [`EventBus`] - Per-view emitter with named and any-event listeners
//! - [`Subscription`] / [`Bindings`] - Detachable listener handles
//! - [`FeatureFlags`] - Injected toggles (prefixing, trigger propagation)
//! - [`relay_child_events`] - Child → parent forwarding

mod bus;
mod flags;
mod relay;
mod subscription;

pub use bus::*;
pub use flags::*;
pub use relay::*;
pub use subscription::*;
