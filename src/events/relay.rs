//! Event Relay - Re-emit child events on the parent.
//!
//! Every event a child emits `(name, args...)` reaches the parent as
//! `(prefix:name, child, args...)`. The relay is an any-event subscription on
//! the child's bus, so it is dropped with the rest of the child's listeners
//! when the child closes.

use std::rc::Rc;

use super::bus::{Arg, Event, EventBus, EventKind};
use super::flags::FeatureFlags;
use super::subscription::Subscription;
use crate::view::ViewHandle;

/// Default namespace for relayed child events.
pub const DEFAULT_CHILD_VIEW_EVENT_PREFIX: &str = "childview";

/// Name a child event takes on the parent.
pub fn relayed_name(name: &str, prefix: &str, flags: FeatureFlags) -> String {
    if flags.contains(FeatureFlags::CHILD_VIEW_EVENT_PREFIX) && !prefix.is_empty() {
        format!("{prefix}:{name}")
    } else {
        name.to_string()
    }
}

/// Forward every event of `child` to `parent`.
///
/// The relay holds the child weakly; events emitted while the child is being
/// dropped are not forwarded.
pub fn relay_child_events(
    parent: &EventBus,
    child: &ViewHandle,
    prefix: &str,
    flags: FeatureFlags,
) -> Subscription {
    let parent = parent.clone();
    let weak_child = Rc::downgrade(child);
    let prefix = prefix.to_string();

    child.base().on_any(move |event: &Event| {
        let Some(child) = weak_child.upgrade() else {
            return;
        };

        let mut args = Vec::with_capacity(event.args.len() + 1);
        args.push(Arg::View(child));
        args.extend(event.args.iter().cloned());

        let name = relayed_name(event.name(), &prefix, flags);
        parent.trigger(&Event::new(EventKind::from_name(&name), args));
    })
}
