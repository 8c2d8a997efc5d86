//! Feature flags - Minor behavioral variants of event handling.
//!
//! Flags are passed explicitly through configuration. There is no global
//! registry to toggle.

use bitflags::bitflags;

bitflags! {
    /// Behavioral toggles consulted when children are built and relayed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct FeatureFlags: u8 {
        /// Namespace relayed child events with the configured prefix.
        const CHILD_VIEW_EVENT_PREFIX = 1 << 0;
        /// Mapped UI events stop propagating once handled by a trigger.
        const TRIGGERS_STOP_PROPAGATION = 1 << 1;
        /// Mapped UI events have their default action prevented.
        const TRIGGERS_PREVENT_DEFAULT = 1 << 2;
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::all()
    }
}

impl FeatureFlags {
    /// Check a flag by its external name (`childViewEventPrefix`, ...).
    ///
    /// Unknown names are disabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        match name {
            "childViewEventPrefix" => self.contains(Self::CHILD_VIEW_EVENT_PREFIX),
            "triggersStopPropagation" => self.contains(Self::TRIGGERS_STOP_PROPAGATION),
            "triggersPreventDefault" => self.contains(Self::TRIGGERS_PREVENT_DEFAULT),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_everything() {
        let flags = FeatureFlags::default();
        assert!(flags.is_enabled("childViewEventPrefix"));
        assert!(flags.is_enabled("triggersStopPropagation"));
        assert!(flags.is_enabled("triggersPreventDefault"));
    }

    #[test]
    fn test_lookup_by_name() {
        let flags = FeatureFlags::TRIGGERS_PREVENT_DEFAULT;
        assert!(!flags.is_enabled("childViewEventPrefix"));
        assert!(flags.is_enabled("triggersPreventDefault"));
        assert!(!flags.is_enabled("doesNotExist"));
    }
}
