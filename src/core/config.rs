//! # Per-signal configuration.
//!
//! Provides [`SignalConfig`], the settings a [`Signal`](crate::Signal) is built from.
//!
//! Config is used in two ways:
//! 1. **Standalone signals**: `Signal::builder().config(cfg)` or `SignalBuilder::new(cfg)`
//! 2. **Class members**: `ClassSpec::root(..).signal::<A, R>("click", cfg)`; the
//!    member name becomes the signal name.
//!
//! ## Defaults
//! - unnamed
//! - [`ExecMode::Sequential`] (pending handlers are joined one after the other)
//! - [`HandlerOrder::AncestorsFirst`] (class-declared handlers of base classes run first)

use std::sync::Arc;

/// How the pending slots of one fire are driven when the aggregate is joined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecMode {
    /// Slot *i+1* is not polled until slot *i* has settled.
    #[default]
    Sequential,
    /// All pending slots are polled together; results keep snapshot order.
    Concurrent,
}

/// Traversal policy used when connecting handlers declared across a class hierarchy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandlerOrder {
    /// Root class handlers first, leaf class handlers last.
    #[default]
    AncestorsFirst,
    /// Leaf class handlers first, root class handlers last.
    LeavesFirst,
}

/// Configuration for one signal.
///
/// ## Field semantics
/// - `name`: used in logs, error reports and bridge registration
/// - `mode`: evaluation of pending handler slots ([`ExecMode`])
/// - `order`: hierarchy traversal for class-declared handlers ([`HandlerOrder`])
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignalConfig {
    /// Optional signal name.
    pub name: Option<Arc<str>>,
    /// Evaluation of pending slots.
    pub mode: ExecMode,
    /// Traversal policy for class-declared handlers.
    pub order: HandlerOrder,
}

impl SignalConfig {
    /// Returns a copy of the config with `name` set.
    #[must_use]
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns a copy of the config using [`ExecMode::Concurrent`].
    #[must_use]
    pub fn concurrent(mut self) -> Self {
        self.mode = ExecMode::Concurrent;
        self
    }

    /// Returns a copy of the config using `order`.
    #[must_use]
    pub fn ordered(mut self, order: HandlerOrder) -> Self {
        self.order = order;
        self
    }

    /// Returns `true` when pending slots are driven together.
    #[inline]
    pub fn is_concurrent(&self) -> bool {
        self.mode == ExecMode::Concurrent
    }

    /// Signal name, if any.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sequential_and_ancestors_first() {
        let cfg = SignalConfig::default();
        assert_eq!(cfg.mode, ExecMode::Sequential);
        assert_eq!(cfg.order, HandlerOrder::AncestorsFirst);
        assert!(cfg.name().is_none());
        assert!(!cfg.is_concurrent());
    }

    #[test]
    fn helpers_compose() {
        let cfg = SignalConfig::default()
            .named("click")
            .concurrent()
            .ordered(HandlerOrder::LeavesFirst);
        assert_eq!(cfg.name(), Some("click"));
        assert!(cfg.is_concurrent());
        assert_eq!(cfg.order, HandlerOrder::LeavesFirst);
    }
}
