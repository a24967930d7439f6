//! # Bridges to external event systems.
//!
//! A [`Bridge`] mirrors signal activity into a foreign event system. It is
//! called in addition to the signal's own behavior, never instead of it:
//!
//! - `register` once, when a named signal is built with the bridge;
//! - `connected` / `disconnected` when the default registry mutation actually happened;
//! - `publish` on every fire unless [`FireOptions::notify_external`](crate::FireOptions) is off.
//!
//! `publish` may answer synchronously or with a future. A pending publish does
//! not take a slot in [`Results`](crate::Results) but the aggregate is not
//! `done` until it settles. A failed publish is logged and otherwise ignored.
//!
//! With the `logging` feature, [`LogBridge`] prints activity to stdout.

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogBridge;

use crate::handlers::Deferred;

/// Capability set of an external event-system bridge.
pub trait Bridge<A>: Send + Sync + 'static {
    /// Announces a signal name.
    fn register(&self, _signal: &str) {}

    /// A handler was added to the signal.
    fn connected(&self, _signal: Option<&str>, _handler: &str) {}

    /// A handler was removed from the signal.
    fn disconnected(&self, _signal: Option<&str>, _handler: &str) {}

    /// Publishes one fire.
    fn publish(&self, signal: Option<&str>, args: &A) -> Deferred<anyhow::Result<()>>;
}
