//! # LogBridge - simple activity printer
//!
//! A minimal bridge that prints signal activity to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [register] signal="click"
//! [connect] signal="click" handler="on_click"
//! [fire] signal="click" args=(1, "a")
//! [disconnect] signal="click" handler="on_click"
//! ```

use std::fmt::Debug;

use crate::bridge::Bridge;
use crate::handlers::Deferred;

/// Activity printer bridge.
#[derive(Default, Debug)]
pub struct LogBridge;

impl LogBridge {
    /// Construct a new [`LogBridge`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<A: Debug> Bridge<A> for LogBridge {
    fn register(&self, signal: &str) {
        println!("[register] signal={signal:?}");
    }

    fn connected(&self, signal: Option<&str>, handler: &str) {
        println!(
            "[connect] signal={:?} handler={handler:?}",
            signal.unwrap_or("anonymous")
        );
    }

    fn disconnected(&self, signal: Option<&str>, handler: &str) {
        println!(
            "[disconnect] signal={:?} handler={handler:?}",
            signal.unwrap_or("anonymous")
        );
    }

    fn publish(&self, signal: Option<&str>, args: &A) -> Deferred<anyhow::Result<()>> {
        println!(
            "[fire] signal={:?} args={args:?}",
            signal.unwrap_or("anonymous")
        );
        Deferred::ready(Ok(()))
    }
}
