//! Dispatch core: signals and their registries.
//!
//! The main public API from this module is [`Signal`], built through
//! [`SignalBuilder`] from a [`SignalConfig`].
//!
//! Internal modules:
//! - [`registry`]: copy-on-write list of weak subscribers;
//! - [`dispatch`]: default connect, disconnect and delivery;
//! - [`wrappers`]: contexts handed to operation wrappers;
//! - [`signal`]: the public operations and per-fire options;
//! - [`builder`]: signal construction.

mod builder;
mod config;
mod dispatch;
mod registry;
mod signal;
mod wrappers;

pub use builder::SignalBuilder;
pub use config::{ExecMode, HandlerOrder, SignalConfig};
pub use registry::{EntryInfo, Registry};
pub use signal::{FireOptions, Signal};
pub use wrappers::{ConnectCtx, ConnectWrapper, FireCtx, FireWrapper, Mutation, Validator};
