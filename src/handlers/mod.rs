//! # Handlers and the weak handles signals keep to them.
//!
//! This module provides the handler-related types:
//! - [`Handler`] - trait for anything a signal can invoke
//! - [`Deferred`] - "value now or future later" outcome shared by handlers and wrappers
//! - [`HandlerFn`] / [`AsyncHandlerFn`] - closure-backed handlers
//! - [`HandlerRef`] - shared, type-erased handler (`Arc<dyn Handler>`)
//! - [`Subscriber`] - weak registry entry target (plain handler or bound method)
//!
//! ## Architecture
//! ```text
//! Arc<HandlerFn> ──downgrade──► Subscriber ──► Registry entry
//!        ▲                                         │ snapshot()
//!        └──────────── upgrade (if alive) ◄────────┘
//!                          │
//!                          ▼
//!                 Handler::call(&args) ──► Deferred::Ready(result)
//!                                     └──► Deferred::Pending(future)
//! ```

mod handler;
mod handler_fn;
mod subscriber;

pub use handler::{Deferred, Handler, HandlerRef};
pub use handler_fn::{AsyncHandlerFn, HandlerFn};
pub use subscriber::Subscriber;
