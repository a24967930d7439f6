//! # sigvisor
//!
//! **Sigvisor** is an in-process signal library for Rust.
//!
//! A [`Signal`] keeps an ordered set of weakly held handlers. Firing it calls
//! every live handler with the same arguments and returns one [`Results`]
//! aggregate, whether the handlers answered synchronously, asynchronously,
//! or both. Connect, disconnect and fire can each be intercepted by a wrapper.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐
//!   │  HandlerFn   │   │AsyncHandlerFn│   │ Subscriber::method   │
//!   │ (sync value) │   │   (future)   │   │ (weak owner + method)│
//!   └──────┬───────┘   └──────┬───────┘   └──────────┬───────────┘
//!          └──────── connect / disconnect ───────────┘
//!                             ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Signal<A, R>                                                     │
//! │  - SignalConfig (name, ExecMode, HandlerOrder)                    │
//! │  - Registry (copy-on-write list of weak entries)                  │
//! │  - wrappers: on_connect / on_disconnect / on_fire, validator      │
//! │  - optional Bridge and owner                                      │
//! └──────┬────────────────────────────────────────────────────┬───────┘
//!        │ fire(args)                                         │ publish
//!        ▼                                                    ▼
//!   snapshot ──► invoke each handler (panics isolated)     Bridge
//!        │          ├─ ready   ─► slot settled
//!        │          └─ pending ─► shared future ──► UnitOfWork::enlist
//!        ▼
//!   Results<R>  (done / results / join / into_future)
//! ```
//!
//! ### Classes
//! ```text
//! ClassSpec (root) ◄── ClassSpec (derived) ◄── ClassSpec (leaf)
//!                                                 │ instantiate(state)
//!                                                 ▼
//!                                  Instance<T>: one Signal per member,
//!                                  handlers connected in resolved order
//! ```
//!
//! ## Features
//! | Area             | Description                                                  | Key types / traits                          |
//! |------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Signals**      | Connect, disconnect and fire with weak handler references.   | [`Signal`], [`SignalBuilder`]               |
//! | **Handlers**     | Sync or async callables, bound methods.                      | [`Handler`], [`HandlerFn`], [`Subscriber`]  |
//! | **Results**      | Ordered outcomes, completion tracking, sequential/concurrent.| [`Results`], [`Outcome`]                    |
//! | **Wrappers**     | Intercept the default behavior of every operation.           | [`ConnectCtx`], [`FireCtx`]                 |
//! | **Classes**      | Declarative handlers with deterministic hierarchy ordering.  | [`ClassSpec`], [`Instance`]                 |
//! | **Units of work**| Hand pending computations to an external joiner.             | [`UnitOfWork`], [`Transaction`]             |
//! | **Bridges**      | Mirror activity into an external event system.               | [`Bridge`]                                  |
//! | **Errors**       | Typed errors for operations and handler outcomes.            | [`SignalError`], [`HandlerError`]           |
//!
//! ## Optional features
//! - `logging`: exports a simple stdout [`Bridge`], `LogBridge` _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use sigvisor::{AsyncHandlerFn, HandlerFn, Signal};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let changed: Signal<u32, String> = Signal::builder().name("changed").build();
//!
//!     let now = HandlerFn::arc("now", |n: &u32| Ok(format!("sync {n}")));
//!     let later = AsyncHandlerFn::arc("later", |n: &u32| {
//!         let n = *n;
//!         async move { Ok(format!("async {n}")) }
//!     });
//!     changed.connect(&now)?;
//!     changed.connect(&later)?;
//!
//!     let res = changed.fire(7)?;
//!     assert!(res.has_async());
//!     assert!(!res.done());
//!
//!     let values = res.try_values().await?;
//!     assert_eq!(values, ["sync 7", "async 7"]);
//!     Ok(())
//! }
//! ```
mod bridge;
mod class;
mod core;
mod error;
mod handlers;
mod results;
mod work;

// ---- Public re-exports ----

pub use bridge::Bridge;
pub use class::{ClassBuilder, ClassSpec, HandlerOptions, Instance, Placement, ResolvedHandler};
pub use core::{
    ConnectCtx, ConnectWrapper, EntryInfo, ExecMode, FireCtx, FireOptions, FireWrapper,
    HandlerOrder, Mutation, Registry, Signal, SignalBuilder, SignalConfig, Validator,
};
pub use error::{HandlerError, SignalError};
pub use handlers::{AsyncHandlerFn, Deferred, Handler, HandlerFn, HandlerRef, Subscriber};
pub use results::{Outcome, Results};
pub use work::{Transaction, UnitOfWork};

// Optional: expose a simple built-in stdout bridge (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use bridge::LogBridge;
