//! # Class-level signals and handler declarations.
//!
//! A [`ClassSpec`] describes one class of a single-inheritance hierarchy: the
//! member signals it declares and the handler methods it provides. Every
//! [`Instance`] gets its own member signals, bound to it, with each declared
//! handler connected in the order computed by the resolver.
//!
//! ## Architecture
//! ```text
//! ClassSpec::root("Base") ──► ClassBuilder ──► .signal() / .handler() ──► build()
//!        │                                                                  │
//! ClassSpec::derive("Leaf", &base) ─────────────────────────────────────────┤
//!                                                                           ▼
//!                                                          Arc<ClassSpec<T>>
//!                                                                │
//!                              instantiate(state) ───────────────┤
//!                                 ├─► plan(): validate + resolve order per signal
//!                                 ├─► one Signal per member (owner = instance)
//!                                 └─► connect handlers in rank order
//!                                                                ▼
//!                                                        Arc<Instance<T>>
//! ```
//!
//! ## Rules
//! - Handler methods are held weakly: dropping the instance disconnects them.
//! - The resolved order is a pure function of the declarations.
//! - Every error is reported before any handler runs.

mod instance;
mod resolver;
mod spec;

pub use instance::Instance;
pub use resolver::{HandlerOptions, Placement, ResolvedHandler};
pub use spec::{ClassBuilder, ClassSpec};
