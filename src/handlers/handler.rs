//! # Core handler trait
//!
//! [`Handler`] is the extension point for reacting to a fired signal. A handler
//! receives a borrowed view of the fire arguments and answers with a
//! [`Deferred`] outcome: either a value computed on the spot, or a future that
//! the [`Results`](crate::Results) aggregate drives later.
//!
//! ## Contract
//! - `call` runs inside the fire call. Keep it short; put slow work in the
//!   returned future.
//! - The returned future must be `'static`: clone what you need out of `args`
//!   before building it.
//! - Errors are reported through `anyhow::Result`; panics are caught and
//!   recorded as [`HandlerError::Panicked`](crate::HandlerError::Panicked).
//!
//! ## Example
//! ```rust
//! use sigvisor::{Deferred, Handler};
//!
//! struct Audit;
//!
//! impl Handler<String, usize> for Audit {
//!     fn call(&self, line: &String) -> Deferred<anyhow::Result<usize>> {
//!         let line = line.clone();
//!         Deferred::pending(async move { Ok(line.len()) })
//!     }
//!
//!     fn name(&self) -> &str { "audit" }
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

/// A value that is either available now or produced by a future.
///
/// Used for handler outcomes (`Deferred<anyhow::Result<R>>`) and for wrapper
/// return values (`Deferred<bool>`, `Deferred<Results<R>>`).
pub enum Deferred<T> {
    /// Computed synchronously.
    Ready(T),
    /// Computed by a future the caller has to drive.
    Pending(BoxFuture<'static, T>),
}

impl<T> Deferred<T> {
    /// Wraps an already computed value.
    #[inline]
    pub fn ready(value: T) -> Self {
        Deferred::Ready(value)
    }

    /// Boxes a future producing the value.
    #[inline]
    pub fn pending<F>(fut: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Deferred::Pending(Box::pin(fut))
    }

    /// Returns `true` if the value still has to be awaited.
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Deferred::Pending(_))
    }

    /// Waits for the value, whichever form it has.
    pub async fn settle(self) -> T {
        match self {
            Deferred::Ready(v) => v,
            Deferred::Pending(fut) => fut.await,
        }
    }
}

impl<T> From<T> for Deferred<T> {
    fn from(value: T) -> Self {
        Deferred::Ready(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferred::Ready(v) => f.debug_tuple("Ready").field(v).finish(),
            Deferred::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Contract for signal handlers.
///
/// `A` is the argument type passed to [`Signal::fire`](crate::Signal::fire),
/// `R` the per-handler result collected into [`Results`](crate::Results).
pub trait Handler<A, R>: Send + Sync + 'static {
    /// Handles one fire of the signal.
    fn call(&self, args: &A) -> Deferred<anyhow::Result<R>>;

    /// Human-readable name (for logs and error reports).
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared, type-erased handler handle.
pub type HandlerRef<A, R> = Arc<dyn Handler<A, R>>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Handler<u32, u32> for Echo {
        fn call(&self, args: &u32) -> Deferred<anyhow::Result<u32>> {
            Deferred::ready(Ok(*args))
        }
    }

    #[test]
    fn default_name_is_type_name() {
        assert!(Echo.name().ends_with("Echo"));
    }

    #[tokio::test]
    async fn settle_resolves_both_forms() {
        assert_eq!(Deferred::ready(1).settle().await, 1);
        assert_eq!(Deferred::pending(async { 2 }).settle().await, 2);
        assert!(Deferred::pending(async { 3 }).is_pending());
        assert!(!Deferred::from(4).is_pending());
    }
}
