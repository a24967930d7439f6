//! # Function-backed handlers (`HandlerFn`, `AsyncHandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(&A) -> anyhow::Result<R>` whose value
//! lands in its slot immediately. [`AsyncHandlerFn`] wraps a closure
//! `F: Fn(&A) -> Fut` producing a fresh future per fire; its slot stays pending
//! until the aggregate is joined.
//!
//! ## Ownership
//! Signals hold handlers weakly. Keep the returned `Arc` alive for as long as
//! the handler should stay connected.
//!
//! ## Example
//! ```rust
//! use sigvisor::{AsyncHandlerFn, HandlerFn};
//!
//! let sync = HandlerFn::arc("double", |n: &u32| Ok(n * 2));
//! let later = AsyncHandlerFn::arc("triple", |n: &u32| {
//!     let n = *n;
//!     async move { Ok(n * 3) }
//! });
//!
//! assert_eq!(sync.name(), "double");
//! assert_eq!(later.name(), "triple");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::handlers::handler::{Deferred, Handler};

/// Synchronous function-backed handler.
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`]: signals only keep a weak reference.
    pub fn new<A, R>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&A) -> anyhow::Result<R>,
    {
        Self { name: name.into(), f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc<A, R>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        F: Fn(&A) -> anyhow::Result<R>,
    {
        Arc::new(Self::new(name, f))
    }

    /// Handler name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").field("name", &self.name).finish()
    }
}

impl<A, R, F> Handler<A, R> for HandlerFn<F>
where
    F: Fn(&A) -> anyhow::Result<R> + Send + Sync + 'static,
{
    fn call(&self, args: &A) -> Deferred<anyhow::Result<R>> {
        Deferred::Ready((self.f)(args))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Asynchronous function-backed handler.
///
/// The closure runs during the fire call; the future it returns runs when the
/// aggregate is joined (or when a unit of work drives it).
pub struct AsyncHandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> AsyncHandlerFn<F> {
    /// Creates a new future-producing handler.
    pub fn new<A, R, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&A) -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
    {
        Self { name: name.into(), f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc<A, R, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        F: Fn(&A) -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
    {
        Arc::new(Self::new(name, f))
    }

    /// Handler name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for AsyncHandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncHandlerFn")
            .field("name", &self.name)
            .finish()
    }
}

impl<A, R, F, Fut> Handler<A, R> for AsyncHandlerFn<F>
where
    F: Fn(&A) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
{
    fn call(&self, args: &A) -> Deferred<anyhow::Result<R>> {
        Deferred::pending((self.f)(args))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_handler_is_ready() {
        let h = HandlerFn::arc("len", |s: &String| Ok(s.len()));
        match h.call(&"abc".to_string()) {
            Deferred::Ready(Ok(n)) => assert_eq!(n, 3),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn async_handler_is_pending_until_awaited() {
        let h = AsyncHandlerFn::arc("len", |s: &String| {
            let s = s.clone();
            async move { Ok(s.len()) }
        });
        let out = h.call(&"abcd".to_string());
        assert!(out.is_pending());
        assert_eq!(out.settle().await.unwrap(), 4);
    }
}
