//! # Signal: subscribe, unsubscribe, fire.
//!
//! [`Signal`] composes the registry, the wrapper chain and the default
//! delivery into the three public operations.
//!
//! ## Operations
//! ```text
//! connect(h)      ─► alive? ─► on_connect(ctx)    | registry.add      ─► bool
//! disconnect(h)   ─►           on_disconnect(ctx) | registry.remove   ─► bool
//! fire(args)      ─► validator ─► snapshot ─► on_fire(ctx) | deliver  ─► Results
//! ```
//!
//! ## Rules
//! - Fire works on a snapshot taken at call time; (dis)connects during a fire
//!   only affect later fires.
//! - The synchronous operations fail with [`SignalError::WrapperContract`] when
//!   the installed wrapper answers with a future; the `*_async` variants await it.
//! - Handlers are held weakly: a dropped handler silently disappears.
//! - Cloning a `Signal` yields another handle to the same registry.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::core::builder::SignalBuilder;
use crate::core::config::{ExecMode, SignalConfig};
use crate::core::dispatch::Core;
use crate::core::registry::EntryInfo;
use crate::core::wrappers::{ConnectCtx, FireCtx, Mutation};
use crate::error::SignalError;
use crate::handlers::{Deferred, HandlerRef, Subscriber};
use crate::results::Results;
use crate::work::UnitOfWork;

/// Per-fire options.
#[derive(Clone)]
pub struct FireOptions {
    /// Joiner that receives every pending computation of the fire.
    pub unit_of_work: Option<Arc<dyn UnitOfWork>>,
    /// Whether the signal's bridge is notified.
    pub notify_external: bool,
}

impl Default for FireOptions {
    fn default() -> Self {
        Self {
            unit_of_work: None,
            notify_external: true,
        }
    }
}

impl FireOptions {
    /// Enlists pending computations into `uow`.
    #[must_use]
    pub fn enlist_into<U: UnitOfWork + 'static>(mut self, uow: Arc<U>) -> Self {
        self.unit_of_work = Some(uow);
        self
    }

    /// Skips the bridge for this fire.
    #[must_use]
    pub fn local(mut self) -> Self {
        self.notify_external = false;
        self
    }
}

impl fmt::Debug for FireOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FireOptions")
            .field("unit_of_work", &self.unit_of_work.is_some())
            .field("notify_external", &self.notify_external)
            .finish()
    }
}

/// A dispatch channel with typed arguments `A` and per-handler results `R`.
///
/// ## Example
/// ```rust
/// use sigvisor::{HandlerFn, Signal};
///
/// let sig = Signal::<String, usize>::builder().name("line").build();
/// let len = HandlerFn::arc("len", |s: &String| Ok(s.len()));
/// assert!(sig.connect(&len)?);
///
/// let res = sig.fire("hello".to_string())?;
/// assert!(res.done());
/// assert_eq!(res.results().map(|r| r.len()), Some(1));
/// # Ok::<(), sigvisor::SignalError>(())
/// ```
pub struct Signal<A, R> {
    core: Arc<Core<A, R>>,
}

impl<A, R> Clone for Signal<A, R> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<A, R> Signal<A, R>
where
    A: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Creates an unnamed sequential signal without wrappers.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts a builder with the default config.
    pub fn builder() -> SignalBuilder<A, R> {
        SignalBuilder::new(SignalConfig::default())
    }

    pub(crate) fn from_core(core: Core<A, R>) -> Self {
        Self {
            core: Arc::new(core),
        }
    }

    pub(crate) fn core(&self) -> &Arc<Core<A, R>> {
        &self.core
    }

    /// Subscribes a handler. Returns `true` if it was not connected yet.
    ///
    /// # Errors
    /// - [`SignalError::InvalidHandler`] if the handler is already dropped;
    /// - [`SignalError::WrapperContract`] if the connect wrapper answers asynchronously.
    pub fn connect(&self, handler: impl Into<Subscriber<A, R>>) -> Result<bool, SignalError> {
        self.connect_ranked(handler.into(), None)
    }

    pub(crate) fn connect_ranked(
        &self,
        subscriber: Subscriber<A, R>,
        rank: Option<u32>,
    ) -> Result<bool, SignalError> {
        let answer = self.start_connect(subscriber, rank)?;
        self.expect_ready(answer, "connect")
    }

    /// Like [`connect`](Self::connect), awaiting an asynchronous wrapper.
    pub async fn connect_async(
        &self,
        handler: impl Into<Subscriber<A, R>>,
    ) -> Result<bool, SignalError> {
        Ok(self.start_connect(handler.into(), None)?.settle().await)
    }

    /// Unsubscribes a handler. Returns `true` if something was removed.
    ///
    /// Disconnecting an absent or dropped handler is a no-op.
    ///
    /// # Errors
    /// [`SignalError::WrapperContract`] if the disconnect wrapper answers asynchronously.
    pub fn disconnect(&self, handler: impl Into<Subscriber<A, R>>) -> Result<bool, SignalError> {
        let answer = self.start_disconnect(handler.into());
        self.expect_ready(answer, "disconnect")
    }

    /// Like [`disconnect`](Self::disconnect), awaiting an asynchronous wrapper.
    pub async fn disconnect_async(
        &self,
        handler: impl Into<Subscriber<A, R>>,
    ) -> Result<bool, SignalError> {
        Ok(self.start_disconnect(handler.into()).settle().await)
    }

    fn start_connect(
        &self,
        subscriber: Subscriber<A, R>,
        rank: Option<u32>,
    ) -> Result<Deferred<bool>, SignalError> {
        check_alive(&subscriber)?;
        Ok(match &self.core.on_connect {
            None => Deferred::Ready(self.core.add(&subscriber, rank)),
            Some(wrapper) => wrapper(ConnectCtx::new(
                Arc::clone(&self.core),
                subscriber,
                Mutation::Connect,
                rank,
            )),
        })
    }

    fn start_disconnect(&self, subscriber: Subscriber<A, R>) -> Deferred<bool> {
        match &self.core.on_disconnect {
            None => Deferred::Ready(self.core.remove(&subscriber)),
            Some(wrapper) => wrapper(ConnectCtx::new(
                Arc::clone(&self.core),
                subscriber,
                Mutation::Disconnect,
                None,
            )),
        }
    }

    /// Fires the signal with default options.
    ///
    /// # Errors
    /// - [`SignalError::Validation`] if the validator rejects `args`;
    /// - [`SignalError::WrapperContract`] if the fire wrapper answers asynchronously.
    pub fn fire(&self, args: A) -> Result<Results<R>, SignalError> {
        self.fire_with(args, FireOptions::default())
    }

    /// Fires the signal.
    ///
    /// Every live handler is called before this returns; asynchronous
    /// handlers leave pending slots in the returned aggregate.
    pub fn fire_with(&self, args: A, options: FireOptions) -> Result<Results<R>, SignalError> {
        match self.start_fire(args, options)? {
            Deferred::Ready(results) => Ok(results),
            Deferred::Pending(_) => Err(self.contract("fire")),
        }
    }

    /// Like [`fire`](Self::fire), awaiting an asynchronous wrapper.
    pub async fn fire_async(&self, args: A) -> Result<Results<R>, SignalError> {
        self.fire_async_with(args, FireOptions::default()).await
    }

    /// Like [`fire_with`](Self::fire_with), awaiting an asynchronous wrapper.
    ///
    /// The returned aggregate may still hold pending slots.
    pub async fn fire_async_with(
        &self,
        args: A,
        options: FireOptions,
    ) -> Result<Results<R>, SignalError> {
        Ok(self.start_fire(args, options)?.settle().await)
    }

    fn start_fire(&self, args: A, options: FireOptions) -> Result<Deferred<Results<R>>, SignalError> {
        if let Some(validator) = &self.core.validator {
            validator(&args).map_err(|err| SignalError::Validation {
                signal: self.name().map(str::to_string),
                reason: err.to_string(),
            })?;
        }

        let subscribers = self.core.snapshot();
        tracing::debug!(
            signal = %self.core.label(),
            subscribers = subscribers.len(),
            wrapped = self.core.on_fire.is_some(),
            "fire"
        );

        Ok(match &self.core.on_fire {
            None => Deferred::Ready(self.core.deliver(&subscribers, &args, &options)),
            Some(wrapper) => wrapper(FireCtx::new(
                Arc::clone(&self.core),
                args,
                subscribers,
                options,
            )),
        })
    }

    /// Live subscribers, in delivery order.
    ///
    /// For a class member this includes the class-level subscribers, first.
    pub fn subscribers(&self) -> Vec<HandlerRef<A, R>> {
        self.core.snapshot()
    }

    /// Returns `true` if `handler` is connected.
    pub fn is_connected(&self, handler: impl Into<Subscriber<A, R>>) -> bool {
        self.core.registry.contains(&handler.into())
    }

    /// Describes the registry entries, dropped handlers included until pruned.
    pub fn entries(&self) -> Vec<EntryInfo> {
        self.core.registry.entries()
    }

    /// Number of live subscribers connected to this signal.
    pub fn len(&self) -> usize {
        self.core.registry.len()
    }

    /// Returns `true` if no live subscriber is connected.
    pub fn is_empty(&self) -> bool {
        self.core.registry.is_empty()
    }

    /// Disconnects everything, bypassing the disconnect wrapper.
    pub fn clear(&self) {
        self.core.registry.clear();
        tracing::debug!(signal = %self.core.label(), "cleared");
    }

    /// Signal name, if any.
    pub fn name(&self) -> Option<&str> {
        self.core.config.name()
    }

    /// Evaluation mode of pending slots.
    pub fn mode(&self) -> ExecMode {
        self.core.config.mode
    }

    /// Configuration the signal was built from.
    pub fn config(&self) -> &SignalConfig {
        &self.core.config
    }

    /// The object the signal is bound to, if any and still alive.
    pub fn owner(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.core.owner()
    }

    fn expect_ready(&self, answer: Deferred<bool>, operation: &'static str) -> Result<bool, SignalError> {
        match answer {
            Deferred::Ready(value) => Ok(value),
            Deferred::Pending(_) => Err(self.contract(operation)),
        }
    }

    fn contract(&self, operation: &'static str) -> SignalError {
        tracing::warn!(signal = %self.core.label(), operation, "asynchronous wrapper in synchronous call");
        SignalError::WrapperContract {
            operation,
            signal: self.name().map(str::to_string),
        }
    }
}

impl<A, R> Default for Signal<A, R>
where
    A: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> fmt::Debug for Signal<A, R>
where
    A: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name())
            .field("mode", &self.mode())
            .field("subscribers", &self.len())
            .finish()
    }
}

fn check_alive<A: 'static, R: 'static>(subscriber: &Subscriber<A, R>) -> Result<(), SignalError> {
    if subscriber.is_alive() {
        Ok(())
    } else {
        Err(SignalError::invalid_handler(
            subscriber.name(),
            "handler was dropped before it could be connected",
        ))
    }
}
