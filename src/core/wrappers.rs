//! # Operation wrappers.
//!
//! Each of connect, disconnect and fire may be intercepted by one wrapper. An
//! installed wrapper is the only entry point for its operation: the default
//! behavior runs only if the wrapper calls `proceed()`.
//!
//! ```text
//! connect(h) ──► on_connect(ConnectCtx) ──► ctx.proceed()      ──► registry.add
//!                                      └──► ctx.notify_one(a)  ──► h(a) only
//!                                      └──► Deferred<bool>     ──► caller
//!
//! fire(a)    ──► on_fire(FireCtx)       ──► ctx.proceed()      ──► default delivery
//!                                      └──► Deferred<Results>  ──► caller
//! ```
//!
//! Contexts are owned values, so an asynchronous wrapper can move them into
//! the future it returns and proceed later.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::core::dispatch::Core;
use crate::core::signal::FireOptions;
use crate::handlers::{Deferred, HandlerRef, Subscriber};
use crate::results::Results;

/// Connect or disconnect wrapper.
pub type ConnectWrapper<A, R> = Arc<dyn Fn(ConnectCtx<A, R>) -> Deferred<bool> + Send + Sync>;

/// Fire wrapper.
pub type FireWrapper<A, R> = Arc<dyn Fn(FireCtx<A, R>) -> Deferred<Results<R>> + Send + Sync>;

/// Fire argument validator.
pub type Validator<A> = Arc<dyn Fn(&A) -> anyhow::Result<()> + Send + Sync>;

/// Registry mutation a [`ConnectCtx`] stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// `connect`
    Connect,
    /// `disconnect`
    Disconnect,
}

/// What a connect or disconnect wrapper receives.
pub struct ConnectCtx<A, R> {
    core: Arc<Core<A, R>>,
    subscriber: Subscriber<A, R>,
    subscribers: Vec<HandlerRef<A, R>>,
    mutation: Mutation,
    rank: Option<u32>,
}

impl<A, R> ConnectCtx<A, R>
where
    A: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        core: Arc<Core<A, R>>,
        subscriber: Subscriber<A, R>,
        mutation: Mutation,
        rank: Option<u32>,
    ) -> Self {
        let subscribers = core.snapshot();
        Self {
            core,
            subscriber,
            subscribers,
            mutation,
            rank,
        }
    }

    /// The subscriber being connected or disconnected.
    pub fn subscriber(&self) -> &Subscriber<A, R> {
        &self.subscriber
    }

    /// Live subscribers at the time of the call.
    pub fn subscribers(&self) -> &[HandlerRef<A, R>] {
        &self.subscribers
    }

    /// Intercepted operation.
    pub fn mutation(&self) -> Mutation {
        self.mutation
    }

    /// Signal name, if any.
    pub fn signal_name(&self) -> Option<&str> {
        self.core.config.name()
    }

    /// The object the signal is bound to, if it is still alive.
    pub fn owner(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.core.owner()
    }

    /// Runs the default registry mutation. Returns whether the registry changed.
    pub fn proceed(&self) -> bool {
        match self.mutation {
            Mutation::Connect => self.core.add(&self.subscriber, self.rank),
            Mutation::Disconnect => self.core.remove(&self.subscriber),
        }
    }

    /// Delivers `args` to this subscriber alone.
    ///
    /// Bypasses the fire wrapper, the validator and the bridge. A dead
    /// subscriber yields an empty aggregate.
    pub fn notify_one(&self, args: A) -> Results<R> {
        match self.subscriber.upgrade() {
            Some(handler) => self
                .core
                .deliver(&[handler], &args, &FireOptions::default().local()),
            None => Results::empty(),
        }
    }
}

impl<A, R> fmt::Debug for ConnectCtx<A, R>
where
    A: 'static,
    R: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectCtx")
            .field("signal", &self.core.config.name())
            .field("mutation", &self.mutation)
            .field("subscriber", &self.subscriber)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// What a fire wrapper receives.
pub struct FireCtx<A, R> {
    core: Arc<Core<A, R>>,
    args: Arc<A>,
    subscribers: Vec<HandlerRef<A, R>>,
    options: FireOptions,
}

impl<A, R> FireCtx<A, R>
where
    A: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        core: Arc<Core<A, R>>,
        args: A,
        subscribers: Vec<HandlerRef<A, R>>,
        options: FireOptions,
    ) -> Self {
        Self {
            core,
            args: Arc::new(args),
            subscribers,
            options,
        }
    }

    /// Fire arguments.
    pub fn args(&self) -> &A {
        &self.args
    }

    /// Subscriber snapshot this fire delivers to.
    pub fn subscribers(&self) -> &[HandlerRef<A, R>] {
        &self.subscribers
    }

    /// Options the fire was called with.
    pub fn options(&self) -> &FireOptions {
        &self.options
    }

    /// Signal name, if any.
    pub fn signal_name(&self) -> Option<&str> {
        self.core.config.name()
    }

    /// The object the signal is bound to, if it is still alive.
    pub fn owner(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.core.owner()
    }

    /// Runs the default delivery over the snapshot.
    pub fn proceed(&self) -> Results<R> {
        self.core
            .deliver(&self.subscribers, &self.args, &self.options)
    }
}

impl<A, R> fmt::Debug for FireCtx<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FireCtx")
            .field("signal", &self.core.config.name())
            .field("subscribers", &self.subscribers.len())
            .field("options", &self.options)
            .finish()
    }
}
