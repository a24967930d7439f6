use std::any::Any;
use std::sync::{Arc, Weak};

use crate::bridge::Bridge;
use crate::core::config::{ExecMode, HandlerOrder, SignalConfig};
use crate::core::dispatch::Core;
use crate::core::registry::Registry;
use crate::core::signal::Signal;
use crate::core::wrappers::{ConnectCtx, ConnectWrapper, FireCtx, FireWrapper, Validator};
use crate::handlers::Deferred;
use crate::results::Results;

/// Builder for constructing a [`Signal`] with optional wrappers and collaborators.
pub struct SignalBuilder<A, R> {
    cfg: SignalConfig,
    on_connect: Option<ConnectWrapper<A, R>>,
    on_disconnect: Option<ConnectWrapper<A, R>>,
    on_fire: Option<FireWrapper<A, R>>,
    validator: Option<Validator<A>>,
    bridge: Option<Arc<dyn Bridge<A>>>,
    owner: Option<Weak<dyn Any + Send + Sync>>,
    class_level: Option<Arc<Core<A, R>>>,
}

impl<A, R> SignalBuilder<A, R>
where
    A: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SignalConfig) -> Self {
        Self {
            cfg,
            on_connect: None,
            on_disconnect: None,
            on_fire: None,
            validator: None,
            bridge: None,
            owner: None,
            class_level: None,
        }
    }

    /// Sets the signal name (logs, errors, bridge registration).
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.cfg.name = Some(name.into());
        self
    }

    /// Sets how pending slots are driven on join.
    pub fn mode(mut self, mode: ExecMode) -> Self {
        self.cfg.mode = mode;
        self
    }

    /// Shorthand for `mode(ExecMode::Concurrent)`.
    pub fn concurrent(self) -> Self {
        self.mode(ExecMode::Concurrent)
    }

    /// Sets the traversal policy for class-declared handlers.
    pub fn order(mut self, order: HandlerOrder) -> Self {
        self.cfg.order = order;
        self
    }

    /// Installs the connect wrapper.
    ///
    /// The wrapper replaces the default connect; call
    /// [`ConnectCtx::proceed`] to register the subscriber.
    pub fn on_connect<F>(mut self, f: F) -> Self
    where
        F: Fn(ConnectCtx<A, R>) -> Deferred<bool> + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Installs the disconnect wrapper.
    pub fn on_disconnect<F>(mut self, f: F) -> Self
    where
        F: Fn(ConnectCtx<A, R>) -> Deferred<bool> + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    /// Installs the fire wrapper.
    ///
    /// Its answer is what `fire` returns. Without [`FireCtx::proceed`] no
    /// handler is invoked.
    pub fn on_fire<F>(mut self, f: F) -> Self
    where
        F: Fn(FireCtx<A, R>) -> Deferred<Results<R>> + Send + Sync + 'static,
    {
        self.on_fire = Some(Arc::new(f));
        self
    }

    /// Installs an argument validator, run before the fire wrapper and the handlers.
    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&A) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    /// Mirrors signal activity into an external event system.
    pub fn bridge(mut self, bridge: Arc<dyn Bridge<A>>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Binds the signal to `owner`, held weakly and exposed to wrappers.
    pub fn owner<O: Any + Send + Sync>(self, owner: &Arc<O>) -> Self {
        let weak: Weak<O> = Arc::downgrade(owner);
        let weak: Weak<dyn Any + Send + Sync> = weak;
        self.owner_weak(weak)
    }

    pub(crate) fn owner_weak(mut self, owner: Weak<dyn Any + Send + Sync>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Delivers the subscribers of `class` ahead of the built signal's own.
    pub(crate) fn class_level(mut self, class: &Signal<A, R>) -> Self {
        self.class_level = Some(Arc::clone(class.core()));
        self
    }

    /// Builds the signal.
    ///
    /// A named signal with a bridge registers itself with the bridge here.
    pub fn build(self) -> Signal<A, R> {
        if let (Some(bridge), Some(name)) = (&self.bridge, self.cfg.name()) {
            bridge.register(name);
        }
        tracing::trace!(
            signal = self.cfg.name().unwrap_or("anonymous"),
            mode = ?self.cfg.mode,
            "signal built"
        );

        Signal::from_core(Core {
            config: self.cfg,
            registry: Registry::new(),
            bridge: self.bridge,
            owner: self.owner,
            on_connect: self.on_connect,
            on_disconnect: self.on_disconnect,
            on_fire: self.on_fire,
            validator: self.validator,
            class_level: self.class_level,
        })
    }
}
