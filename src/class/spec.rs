use std::any::{type_name, Any};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::class::instance::Instance;
use crate::class::resolver::HandlerOptions;
use crate::core::{Signal, SignalBuilder, SignalConfig};
use crate::error::SignalError;
use crate::handlers::{Deferred, Subscriber};

/// Creates the member signal of one instance, bound to that instance.
type SignalFactory = Arc<dyn Fn(Weak<dyn Any + Send + Sync>) -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// Connects one declared handler of `instance` to an erased member signal.
pub(crate) type ConnectFn<T> = Arc<
    dyn Fn(&(dyn Any + Send + Sync), &Arc<Instance<T>>, Option<u32>) -> Result<bool, SignalError>
        + Send
        + Sync,
>;

pub(crate) struct SignalDecl {
    pub(crate) name: Arc<str>,
    pub(crate) config: SignalConfig,
    /// Class-level `Signal<A, R>`, shared by every instance.
    pub(crate) class_level: Arc<dyn Any + Send + Sync>,
    pub(crate) factory: SignalFactory,
}

pub(crate) struct HandlerDecl<T> {
    pub(crate) signal: Arc<str>,
    pub(crate) method: Arc<str>,
    pub(crate) options: HandlerOptions,
    pub(crate) connect: ConnectFn<T>,
}

/// Description of one class of a single-inheritance hierarchy.
///
/// Every class of a hierarchy shares the instance state type `T`. A class
/// declares member signals and handler methods; instances get their own
/// signals with every declared handler already connected, in resolved order.
///
/// ## Example
/// ```rust
/// use sigvisor::{ClassSpec, Deferred, SignalConfig};
///
/// struct Counter { step: u32 }
///
/// let base = ClassSpec::<Counter>::root("Base")
///     .signal::<u32, u32>("tick", SignalConfig::default())
///     .handler("tick", "on_tick", |c: &Counter, n: &u32| Deferred::ready(Ok(n + c.step)))
///     .build();
/// let fast = ClassSpec::derive("Fast", &base)
///     .handler("tick", "on_fast_tick", |c: &Counter, n: &u32| Deferred::ready(Ok(n * c.step)))
///     .build();
///
/// let counter = fast.instantiate(Counter { step: 10 })?;
/// let res = counter.signal::<u32, u32>("tick")?.fire(2)?;
/// assert_eq!(res.results().map(|r| r.len()), Some(2));
/// # Ok::<(), sigvisor::SignalError>(())
/// ```
pub struct ClassSpec<T> {
    pub(crate) name: Arc<str>,
    pub(crate) parent: Option<Arc<ClassSpec<T>>>,
    pub(crate) signals: Vec<SignalDecl>,
    pub(crate) handlers: Vec<HandlerDecl<T>>,
}

/// First phase of a [`ClassSpec`]: collects declarations.
pub struct ClassBuilder<T> {
    spec: ClassSpec<T>,
}

impl<T: Send + Sync + 'static> ClassSpec<T> {
    /// Starts a class without parent.
    pub fn root(name: impl Into<Arc<str>>) -> ClassBuilder<T> {
        ClassBuilder::new(name.into(), None)
    }

    /// Starts a class deriving from `parent`.
    pub fn derive(name: impl Into<Arc<str>>, parent: &Arc<ClassSpec<T>>) -> ClassBuilder<T> {
        ClassBuilder::new(name.into(), Some(Arc::clone(parent)))
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent class, if any.
    pub fn parent(&self) -> Option<&Arc<ClassSpec<T>>> {
        self.parent.as_ref()
    }

    /// Distance from the root class (the root has depth 0).
    pub fn depth(&self) -> usize {
        self.chain().len() - 1
    }

    /// Names of the member signals an instance of this class gets.
    pub fn signal_names(&self) -> Vec<&str> {
        self.signal_decls().into_iter().map(|d| &*d.name).collect()
    }

    /// Class-level signal `name`.
    ///
    /// Handlers connected here are delivered by every instance's member
    /// signal, ahead of the instance's own handlers. Firing it directly only
    /// reaches the class-level handlers.
    ///
    /// # Errors
    /// - [`SignalError::UnknownSignal`] if the class has no such member;
    /// - [`SignalError::InvalidHandler`] if the member has other argument/result types.
    pub fn class_signal<A, R>(&self, name: &str) -> Result<&Signal<A, R>, SignalError>
    where
        A: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        let decl = self
            .signal_decls()
            .into_iter()
            .find(|d| &*d.name == name)
            .ok_or_else(|| SignalError::UnknownSignal {
                signal: name.to_string(),
                class: self.name.to_string(),
            })?;
        decl.class_level.downcast_ref::<Signal<A, R>>().ok_or_else(|| {
            SignalError::invalid_handler(
                name,
                format!(
                    "member is not a signal of ({}) -> {}",
                    type_name::<A>(),
                    type_name::<R>()
                ),
            )
        })
    }

    /// Classes from the root down to `self`.
    pub(crate) fn chain(&self) -> Vec<&ClassSpec<T>> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = &current.parent {
            current = &**parent;
            chain.push(current);
        }
        chain.reverse();
        chain
    }

    /// Effective member signals: the most derived declaration of each name wins.
    pub(crate) fn signal_decls(&self) -> Vec<&SignalDecl> {
        let mut decls: Vec<&SignalDecl> = Vec::new();
        for class in self.chain() {
            for decl in &class.signals {
                match decls.iter_mut().find(|d| d.name == decl.name) {
                    Some(slot) => *slot = decl,
                    None => decls.push(decl),
                }
            }
        }
        decls
    }
}

impl<T> fmt::Debug for ClassSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassSpec")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| &p.name))
            .field(
                "signals",
                &self.signals.iter().map(|s| &s.name).collect::<Vec<_>>(),
            )
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<T: Send + Sync + 'static> ClassBuilder<T> {
    fn new(name: Arc<str>, parent: Option<Arc<ClassSpec<T>>>) -> Self {
        Self {
            spec: ClassSpec {
                name,
                parent,
                signals: Vec::new(),
                handlers: Vec::new(),
            },
        }
    }

    /// Declares a member signal. The member name becomes the signal name.
    ///
    /// A class-level signal is created along with it; see [`ClassSpec::class_signal`].
    pub fn signal<A, R>(self, name: impl Into<Arc<str>>, cfg: SignalConfig) -> Self
    where
        A: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        self.signal_with::<A, R, _>(name, cfg, |builder| builder)
    }

    /// Declares a member signal and customizes its builder (wrappers, validator, bridge).
    pub fn signal_with<A, R, F>(mut self, name: impl Into<Arc<str>>, cfg: SignalConfig, customize: F) -> Self
    where
        A: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
        F: Fn(SignalBuilder<A, R>) -> SignalBuilder<A, R> + Send + Sync + 'static,
    {
        let name: Arc<str> = name.into();
        let config = cfg.named(Arc::clone(&name));
        let class_level = customize(SignalBuilder::<A, R>::new(config.clone())).build();
        let member = config.clone();
        let shared = class_level.clone();
        let factory: SignalFactory = Arc::new(move |owner| {
            let signal = customize(SignalBuilder::<A, R>::new(member.clone()))
                .owner_weak(owner)
                .class_level(&shared)
                .build();
            Arc::new(signal) as Arc<dyn Any + Send + Sync>
        });
        self.spec.signals.push(SignalDecl {
            name,
            config,
            class_level: Arc::new(class_level),
            factory,
        });
        self
    }

    /// Declares `method` as a handler of `signal`.
    pub fn handler<A, R, F>(self, signal: impl Into<Arc<str>>, method: impl Into<Arc<str>>, f: F) -> Self
    where
        A: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
        F: Fn(&T, &A) -> Deferred<anyhow::Result<R>> + Send + Sync + 'static,
    {
        self.handler_with(signal, method, HandlerOptions::default(), f)
    }

    /// Declares a handler with placement or check options.
    pub fn handler_with<A, R, F>(
        mut self,
        signal: impl Into<Arc<str>>,
        method: impl Into<Arc<str>>,
        options: HandlerOptions,
        f: F,
    ) -> Self
    where
        A: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
        F: Fn(&T, &A) -> Deferred<anyhow::Result<R>> + Send + Sync + 'static,
    {
        let method: Arc<str> = method.into();
        let f = Arc::new(f);
        let name = Arc::clone(&method);
        let connect: ConnectFn<T> = Arc::new(
            move |erased: &(dyn Any + Send + Sync), instance: &Arc<Instance<T>>, rank: Option<u32>| {
                let target = erased.downcast_ref::<Signal<A, R>>().ok_or_else(|| {
                    SignalError::invalid_handler(
                        &*name,
                        format!(
                            "expects a signal of ({}) -> {}",
                            type_name::<A>(),
                            type_name::<R>()
                        ),
                    )
                })?;
                let f = Arc::clone(&f);
                let subscriber = Subscriber::method(
                    instance,
                    Arc::clone(&name),
                    move |owner: &Instance<T>, args: &A| f(owner.state(), args),
                );
                target.connect_ranked(subscriber, rank)
            },
        );

        self.spec.handlers.push(HandlerDecl {
            signal: signal.into(),
            method,
            options,
            connect,
        });
        self
    }

    /// Finishes the class.
    pub fn build(self) -> Arc<ClassSpec<T>> {
        tracing::trace!(
            class = %self.spec.name,
            signals = self.spec.signals.len(),
            handlers = self.spec.handlers.len(),
            "class declared"
        );
        Arc::new(self.spec)
    }
}
