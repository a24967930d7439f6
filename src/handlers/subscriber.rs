//! # Weak subscriber handles
//!
//! A [`Subscriber`] is what a signal stores for each connected handler. It never
//! keeps the handler alive:
//!
//! - **Plain handlers** are stored as `Weak<dyn Handler>`; identity is the
//!   allocation address of the `Arc` they were created from.
//! - **Bound methods** pair a weakly held owner with a method closure; identity
//!   is the owner address plus the method name, so binding the same method of
//!   the same owner twice yields equal subscribers.
//!
//! A subscriber whose target has been dropped is *dead*: the registry skips it
//! on the next snapshot and prunes it on the next write.
//!
//! ```text
//! Subscriber ──► Target::Handler { Weak<dyn Handler> }         ──upgrade──► HandlerRef
//!           └──► Target::Method  { Weak<Owner>, Arc<closure> } ──bind─────► HandlerRef (owner pinned)
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use crate::handlers::handler::{Deferred, Handler, HandlerRef};

/// Identity of a subscriber inside one registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SubscriberKey {
    addr: usize,
    method: Option<Arc<str>>,
}

type MethodFn<O, A, R> = dyn Fn(&O, &A) -> Deferred<anyhow::Result<R>> + Send + Sync;

/// Owner-erased view of a bound method.
trait Bind<A, R>: Send + Sync {
    fn bind(&self) -> Option<HandlerRef<A, R>>;
    fn is_alive(&self) -> bool;
    fn owner_addr(&self) -> usize;
}

struct BoundMethod<O, A, R> {
    owner: Weak<O>,
    name: Arc<str>,
    f: Arc<MethodFn<O, A, R>>,
}

/// A method pinned to a live owner for the duration of one fire.
struct BoundCall<O, A, R> {
    owner: Arc<O>,
    name: Arc<str>,
    f: Arc<MethodFn<O, A, R>>,
}

impl<O, A, R> Handler<A, R> for BoundCall<O, A, R>
where
    O: Send + Sync + 'static,
    A: 'static,
    R: 'static,
{
    fn call(&self, args: &A) -> Deferred<anyhow::Result<R>> {
        (self.f)(&self.owner, args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<O, A, R> Bind<A, R> for BoundMethod<O, A, R>
where
    O: Send + Sync + 'static,
    A: 'static,
    R: 'static,
{
    fn bind(&self) -> Option<HandlerRef<A, R>> {
        let owner = self.owner.upgrade()?;
        Some(Arc::new(BoundCall {
            owner,
            name: Arc::clone(&self.name),
            f: Arc::clone(&self.f),
        }))
    }

    fn is_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }

    fn owner_addr(&self) -> usize {
        Weak::as_ptr(&self.owner) as *const () as usize
    }
}

enum Target<A, R> {
    Handler {
        handle: Weak<dyn Handler<A, R>>,
        name: Arc<str>,
    },
    Method {
        bind: Arc<dyn Bind<A, R>>,
        name: Arc<str>,
    },
}

impl<A, R> Clone for Target<A, R> {
    fn clone(&self) -> Self {
        match self {
            Target::Handler { handle, name } => Target::Handler {
                handle: Weak::clone(handle),
                name: Arc::clone(name),
            },
            Target::Method { bind, name } => Target::Method {
                bind: Arc::clone(bind),
                name: Arc::clone(name),
            },
        }
    }
}

/// Weak, non-owning reference to something a signal can invoke.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use sigvisor::{HandlerFn, Subscriber};
///
/// let h = HandlerFn::arc("noop", |_: &()| Ok(()));
/// let sub: Subscriber<(), ()> = Subscriber::from(&h);
/// assert!(sub.is_alive());
///
/// drop(h);
/// assert!(!sub.is_alive());
/// ```
pub struct Subscriber<A, R> {
    target: Target<A, R>,
}

impl<A, R> Clone for Subscriber<A, R> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}

impl<A: 'static, R: 'static> Subscriber<A, R> {
    /// Subscribes a concrete handler.
    pub fn handler<H: Handler<A, R>>(handler: &Arc<H>) -> Self {
        let name: Arc<str> = Arc::from(handler.name());
        let handle: Weak<H> = Arc::downgrade(handler);
        let handle: Weak<dyn Handler<A, R>> = handle;
        Self {
            target: Target::Handler { handle, name },
        }
    }

    /// Subscribes an already type-erased handler.
    pub fn shared(handler: &HandlerRef<A, R>) -> Self {
        Self {
            target: Target::Handler {
                handle: Arc::downgrade(handler),
                name: Arc::from(handler.name()),
            },
        }
    }

    /// Subscribes a handler that is only reachable through a weak handle.
    ///
    /// If the handle is already dead the subscriber is dead too, and connecting
    /// it fails with [`SignalError::InvalidHandler`](crate::SignalError::InvalidHandler).
    pub fn from_weak<H: Handler<A, R>>(handler: &Weak<H>) -> Self {
        let name: Arc<str> = match handler.upgrade() {
            Some(h) => Arc::from(h.name()),
            None => Arc::from(std::any::type_name::<H>()),
        };
        let handle: Weak<H> = Weak::clone(handler);
        let handle: Weak<dyn Handler<A, R>> = handle;
        Self {
            target: Target::Handler { handle, name },
        }
    }

    /// Binds `method` to a weakly held `owner`.
    ///
    /// Two subscribers created for the same owner and method name are equal,
    /// whatever closure they carry.
    pub fn method<O, F>(owner: &Arc<O>, method: impl Into<Arc<str>>, f: F) -> Self
    where
        O: Send + Sync + 'static,
        F: Fn(&O, &A) -> Deferred<anyhow::Result<R>> + Send + Sync + 'static,
    {
        let name: Arc<str> = method.into();
        let bind = BoundMethod {
            owner: Arc::downgrade(owner),
            name: Arc::clone(&name),
            f: Arc::new(f) as Arc<MethodFn<O, A, R>>,
        };
        Self {
            target: Target::Method {
                bind: Arc::new(bind),
                name,
            },
        }
    }

    /// Resolves the subscriber into a callable handle, if its target is still alive.
    pub fn upgrade(&self) -> Option<HandlerRef<A, R>> {
        match &self.target {
            Target::Handler { handle, .. } => handle.upgrade(),
            Target::Method { bind, .. } => bind.bind(),
        }
    }

    /// Returns `true` while the handler (or the method's owner) is alive.
    pub fn is_alive(&self) -> bool {
        match &self.target {
            Target::Handler { handle, .. } => handle.strong_count() > 0,
            Target::Method { bind, .. } => bind.is_alive(),
        }
    }

    /// Handler or method name.
    pub fn name(&self) -> &str {
        match &self.target {
            Target::Handler { name, .. } | Target::Method { name, .. } => name,
        }
    }

    /// Returns `true` if both subscribers designate the same callable.
    pub fn same_as(&self, other: &Self) -> bool {
        self.key() == other.key()
    }

    fn key(&self) -> SubscriberKey {
        match &self.target {
            Target::Handler { handle, .. } => SubscriberKey {
                addr: Weak::as_ptr(handle) as *const () as usize,
                method: None,
            },
            Target::Method { bind, name } => SubscriberKey {
                addr: bind.owner_addr(),
                method: Some(Arc::clone(name)),
            },
        }
    }
}

impl<A: 'static, R: 'static, H: Handler<A, R>> From<&Arc<H>> for Subscriber<A, R> {
    fn from(handler: &Arc<H>) -> Self {
        Subscriber::handler(handler)
    }
}

impl<A: 'static, R: 'static> fmt::Debug for Subscriber<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("name", &self.name())
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerFn;

    struct Owner {
        base: u32,
    }

    #[test]
    fn identity_follows_allocation() {
        let h1 = HandlerFn::arc("h", |_: &()| Ok(()));
        let h2 = HandlerFn::arc("h", |_: &()| Ok(()));
        let a: Subscriber<(), ()> = Subscriber::from(&h1);
        let b: Subscriber<(), ()> = Subscriber::from(&h1);
        let c: Subscriber<(), ()> = Subscriber::from(&h2);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
    }

    #[test]
    fn bound_methods_compare_by_owner_and_name() {
        let o1 = Arc::new(Owner { base: 1 });
        let o2 = Arc::new(Owner { base: 2 });
        let m = |o: &Owner, n: &u32| Deferred::ready(Ok(o.base + n));

        let a: Subscriber<u32, u32> = Subscriber::method(&o1, "add", m);
        let b: Subscriber<u32, u32> = Subscriber::method(&o1, "add", m);
        let c: Subscriber<u32, u32> = Subscriber::method(&o2, "add", m);
        let d: Subscriber<u32, u32> = Subscriber::method(&o1, "other", m);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
        assert!(!a.same_as(&d));

        let bound = a.upgrade().expect("owner alive");
        assert_eq!(bound.name(), "add");
        match bound.call(&10) {
            Deferred::Ready(Ok(v)) => assert_eq!(v, 11),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn method_dies_with_owner() {
        let owner = Arc::new(Owner { base: 0 });
        let sub: Subscriber<u32, u32> =
            Subscriber::method(&owner, "m", |o: &Owner, _: &u32| Deferred::ready(Ok(o.base)));
        assert!(sub.is_alive());
        drop(owner);
        assert!(!sub.is_alive());
        assert!(sub.upgrade().is_none());
    }

    #[test]
    fn dead_weak_is_not_alive() {
        let weak = {
            let h = HandlerFn::arc("gone", |_: &()| Ok(()));
            Arc::downgrade(&h)
        };
        let sub: Subscriber<(), ()> = Subscriber::from_weak(&weak);
        assert!(!sub.is_alive());
        assert!(sub.upgrade().is_none());
    }
}
