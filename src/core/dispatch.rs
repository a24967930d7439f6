//! # Default behavior of the three signal operations.
//!
//! [`Core`] is the state shared by a [`Signal`](crate::Signal) and the wrapper
//! contexts it hands out. It owns the registry and performs the default
//! connect, disconnect and delivery.
//!
//! ## Delivery
//! ```text
//! snapshot ──► for each handler (snapshot order):
//!                 invoke(handler, &args)                         catch_unwind
//!                   ├─ Ready(Ok/Err) ─────────────────────────► Slot::Ready
//!                   └─ Pending(fut)  ─► [after prev] ─► select!(cancel) ─► warn ─► shared
//!                                                                ├──► Slot::Pending
//!                                                                └──► unit_of_work.enlist
//!          bridge.publish(&args)  (notify_external)
//!                   ├─ Ready   ─► logged on error
//!                   └─ Pending ─► side future (+ enlist)
//!          ──► Results::assemble(mode, slots, side)
//! ```
//!
//! ## Rules
//! - Every handler of the snapshot is called, even if an earlier one failed or panicked.
//! - Failures are recorded in the failing slot and logged with `warn!`; they never abort the fire.
//! - Cancellation only affects pending slots; ready slots are already settled.
//! - In sequential mode each pending slot awaits the previous one, so every
//!   driver (join or unit of work) observes snapshot order.
//! - Delivery never mutates the registry.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;

use crate::bridge::Bridge;
use crate::core::config::SignalConfig;
use crate::core::registry::Registry;
use crate::core::signal::FireOptions;
use crate::core::wrappers::{ConnectWrapper, FireWrapper, Validator};
use crate::error::HandlerError;
use crate::handlers::{Deferred, HandlerRef, Subscriber};
use crate::results::{Outcome, Results, SharedOutcome, SharedSide, Slot};

/// Shared state of one signal.
pub(crate) struct Core<A, R> {
    pub(crate) config: SignalConfig,
    pub(crate) registry: Registry<A, R>,
    pub(crate) bridge: Option<Arc<dyn Bridge<A>>>,
    pub(crate) owner: Option<Weak<dyn Any + Send + Sync>>,
    pub(crate) on_connect: Option<ConnectWrapper<A, R>>,
    pub(crate) on_disconnect: Option<ConnectWrapper<A, R>>,
    pub(crate) on_fire: Option<FireWrapper<A, R>>,
    pub(crate) validator: Option<Validator<A>>,
    /// Class-level signal whose subscribers are delivered before this one's.
    pub(crate) class_level: Option<Arc<Core<A, R>>>,
}

impl<A, R> Core<A, R>
where
    A: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Name used in log fields.
    pub(crate) fn label(&self) -> &str {
        self.config.name().unwrap_or("anonymous")
    }

    pub(crate) fn owner(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    /// Delivery set of a fire: class-level subscribers first, then our own.
    pub(crate) fn snapshot(&self) -> Vec<HandlerRef<A, R>> {
        match &self.class_level {
            None => self.registry.snapshot(),
            Some(class) => {
                let mut all = class.registry.snapshot();
                all.extend(self.registry.snapshot());
                all
            }
        }
    }

    /// Default connect.
    pub(crate) fn add(&self, subscriber: &Subscriber<A, R>, rank: Option<u32>) -> bool {
        let added = self.registry.add_ranked(subscriber, rank);
        if added {
            tracing::debug!(
                signal = %self.label(),
                handler = %subscriber.name(),
                "connected"
            );
            if let Some(bridge) = &self.bridge {
                bridge.connected(self.config.name(), subscriber.name());
            }
        }
        added
    }

    /// Default disconnect.
    pub(crate) fn remove(&self, subscriber: &Subscriber<A, R>) -> bool {
        let removed = self.registry.remove(subscriber);
        if removed {
            tracing::debug!(
                signal = %self.label(),
                handler = %subscriber.name(),
                "disconnected"
            );
            if let Some(bridge) = &self.bridge {
                bridge.disconnected(self.config.name(), subscriber.name());
            }
        }
        removed
    }

    /// Default fire: invokes every handler of `handlers` and aggregates the outcomes.
    pub(crate) fn deliver(
        &self,
        handlers: &[HandlerRef<A, R>],
        args: &A,
        options: &FireOptions,
    ) -> Results<R> {
        let cancel = options
            .unit_of_work
            .as_ref()
            .and_then(|uow| uow.cancellation());

        let sequential = !self.config.is_concurrent();
        let mut previous: Option<SharedOutcome<R>> = None;
        let mut slots = Vec::with_capacity(handlers.len());
        for handler in handlers {
            let slot = match invoke(handler, args) {
                Deferred::Ready(out) => {
                    if let Err(err) = &out {
                        self.report(err);
                    }
                    Slot::Ready(out)
                }
                Deferred::Pending(fut) => {
                    let fut = match &previous {
                        Some(prev) if sequential => after(prev.clone(), fut),
                        _ => fut,
                    };
                    let fut = match &cancel {
                        Some(token) => cancellable(fut, token.clone(), handler.name()),
                        None => fut,
                    };
                    Slot::pending(self.watch(fut))
                }
            };

            if let Slot::Pending(shared) = &slot {
                if let Some(uow) = &options.unit_of_work {
                    uow.enlist(shared.clone().map(|_| ()).boxed());
                }
                previous = Some(shared.clone());
            }
            slots.push(slot);
        }

        let mut side = Vec::new();
        if options.notify_external {
            if let Some(bridge) = &self.bridge {
                if let Some(publish) = self.publish(bridge.as_ref(), args) {
                    if let Some(uow) = &options.unit_of_work {
                        uow.enlist(publish.clone().boxed());
                    }
                    side.push(publish);
                }
            }
        }

        Results::assemble(self.config.mode, slots, side)
    }

    /// Publishes to the bridge; returns the pending part, if any.
    fn publish(&self, bridge: &dyn Bridge<A>, args: &A) -> Option<SharedSide> {
        match bridge.publish(self.config.name(), args) {
            Deferred::Ready(Ok(())) => None,
            Deferred::Ready(Err(err)) => {
                tracing::warn!(signal = %self.label(), error = %err, "bridge publish failed");
                None
            }
            Deferred::Pending(fut) => {
                let signal = self.label().to_string();
                let side = async move {
                    if let Err(err) = fut.await {
                        tracing::warn!(%signal, error = %err, "bridge publish failed");
                    }
                };
                Some(side.boxed().shared())
            }
        }
    }

    /// Logs a pending slot's failure once it settles.
    fn watch(&self, fut: BoxFuture<'static, Outcome<R>>) -> BoxFuture<'static, Outcome<R>> {
        let signal = self.label().to_string();
        async move {
            let out = fut.await;
            if let Err(err) = &out {
                tracing::warn!(
                    %signal,
                    handler = %err.handler(),
                    error = %err.as_message(),
                    "{}",
                    err.as_label()
                );
            }
            out
        }
        .boxed()
    }

    fn report(&self, err: &HandlerError) {
        tracing::warn!(
            signal = %self.label(),
            handler = %err.handler(),
            error = %err.as_message(),
            "{}",
            err.as_label()
        );
    }
}

/// Calls one handler, turning errors and panics into its slot outcome.
fn invoke<A, R>(handler: &HandlerRef<A, R>, args: &A) -> Deferred<Outcome<R>>
where
    A: 'static,
    R: Send + 'static,
{
    let name: Arc<str> = Arc::from(handler.name());
    match catch_unwind(AssertUnwindSafe(|| handler.call(args))) {
        Err(payload) => Deferred::Ready(Err(HandlerError::panicked(&name, payload))),
        Ok(Deferred::Ready(res)) => {
            Deferred::Ready(res.map_err(|err| HandlerError::failed(&name, err)))
        }
        Ok(Deferred::Pending(fut)) => Deferred::pending(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(HandlerError::failed(&name, err)),
                Err(payload) => Err(HandlerError::panicked(&name, payload)),
            }
        }),
    }
}

/// Holds `fut` back until the previous pending slot has settled.
fn after<R>(
    previous: SharedOutcome<R>,
    fut: BoxFuture<'static, Outcome<R>>,
) -> BoxFuture<'static, Outcome<R>>
where
    R: Clone + Send + Sync + 'static,
{
    async move {
        let _ = previous.await;
        fut.await
    }
    .boxed()
}

/// Races a pending slot against the unit of work's cancellation.
fn cancellable<R>(
    fut: BoxFuture<'static, Outcome<R>>,
    token: CancellationToken,
    handler: &str,
) -> BoxFuture<'static, Outcome<R>>
where
    R: Send + 'static,
{
    let handler: Arc<str> = Arc::from(handler);
    async move {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(HandlerError::Cancelled { handler }),
            out = fut => out,
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{AsyncHandlerFn, HandlerFn};

    #[test]
    fn sync_panic_becomes_a_slot_error() {
        let h: HandlerRef<u8, u8> = HandlerFn::arc("boom", |_: &u8| -> anyhow::Result<u8> {
            panic!("exploded")
        });
        match invoke(&h, &1) {
            Deferred::Ready(Err(HandlerError::Panicked { handler, info })) => {
                assert_eq!(&*handler, "boom");
                assert_eq!(info, "exploded");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn async_panic_becomes_a_slot_error() {
        let h: HandlerRef<u8, u8> = AsyncHandlerFn::arc("later", |_: &u8| async {
            if true {
                panic!("late");
            }
            Ok(0_u8)
        });
        let out = invoke(&h, &1).settle().await;
        assert_eq!(out.unwrap_err().as_label(), "handler_panicked");
    }

    #[tokio::test]
    async fn cancelled_token_wins_over_pending_work() {
        let token = CancellationToken::new();
        token.cancel();
        let fut = futures::future::pending::<Outcome<u8>>().boxed();
        let out = cancellable(fut, token, "slow").await;
        assert!(matches!(out, Err(HandlerError::Cancelled { .. })));
    }
}
