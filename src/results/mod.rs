//! # Fire outcome aggregation.
//!
//! Every fire produces one [`Results`] value: one slot per handler of the
//! snapshot, in snapshot order. Synchronous handlers fill their slot during the
//! fire call; asynchronous handlers leave a pending handle that is driven when
//! the aggregate is joined.
//!
//! ## Architecture
//! ```text
//! fire ──► [Ready(r1), Pending(f2), Ready(r3)] + side futures (bridge publish)
//!                          │
//!          done() / get(i) │ peek, never polls
//!                          ▼
//!              join() / .await / try_values()
//!                          │
//!          Sequential:  f2 ─► side                    (one at a time)
//!          Concurrent:  join_all(pending) ‖ side      (interleaved)
//!                          │
//!                          ▼
//!              [r1, r2, r3]  (snapshot order, cached)
//! ```
//!
//! ## Rules
//! - `has_async` is fixed at construction: `true` if any slot or side future started pending.
//! - `done` is `true` iff every slot (and side future) holds a concrete value.
//!   Pending handles are shared, so a unit of work driving them also flips `done`.
//! - A failed slot carries its [`HandlerError`]; siblings are unaffected.
//! - Joining is repeatable: every join observes the same values.

mod slot;

use std::fmt;
use std::future::IntoFuture;
use std::sync::OnceLock;

use futures::future::{self, join_all, BoxFuture, FutureExt};

use crate::core::ExecMode;
use crate::error::HandlerError;

pub use slot::Outcome;
pub(crate) use slot::{SharedOutcome, SharedSide, Slot};

/// Aggregate outcome of one fire.
///
/// ## Example
/// ```rust
/// use sigvisor::{AsyncHandlerFn, HandlerFn, Signal};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sig = Signal::<u32, u32>::new();
/// let now = HandlerFn::arc("now", |n: &u32| Ok(n + 1));
/// let later = AsyncHandlerFn::arc("later", |n: &u32| {
///     let n = *n;
///     async move { Ok(n + 2) }
/// });
/// sig.connect(&now)?;
/// sig.connect(&later)?;
///
/// let res = sig.fire(1)?;
/// assert!(!res.done());
/// assert!(res.has_async());
/// assert_eq!(res.try_values().await?, vec![2, 3]);
/// # Ok(())
/// # }
/// ```
pub struct Results<R> {
    mode: ExecMode,
    has_async: bool,
    slots: Vec<Slot<R>>,
    side: Vec<SharedSide>,
    finished: OnceLock<Vec<Outcome<R>>>,
}

impl<R> Results<R>
where
    R: Clone + Send + Sync + 'static,
{
    /// Builds the aggregate of one fire.
    pub(crate) fn assemble(mode: ExecMode, slots: Vec<Slot<R>>, side: Vec<SharedSide>) -> Self {
        let has_async = !side.is_empty() || slots.iter().any(Slot::is_pending);
        if has_async {
            return Self {
                mode,
                has_async,
                slots,
                side,
                finished: OnceLock::new(),
            };
        }

        let values = slots
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Ready(out) => Some(out),
                Slot::Pending(_) => None,
            })
            .collect();
        Self::settled(mode, values)
    }

    fn settled(mode: ExecMode, values: Vec<Outcome<R>>) -> Self {
        Self {
            mode,
            has_async: false,
            slots: Vec::new(),
            side: Vec::new(),
            finished: OnceLock::from(values),
        }
    }

    /// An aggregate that is already done with the given values.
    ///
    /// Used by fire wrappers that answer without running the default delivery.
    pub fn ready(values: impl IntoIterator<Item = R>) -> Self {
        Self::settled(ExecMode::default(), values.into_iter().map(Ok).collect())
    }

    /// An aggregate that is already done with the given per-slot outcomes.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = Outcome<R>>) -> Self {
        Self::settled(ExecMode::default(), outcomes.into_iter().collect())
    }

    /// A done aggregate with no slots.
    pub fn empty() -> Self {
        Self::settled(ExecMode::default(), Vec::new())
    }

    /// Returns `true` once every slot holds a concrete value.
    pub fn done(&self) -> bool {
        self.finished.get().is_some()
            || (self.slots.iter().all(|s| s.peek().is_some())
                && self.side.iter().all(|s| s.peek().is_some()))
    }

    /// Returns `true` if at least one slot started pending.
    #[inline]
    pub fn has_async(&self) -> bool {
        self.has_async
    }

    /// Number of slots (one per invoked handler).
    pub fn len(&self) -> usize {
        match self.finished.get() {
            Some(values) => values.len(),
            None => self.slots.len(),
        }
    }

    /// Returns `true` if the fire reached no handler.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Execution mode used when joining.
    #[inline]
    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    /// The ordered outcomes, or `None` while any slot is still pending.
    ///
    /// Never polls: pending slots are only inspected.
    pub fn results(&self) -> Option<&[Outcome<R>]> {
        if let Some(values) = self.finished.get() {
            return Some(values);
        }
        if !self.done() {
            return None;
        }
        let values = self
            .slots
            .iter()
            .map(|s| s.peek().cloned())
            .collect::<Option<Vec<_>>>()?;
        Some(self.finished.get_or_init(|| values))
    }

    /// Outcome of slot `index`, if that slot has settled.
    pub fn get(&self, index: usize) -> Option<&Outcome<R>> {
        match self.finished.get() {
            Some(values) => values.get(index),
            None => self.slots.get(index)?.peek(),
        }
    }

    /// Drives every pending slot and returns the ordered outcomes.
    ///
    /// Cancel-safe and repeatable: dropping the future loses no progress, and a
    /// second join returns the cached values.
    pub async fn join(&self) -> &[Outcome<R>] {
        if let Some(values) = self.finished.get() {
            return values;
        }
        let values = self.drive().await;
        self.finished.get_or_init(|| values)
    }

    /// Joins and returns the plain values, or the first failure in slot order.
    pub async fn try_values(self) -> Result<Vec<R>, HandlerError> {
        self.await.into_iter().collect()
    }

    async fn drive(&self) -> Vec<Outcome<R>> {
        let slots = self.slots.iter().map(|slot| match slot {
            Slot::Ready(out) => future::ready(out.clone()).left_future(),
            Slot::Pending(fut) => fut.clone().right_future(),
        });

        match self.mode {
            ExecMode::Sequential => {
                let mut values = Vec::with_capacity(self.slots.len());
                for fut in slots {
                    values.push(fut.await);
                }
                for side in &self.side {
                    side.clone().await;
                }
                values
            }
            ExecMode::Concurrent => {
                let (values, _) = futures::join!(join_all(slots), join_all(self.side.iter().cloned()));
                values
            }
        }
    }
}

impl<R> IntoFuture for Results<R>
where
    R: Clone + Send + Sync + 'static,
{
    type Output = Vec<Outcome<R>>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(mut self) -> Self::IntoFuture {
        Box::pin(async move {
            match self.finished.take() {
                Some(values) => values,
                None => self.drive().await,
            }
        })
    }
}

impl<R> fmt::Debug for Results<R>
where
    R: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Results")
            .field("len", &self.len())
            .field("done", &self.done())
            .field("has_async", &self.has_async)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;

    fn name(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    fn pending<R, F>(fut: F) -> Slot<R>
    where
        R: Clone + Send + Sync + 'static,
        F: std::future::Future<Output = Outcome<R>> + Send + 'static,
    {
        Slot::pending(Box::pin(fut))
    }

    fn values<R: Clone>(out: &[Outcome<R>]) -> Vec<R> {
        out.iter().map(|o| o.as_ref().cloned().unwrap()).collect()
    }

    #[test]
    fn empty_is_done() {
        let res = Results::<u32>::assemble(ExecMode::Sequential, Vec::new(), Vec::new());
        assert!(res.done());
        assert!(!res.has_async());
        assert_eq!(res.results().map(<[_]>::len), Some(0));
        assert!(Results::<u32>::empty().is_empty());
    }

    #[test]
    fn sync_only_is_done_at_construction() {
        let res = Results::assemble(
            ExecMode::Sequential,
            vec![Slot::Ready(Ok("a")), Slot::Ready(Ok("b"))],
            Vec::new(),
        );
        assert!(res.done());
        assert_eq!(values(res.results().unwrap()), ["a", "b"]);
    }

    #[tokio::test]
    async fn mixed_slots_resolve_in_slot_order() {
        let res = Results::assemble(
            ExecMode::Sequential,
            vec![
                Slot::Ready(Ok("r1")),
                pending(async {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok("r2")
                }),
            ],
            Vec::new(),
        );
        assert!(!res.done());
        assert!(res.has_async());
        assert!(res.results().is_none());
        assert_eq!(res.get(0).map(|o| o.is_ok()), Some(true));
        assert!(res.get(1).is_none());

        assert_eq!(values(res.join().await), ["r1", "r2"]);
        assert!(res.done());
        assert!(res.has_async());
        assert_eq!(values(res.join().await), ["r1", "r2"]);
        assert_eq!(values(res.results().unwrap()), ["r1", "r2"]);
    }

    fn ordered_pair(mode: ExecMode, log: &Arc<Mutex<Vec<u8>>>) -> Results<u8> {
        let slow_log = Arc::clone(log);
        let fast_log = Arc::clone(log);
        Results::assemble(
            mode,
            vec![
                pending(async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    slow_log.lock().unwrap().push(0);
                    Ok(0)
                }),
                pending(async move {
                    fast_log.lock().unwrap().push(1);
                    Ok(1)
                }),
            ],
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn sequential_settles_one_slot_at_a_time() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let out = ordered_pair(ExecMode::Sequential, &log).await;
        assert_eq!(*log.lock().unwrap(), [0, 1]);
        assert_eq!(values(&out), [0, 1]);
    }

    #[tokio::test]
    async fn concurrent_keeps_slot_order_not_completion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let out = ordered_pair(ExecMode::Concurrent, &log).await;
        assert_eq!(*log.lock().unwrap(), [1, 0]);
        assert_eq!(values(&out), [0, 1]);
    }

    #[tokio::test]
    async fn failure_is_isolated_to_its_slot() {
        let h = name("bad");
        let err = HandlerError::failed(&h, anyhow::anyhow!("nope"));
        let res = Results::assemble(
            ExecMode::Concurrent,
            vec![
                Slot::Ready(Ok(1)),
                pending(async move { Err(err) }),
                pending(async { Ok(3) }),
            ],
            Vec::new(),
        );

        let out = res.join().await;
        assert_eq!(out.len(), 3);
        assert_eq!(*out[0].as_ref().unwrap(), 1);
        assert_eq!(out[1].as_ref().unwrap_err().handler(), "bad");
        assert_eq!(*out[2].as_ref().unwrap(), 3);

        let first = res.try_values().await.unwrap_err();
        assert_eq!(first.as_label(), "handler_failed");
    }

    #[tokio::test]
    async fn external_driver_flips_done() {
        let shared = async { Ok::<_, HandlerError>(7_u32) }.boxed().shared();
        let res = Results::assemble(
            ExecMode::Sequential,
            vec![Slot::Pending(shared.clone())],
            Vec::new(),
        );
        assert!(!res.done());

        assert_eq!(shared.await.unwrap(), 7);
        assert!(res.done());
        assert_eq!(values(res.results().unwrap()), [7]);
    }

    #[tokio::test]
    async fn side_futures_count_toward_done() {
        let flag = Arc::new(Mutex::new(false));
        let set = Arc::clone(&flag);
        let side = async move {
            *set.lock().unwrap() = true;
        }
        .boxed()
        .shared();

        let res = Results::assemble(ExecMode::Sequential, vec![Slot::Ready(Ok(1_u8))], vec![side]);
        assert!(res.has_async());
        assert!(!res.done());
        assert_eq!(res.get(0).map(|o| o.is_ok()), Some(true));

        assert_eq!(values(res.join().await), [1]);
        assert!(*flag.lock().unwrap());
        assert!(res.done());
    }

    #[tokio::test]
    async fn ready_builds_a_done_aggregate() {
        let res = Results::ready(["x", "y"]);
        assert!(res.done());
        assert!(!res.has_async());
        assert_eq!(res.try_values().await.unwrap(), ["x", "y"]);
    }
}
