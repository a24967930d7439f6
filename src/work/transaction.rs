//! In-memory unit of work.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{join_all, BoxFuture};
use tokio_util::sync::CancellationToken;

use super::UnitOfWork;

/// Collects enlisted computations and waits for all of them on [`end`](Transaction::end).
///
/// ## Example
/// ```rust
/// use sigvisor::{AsyncHandlerFn, FireOptions, Signal, Transaction};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sig = Signal::<u32, u32>::new();
/// let h = AsyncHandlerFn::arc("later", |n: &u32| {
///     let n = *n;
///     async move { Ok(n) }
/// });
/// sig.connect(&h)?;
///
/// let tx = Transaction::begin();
/// let res = sig.fire_with(5, FireOptions::default().enlist_into(tx.clone()))?;
/// assert_eq!(tx.len(), 1);
///
/// tx.end().await;
/// assert!(res.done());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Transaction {
    pending: Mutex<Vec<BoxFuture<'static, ()>>>,
    token: CancellationToken,
}

impl Transaction {
    /// Starts a new transaction.
    pub fn begin() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of enlisted computations not yet drained by [`end`](Self::end).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancels the transaction. Pending slots enlisted here settle as cancelled.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits until every enlisted computation has settled.
    ///
    /// Work enlisted while waiting is awaited too.
    pub async fn end(&self) {
        loop {
            let batch = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                return;
            }
            tracing::trace!(count = batch.len(), "transaction draining");
            join_all(batch).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BoxFuture<'static, ()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UnitOfWork for Transaction {
    fn enlist(&self, work: BoxFuture<'static, ()>) {
        self.lock().push(work);
    }

    fn cancellation(&self) -> Option<CancellationToken> {
        Some(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;

    use super::*;

    #[tokio::test]
    async fn end_drains_everything() {
        let tx = Transaction::begin();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            tx.enlist(
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
                .boxed(),
            );
        }
        assert_eq!(tx.len(), 3);

        tx.end().await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(tx.is_empty());
    }

    #[tokio::test]
    async fn work_enlisted_while_draining_is_awaited() {
        let tx = Transaction::begin();
        let hits = Arc::new(AtomicUsize::new(0));

        let inner_tx = Arc::clone(&tx);
        let inner_hits = Arc::clone(&hits);
        tx.enlist(
            async move {
                let hits = Arc::clone(&inner_hits);
                inner_tx.enlist(
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                    }
                    .boxed(),
                );
                inner_hits.fetch_add(1, Ordering::SeqCst);
            }
            .boxed(),
        );

        tx.end().await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cancel_is_visible_through_the_token() {
        let tx = Transaction::begin();
        let token = tx.cancellation().unwrap();
        assert!(!token.is_cancelled());
        tx.cancel();
        assert!(token.is_cancelled());
        assert!(tx.is_cancelled());
    }
}
