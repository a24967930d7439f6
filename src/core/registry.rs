//! # Subscriber registry - copy-on-write list of weak entries.
//!
//! The registry stores one [`Subscriber`] per connected callable, in insertion
//! order. It is the only mutable state of a signal.
//!
//! ## Architecture
//! ```text
//! connect ──► add()    ──┐
//!                        ├─► rcu(clone → modify → swap) ──► ArcSwap<Vec<Entry>>
//! disconnect ► remove() ─┘                                        │
//!                                                                 │ load (no lock)
//! fire ──► snapshot() ◄───────────────────────────────────────────┘
//!            └─► upgrade each entry, skip dead ones, keep order
//! ```
//!
//! ## Rules
//! - Readers never block writers and never observe a half-applied mutation.
//! - A snapshot is a point-in-time copy: later writes do not affect it.
//! - Identity is [`Subscriber::same_as`]; adding an equal live subscriber is a no-op.
//! - Dead entries are skipped on read and dropped on the next write.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::handlers::{HandlerRef, Subscriber};

/// Global sequence counter for entry ordering.
static ENTRY_SEQ: AtomicU64 = AtomicU64::new(0);

/// One registered subscriber.
struct Entry<A, R> {
    seq: u64,
    rank: Option<u32>,
    subscriber: Subscriber<A, R>,
}

impl<A, R> Clone for Entry<A, R> {
    fn clone(&self) -> Self {
        Self {
            seq: self.seq,
            rank: self.rank,
            subscriber: self.subscriber.clone(),
        }
    }
}

/// Read-only description of a registry entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryInfo {
    /// Insertion sequence number (globally monotonic).
    pub seq: u64,
    /// Resolved position assigned by the class ordering resolver, if any.
    pub rank: Option<u32>,
    /// Handler or method name.
    pub name: String,
    /// Whether the target is still alive.
    pub alive: bool,
}

/// Ordered set of weakly held subscribers.
pub struct Registry<A, R> {
    entries: ArcSwap<Vec<Entry<A, R>>>,
}

impl<A: 'static, R: 'static> Registry<A, R> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Registers `subscriber` unless an equal live entry exists.
    ///
    /// Returns `true` if a new entry was created.
    pub fn add(&self, subscriber: &Subscriber<A, R>) -> bool {
        self.add_ranked(subscriber, None)
    }

    /// Same as [`add`](Self::add), recording the resolver position as entry metadata.
    pub fn add_ranked(&self, subscriber: &Subscriber<A, R>, rank: Option<u32>) -> bool {
        let mut added = false;
        self.entries.rcu(|current| {
            let mut next = live_entries(current);
            added = !next.iter().any(|e| e.subscriber.same_as(subscriber));
            if added {
                next.push(Entry {
                    seq: ENTRY_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
                    rank,
                    subscriber: subscriber.clone(),
                });
            }
            next
        });
        added
    }

    /// Removes the live entry equal to `subscriber`.
    ///
    /// Returns `true` if something was removed; absent or collected entries are a no-op.
    pub fn remove(&self, subscriber: &Subscriber<A, R>) -> bool {
        let mut removed = false;
        self.entries.rcu(|current| {
            let mut next = live_entries(current);
            let before = next.len();
            next.retain(|e| !e.subscriber.same_as(subscriber));
            removed = next.len() != before;
            next
        });
        removed
    }

    /// Resolves every live entry, in insertion order.
    pub fn snapshot(&self) -> Vec<HandlerRef<A, R>> {
        self.entries
            .load()
            .iter()
            .filter_map(|e| e.subscriber.upgrade())
            .collect()
    }

    /// Returns `true` if an equal live entry is registered.
    pub fn contains(&self, subscriber: &Subscriber<A, R>) -> bool {
        self.entries
            .load()
            .iter()
            .any(|e| e.subscriber.is_alive() && e.subscriber.same_as(subscriber))
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries
            .load()
            .iter()
            .filter(|e| e.subscriber.is_alive())
            .count()
    }

    /// Returns `true` if no live entry is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry immediately, alive or not.
    pub fn clear(&self) {
        self.entries.store(Arc::new(Vec::new()));
    }

    /// Drops collected entries. Only reclaims memory; reads already skip them.
    ///
    /// Returns the number of entries dropped.
    pub fn prune(&self) -> usize {
        let mut dropped = 0;
        self.entries.rcu(|current| {
            let next = live_entries(current);
            dropped = current.len() - next.len();
            next
        });
        if dropped > 0 {
            tracing::trace!(dropped, "pruned dead subscribers");
        }
        dropped
    }

    /// Describes every stored entry, dead ones included.
    pub fn entries(&self) -> Vec<EntryInfo> {
        self.entries
            .load()
            .iter()
            .map(|e| EntryInfo {
                seq: e.seq,
                rank: e.rank,
                name: e.subscriber.name().to_string(),
                alive: e.subscriber.is_alive(),
            })
            .collect()
    }
}

impl<A: 'static, R: 'static> Default for Registry<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

fn live_entries<A: 'static, R: 'static>(current: &Arc<Vec<Entry<A, R>>>) -> Vec<Entry<A, R>> {
    current
        .iter()
        .filter(|e| e.subscriber.is_alive())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerFn;

    fn names(reg: &Registry<u32, u32>) -> Vec<String> {
        reg.snapshot().iter().map(|h| h.name().to_string()).collect()
    }

    #[test]
    fn add_is_idempotent_on_identity() {
        let reg = Registry::<u32, u32>::new();
        let h = HandlerFn::arc("h", |n: &u32| Ok(*n));
        assert!(reg.add(&Subscriber::from(&h)));
        assert!(!reg.add(&Subscriber::from(&h)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn snapshot_keeps_insertion_order() {
        let reg = Registry::<u32, u32>::new();
        let a = HandlerFn::arc("a", |n: &u32| Ok(*n));
        let b = HandlerFn::arc("b", |n: &u32| Ok(*n));
        let c = HandlerFn::arc("c", |n: &u32| Ok(*n));
        reg.add(&Subscriber::from(&b));
        reg.add(&Subscriber::from(&a));
        reg.add(&Subscriber::from(&c));
        assert_eq!(names(&reg), ["b", "a", "c"]);

        let seqs: Vec<u64> = reg.entries().iter().map(|e| e.seq).collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn remove_absent_is_noop() {
        let reg = Registry::<u32, u32>::new();
        let h = HandlerFn::arc("h", |n: &u32| Ok(*n));
        let sub = Subscriber::from(&h);
        assert!(!reg.remove(&sub));
        reg.add(&sub);
        assert!(reg.remove(&sub));
        assert!(!reg.remove(&sub));
        assert!(reg.is_empty());
    }

    #[test]
    fn dropped_handler_disappears_from_snapshot() {
        let reg = Registry::<u32, u32>::new();
        let keep = HandlerFn::arc("keep", |n: &u32| Ok(*n));
        let gone = HandlerFn::arc("gone", |n: &u32| Ok(*n));
        reg.add(&Subscriber::from(&gone));
        reg.add(&Subscriber::from(&keep));

        drop(gone);
        assert_eq!(names(&reg), ["keep"]);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.entries().len(), 2);

        assert_eq!(reg.prune(), 1);
        assert_eq!(reg.entries().len(), 1);
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let reg = Registry::<u32, u32>::new();
        let a = HandlerFn::arc("a", |n: &u32| Ok(*n));
        let b = HandlerFn::arc("b", |n: &u32| Ok(*n));
        reg.add(&Subscriber::from(&a));

        let snap = reg.snapshot();
        reg.add(&Subscriber::from(&b));
        reg.remove(&Subscriber::from(&a));

        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].name(), "a");
        assert_eq!(names(&reg), ["b"]);
    }

    #[test]
    fn clear_drops_everything() {
        let reg = Registry::<u32, u32>::new();
        let a = HandlerFn::arc("a", |n: &u32| Ok(*n));
        let b = HandlerFn::arc("b", |n: &u32| Ok(*n));
        reg.add(&Subscriber::from(&a));
        reg.add_ranked(&Subscriber::from(&b), Some(3));
        assert_eq!(reg.entries()[1].rank, Some(3));

        reg.clear();
        assert_eq!(reg.len(), 0);
        assert!(reg.snapshot().is_empty());
    }

    #[test]
    fn concurrent_writers_do_not_lose_updates() {
        let reg = Arc::new(Registry::<u32, u32>::new());
        let handlers: Vec<_> = (0..64)
            .map(|i| HandlerFn::arc(format!("h{i}"), |n: &u32| Ok(*n)))
            .collect();

        std::thread::scope(|s| {
            for chunk in handlers.chunks(16) {
                let reg = Arc::clone(&reg);
                s.spawn(move || {
                    for h in chunk {
                        reg.add(&Subscriber::from(h));
                    }
                });
            }
        });

        assert_eq!(reg.len(), 64);
    }
}
