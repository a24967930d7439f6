//! # Units of work.
//!
//! A fire can hand every pending computation it produces to an external joiner,
//! so that the joiner waits on the same completion set the [`Results`](crate::Results)
//! aggregate exposes. The joiner is passed explicitly through
//! [`FireOptions`](crate::FireOptions); there is no ambient lookup.
//!
//! - [`UnitOfWork`] - the capability a fire needs (`enlist`, optional cancellation)
//! - [`Transaction`] - an in-memory implementation with `begin` / `end` / `cancel`
//!
//! ```text
//! Transaction::begin() ──► FireOptions::default().enlist_into(tx)
//!                                   │
//!          fire ──► pending slot ───┼──► Results (slot i)
//!                                   └──► tx.enlist(same shared future)
//!
//! tx.end().await ──► every enlisted computation settled
//! tx.cancel()    ──► pending slots settle with HandlerError::Cancelled
//! ```

mod transaction;

pub use transaction::Transaction;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// External joiner of pending handler computations.
pub trait UnitOfWork: Send + Sync {
    /// Takes one pending computation. It settles when the matching aggregate slot does.
    fn enlist(&self, work: BoxFuture<'static, ()>);

    /// Token whose cancellation fails the pending slots of fires that enlisted here.
    ///
    /// The default has none: enlisted work cannot be cancelled.
    fn cancellation(&self) -> Option<CancellationToken> {
        None
    }
}
