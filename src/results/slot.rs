//! One position of a [`Results`](crate::Results) aggregate.

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::HandlerError;

/// Outcome of a single handler invocation.
pub type Outcome<R> = Result<R, HandlerError>;

/// Pending handler computation, shareable with a unit of work.
pub(crate) type SharedOutcome<R> = Shared<BoxFuture<'static, Outcome<R>>>;

/// Pending side computation (bridge publish) that has no slot of its own.
pub(crate) type SharedSide = Shared<BoxFuture<'static, ()>>;

/// A slot holds either a concrete outcome or a handle to a pending one.
pub(crate) enum Slot<R> {
    Ready(Outcome<R>),
    Pending(SharedOutcome<R>),
}

impl<R> Slot<R>
where
    R: Clone + Send + Sync + 'static,
{
    /// Wraps a pending computation so that several joiners can await it.
    pub(crate) fn pending(fut: BoxFuture<'static, Outcome<R>>) -> Self {
        Slot::Pending(fut.shared())
    }

    /// Outcome, if already known.
    pub(crate) fn peek(&self) -> Option<&Outcome<R>> {
        match self {
            Slot::Ready(out) => Some(out),
            Slot::Pending(fut) => fut.peek(),
        }
    }

    #[inline]
    pub(crate) fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending(_))
    }
}
