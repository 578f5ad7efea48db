//! # Publication handle.
//!
//! [`Publication`] is what `publish` hands back: a promissory view of the
//! dispatch. It exposes the live counters, the retained-message token when
//! the publish persisted, and the settlement outcome — non-blocking via
//! [`Publication::try_outcome`], awaitable via [`Publication::outcome`].
//!
//! The handle is created before dispatch begins; with deferred publishes
//! the counters stay at zero until the dispatch turn runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::error::{Outcome, Rejected};
use crate::token::Token;
use crate::topic::Topic;

use super::resolver::Core;

/// State shared between the dispatcher and every publication handle.
pub(crate) struct Shared<R> {
    pub(crate) core: Mutex<Core<R>>,
    pub(crate) settled_tx: watch::Sender<bool>,
    pub(crate) topic: Topic,
}

/// Locks a mutex, surviving poisoning (broker state stays usable even if
/// an invocation task died mid-update).
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Promissory result of one publish.
///
/// Settles when the latch is met (fulfillment) or becomes unsatisfiable
/// (rejection); until then `pending` reflects the outstanding subscriber
/// invocations. Cloning yields another view of the same publication.
pub struct Publication<R> {
    shared: Arc<Shared<R>>,
}

impl<R> Clone for Publication<R> {
    fn clone(&self) -> Self {
        Publication {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R> Publication<R> {
    pub(crate) fn new(topic: Topic) -> (Self, Arc<Shared<R>>) {
        let (settled_tx, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            core: Mutex::new(Core::new()),
            settled_tx,
            topic,
        });
        (
            Publication {
                shared: Arc::clone(&shared),
            },
            shared,
        )
    }

    /// The topic this publication was made to.
    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.shared.topic
    }

    /// Fulfillment count so far.
    #[must_use]
    pub fn fulfilled(&self) -> usize {
        lock(&self.shared.core).fulfilled
    }

    /// Rejection count so far.
    #[must_use]
    pub fn rejected(&self) -> usize {
        lock(&self.shared.core).rejected
    }

    /// Subscriber invocations not yet settled.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.shared.core).pending
    }

    /// Whether the publication has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        lock(&self.shared.core).settled.is_some()
    }

    /// The retained-message token, when this publish persisted. Usable
    /// with [`Broker::remove_persisted`](crate::Broker::remove_persisted).
    /// Deferred publishes attach it on the dispatch turn.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        lock(&self.shared.core).token.clone()
    }
}

impl<R: Clone> Publication<R> {
    /// The settlement outcome, if settled.
    ///
    /// Fulfillment carries the fulfillment values in completion order —
    /// followed by the rejection values under a settlement latch.
    /// Rejection carries the accumulated rejection values.
    #[must_use]
    pub fn try_outcome(&self) -> Option<Outcome<R>> {
        let core = lock(&self.shared.core);
        let fulfilled = core.settled?;
        if fulfilled {
            let mut values = core.fulfilled_values.clone();
            if core.opts.settlement_latch {
                values.extend(core.rejected_values.iter().cloned());
            }
            Some(Ok(values))
        } else {
            Some(Err(Rejected::new(core.rejected_values.clone())))
        }
    }

    /// Waits for settlement and returns the outcome.
    ///
    /// A publication whose latch is never met and never becomes
    /// unsatisfiable pends forever; so does this call.
    pub async fn outcome(&self) -> Outcome<R> {
        let mut rx = self.shared.settled_tx.subscribe();
        loop {
            if let Some(outcome) = self.try_outcome() {
                return outcome;
            }
            // The sender lives in `self.shared`; it cannot drop while we
            // hold the handle.
            if rx.changed().await.is_err() {
                unreachable!("settlement channel closed while the publication is alive");
            }
        }
    }
}

impl<R> std::fmt::Debug for Publication<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = lock(&self.shared.core);
        f.debug_struct("Publication")
            .field("topic", &self.shared.topic)
            .field("settled", &core.settled)
            .field("fulfilled", &core.fulfilled)
            .field("rejected", &core.rejected)
            .field("pending", &core.pending)
            .finish()
    }
}
