//! # Dispatcher: from a published topic to launched invocations.
//!
//! One publish turns into:
//!
//! ```text
//! publish(topic, data)
//!     │ lineage lookup (or exact node under prevent_bubble)
//!     ▼
//! per-node dispatch lists ── k-way merge by priority ──► launch queue
//!     │                                                      │
//!     │          ┌── semaphore admits ◄──────────────────────┘
//!     ▼          ▼
//! spawned invocation tasks ──► outcome ──► resolver ──► settle / pump next
//! ```
//!
//! ## Rules
//! - The dispatch list is a snapshot taken under the tree lock; later
//!   subscribes or unsubscribes do not affect an in-flight publish.
//! - Launch order is priority descending across the whole lineage; equal
//!   priorities fire shallowest ancestor first, then in registration
//!   order.
//! - At most `semaphore` invocations are in flight; each settling
//!   invocation admits the next queued one.
//! - A panicking subscriber is isolated: logged and recorded as a
//!   rejection.
//! - `sync=false` defers everything — including the persistence write and
//!   the latch's first evaluation — to the next scheduler turn.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, trace};

use crate::broker::Inner;
use crate::config::PublishEffective;
use crate::merge::MergeIter;
use crate::subscribers::SubscriberRef;
use crate::token::Token;
use crate::topic::Topic;
use crate::tree::Retained;

use super::publication::{lock, Publication, Shared};
use super::resolver::{Delivered, InvokeThunk};

/// Merge key ordering dispatch entries: priority descending, with merge
/// ties falling to the earliest (shallowest) lineage node.
struct DispatchKey(f64);

impl PartialEq for DispatchKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0).is_eq()
    }
}

impl Eq for DispatchKey {}

impl PartialOrd for DispatchKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DispatchKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: a higher priority is a smaller merge key.
        other.0.total_cmp(&self.0)
    }
}

/// Entry point for the broker façade: creates the publication handle and
/// runs (or defers) the dispatch.
pub(crate) fn publish<M, R>(
    inner: &Arc<Inner<M, R>>,
    topic: Topic,
    data: M,
    eff: PublishEffective,
) -> Publication<R>
where
    M: Clone + Send + 'static,
    R: Send + 'static,
{
    let (publication, shared) = Publication::new(topic.clone());
    if eff.sync {
        dispatch(inner, topic, data, eff, shared);
    } else {
        let inner = Arc::clone(inner);
        tokio::spawn(async move { dispatch(&inner, topic, data, eff, shared) });
    }
    publication
}

/// Builds the dispatch list, launches the initial wave, persists, and runs
/// the latch's first evaluation.
fn dispatch<M, R>(
    inner: &Arc<Inner<M, R>>,
    topic: Topic,
    data: M,
    eff: PublishEffective,
    shared: Arc<Shared<R>>,
) where
    M: Clone + Send + 'static,
    R: Send + 'static,
{
    let subscribers: Vec<SubscriberRef<M, R>> = {
        let tree = lock(&inner.tree);
        let lineage = tree.lineage(&topic);
        let lists: Vec<Vec<(f64, SubscriberRef<M, R>)>> = if eff.prevent_bubble {
            // Exact-topic subscribers only; nothing when the topic itself
            // is not materialized.
            match lineage.last().copied() {
                Some(node) if node.topic == topic => vec![snapshot(node)],
                _ => Vec::new(),
            }
        } else {
            lineage.into_iter().map(snapshot).collect()
        };
        MergeIter::new(lists, |(priority, _): &(f64, SubscriberRef<M, R>)| {
            DispatchKey(*priority)
        })
            .map(|(_, sub)| sub)
            .collect()
    };

    let total = subscribers.len();
    debug!(
        topic = %topic,
        subscribers = total,
        sync = eff.sync,
        persist = eff.persist,
        "dispatching publication"
    );

    {
        let mut core = lock(&shared.core);
        core.opts = eff;
        core.pending = total;
        core.queue = subscribers
            .into_iter()
            .map(|sub| {
                let data = data.clone();
                let topic = topic.clone();
                let thunk: InvokeThunk<R> =
                    Box::new(move || async move { sub.deliver(data, topic).await }.boxed());
                thunk
            })
            .collect();
    }

    pump(&shared);

    if eff.persist {
        let token = {
            let mut tree = lock(&inner.tree);
            let order = inner.next_id();
            let node = tree.materialize(&topic);
            node.push_persisted(Retained {
                topic: topic.clone(),
                data,
                order,
            });
            Token::persisted(topic.clone(), order)
        };
        trace!(topic = %topic, order = token.id(), "publication retained");
        lock(&shared.core).token = Some(token);
    }

    try_settle(&shared);
}

/// One node's active subscriptions as owned dispatch entries, already in
/// per-node dispatch order.
fn snapshot<M, R>(node: &crate::tree::Node<M, R>) -> Vec<(f64, SubscriberRef<M, R>)> {
    node.dispatch_order()
        .into_iter()
        .map(|s| (s.priority, Arc::clone(&s.subscriber)))
        .collect()
}

/// Launches queued invocations while the semaphore admits them.
fn pump<R>(shared: &Arc<Shared<R>>)
where
    R: Send + 'static,
{
    loop {
        let mut core = lock(&shared.core);
        if core.settled.is_some() && !core.opts.update_after_settlement {
            return;
        }
        if core.in_flight >= core.opts.semaphore {
            return;
        }
        let Some(thunk) = core.queue.pop_front() else {
            return;
        };
        core.in_flight += 1;
        drop(core);

        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            let outcome = std::panic::AssertUnwindSafe(thunk()).catch_unwind().await;
            on_outcome(&shared, outcome.ok());
        });
    }
}

/// Feeds one settled invocation to the resolver, then admits the next
/// queued invocation or re-evaluates the latch.
fn on_outcome<R>(shared: &Arc<Shared<R>>, outcome: Delivered<R>)
where
    R: Send + 'static,
{
    if outcome.is_none() {
        error!(topic = %shared.topic, "subscriber panicked during delivery");
    }

    let queued = {
        let mut core = lock(&shared.core);
        core.in_flight -= 1;
        if !core.record(outcome) {
            return;
        }
        !core.queue.is_empty()
    };

    if queued {
        pump(shared);
    } else {
        try_settle(shared);
    }
}

/// Settles the publication when the latch is met or unsatisfiable.
fn try_settle<R>(shared: &Arc<Shared<R>>) {
    let settled = {
        let mut core = lock(&shared.core);
        if core.settled.is_some() {
            return;
        }
        let verdict = core.evaluate();
        if let Some(ok) = verdict {
            core.settled = Some(ok);
        }
        verdict
    };

    if let Some(fulfilled) = settled {
        debug!(topic = %shared.topic, fulfilled, "publication settled");
        shared.settled_tx.send_replace(true);
    }
}
