//! # Broker façade.
//!
//! [`Broker`] ties the tree, the dispatcher, and the options model into
//! the public surface: subscribe, publish, unsubscribe, suspend,
//! resubscribe, retained-message removal, and runtime reconfiguration.
//!
//! Every broker is independent — its own tree, its own defaults, its own
//! id space. Handles are cheap clones over shared state and stay valid
//! when moved into tasks or stored away.
//!
//! ## Example
//! ```no_run
//! use arbor::{Broker, SubscriberFn, Topic};
//!
//! # async fn demo() {
//! let bus: Broker<u32, u32> = Broker::new();
//!
//! bus.subscribe(
//!     "metrics",
//!     SubscriberFn::arc(|n: u32, _t: &Topic| Ok::<_, u32>(n)),
//! );
//!
//! let publication = bus.publish("metrics.cpu", 42);
//! assert_eq!(publication.outcome().await, Ok(vec![42]));
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::config::{Config, PublishOptions, SubscribeOptions};
use crate::dispatch::{self, lock, Publication};
use crate::merge::MergeIter;
use crate::subscribers::SubscriberRef;
use crate::token::Token;
use crate::topic::{split_expression, Topic};
use crate::tree::{Retained, Store, Subscription};

/// State shared by every handle to one broker.
pub(crate) struct Inner<M, R> {
    pub(crate) tree: Mutex<Store<M, R>>,
    pub(crate) config: Mutex<Config>,
    ids: AtomicU64,
}

impl<M, R> Inner<M, R> {
    /// Next broker-unique id. Strictly increasing; shared between
    /// subscription ids and retained-message orders.
    pub(crate) fn next_id(&self) -> u64 {
        self.ids.fetch_add(1, AtomicOrdering::Relaxed)
    }
}

/// An independent hierarchical pub/sub broker.
///
/// `M` is the payload type delivered to subscribers (cloned per
/// delivery); `R` is the outcome value type aggregated into publication
/// results.
pub struct Broker<M, R = ()> {
    inner: Arc<Inner<M, R>>,
}

impl<M, R> Clone for Broker<M, R> {
    fn clone(&self) -> Self {
        Broker {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M, R> Default for Broker<M, R>
where
    M: Clone + Send + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M, R> Broker<M, R>
where
    M: Clone + Send + 'static,
    R: Send + 'static,
{
    /// Creates a broker with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a broker with the given default options.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Broker {
            inner: Arc::new(Inner {
                tree: Mutex::new(Store::new()),
                config: Mutex::new(config),
                ids: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the current default options.
    #[must_use]
    pub fn config(&self) -> Config {
        lock(&self.inner.config).clone()
    }

    /// Mutates the default options in place. Affects subsequent
    /// operations; in-flight publishes keep their resolved options.
    pub fn configure(&self, f: impl FnOnce(&mut Config)) {
        f(&mut lock(&self.inner.config));
    }

    /// Subscribes to every topic in the expression with broker-default
    /// subscribe options. One token per topic, in expression order.
    pub fn subscribe(&self, topics: &str, subscriber: SubscriberRef<M, R>) -> Vec<Token> {
        self.subscribe_with(topics, subscriber, SubscribeOptions::default())
    }

    /// Subscribes with per-call options merged over the broker defaults.
    ///
    /// Unless `ignore_persisted`, messages retained on each subscribed
    /// topic or any of its descendants are replayed to the new subscriber
    /// on a following scheduler turn, in original publication order.
    pub fn subscribe_with(
        &self,
        topics: &str,
        subscriber: SubscriberRef<M, R>,
        opts: SubscribeOptions,
    ) -> Vec<Token> {
        let eff = lock(&self.inner.config).for_subscribe(&opts);
        split_expression(topics)
            .into_iter()
            .map(|topic| {
                let id = self.inner.next_id();
                let replay = {
                    let mut tree = lock(&self.inner.tree);
                    let node = tree.materialize(&topic);
                    node.insert_subscription(Subscription {
                        id,
                        priority: eff.priority,
                        suspended: false,
                        subscriber: Arc::clone(&subscriber),
                    });
                    if eff.ignore_persisted {
                        Vec::new()
                    } else {
                        retained_snapshot(node)
                    }
                };
                debug!(
                    topic = %topic,
                    id,
                    priority = eff.priority,
                    "subscribed"
                );
                if !replay.is_empty() {
                    trace!(topic = %topic, count = replay.len(), "replaying retained messages");
                    let subscriber = Arc::clone(&subscriber);
                    tokio::spawn(async move {
                        for retained in replay {
                            let _ = subscriber.deliver(retained.data, retained.topic).await;
                        }
                    });
                }
                Token::subscription(topic, id, eff.priority)
            })
            .collect()
    }

    /// Publishes `data` to a single topic with broker-default options.
    ///
    /// Returns the promissory [`Publication`]; its settlement is governed
    /// by the effective latch. With `sync=false` (the default) the whole
    /// dispatch runs on the next scheduler turn.
    pub fn publish(&self, topic: &str, data: M) -> Publication<R> {
        self.publish_with(topic, data, PublishOptions::default())
    }

    /// Publishes with per-call options merged over the broker defaults.
    pub fn publish_with(&self, topic: &str, data: M, opts: PublishOptions) -> Publication<R> {
        let eff = lock(&self.inner.config).for_publish(&opts);
        dispatch::publish(&self.inner, Topic::from(topic), data, eff)
    }

    /// Removes the subscription the token names. `false` when it is gone
    /// already (or the token never named one). Terminal: a removed
    /// subscription cannot be resubscribed.
    pub fn unsubscribe(&self, token: &Token) -> bool {
        let removed = lock(&self.inner.tree)
            .exact_mut(token.topic())
            .map_or(false, |node| node.remove_subscription(token));
        if removed {
            debug!(topic = %token.topic(), id = token.id(), "unsubscribed");
        }
        removed
    }

    /// Removes every subscription on each topic in the expression and on
    /// all of its descendants. One flag per topic: `true` when at least
    /// one subscription was removed.
    pub fn unsubscribe_topics(&self, topics: &str) -> Vec<bool> {
        self.sweep_expression(topics, |tree, topic| {
            tree.sweep(topic, |node| node.remove_all_subscriptions())
        })
    }

    /// Suspends the subscription the token names: it stays registered but
    /// is skipped by dispatch until resubscribed. `false` on a miss.
    pub fn suspend(&self, token: &Token) -> bool {
        self.flip_suspension(token, true)
    }

    /// Suspends every subscription on each topic in the expression and on
    /// all of its descendants.
    pub fn suspend_topics(&self, topics: &str) -> Vec<bool> {
        self.sweep_expression(topics, |tree, topic| {
            tree.sweep(topic, |node| node.set_suspended_all(true))
        })
    }

    /// Lifts suspension from the subscription the token names. `false` on
    /// a miss (including a removed subscription — removal is terminal).
    pub fn resubscribe(&self, token: &Token) -> bool {
        self.flip_suspension(token, false)
    }

    /// Lifts suspension from every subscription on each topic in the
    /// expression and on all of its descendants.
    pub fn resubscribe_topics(&self, topics: &str) -> Vec<bool> {
        self.sweep_expression(topics, |tree, topic| {
            tree.sweep(topic, |node| node.set_suspended_all(false))
        })
    }

    /// Removes the retained message a persisting publish left behind,
    /// addressed by its token (see [`Publication::token`]). `false` on a
    /// miss.
    pub fn remove_persisted(&self, token: &Token) -> bool {
        let removed = lock(&self.inner.tree)
            .exact_mut(token.topic())
            .map_or(false, |node| node.remove_persisted(token.id()));
        if removed {
            debug!(topic = %token.topic(), order = token.id(), "retained message removed");
        }
        removed
    }

    /// Clears retained messages on each topic in the expression and on
    /// all of its descendants. Ancestors and siblings are untouched. One
    /// flag per topic: `true` when at least one message was removed.
    pub fn remove_persisted_topics(&self, topics: &str) -> Vec<bool> {
        self.sweep_expression(topics, |tree, topic| {
            tree.sweep(topic, |node| node.clear_persisted())
        })
    }

    /// Clears every retained message on the broker. Returns how many were
    /// removed.
    pub fn clear_persisted(&self) -> usize {
        let n = lock(&self.inner.tree).sweep_all(|node| node.clear_persisted());
        debug!(count = n, "cleared all retained messages");
        n
    }

    fn flip_suspension(&self, token: &Token, suspended: bool) -> bool {
        let changed = lock(&self.inner.tree)
            .exact_mut(token.topic())
            .map_or(false, |node| node.set_suspended(token, suspended));
        if changed {
            debug!(topic = %token.topic(), id = token.id(), suspended, "suspension changed");
        }
        changed
    }

    fn sweep_expression<F>(&self, topics: &str, mut op: F) -> Vec<bool>
    where
        F: FnMut(&mut Store<M, R>, &str) -> Option<usize>,
    {
        let mut tree = lock(&self.inner.tree);
        split_expression(topics)
            .into_iter()
            .map(|topic| op(&mut tree, &topic).is_some_and(|n| n > 0))
            .collect()
    }
}

/// Retained messages of `node` and all descendants, merged into global
/// publication order.
fn retained_snapshot<M, R>(node: &crate::tree::Node<M, R>) -> Vec<Retained<M>>
where
    M: Clone,
{
    let lists: Vec<Vec<Retained<M>>> = Store::descendants(node)
        .into_iter()
        .map(|n| n.persisted.clone())
        .collect();
    MergeIter::new(lists, |r: &Retained<M>| r.order).collect()
}
