//! Topic-tree nodes: per-topic subscription and retained-message storage.
//!
//! One node per materialized topic. Children are kept sorted by topic so
//! descent can binary-search; subscriptions are kept sorted by priority
//! (ties in registration order); retained messages are kept in publication
//! order.

use crate::subscribers::SubscriberRef;
use crate::token::Token;
use crate::topic::Topic;

/// One registered subscriber on one topic.
pub(crate) struct Subscription<M, R> {
    pub(crate) id: u64,
    pub(crate) priority: f64,
    pub(crate) suspended: bool,
    pub(crate) subscriber: SubscriberRef<M, R>,
}

/// One retained publication awaiting late delivery.
#[derive(Clone)]
pub(crate) struct Retained<M> {
    pub(crate) topic: Topic,
    pub(crate) data: M,
    pub(crate) order: u64,
}

/// A materialized topic with its children, subscriptions, and retained
/// messages.
pub(crate) struct Node<M, R> {
    pub(crate) topic: Topic,
    /// Sorted lexicographically by topic.
    pub(crate) children: Vec<Node<M, R>>,
    /// Sorted by `(priority asc, id asc)`.
    pub(crate) subscriptions: Vec<Subscription<M, R>>,
    /// Sorted by `order` (appended under a monotonic id).
    pub(crate) persisted: Vec<Retained<M>>,
}

impl<M, R> Node<M, R> {
    pub(crate) fn new(topic: Topic) -> Self {
        Node {
            topic,
            children: Vec::new(),
            subscriptions: Vec::new(),
            persisted: Vec::new(),
        }
    }

    /// Index of the child with exactly this topic.
    pub(crate) fn child_index(&self, topic: &str) -> Result<usize, usize> {
        self.children
            .binary_search_by(|c| c.topic.as_str().cmp(topic))
    }

    /// Child with exactly this topic, if materialized.
    pub(crate) fn child(&self, topic: &str) -> Option<&Node<M, R>> {
        self.child_index(topic).ok().map(|i| &self.children[i])
    }

    /// Inserts a subscription keeping `(priority asc, id asc)` order.
    /// Equal priorities land after existing ones, so registration order is
    /// preserved within a tie group.
    pub(crate) fn insert_subscription(&mut self, sub: Subscription<M, R>) {
        let at = self
            .subscriptions
            .partition_point(|s| s.priority.total_cmp(&sub.priority).is_le());
        self.subscriptions.insert(at, sub);
    }

    /// Locates a subscription by token: binary-search anchor at the
    /// token's priority, then a linear scan across the tie group for the
    /// id.
    fn locate(&self, token: &Token) -> Option<usize> {
        let priority = token.priority()?;
        let start = self
            .subscriptions
            .partition_point(|s| s.priority.total_cmp(&priority).is_lt());
        self.subscriptions[start..]
            .iter()
            .take_while(|s| s.priority.total_cmp(&priority).is_eq())
            .position(|s| s.id == token.id())
            .map(|off| start + off)
    }

    /// Removes the subscription the token names. `false` on a miss.
    pub(crate) fn remove_subscription(&mut self, token: &Token) -> bool {
        match self.locate(token) {
            Some(i) => {
                self.subscriptions.remove(i);
                true
            }
            None => false,
        }
    }

    /// Sets the suspension flag on the subscription the token names.
    /// `false` on a miss.
    pub(crate) fn set_suspended(&mut self, token: &Token, suspended: bool) -> bool {
        match self.locate(token) {
            Some(i) => {
                self.subscriptions[i].suspended = suspended;
                true
            }
            None => false,
        }
    }

    /// Flips the suspension flag on every subscription. Returns how many
    /// were touched.
    pub(crate) fn set_suspended_all(&mut self, suspended: bool) -> usize {
        for s in &mut self.subscriptions {
            s.suspended = suspended;
        }
        self.subscriptions.len()
    }

    /// Drops every subscription. Returns how many were removed.
    pub(crate) fn remove_all_subscriptions(&mut self) -> usize {
        let n = self.subscriptions.len();
        self.subscriptions.clear();
        n
    }

    /// Appends a retained message; `order` is monotonic so the list stays
    /// sorted.
    pub(crate) fn push_persisted(&mut self, retained: Retained<M>) {
        debug_assert!(self
            .persisted
            .last()
            .map_or(true, |p| p.order < retained.order));
        self.persisted.push(retained);
    }

    /// Removes the retained message with this order. `false` on a miss.
    pub(crate) fn remove_persisted(&mut self, order: u64) -> bool {
        match self.persisted.binary_search_by_key(&order, |p| p.order) {
            Ok(i) => {
                self.persisted.remove(i);
                true
            }
            Err(_) => false,
        }
    }

    /// Drops every retained message. Returns how many were removed.
    pub(crate) fn clear_persisted(&mut self) -> usize {
        let n = self.persisted.len();
        self.persisted.clear();
        n
    }

    /// Active (non-suspended) subscriptions in dispatch order: priority
    /// descending, registration order within a tie group.
    pub(crate) fn dispatch_order(&self) -> Vec<&Subscription<M, R>> {
        let mut out = Vec::with_capacity(self.subscriptions.len());
        let mut hi = self.subscriptions.len();
        while hi > 0 {
            let priority = self.subscriptions[hi - 1].priority;
            let lo = self
                .subscriptions
                .partition_point(|s| s.priority.total_cmp(&priority).is_lt());
            out.extend(
                self.subscriptions[lo..hi]
                    .iter()
                    .filter(|s| !s.suspended),
            );
            hi = lo;
        }
        out
    }
}
