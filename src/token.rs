//! # Tokens: opaque handles to subscriptions and retained messages.
//!
//! A token comes back from [`Broker::subscribe`](crate::Broker::subscribe)
//! (one per topic) and from a persisting publish (via
//! [`Publication::token`](crate::Publication::token)). It is a weak
//! reference: the broker resolves it by `(topic, id)` lookup on use, and a
//! stale token simply reports `false`. Tokens are value-comparable and
//! losing one is tolerable — topic-scoped operations can substitute.

use crate::topic::Topic;

/// Opaque handle identifying a subscription or a retained message.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    topic: Topic,
    id: u64,
    priority: Option<f64>,
}

impl Token {
    pub(crate) fn subscription(topic: Topic, id: u64, priority: f64) -> Self {
        Token {
            topic,
            id,
            priority: Some(priority),
        }
    }

    pub(crate) fn persisted(topic: Topic, order: u64) -> Self {
        Token {
            topic,
            id: order,
            priority: None,
        }
    }

    /// The topic this token was issued for.
    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// The broker-unique id (subscription id, or retained-message order).
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The subscription priority; `None` for retained-message tokens.
    #[must_use]
    pub fn priority(&self) -> Option<f64> {
        self.priority
    }
}
