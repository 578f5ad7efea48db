//! # Subscriber trait.
//!
//! [`Subscriber`] is the extension point for receiving publications. A
//! subscriber is registered on a topic and invoked once per matching
//! publish with the payload and the *published* topic (which may be a
//! descendant of the subscribed one).
//!
//! The returned `Result` is the invocation outcome fed to the publication's
//! resolver: `Ok` counts as a fulfillment, `Err` as a rejection. Neither
//! escapes as an exception — both are aggregated under the publication's
//! latch policy.
//!
//! ### Rules
//! - `deliver` runs on its own spawned task, never inside `publish`.
//! - One subscriber registered on several ancestors of a topic is invoked
//!   once per registration.
//! - Panics are caught by the dispatcher, logged, and counted as a
//!   rejection.

use std::sync::Arc;

use async_trait::async_trait;

use crate::topic::Topic;

/// Receives publications on a subscribed topic.
///
/// `M` is the payload type, `R` the outcome value type (used for both
/// fulfillment and rejection so settlement-latch concatenation stays
/// well-typed).
#[async_trait]
pub trait Subscriber<M, R>: Send + Sync + 'static {
    /// Handles one publication.
    ///
    /// `topic` is the topic that was published, not necessarily the one
    /// subscribed to (publications bubble up the ancestor chain).
    async fn deliver(&self, data: M, topic: Topic) -> Result<R, R>;
}

/// Shared subscriber handle, as stored in the broker tree.
pub type SubscriberRef<M, R> = Arc<dyn Subscriber<M, R>>;
