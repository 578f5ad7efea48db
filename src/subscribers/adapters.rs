//! # Closure adapters for the three subscriber shapes.
//!
//! Mirrors the three invocation protocols a subscriber can use:
//! synchronous return ([`SubscriberFn`]), future return ([`FutureFn`]), and
//! node-style completion callback ([`DoneFn`] with [`Done`]). [`Noop`]
//! stands in where a real handler is not wanted but the publication should
//! still observe a settled outcome.
//!
//! ## Example
//! ```
//! use arbor::{Done, DoneFn, FutureFn, SubscriberFn, Topic};
//!
//! // Synchronous: the return value settles the invocation.
//! let doubler = SubscriberFn::arc(|n: u32, _t: &Topic| Ok::<_, u32>(n * 2));
//!
//! // Future-returning: the future settles the invocation.
//! let echo = FutureFn::arc(|n: u32, _t: Topic| async move { Ok::<_, u32>(n) });
//!
//! // Node-style: the `Done` resolver settles the invocation.
//! let gated = DoneFn::arc(|n: u32, _t: Topic, done: Done<u32>| {
//!     if n % 2 == 0 {
//!         done.fulfill(n);
//!     } else {
//!         done.reject(n);
//!     }
//! });
//! # let _ = (doubler, echo, gated);
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::topic::Topic;

use super::{Subscriber, SubscriberRef};

/// Subscriber backed by a synchronous closure.
///
/// The closure's `Result` is the invocation outcome; returning `Err` is
/// the typed equivalent of throwing.
pub struct SubscriberFn<F> {
    f: F,
}

impl<F> SubscriberFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the adapter and returns it as a shared handle.
    pub fn arc<M, R>(f: F) -> SubscriberRef<M, R>
    where
        M: Send + 'static,
        R: Send + 'static,
        F: Fn(M, &Topic) -> Result<R, R> + Send + Sync + 'static,
    {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<M, R, F> Subscriber<M, R> for SubscriberFn<F>
where
    M: Send + 'static,
    R: Send + 'static,
    F: Fn(M, &Topic) -> Result<R, R> + Send + Sync + 'static,
{
    async fn deliver(&self, data: M, topic: Topic) -> Result<R, R> {
        (self.f)(data, &topic)
    }
}

/// Subscriber backed by a future-returning closure.
///
/// The closure runs synchronously to *produce* the future; the future is
/// then awaited for the outcome.
pub struct FutureFn<F> {
    f: F,
}

impl<F> FutureFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the adapter and returns it as a shared handle.
    pub fn arc<M, R, Fut>(f: F) -> SubscriberRef<M, R>
    where
        M: Send + 'static,
        R: Send + 'static,
        F: Fn(M, Topic) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, R>> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<M, R, F, Fut> Subscriber<M, R> for FutureFn<F>
where
    M: Send + 'static,
    R: Send + 'static,
    F: Fn(M, Topic) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, R>> + Send + 'static,
{
    async fn deliver(&self, data: M, topic: Topic) -> Result<R, R> {
        (self.f)(data, topic).await
    }
}

/// Completion handle for [`DoneFn`] subscribers.
///
/// Exactly one of [`fulfill`](Done::fulfill) / [`reject`](Done::reject)
/// settles the invocation. Dropping the handle without calling either
/// leaves the invocation pending forever — the publication's `pending`
/// counter keeps reflecting it.
pub struct Done<R> {
    tx: oneshot::Sender<Result<R, R>>,
}

impl<R> Done<R> {
    /// Settles the invocation as a fulfillment.
    pub fn fulfill(self, value: R) {
        let _ = self.tx.send(Ok(value));
    }

    /// Settles the invocation as a rejection.
    pub fn reject(self, value: R) {
        let _ = self.tx.send(Err(value));
    }
}

/// Subscriber backed by a node-style closure taking a [`Done`] resolver.
pub struct DoneFn<F> {
    f: F,
}

impl<F> DoneFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the adapter and returns it as a shared handle.
    pub fn arc<M, R>(f: F) -> SubscriberRef<M, R>
    where
        M: Send + 'static,
        R: Send + 'static,
        F: Fn(M, Topic, Done<R>) + Send + Sync + 'static,
    {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<M, R, F> Subscriber<M, R> for DoneFn<F>
where
    M: Send + 'static,
    R: Send + 'static,
    F: Fn(M, Topic, Done<R>) + Send + Sync + 'static,
{
    async fn deliver(&self, data: M, topic: Topic) -> Result<R, R> {
        let (tx, rx) = oneshot::channel();
        (self.f)(data, topic, Done { tx });
        match rx.await {
            Ok(outcome) => outcome,
            // Resolver dropped without settling: stay pending, like a
            // completion callback that is never called.
            Err(_) => std::future::pending().await,
        }
    }
}

/// Placeholder subscriber: fulfills every delivery with `R::default()`.
pub struct Noop;

impl Noop {
    /// Returns the placeholder as a shared handle.
    pub fn arc<M, R>() -> SubscriberRef<M, R>
    where
        M: Send + 'static,
        R: Default + Send + 'static,
    {
        Arc::new(Noop)
    }
}

#[async_trait]
impl<M, R> Subscriber<M, R> for Noop
where
    M: Send + 'static,
    R: Default + Send + 'static,
{
    async fn deliver(&self, _data: M, _topic: Topic) -> Result<R, R> {
        Ok(R::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sync_fn_outcome_is_the_return_value() {
        let sub = SubscriberFn::arc(|n: u32, _t: &Topic| if n > 2 { Ok(n) } else { Err(n) });
        assert_eq!(sub.deliver(3, Topic::root()).await, Ok(3));
        assert_eq!(sub.deliver(1, Topic::root()).await, Err(1));
    }

    #[tokio::test]
    async fn future_fn_awaits_the_returned_future() {
        let sub = FutureFn::arc(|n: u32, _t: Topic| async move {
            tokio::task::yield_now().await;
            Ok::<_, u32>(n + 1)
        });
        assert_eq!(sub.deliver(1, Topic::from("x")).await, Ok(2));
    }

    #[tokio::test]
    async fn done_fn_settles_through_the_handle() {
        let sub = DoneFn::arc(|n: u32, _t: Topic, done: Done<u32>| {
            if n == 0 {
                done.reject(n);
            } else {
                done.fulfill(n);
            }
        });
        assert_eq!(sub.deliver(7, Topic::root()).await, Ok(7));
        assert_eq!(sub.deliver(0, Topic::root()).await, Err(0));
    }

    #[tokio::test]
    async fn noop_fulfills_with_default() {
        let sub = Noop::arc::<&str, u32>();
        assert_eq!(sub.deliver("ignored", Topic::root()).await, Ok(0));
    }
}
