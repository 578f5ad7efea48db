//! # Subscribers: the delivery extension point.
//!
//! This module provides the [`Subscriber`] trait plus adapters that turn
//! ordinary closures into subscribers. Every shape collapses into the same
//! uniform invocation future inside the dispatcher.
//!
//! ## Delivery flow
//! ```text
//!   publish(topic, data)
//!        │  lineage lookup + priority merge
//!        ▼
//!   Subscriber::deliver(data, topic) ──► Result<R, R>
//!        │                                   │
//!   ┌────┴─────────┬──────────────┬──────┐   ▼
//!   ▼              ▼              ▼      ▼  resolver (latch)
//! SubscriberFn   FutureFn      DoneFn  Noop
//! (sync return)  (awaited)     (node-  (always
//!                               style)  fulfills)
//! ```
//!
//! ## Shapes
//! - [`SubscriberFn`] — synchronous closure; the returned `Result` is the
//!   settlement.
//! - [`FutureFn`] — closure returning a future; the future is awaited.
//! - [`DoneFn`] — node-style closure handed a [`Done`] resolver; settle by
//!   calling [`Done::fulfill`] or [`Done::reject`].
//! - [`Noop`] — placeholder that fulfills with `R::default()`.
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use arbor::{Subscriber, Topic};
//! use async_trait::async_trait;
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Subscriber<String, usize> for Audit {
//!     async fn deliver(&self, line: String, topic: Topic) -> Result<usize, usize> {
//!         println!("[{topic}] {line}");
//!         Ok(line.len())
//!     }
//! }
//! ```

mod adapters;
mod subscriber;

pub use adapters::{Done, DoneFn, FutureFn, Noop, SubscriberFn};
pub use subscriber::{Subscriber, SubscriberRef};
