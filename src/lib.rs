//! # arbor
//!
//! **Arbor** is an in-process, hierarchical, topic-based publish/subscribe
//! broker with *promissory* publications: every publish returns a
//! [`Publication`] whose settlement aggregates the notified subscribers'
//! outcomes under a configurable latch policy.
//!
//! It is meant for loosely coupling components inside one process that
//! already talk through callbacks and async tasks.
//!
//! ## Features
//!
//! | Area               | Description                                                        | Key types                                    |
//! |--------------------|--------------------------------------------------------------------|----------------------------------------------|
//! | **Topic tree**     | Dotted topic hierarchy; publishes bubble up the ancestor chain.    | [`Topic`]                                    |
//! | **Subscribers**    | Sync, future-returning, and node-style handlers; priorities.       | [`Subscriber`], [`SubscriberFn`], [`DoneFn`] |
//! | **Publications**   | Promissory results with observable counters and latch policies.    | [`Publication`], [`Latch`], [`Rejected`]     |
//! | **Persistence**    | Retained messages replayed to late subscribers, in original order. | [`Token`]                                    |
//! | **Flow control**   | Per-publish bound on concurrently pending invocations.             | [`Config::semaphore`]                        |
//! | **Configuration**  | Runtime-mutable broker defaults, per-call option patches.          | [`Config`], [`PublishOptions`]               |
//!
//! ## Topics
//!
//! A topic is a dotted path: publishing to `"files.pdf.saved"` notifies
//! subscribers of `"files.pdf.saved"`, `"files.pdf"`, `"files"`, and the
//! root `""` — highest priority first across the whole chain. Brokers are
//! independent: each owns its tree, defaults, and id space.
//!
//! ```no_run
//! use arbor::{Broker, Latch, PublishOptions, SubscriberFn, Topic};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let bus: Broker<String, usize> = Broker::new();
//!
//!     bus.subscribe(
//!         "files",
//!         SubscriberFn::arc(|path: String, topic: &Topic| {
//!             println!("[{topic}] {path}");
//!             Ok::<_, usize>(path.len())
//!         }),
//!     );
//!
//!     // Settle as soon as one subscriber fulfills.
//!     let publication = bus.publish_with(
//!         "files.pdf.saved",
//!         "report.pdf".to_owned(),
//!         PublishOptions::new().latch(Latch::Count(1)),
//!     );
//!
//!     assert_eq!(publication.outcome().await, Ok(vec![10]));
//! }
//! ```
//!
//! A broker must live inside a tokio runtime: dispatch, deferred publishes,
//! and retained-message replay are all scheduled with `tokio::spawn`.
//!
//! ---

mod broker;
mod config;
mod dispatch;
mod error;
mod merge;
mod subscribers;
mod token;
mod topic;
mod tree;

// ---- Public re-exports ----

pub use broker::Broker;
pub use config::{Config, Latch, PublishEffective, PublishOptions, SubscribeEffective, SubscribeOptions};
pub use dispatch::Publication;
pub use error::{Outcome, Rejected};
pub use subscribers::{Done, DoneFn, FutureFn, Noop, Subscriber, SubscriberFn, SubscriberRef};
pub use token::Token;
pub use topic::Topic;
