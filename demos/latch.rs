//! Latch policies on publication outcomes.
//!
//! What it shows:
//! - A count latch settling before every subscriber has finished
//! - A settlement latch accepting rejections as progress
//! - Rejection when a latch is unsatisfiable
//!
//! Run with:
//! `cargo run --example latch`

use std::time::Duration;

use arbor::{Broker, FutureFn, Latch, PublishOptions, SubscriberFn, Topic};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bus: Broker<u32, u32> = Broker::new();

    // Three replicas answer at different speeds; one always fails.
    for (name, delay_ms) in [("alpha", 10u64), ("bravo", 40), ("charlie", 80)] {
        bus.subscribe(
            "replica.write",
            FutureFn::arc(move |n: u32, _t: Topic| async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                println!("{name} acknowledged {n}");
                Ok::<_, u32>(n)
            }),
        );
    }
    bus.subscribe(
        "replica.write",
        SubscriberFn::arc(|n: u32, _t: &Topic| Err::<u32, _>(n)),
    );

    // Quorum write: two acknowledgements settle the publication while the
    // slowest replica is still working.
    let publication =
        bus.publish_with("replica.write", 7, PublishOptions::new().latch(Latch::Count(2)));
    println!("quorum result: {:?}", publication.outcome().await);

    // A settlement latch counts the failure too and hands back every
    // outcome, fulfilled first.
    let publication = bus.publish_with(
        "replica.write",
        8,
        PublishOptions::new().settlement_latch(true),
    );
    println!("settlement result: {:?}", publication.outcome().await);

    // Nobody listens on this topic: the default all-must-fulfill latch is
    // unsatisfiable and rejects immediately.
    let publication = bus.publish("replica.archive", 9);
    println!("no subscribers: {:?}", publication.outcome().await);

    Ok(())
}
