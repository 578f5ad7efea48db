//! Basic pub/sub walkthrough.
//!
//! What it shows:
//! - Subscribing on an ancestor topic and receiving descendant publishes
//! - Priorities deciding launch order across the lineage
//! - Awaiting the publication outcome
//!
//! Run with:
//! `cargo run --example basic`

use arbor::{Broker, SubscribeOptions, SubscriberFn, Topic};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bus: Broker<String, usize> = Broker::new();

    // An ancestor subscriber sees everything published below "files".
    bus.subscribe(
        "files",
        SubscriberFn::arc(|path: String, topic: &Topic| {
            println!("[files]      {topic} -> {path}");
            Ok::<_, usize>(path.len())
        }),
    );

    // Higher priority fires first, even though it sits deeper in the tree.
    bus.subscribe_with(
        "files.pdf",
        SubscriberFn::arc(|path: String, topic: &Topic| {
            println!("[files.pdf]  {topic} -> {path}");
            Ok::<_, usize>(path.len())
        }),
        SubscribeOptions::new().priority(10.0),
    );

    let publication = bus.publish("files.pdf.saved", "report.pdf".to_owned());
    let lengths = publication.outcome().await?;
    println!("both subscribers fulfilled: {lengths:?}");

    Ok(())
}
