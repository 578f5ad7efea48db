//! Retained messages and late subscribers.
//!
//! What it shows:
//! - Persisting publishes for subscribers that arrive later
//! - Replay in original publication order across a subtree
//! - Removing retained messages by token and by topic
//!
//! Run with:
//! `cargo run --example persisted`

use std::time::Duration;

use arbor::{Broker, Config, PublishOptions, SubscriberFn, Topic};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut cfg = Config::default();
    cfg.sync = true;
    let bus: Broker<&'static str, ()> = Broker::with_config(cfg);

    // Publish state before anyone is listening.
    bus.publish_with("config.db", "pool=8", PublishOptions::new().persist(true));
    let keyed = bus.publish_with(
        "config.cache.ttl",
        "300s",
        PublishOptions::new().persist(true),
    );

    // The late subscriber catches up on the whole subtree, oldest first.
    bus.subscribe(
        "config",
        SubscriberFn::arc(|value: &'static str, topic: &Topic| {
            println!("replayed {topic} = {value}");
            Ok::<_, ()>(())
        }),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Retained messages can be dropped individually...
    let token = keyed.token().expect("persisting publish carries a token");
    println!("removed ttl entry: {}", bus.remove_persisted(&token));

    // ...or per subtree. Only "config.db" is left by now.
    println!("cleared subtree: {:?}", bus.remove_persisted_topics("config.cache"));
    bus.subscribe(
        "config",
        SubscriberFn::arc(|value: &'static str, topic: &Topic| {
            println!("second subscriber sees {topic} = {value}");
            Ok::<_, ()>(())
        }),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;

    Ok(())
}
