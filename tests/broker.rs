//! End-to-end broker behavior: hierarchical delivery, priorities, latch
//! policies, the in-flight semaphore, retained-message replay, and
//! suspension. All tests run on a paused current-thread runtime; a short
//! paused-time sleep drains every ready task deterministically.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use arbor::{
    Broker, Config, Done, DoneFn, FutureFn, Latch, Noop, PublishOptions, Rejected, SubscribeOptions,
    SubscriberFn, SubscriberRef, Topic,
};

type Log = Arc<Mutex<Vec<(&'static str, String, i32)>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<(&'static str, String, i32)> {
    log.lock().unwrap().clone()
}

/// Subscriber that records `(name, published topic, data)` and fulfills
/// with the data.
fn spy(log: &Log, name: &'static str) -> SubscriberRef<i32, i32> {
    let log = Arc::clone(log);
    SubscriberFn::arc(move |n: i32, topic: &Topic| {
        log.lock().unwrap().push((name, topic.to_string(), n));
        Ok(n)
    })
}

/// Subscriber that records its invocation, then waits on a gate before
/// fulfilling with `value`.
fn gated(log: &Log, name: &'static str, value: i32) -> (SubscriberRef<i32, i32>, oneshot::Sender<()>) {
    let (tx, rx) = oneshot::channel::<()>();
    let gate = Mutex::new(Some(rx));
    let log = Arc::clone(log);
    let sub = FutureFn::arc(move |n: i32, topic: Topic| {
        log.lock().unwrap().push((name, topic.to_string(), n));
        let gate = gate.lock().unwrap().take();
        async move {
            match gate {
                Some(gate) => {
                    let _ = gate.await;
                    Ok(value)
                }
                None => std::future::pending().await,
            }
        }
    });
    (sub, tx)
}

/// Runs every ready task (paused time advances only when the runtime is
/// idle).
async fn drain() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn publish_bubbles_to_every_ancestor() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    bus.subscribe("a", spy(&log, "f"));
    bus.subscribe("a.b", spy(&log, "g"));
    bus.subscribe("", spy(&log, "h"));

    let publication = bus.publish("a.b", 1);
    assert_eq!(publication.outcome().await, Ok(vec![1, 1, 1]));

    let mut seen = entries(&log);
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("f", "a.b".to_owned(), 1),
            ("g", "a.b".to_owned(), 1),
            ("h", "a.b".to_owned(), 1),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn siblings_and_descendants_are_not_notified() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    bus.subscribe("a.x", spy(&log, "sibling"));
    bus.subscribe("a.b.c", spy(&log, "descendant"));
    bus.subscribe("a", spy(&log, "ancestor"));

    bus.publish("a.b", 2);
    drain().await;

    assert_eq!(entries(&log), vec![("ancestor", "a.b".to_owned(), 2)]);
}

#[tokio::test(start_paused = true)]
async fn priority_orders_launches_across_the_lineage() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    bus.subscribe_with("a", spy(&log, "low"), SubscribeOptions::new().priority(1.0));
    bus.subscribe_with("a.b", spy(&log, "high"), SubscribeOptions::new().priority(10.0));
    // Equal priority resolves shallowest topic first, regardless of
    // registration order.
    bus.subscribe_with("a.b", spy(&log, "deep"), SubscribeOptions::new().priority(5.0));
    bus.subscribe_with("", spy(&log, "root"), SubscribeOptions::new().priority(5.0));

    bus.publish("a.b", 3);
    drain().await;

    let names: Vec<&str> = entries(&log).iter().map(|(n, _, _)| *n).collect();
    assert_eq!(names, vec!["high", "root", "deep", "low"]);
}

#[tokio::test(start_paused = true)]
async fn count_latch_fulfills_with_values_in_completion_order() {
    let bus: Broker<i32, i32> = Broker::new();
    let dones: Arc<Mutex<Vec<Done<i32>>>> = Arc::new(Mutex::new(Vec::new()));

    for _ in 0..3 {
        let dones = Arc::clone(&dones);
        bus.subscribe(
            "jobs",
            DoneFn::arc(move |_n: i32, _t: Topic, done: Done<i32>| {
                dones.lock().unwrap().push(done);
            }),
        );
    }

    let publication = bus.publish_with("jobs", 0, PublishOptions::new().latch(Latch::Count(2)));
    drain().await;
    assert_eq!(publication.pending(), 3);
    assert!(!publication.is_settled());

    // Fulfill the last-launched subscriber first: results come back in
    // completion order, not dispatch order. The middle subscriber never
    // settles at all.
    let (third, first) = {
        let mut dones = dones.lock().unwrap();
        let third = dones.pop().unwrap();
        let first = dones.remove(0);
        (third, first)
    };
    third.fulfill(30);
    drain().await;
    assert!(!publication.is_settled());

    first.fulfill(10);
    drain().await;

    assert_eq!(publication.outcome().await, Ok(vec![30, 10]));
    assert_eq!(publication.fulfilled(), 2);
    assert_eq!(publication.pending(), 1);
}

#[tokio::test(start_paused = true)]
async fn unsatisfiable_latch_rejects_with_an_empty_list() {
    let bus: Broker<i32, i32> = Broker::new();

    // No subscribers at all: the default all-must-fulfill latch cannot be
    // met.
    let publication = bus.publish("ghost.topic", 4);
    assert_eq!(publication.outcome().await, Err(Rejected { values: vec![] }));

    // A count latch larger than the subscriber pool rejects on the first
    // evaluation.
    bus.subscribe("ghost.topic", Noop::arc());
    let publication =
        bus.publish_with("ghost.topic", 4, PublishOptions::new().latch(Latch::Count(5)));
    assert_eq!(publication.outcome().await, Err(Rejected { values: vec![] }));
}

#[tokio::test(start_paused = true)]
async fn rejections_make_the_default_latch_unsatisfiable() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    bus.subscribe("ops", spy(&log, "ok"));
    bus.subscribe(
        "ops",
        SubscriberFn::arc(|n: i32, _t: &Topic| Err::<i32, _>(n * 100)),
    );

    let publication = bus.publish("ops", 5);
    assert_eq!(
        publication.outcome().await,
        Err(Rejected { values: vec![500] })
    );
    assert_eq!(publication.fulfilled(), 1);
    assert_eq!(publication.rejected(), 1);
}

#[tokio::test(start_paused = true)]
async fn semaphore_of_one_launches_in_priority_order_one_at_a_time() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    let (first, release_first) = gated(&log, "p3", 31);
    let (second, release_second) = gated(&log, "p2", 22);
    let (third, release_third) = gated(&log, "p1", 13);
    bus.subscribe_with("q", third, SubscribeOptions::new().priority(1.0));
    bus.subscribe_with("q", first, SubscribeOptions::new().priority(3.0));
    bus.subscribe_with("q", second, SubscribeOptions::new().priority(2.0));

    let publication = bus.publish_with("q", 0, PublishOptions::new().semaphore(1));
    drain().await;

    let names = |log: &Log| -> Vec<&'static str> {
        entries(log).iter().map(|(n, _, _)| *n).collect()
    };
    assert_eq!(names(&log), vec!["p3"]);

    release_first.send(()).unwrap();
    drain().await;
    assert_eq!(names(&log), vec!["p3", "p2"]);

    release_second.send(()).unwrap();
    drain().await;
    assert_eq!(names(&log), vec!["p3", "p2", "p1"]);

    release_third.send(()).unwrap();
    drain().await;
    assert_eq!(publication.outcome().await, Ok(vec![31, 22, 13]));
}

#[tokio::test(start_paused = true)]
async fn prevent_bubble_notifies_exact_topic_subscribers_only() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    bus.subscribe("a", spy(&log, "ancestor"));
    bus.subscribe("a.b", spy(&log, "exact"));

    let publication = bus.publish_with("a.b", 6, PublishOptions::new().prevent_bubble(true));
    assert_eq!(publication.outcome().await, Ok(vec![6]));
    assert_eq!(entries(&log), vec![("exact", "a.b".to_owned(), 6)]);

    // Ancestors alone do not count: the exact topic has no node, so
    // nobody is notified and the default latch rejects.
    let publication = bus.publish_with("a.zzz", 6, PublishOptions::new().prevent_bubble(true));
    assert_eq!(publication.outcome().await, Err(Rejected { values: vec![] }));
}

#[tokio::test(start_paused = true)]
async fn persisted_messages_replay_in_publication_order() {
    let mut cfg = Config::default();
    cfg.sync = true;
    cfg.persist = true;
    let bus: Broker<i32, i32> = Broker::with_config(cfg);
    let log = log();

    bus.publish("x.y.z", 1);
    bus.publish("x", 2);
    drain().await;

    // A late subscriber on an ancestor sees the whole subtree's history,
    // ordered by original publication.
    bus.subscribe("x", spy(&log, "late"));
    drain().await;
    assert_eq!(
        entries(&log),
        vec![("late", "x.y.z".to_owned(), 1), ("late", "x".to_owned(), 2)]
    );

    // Clearing the subtree stops any further replay.
    assert_eq!(bus.remove_persisted_topics("x"), vec![true]);
    bus.subscribe("x", spy(&log, "after-clear"));
    drain().await;
    assert_eq!(entries(&log).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn replay_can_be_skipped_per_subscription() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    bus.publish_with("x", 1, PublishOptions::new().persist(true).sync(true));
    drain().await;

    bus.subscribe_with(
        "x",
        spy(&log, "deaf"),
        SubscribeOptions::new().ignore_persisted(true),
    );
    drain().await;
    assert!(entries(&log).is_empty());
}

#[tokio::test(start_paused = true)]
async fn remove_persisted_by_token_leaves_the_rest() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    let p1 = bus.publish_with("a", 1, PublishOptions::new().persist(true).sync(true));
    let p2 = bus.publish_with("a.b", 2, PublishOptions::new().persist(true).sync(true));
    drain().await;

    let token = p1.token().unwrap();
    assert!(bus.remove_persisted(&token));
    assert!(!bus.remove_persisted(&token));
    assert!(p2.token().is_some());

    bus.subscribe("a", spy(&log, "late"));
    drain().await;
    assert_eq!(entries(&log), vec![("late", "a.b".to_owned(), 2)]);
}

#[tokio::test(start_paused = true)]
async fn scoped_clear_spares_ancestors_and_siblings() {
    let mut cfg = Config::default();
    cfg.sync = true;
    cfg.persist = true;
    let bus: Broker<i32, i32> = Broker::with_config(cfg);
    let log = log();

    bus.publish("top", 1);
    bus.publish("top.left", 2);
    bus.publish("top.left.deep", 3);
    bus.publish("top.right", 4);
    drain().await;

    assert_eq!(bus.remove_persisted_topics("top.left"), vec![true]);
    assert_eq!(bus.remove_persisted_topics("top.left"), vec![false]);
    assert_eq!(bus.remove_persisted_topics("no.such"), vec![false]);

    bus.subscribe("top", spy(&log, "late"));
    drain().await;
    let mut seen: Vec<i32> = entries(&log).iter().map(|(_, _, n)| *n).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 4]);

    assert_eq!(bus.clear_persisted(), 2);
    bus.subscribe("", spy(&log, "after-wipe"));
    drain().await;
    assert_eq!(entries(&log).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn suspension_skips_delivery_until_resubscribed() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    let token = bus.subscribe("news", spy(&log, "reader")).remove(0);

    assert!(bus.suspend(&token));
    // The suspended subscriber is invisible to dispatch; with nobody else
    // on the lineage the default latch rejects.
    let publication = bus.publish("news", 1);
    assert_eq!(publication.outcome().await, Err(Rejected { values: vec![] }));
    assert!(entries(&log).is_empty());

    assert!(bus.resubscribe(&token));
    let publication = bus.publish("news", 2);
    assert_eq!(publication.outcome().await, Ok(vec![2]));
    assert_eq!(entries(&log), vec![("reader", "news".to_owned(), 2)]);
}

#[tokio::test(start_paused = true)]
async fn topic_sweeps_cover_descendants() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    bus.subscribe("a", spy(&log, "top"));
    bus.subscribe("a.b", spy(&log, "mid"));
    bus.subscribe("a.b.c", spy(&log, "leaf"));

    assert_eq!(bus.suspend_topics("a.b"), vec![true]);
    bus.publish("a.b.c", 1);
    drain().await;
    let names: Vec<&str> = entries(&log).iter().map(|(n, _, _)| *n).collect();
    assert_eq!(names, vec!["top"]);

    assert_eq!(bus.resubscribe_topics("a.b"), vec![true]);
    bus.publish("a.b.c", 2);
    drain().await;
    assert_eq!(entries(&log).len(), 4);

    assert_eq!(bus.unsubscribe_topics("a"), vec![true]);
    assert_eq!(bus.unsubscribe_topics("a"), vec![false]);
    let publication = bus.publish("a.b.c", 3);
    assert_eq!(publication.outcome().await, Err(Rejected { values: vec![] }));
}

#[tokio::test(start_paused = true)]
async fn settlement_latch_counts_rejections_and_concatenates_values() {
    let bus: Broker<i32, i32> = Broker::new();

    bus.subscribe("mixed", SubscriberFn::arc(|n: i32, _t: &Topic| Ok::<_, i32>(n)));
    bus.subscribe(
        "mixed",
        SubscriberFn::arc(|n: i32, _t: &Topic| Err::<i32, _>(-n)),
    );

    // Under a settlement latch both outcomes count; the fulfillment value
    // is fulfillments then rejections.
    let publication =
        bus.publish_with("mixed", 7, PublishOptions::new().settlement_latch(true));
    assert_eq!(publication.outcome().await, Ok(vec![7, -7]));

    // The same topology under the default fulfillment latch rejects.
    let publication = bus.publish("mixed", 7);
    assert_eq!(publication.outcome().await, Err(Rejected { values: vec![-7] }));
}

#[tokio::test(start_paused = true)]
async fn update_after_settlement_keeps_counting() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    bus.subscribe("feed", spy(&log, "fast"));
    let (slow, release) = gated(&log, "slow", 99);
    bus.subscribe("feed", slow);

    let publication = bus.publish_with(
        "feed",
        1,
        PublishOptions::new()
            .latch(Latch::Count(1))
            .update_after_settlement(true),
    );
    drain().await;
    assert_eq!(publication.try_outcome(), Some(Ok(vec![1])));
    assert_eq!(publication.pending(), 1);

    release.send(()).unwrap();
    drain().await;
    assert_eq!(publication.fulfilled(), 2);
    assert_eq!(publication.pending(), 0);
    assert_eq!(publication.try_outcome(), Some(Ok(vec![1, 99])));
}

#[tokio::test(start_paused = true)]
async fn late_outcomes_are_dropped_without_the_flag() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    bus.subscribe("feed", spy(&log, "fast"));
    let (slow, release) = gated(&log, "slow", 99);
    bus.subscribe("feed", slow);

    let publication =
        bus.publish_with("feed", 1, PublishOptions::new().latch(Latch::Count(1)));
    drain().await;
    assert_eq!(publication.try_outcome(), Some(Ok(vec![1])));

    release.send(()).unwrap();
    drain().await;
    assert_eq!(publication.fulfilled(), 1);
    assert_eq!(publication.try_outcome(), Some(Ok(vec![1])));
}

#[tokio::test(start_paused = true)]
async fn deferred_publish_does_nothing_until_the_next_turn() {
    let bus: Broker<i32, i32> = Broker::new();
    bus.subscribe("lazy", Noop::arc());

    let publication = bus.publish_with("lazy", 1, PublishOptions::new().persist(true));
    // The handle exists, but dispatch (and the persistence write) has not
    // run yet.
    assert_eq!(publication.pending(), 0);
    assert!(!publication.is_settled());
    assert!(publication.token().is_none());

    drain().await;
    assert!(publication.is_settled());
    assert!(publication.token().is_some());
}

#[tokio::test(start_paused = true)]
async fn sync_publish_dispatches_inline() {
    let bus: Broker<i32, i32> = Broker::new();
    bus.subscribe("eager", Noop::arc());

    let publication = bus.publish_with("eager", 1, PublishOptions::new().sync(true).persist(true));
    // Dispatch ran inline: the invocation is launched (still pending) and
    // the retained-message token is already attached.
    assert_eq!(publication.pending(), 1);
    assert!(publication.token().is_some());

    assert_eq!(publication.outcome().await, Ok(vec![0]));
}

#[tokio::test(start_paused = true)]
async fn same_turn_publishes_dispatch_in_order() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();
    bus.subscribe("seq", spy(&log, "s"));

    bus.publish("seq", 1);
    bus.publish("seq", 2);
    bus.publish("seq", 3);
    drain().await;

    let data: Vec<i32> = entries(&log).iter().map(|(_, _, n)| *n).collect();
    assert_eq!(data, vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn duplicate_registration_fires_once_per_ancestor() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    let sub = spy(&log, "both");
    bus.subscribe("a", Arc::clone(&sub));
    bus.subscribe("a.b", sub);

    let publication = bus.publish("a.b", 1);
    assert_eq!(publication.outcome().await, Ok(vec![1, 1]));
    assert_eq!(entries(&log).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn expression_subscribe_covers_every_topic() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    let tokens = bus.subscribe("alerts, metrics.cpu", spy(&log, "w"));
    assert_eq!(tokens.len(), 2);

    bus.publish("alerts.disk", 1);
    bus.publish("metrics.cpu", 2);
    drain().await;
    assert_eq!(
        entries(&log),
        vec![
            ("w", "alerts.disk".to_owned(), 1),
            ("w", "metrics.cpu".to_owned(), 2),
        ]
    );

    // Unsubscribing one leg leaves the other active.
    assert!(bus.unsubscribe(&tokens[0]));
    bus.publish("alerts.disk", 3);
    bus.publish("metrics.cpu", 4);
    drain().await;
    assert_eq!(entries(&log).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn brokers_are_fully_independent() {
    let one: Broker<i32, i32> = Broker::new();
    let two: Broker<i32, i32> = Broker::new();
    let log = log();

    one.subscribe("shared.topic", spy(&log, "one"));
    one.publish_with("shared.topic", 1, PublishOptions::new().persist(true).sync(true));
    drain().await;

    // Nothing crosses: no subscribers, no retained messages.
    let publication = two.publish("shared.topic", 2);
    assert_eq!(publication.outcome().await, Err(Rejected { values: vec![] }));
    two.subscribe("shared.topic", spy(&log, "two"));
    drain().await;

    let names: Vec<&str> = entries(&log).iter().map(|(n, _, _)| *n).collect();
    assert_eq!(names, vec!["one"]);
}

#[tokio::test(start_paused = true)]
async fn panicking_subscriber_counts_as_a_rejection() {
    let bus: Broker<i32, i32> = Broker::new();
    let log = log();

    bus.subscribe("risky", spy(&log, "ok"));
    bus.subscribe(
        "risky",
        SubscriberFn::arc(|_n: i32, _t: &Topic| -> Result<i32, i32> {
            panic!("subscriber exploded")
        }),
    );

    let publication = bus.publish("risky", 1);
    assert_eq!(publication.outcome().await, Err(Rejected { values: vec![] }));
    assert_eq!(publication.fulfilled(), 1);
    assert_eq!(publication.rejected(), 1);
    // The healthy subscriber still ran.
    assert_eq!(entries(&log), vec![("ok", "risky".to_owned(), 1)]);
}

#[tokio::test(start_paused = true)]
async fn done_subscribers_can_reject() {
    let bus: Broker<i32, i32> = Broker::new();

    bus.subscribe(
        "gate",
        DoneFn::arc(|n: i32, _t: Topic, done: Done<i32>| done.reject(n + 1)),
    );

    let publication = bus.publish("gate", 40);
    assert_eq!(
        publication.outcome().await,
        Err(Rejected { values: vec![41] })
    );
}

#[tokio::test(start_paused = true)]
async fn cloned_handles_and_publications_share_state() {
    let bus: Broker<i32, i32> = Broker::new();
    let other = bus.clone();
    let log = log();

    other.subscribe("shared", spy(&log, "s"));
    let publication = bus.publish("shared", 5);
    let view = publication.clone();

    assert_eq!(publication.outcome().await, Ok(vec![5]));
    assert_eq!(view.try_outcome(), Some(Ok(vec![5])));
    assert_eq!(view.topic(), &Topic::from("shared"));
}
