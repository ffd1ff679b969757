//! End-to-end pipeline tests over the in-memory store and broker, with a
//! real HTTP receiver on a loopback socket.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use driftwatch::{
    Broker, ChangeKind, CollectionState, Config, EventsHandler, HttpDispatcher, ItemRecord,
    MemoryBroker, MemoryStore, Pipeline, SnapshotStore, StaticSource, Subscription,
    SubscriptionStatus, SubscriptionStore, TargetKind, EVENTS_QUEUE,
};

/// Loopback webhook receiver: answers every POST with `status` and
/// collects the JSON bodies it saw.
async fn webhook_receiver(status: u16) -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let bodies: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));

    let seen = Arc::clone(&bodies);
    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                let mut raw = Vec::new();
                let mut buf = [0u8; 4096];
                let body = loop {
                    let Ok(n) = sock.read(&mut buf).await else {
                        return;
                    };
                    if n == 0 {
                        return;
                    }
                    raw.extend_from_slice(&buf[..n]);
                    if let Some(split) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                        let head = String::from_utf8_lossy(&raw[..split]).to_lowercase();
                        let len: usize = head
                            .lines()
                            .find_map(|l| l.strip_prefix("content-length:"))
                            .and_then(|v| v.trim().parse().ok())
                            .unwrap_or(0);
                        while raw.len() < split + 4 + len {
                            let Ok(n) = sock.read(&mut buf).await else {
                                return;
                            };
                            if n == 0 {
                                return;
                            }
                            raw.extend_from_slice(&buf[..n]);
                        }
                        break raw[split + 4..split + 4 + len].to_vec();
                    }
                };

                if let Ok(v) = serde_json::from_slice(&body) {
                    seen.lock().await.push(v);
                }
                let resp =
                    format!("HTTP/1.1 {status} X\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = sock.write_all(resp.as_bytes()).await;
            });
        }
    });

    (format!("http://{addr}/hook"), bodies)
}

fn subscription(id: &str, url: &str, kinds: Vec<ChangeKind>) -> Subscription {
    Subscription {
        id: id.into(),
        user_id: "user-1".into(),
        url: url.into(),
        events: kinds,
        active: true,
        status: SubscriptionStatus::Idle,
        polling_interval_mins: 0,
        last_polled: None,
        object_id: "col-1".into(),
        object_kind: TargetKind::Collection,
    }
}

fn state(items: &[(&str, &str)]) -> CollectionState {
    CollectionState {
        items: items
            .iter()
            .map(|(id, marker)| ItemRecord {
                id: (*id).into(),
                modified_at: (*marker).into(),
                fields: serde_json::Value::Null,
            })
            .collect(),
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    source: Arc<StaticSource>,
    broker: Arc<MemoryBroker>,
    pipeline: Pipeline,
}

fn fixture(poll_period: Duration) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(StaticSource::new());
    let broker = Arc::new(MemoryBroker::new());
    let cfg = Config {
        poll_period,
        grace: Duration::from_secs(2),
        request_timeout: Duration::from_secs(2),
        ..Config::default()
    };
    let pipeline = Pipeline::new(
        cfg.clone(),
        Arc::clone(&store) as Arc<dyn SubscriptionStore>,
        Arc::clone(&store) as Arc<dyn SnapshotStore>,
        Arc::clone(&source) as _,
        Arc::clone(&broker) as _,
        Arc::new(HttpDispatcher::new(cfg.request_timeout)),
    );
    Fixture {
        store,
        source,
        broker,
        pipeline,
    }
}

async fn run_for(pipeline: &Pipeline, period: Duration) {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(period).await;
        cancel.cancel();
    });
    pipeline.run_until_cancelled(token).await.unwrap();
}

#[tokio::test]
async fn detects_membership_changes_end_to_end() {
    let (url, bodies) = webhook_receiver(200).await;
    let f = fixture(Duration::from_millis(50));

    f.store
        .insert(subscription(
            "wh-1",
            &url,
            vec![ChangeKind::Added, ChangeKind::Deleted],
        ))
        .await
        .unwrap();
    f.source.set("col-1", state(&[("a", "m1"), ("b", "m1")])).await;

    // First window seeds the snapshot, second detects the swap.
    run_for(&f.pipeline, Duration::from_millis(120)).await;
    assert!(bodies.lock().await.is_empty());

    f.source.set("col-1", state(&[("b", "m1"), ("c", "m1")])).await;
    run_for(&f.pipeline, Duration::from_millis(120)).await;

    let seen = bodies.lock().await;
    let got: HashSet<(String, String)> = seen
        .iter()
        .map(|v| {
            (
                v["type"].as_str().unwrap().to_string(),
                v["data"]["object_id"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        got,
        HashSet::from([
            ("item.added".to_string(), "c".to_string()),
            ("item.deleted".to_string(), "a".to_string()),
        ])
    );

    // Envelope shape: id, webhook_id, created_at alongside the event.
    let first = &seen[0];
    assert!(first["id"].as_str().is_some());
    assert_eq!(first["webhook_id"], "wh-1");
    assert!(first["created_at"].as_i64().is_some());
}

#[tokio::test]
async fn unsubscribed_kinds_are_filtered_out() {
    let (url, bodies) = webhook_receiver(200).await;
    let f = fixture(Duration::from_millis(50));

    f.store
        .insert(subscription("wh-1", &url, vec![ChangeKind::Deleted]))
        .await
        .unwrap();
    f.source.set("col-1", state(&[("a", "m1")])).await;
    run_for(&f.pipeline, Duration::from_millis(120)).await;

    // "b" appears and "a" changes its marker: neither kind is subscribed.
    f.source.set("col-1", state(&[("a", "m2"), ("b", "m1")])).await;
    run_for(&f.pipeline, Duration::from_millis(120)).await;

    assert!(bodies.lock().await.is_empty());
}

#[tokio::test]
async fn unchanged_collection_emits_nothing_on_later_cycles() {
    let (url, bodies) = webhook_receiver(200).await;
    let f = fixture(Duration::from_millis(40));

    f.store
        .insert(subscription(
            "wh-1",
            &url,
            vec![ChangeKind::Added, ChangeKind::Deleted, ChangeKind::Updated],
        ))
        .await
        .unwrap();
    f.source.set("col-1", state(&[("a", "m1"), ("b", "m1")])).await;

    // Several polling windows over identical remote state.
    run_for(&f.pipeline, Duration::from_millis(300)).await;

    assert!(bodies.lock().await.is_empty());
    assert_eq!(f.broker.depth(EVENTS_QUEUE).await, 0);
}

#[tokio::test]
async fn refusing_receiver_consumes_the_event_without_redelivery() {
    let (url, bodies) = webhook_receiver(500).await;
    let f = fixture(Duration::from_millis(50));

    f.store
        .insert(subscription("wh-1", &url, vec![ChangeKind::Added]))
        .await
        .unwrap();
    f.source.set("col-1", state(&[("a", "m1")])).await;
    run_for(&f.pipeline, Duration::from_millis(120)).await;

    f.source.set("col-1", state(&[("a", "m1"), ("b", "m1")])).await;
    run_for(&f.pipeline, Duration::from_millis(250)).await;

    // Exactly one attempt reached the receiver; nothing left queued.
    assert_eq!(bodies.lock().await.len(), 1);
    assert_eq!(f.broker.depth(EVENTS_QUEUE).await, 0);
}

#[tokio::test]
async fn poison_event_payload_does_not_wedge_the_delivery_worker() {
    let (url, bodies) = webhook_receiver(200).await;

    let store = Arc::new(MemoryStore::new());
    let broker = Arc::new(MemoryBroker::new());
    store
        .insert(subscription("wh-1", &url, vec![ChangeKind::Added]))
        .await
        .unwrap();

    // Garbage first, then a valid event behind it.
    broker
        .publish(EVENTS_QUEUE, b"this is not json".to_vec())
        .await
        .unwrap();
    let good = driftwatch::ChangeEvent::detected(
        ChangeKind::Added,
        "wh-1",
        "user-1",
        "item-1",
        chrono::Utc::now(),
    );
    broker
        .publish(EVENTS_QUEUE, serde_json::to_vec(&good).unwrap())
        .await
        .unwrap();

    let handler: Arc<dyn driftwatch::queue::Handler> = Arc::new(EventsHandler::new(
        Arc::clone(&store) as Arc<dyn SubscriptionStore>,
        Arc::new(HttpDispatcher::new(Duration::from_secs(2))),
        driftwatch::Bus::new(16),
    ));
    let consumer = broker.consumer(EVENTS_QUEUE).await.unwrap();

    let token = CancellationToken::new();
    let worker = tokio::spawn(driftwatch::queue::run_worker(
        consumer,
        handler,
        driftwatch::Bus::new(16),
        token.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(300)).await;
    token.cancel();
    worker.await.unwrap();

    // The poison message was dropped and the one behind it delivered.
    let seen = bodies.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["data"]["object_id"], "item-1");
    assert_eq!(broker.depth(EVENTS_QUEUE).await, 0);
}

#[tokio::test]
async fn failed_fetch_leaves_the_subscription_claimable() {
    let (url, bodies) = webhook_receiver(200).await;
    let f = fixture(Duration::from_millis(40));

    f.store
        .insert(subscription("wh-1", &url, vec![ChangeKind::Added]))
        .await
        .unwrap();
    f.source.set("col-1", state(&[("a", "m1")])).await;
    f.source.set_failing(true).await;

    run_for(&f.pipeline, Duration::from_millis(150)).await;
    // Claim was released without a polled stamp after each failure.
    assert_eq!(
        f.store.status("wh-1").await,
        Some(SubscriptionStatus::Idle)
    );
    assert!(bodies.lock().await.is_empty());

    // Once the source recovers the same subscription seeds normally.
    f.source.set_failing(false).await;
    run_for(&f.pipeline, Duration::from_millis(150)).await;
    assert!(f.store.item_ids("wh-1").await.unwrap().is_some());
}
