//! End-to-end relay cycles against in-memory source and sink.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use tweet_relay::metrics::RelayHealth;
use tweet_relay::monitor::{CycleOutcome, RelayService};
use tweet_relay::notification::{
    Deliverer, DiscordWebhook, DiscordWebhookConfig, MentionResolver, MentionTarget,
    NotificationPayload, RoleDirectory,
};
use tweet_relay::scheduler::{CycleRunner, Scheduler, Ticker};
use tweet_relay::source::{
    Author, FeedSource, Item, ItemDetail, ItemId, MediaKind, MediaRef, Metrics,
};
use tweet_relay::{Error, Result};

/// Feed whose newest item is set by the test between cycles.
#[derive(Default)]
struct FakeFeed {
    newest: Mutex<Option<String>>,
    scans: Mutex<usize>,
    detail_calls: Mutex<Vec<String>>,
}

impl FakeFeed {
    fn publish(&self, id: &str) {
        *self.newest.lock() = Some(id.to_string());
    }
}

fn item(id: &str, text: &str) -> Item {
    Item {
        id: ItemId::from(id),
        text: text.to_string(),
        created_at: None,
        author_id: Some("42".to_string()),
        metrics: None,
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    fn name(&self) -> &str {
        "@example"
    }

    async fn scan_latest(&self) -> Result<Option<Item>> {
        *self.scans.lock() += 1;
        Ok(self
            .newest
            .lock()
            .as_deref()
            .map(|id| item(id, "summary only")))
    }

    async fn fetch_detail(&self, id: &ItemId) -> Result<ItemDetail> {
        self.detail_calls.lock().push(id.to_string());
        let mut detail = item(id.as_str(), &format!("post {id} https://t.co/Ab12"));
        detail.metrics = Some(Metrics {
            likes: 5,
            reposts: 2,
            replies: 1,
        });
        Ok(ItemDetail {
            item: detail,
            author: Author {
                id: "42".to_string(),
                display_name: "Example".to_string(),
                handle: "example".to_string(),
                avatar_url: Some("https://pbs.twimg.com/profile.jpg".to_string()),
            },
            media: vec![MediaRef {
                kind: MediaKind::Photo,
                url: Some(format!("https://pbs.twimg.com/media/{id}.jpg")),
                preview_url: None,
            }],
        })
    }
}

/// Sink that renders the wire message the way the webhook channel does.
struct FakeSink {
    webhook: DiscordWebhook,
    posted: Mutex<Vec<serde_json::Value>>,
    fail_next: Mutex<bool>,
}

impl FakeSink {
    fn new() -> Self {
        let http = tweet_relay::utils::http_client::build_http_client(Duration::from_secs(5))
            .expect("http client");
        Self {
            webhook: DiscordWebhook::new(
                http,
                DiscordWebhookConfig {
                    webhook_url: "https://discord.com/api/webhooks/1/token".to_string(),
                    ..Default::default()
                },
            ),
            posted: Mutex::new(Vec::new()),
            fail_next: Mutex::new(false),
        }
    }
}

#[async_trait]
impl Deliverer for FakeSink {
    fn channel_type(&self) -> &'static str {
        "fake"
    }

    async fn send(&self, payload: &NotificationPayload, mention: &MentionTarget) -> Result<()> {
        if std::mem::take(&mut *self.fail_next.lock()) {
            return Err(Error::delivery("503 Service Unavailable"));
        }
        let message = self.webhook.build_message(payload, mention);
        self.posted
            .lock()
            .push(serde_json::to_value(&message).expect("serializable"));
        Ok(())
    }
}

/// Directory that always fails, forcing the broadcast fallback.
struct UnreachableDirectory;

#[async_trait]
impl RoleDirectory for UnreachableDirectory {
    async fn find_role(&self, _name: &str) -> Result<Option<String>> {
        Err(Error::MentionResolution("gateway unavailable".to_string()))
    }
}

struct RoleMap(HashMap<&'static str, &'static str>);

#[async_trait]
impl RoleDirectory for RoleMap {
    async fn find_role(&self, name: &str) -> Result<Option<String>> {
        Ok(self.0.get(name).map(|id| id.to_string()))
    }
}

fn relay(mention: MentionTarget) -> RelayService<FakeFeed, FakeSink> {
    RelayService::new(
        FakeFeed::default(),
        FakeSink::new(),
        mention,
        Arc::new(RelayHealth::new("@example", Duration::from_secs(1800))),
    )
}

#[tokio::test]
async fn seed_then_deliver_only_new_items() {
    let relay = relay(MentionTarget::Broadcast);
    relay_feed(&relay).publish("A");
    assert_eq!(
        relay.run_cycle().await.unwrap(),
        CycleOutcome::Seeded(ItemId::from("A"))
    );
    let state = relay.detection_state().await;
    assert!(state.initialized);
    assert_eq!(state.last_delivered_id, Some(ItemId::from("A")));

    assert_eq!(
        relay.run_cycle().await.unwrap(),
        CycleOutcome::Unchanged(ItemId::from("A"))
    );

    relay_feed(&relay).publish("B");
    assert_eq!(
        relay.run_cycle().await.unwrap(),
        CycleOutcome::Delivered(ItemId::from("B"))
    );
    assert_eq!(
        relay.detection_state().await.last_delivered_id,
        Some(ItemId::from("B"))
    );

    assert_eq!(*relay_feed(&relay).detail_calls.lock(), vec!["B".to_string()]);
    let posted = relay_sink(&relay).posted.lock();
    assert_eq!(posted.len(), 1);

    let embed = &posted[0]["embeds"][0];
    assert_eq!(embed["url"], "https://twitter.com/example/status/B");
    assert_eq!(embed["description"], "post B");
    assert_eq!(embed["image"]["url"], "https://pbs.twimg.com/media/B.jpg");
    let values: Vec<&str> = embed["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["value"].as_str().unwrap())
        .collect();
    assert_eq!(values, ["5", "2", "1"]);
}

#[tokio::test]
async fn failed_delivery_is_retried_next_cycle() {
    let relay = relay(MentionTarget::Broadcast);
    relay_feed(&relay).publish("A");
    relay.run_cycle().await.unwrap();

    relay_feed(&relay).publish("B");
    *relay_sink(&relay).fail_next.lock() = true;
    assert!(matches!(
        relay.run_cycle().await,
        Err(Error::Delivery(_))
    ));
    assert_eq!(
        relay.detection_state().await.last_delivered_id,
        Some(ItemId::from("A"))
    );

    assert_eq!(
        relay.run_cycle().await.unwrap(),
        CycleOutcome::Delivered(ItemId::from("B"))
    );
    assert_eq!(relay_sink(&relay).posted.lock().len(), 1);
    assert_eq!(
        *relay_feed(&relay).detail_calls.lock(),
        vec!["B".to_string(), "B".to_string()]
    );
}

#[tokio::test]
async fn role_lookup_failure_falls_back_to_broadcast() {
    let directory = UnreachableDirectory;
    let mention = MentionResolver::new(Some(&directory))
        .resolve(Some("Socials"), true)
        .await;

    let relay = relay(mention);
    relay_feed(&relay).publish("A");
    relay.run_cycle().await.unwrap();
    relay_feed(&relay).publish("B");
    relay.run_cycle().await.unwrap();

    let posted = relay_sink(&relay).posted.lock();
    let content = posted[0]["content"].as_str().unwrap();
    assert!(content.starts_with("@everyone"));
    assert!(!content.contains("<@&"));
}

#[tokio::test]
async fn resolved_role_is_mentioned() {
    let directory = RoleMap(HashMap::from([("Socials", "777")]));
    let mention = MentionResolver::new(Some(&directory))
        .resolve(Some("Socials"), true)
        .await;

    let relay = relay(mention);
    relay_feed(&relay).publish("A");
    relay.run_cycle().await.unwrap();
    relay_feed(&relay).publish("B");
    relay.run_cycle().await.unwrap();

    let posted = relay_sink(&relay).posted.lock();
    assert!(posted[0]["content"]
        .as_str()
        .unwrap()
        .starts_with("<@&777> "));
}

/// Ticks a fixed number of times, publishing a scripted item before each.
struct ScriptedTicker {
    relay: Arc<RelayService<FakeFeed, FakeSink>>,
    script: VecDeque<&'static str>,
    token: CancellationToken,
}

#[async_trait]
impl Ticker for ScriptedTicker {
    async fn tick(&mut self) {
        match self.script.pop_front() {
            Some(id) => relay_feed(&self.relay).publish(id),
            None => {
                self.token.cancel();
                std::future::pending::<()>().await;
            }
        }
    }
}

#[tokio::test]
async fn scheduler_drives_the_relay() {
    let relay = Arc::new(relay(MentionTarget::None));
    let token = CancellationToken::new();
    let ticker = ScriptedTicker {
        relay: relay.clone(),
        script: VecDeque::from(["A", "A", "B", "B", "C"]),
        token: token.clone(),
    };

    let cycles = Scheduler::new(relay.clone(), ticker, token).run().await;
    assert_eq!(cycles, 5);

    let posted = relay_sink(&relay).posted.lock();
    let urls: Vec<&str> = posted
        .iter()
        .map(|m| m["embeds"][0]["url"].as_str().unwrap())
        .collect();
    assert_eq!(
        urls,
        [
            "https://twitter.com/example/status/B",
            "https://twitter.com/example/status/C"
        ]
    );
    assert_eq!(posted[0]["content"], "🐦 **New tweet!**");

    let health = relay.health().snapshot();
    assert_eq!(health.cycles, 5);
    assert_eq!(health.deliveries, 2);
    assert_eq!(health.last_delivered_id.as_deref(), Some("C"));
}

fn relay_feed(relay: &RelayService<FakeFeed, FakeSink>) -> &FakeFeed {
    relay.source()
}

fn relay_sink(relay: &RelayService<FakeFeed, FakeSink>) -> &FakeSink {
    relay.deliverer()
}
