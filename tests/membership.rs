use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use discovisor::{
    ClusterIdError, ClusterIdSource, Config, Coordinator, Event, Guard, MemoryStore, Node, Notice,
    NoticeKind, RuntimeError, State, StaticClusterId, StoredClusterId, Subscribe, Watch,
};

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Notice>>,
}

impl Recorder {
    fn kinds(&self, kind: NoticeKind) -> Vec<Notice> {
        self.seen
            .lock()
            .iter()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect()
    }

    fn saw_event(&self, event: Event) -> bool {
        self.seen
            .lock()
            .iter()
            .any(|n| n.kind == NoticeKind::Transitioned && n.event == Some(event))
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_notice(&self, n: &Notice) {
        self.seen.lock().push(n.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

fn config(node_id: &str) -> Config {
    let mut cfg = Config::for_node(node_id, format!("{node_id}.local:7000"));
    cfg.prefix = "/t".to_string();
    cfg.announce_ttl = Duration::from_secs(3);
    cfg.refresh_interval = Duration::from_secs(1);
    cfg.retry_min = Duration::from_millis(100);
    cfg.retry_max = Duration::from_secs(1);
    cfg.retry_steps = 4;
    cfg.grace = Duration::from_secs(5);
    cfg
}

fn stored_node(store: &Arc<MemoryStore>, cfg: Config) -> (Node, Arc<Recorder>) {
    let cluster = StoredClusterId::new(
        store.clone(),
        cfg.cluster_id_key(),
        format!("cluster-{}", cfg.node_id),
    );
    node_with(store, cfg, Arc::new(cluster))
}

fn node_with(
    store: &Arc<MemoryStore>,
    cfg: Config,
    cluster: discovisor::ClusterIdRef,
) -> (Node, Arc<Recorder>) {
    let rec = Arc::new(Recorder::default());
    let node = Node::builder(cfg)
        .with_coordinator(store.clone())
        .with_cluster_id(cluster)
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .build()
        .unwrap();
    (node, rec)
}

async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..3000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

async fn announced_value(store: &MemoryStore, key: &str) -> Option<String> {
    store.get(key, Watch::No).await.ok().map(|n| n.value)
}

#[tokio::test(start_paused = true)]
async fn test_first_node_creates_cluster_and_announces() {
    let store = Arc::new(MemoryStore::new());
    let (node, rec) = stored_node(&store, config("n1"));

    node.start();
    eventually("running", || node.state() == State::Running).await;
    eventually("announced notice", || rec.saw_event(Event::Announced)).await;

    assert_eq!(node.cluster_id().as_deref(), Some("cluster-n1"));
    assert_eq!(
        announced_value(&store, "/t/cluster_id").await.as_deref(),
        Some("cluster-n1")
    );
    assert_eq!(
        announced_value(&store, "/t/cluster-n1/nodes/n1").await.as_deref(),
        Some("n1.local:7000")
    );
    assert!(rec.saw_event(Event::ClusterUndefined));
    assert!(rec.saw_event(Event::ClusterCreated));
    assert!(rec.saw_event(Event::ClusterDefined));

    // GetCluster is entered twice: by start() and again after the cluster is created.
    let entered: Vec<_> = rec
        .kinds(NoticeKind::StateEntered)
        .into_iter()
        .filter_map(|n| n.state)
        .collect();
    assert_eq!(entered, vec![State::GetCluster, State::GetCluster]);

    node.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_second_node_joins_existing_cluster() {
    let store = Arc::new(MemoryStore::new());
    let (first, _) = stored_node(&store, config("n1"));
    let (second, rec) = stored_node(&store, config("n2"));

    first.start();
    eventually("first running", || first.state() == State::Running).await;
    second.start();
    eventually("second running", || second.state() == State::Running).await;

    assert_eq!(second.cluster_id().as_deref(), Some("cluster-n1"));
    assert!(!rec.saw_event(Event::ClusterCreated));
    assert_eq!(
        store.keys("/t/cluster-n1/nodes/"),
        vec![
            "/t/cluster-n1/nodes/n1".to_string(),
            "/t/cluster-n1/nodes/n2".to_string()
        ]
    );

    first.shutdown().await.unwrap();
    second.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_lease_survives_many_ttls() {
    let store = Arc::new(MemoryStore::new());
    let (node, rec) = stored_node(&store, config("n1"));

    node.start();
    eventually("running", || node.state() == State::Running).await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(node.state(), State::Running);
    assert!(!rec.saw_event(Event::AnnounceRefreshFailedWithNoKey));
    assert!(announced_value(&store, "/t/cluster-n1/nodes/n1").await.is_some());

    node.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_deleted_announcement_is_restored() {
    let store = Arc::new(MemoryStore::new());
    let (node, rec) = stored_node(&store, config("n1"));
    let key = "/t/cluster-n1/nodes/n1";

    node.start();
    eventually("running", || node.state() == State::Running).await;
    store.delete(key, Guard::None).await.unwrap();

    eventually("lease loss noticed", || {
        rec.saw_event(Event::AnnounceRefreshFailedWithNoKey)
    })
    .await;
    eventually("running again", || node.state() == State::Running).await;
    assert_eq!(
        announced_value(&store, key).await.as_deref(),
        Some("n1.local:7000")
    );

    node.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_outage_expires_lease_then_recovers() {
    let store = Arc::new(MemoryStore::new());
    let (node, rec) = stored_node(&store, config("n1"));
    let key = "/t/cluster-n1/nodes/n1";

    node.start();
    eventually("running", || node.state() == State::Running).await;

    store.set_available(false);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!rec.kinds(NoticeKind::AttemptFailed).is_empty());
    for n in rec.kinds(NoticeKind::BackoffScheduled) {
        assert!(n.delay_ms.unwrap() <= 1000);
    }

    store.set_available(true);
    eventually("re-announced", || {
        rec.saw_event(Event::AnnounceRefreshFailedWithNoKey) && node.state() == State::Running
    })
    .await;
    assert_eq!(
        announced_value(&store, key).await.as_deref(),
        Some("n1.local:7000")
    );

    node.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_overwritten_announcement_waits_for_owner_to_leave() {
    let store = Arc::new(MemoryStore::new());
    let (node, rec) = stored_node(&store, config("n1"));
    let key = "/t/cluster-n1/nodes/n1";

    node.start();
    eventually("running", || node.state() == State::Running).await;

    store
        .put(key, "intruder:1", Guard::None, Some(Duration::from_secs(4)))
        .await
        .unwrap();
    eventually("lost", || node.state() == State::Announce).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(node.state(), State::Announce);
    assert!(!rec.kinds(NoticeKind::AttemptFailed).is_empty());

    // The intruder's lease runs out and the node takes the key back.
    eventually("running again", || node.state() == State::Running).await;
    assert_eq!(
        announced_value(&store, key).await.as_deref(),
        Some("n1.local:7000")
    );

    node.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_withdraws_announcement() {
    let store = Arc::new(MemoryStore::new());
    let (node, rec) = stored_node(&store, config("n1"));

    node.start();
    eventually("running", || node.state() == State::Running).await;
    node.shutdown().await.unwrap();

    assert_eq!(node.state(), State::Stop);
    assert!(store.keys("/t/cluster-n1/nodes/").is_empty());
    assert_eq!(
        announced_value(&store, "/t/cluster_id").await.as_deref(),
        Some("cluster-n1")
    );
    eventually("stopped notice", || {
        !rec.kinds(NoticeKind::AllStoppedWithin).is_empty()
    })
    .await;
    assert!(!rec.kinds(NoticeKind::ShutdownRequested).is_empty());

    // A second shutdown runs the stop phase again and still succeeds.
    node.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_leaves_foreign_announcement_alone() {
    let store = Arc::new(MemoryStore::new());
    let (node, _) = stored_node(&store, config("n1"));
    let key = "/t/cluster-n1/nodes/n1";

    node.start();
    eventually("running", || node.state() == State::Running).await;
    node.context().init(State::Stop);
    eventually("withdrawn", || store.keys("/t/cluster-n1/nodes/").is_empty()).await;
    store.put(key, "other:1", Guard::None, None).await.unwrap();

    node.shutdown().await.unwrap();
    assert_eq!(announced_value(&store, key).await.as_deref(), Some("other:1"));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_grace_exceeded_when_store_down() {
    let store = Arc::new(MemoryStore::new());
    let mut cfg = config("n1");
    cfg.grace = Duration::from_secs(2);
    let (node, rec) = stored_node(&store, cfg);

    node.start();
    eventually("running", || node.state() == State::Running).await;
    store.set_available(false);

    match node.shutdown().await {
        Err(RuntimeError::GraceExceeded { grace, stuck }) => {
            assert_eq!(grace, Duration::from_secs(2));
            assert_eq!(stuck.as_deref(), Some("stop"));
        }
        other => panic!("unexpected: {other:?}"),
    }
    eventually("grace notice", || {
        !rec.kinds(NoticeKind::GraceExceeded).is_empty()
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_before_start_is_quick() {
    let store = Arc::new(MemoryStore::new());
    let (node, _) = stored_node(&store, config("n1"));

    node.shutdown().await.unwrap();
    assert_eq!(node.state(), State::Stop);
    assert!(store.keys("/").is_empty());
}

/// Claims support but can never establish an identifier.
struct Unestablishable;

#[async_trait]
impl ClusterIdSource for Unestablishable {
    fn is_supported(&self) -> bool {
        true
    }

    async fn cluster_id(&self) -> Result<Option<String>, ClusterIdError> {
        Ok(None)
    }

    async fn set_cluster_id(&self) -> Result<String, ClusterIdError> {
        Err(ClusterIdError::Unsupported {
            reason: "read-only".to_string(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_unset_static_cluster_id_uses_stored_default() {
    let store = Arc::new(MemoryStore::new());
    let (node, rec) = node_with(&store, config("n1"), Arc::new(StaticClusterId::unset()));

    node.start();
    eventually("running", || node.state() == State::Running).await;

    assert!(rec.saw_event(Event::ClusterCreated));
    assert!(rec.kinds(NoticeKind::AttemptAbandoned).is_empty());
    let cluster = node.cluster_id().unwrap();
    assert_eq!(
        announced_value(&store, "/t/cluster_id").await.as_deref(),
        Some(cluster.as_str())
    );

    node.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_creation_is_not_retried() {
    let store = Arc::new(MemoryStore::new());
    let (node, rec) = node_with(&store, config("n1"), Arc::new(Unestablishable));

    node.start();
    eventually("abandoned", || {
        !rec.kinds(NoticeKind::AttemptAbandoned).is_empty()
    })
    .await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(node.state(), State::CreateCluster);
    let abandoned = rec.kinds(NoticeKind::AttemptAbandoned);
    assert_eq!(abandoned.len(), 1);
    assert_eq!(abandoned[0].runner.as_deref(), Some("create_cluster"));
    assert!(rec.kinds(NoticeKind::AttemptFailed).is_empty());
    assert!(!rec.saw_event(Event::ClusterCreated));

    node.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_static_cluster_skips_creation() {
    let store = Arc::new(MemoryStore::new());
    let (node, rec) = node_with(&store, config("n1"), Arc::new(StaticClusterId::new("fixed")));

    node.start();
    eventually("running", || node.state() == State::Running).await;

    assert!(!rec.saw_event(Event::ClusterUndefined));
    assert_eq!(
        announced_value(&store, "/t/fixed/nodes/n1").await.as_deref(),
        Some("n1.local:7000")
    );
    node.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_forced_running_without_key_announces() {
    let store = Arc::new(MemoryStore::new());
    let (node, rec) = node_with(&store, config("n1"), Arc::new(StaticClusterId::new("fixed")));

    node.context().init(State::Running);
    eventually("announced", || rec.saw_event(Event::Announced)).await;

    assert!(rec.saw_event(Event::AnnounceRefreshFailedWithNoKey));
    assert_eq!(node.state(), State::Running);
    assert_eq!(
        announced_value(&store, "/t/fixed/nodes/n1").await.as_deref(),
        Some("n1.local:7000")
    );
    node.shutdown().await.unwrap();
}
