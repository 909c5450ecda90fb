//! # Example: two nodes joining one cluster
//!
//! Both nodes share an in-process [`MemoryStore`]. The first node finds no
//! cluster and creates one; the second joins it. Halfway through, the first
//! node's announcement is deleted behind its back and it re-announces.
//!
//! Run with: `cargo run --example membership --features logging`

use std::sync::Arc;
use std::time::Duration;

use discovisor::{
    Config, Coordinator, Guard, LogWriter, MemoryStore, Node, State, StoredClusterId, Subscribe,
};

fn config(node_id: &str, address: &str) -> Config {
    let mut cfg = Config::for_node(node_id, address);
    cfg.prefix = "/demo".to_string();
    cfg.announce_ttl = Duration::from_secs(2);
    cfg.refresh_interval = Duration::from_millis(500);
    cfg.retry_min = Duration::from_millis(50);
    cfg.retry_max = Duration::from_secs(1);
    cfg
}

fn node(store: &Arc<MemoryStore>, node_id: &str, address: &str) -> Result<Node, Box<dyn std::error::Error>> {
    let cfg = config(node_id, address);
    let cluster = StoredClusterId::new(store.clone(), cfg.cluster_id_key(), format!("cluster-of-{node_id}"));
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    Ok(Node::builder(cfg)
        .with_coordinator(store.clone())
        .with_cluster_id(Arc::new(cluster))
        .with_subscribers(subs)
        .build()?)
}

async fn wait_running(node: &Node) {
    while !node.context().is(State::Running) {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "discovisor=info,membership=info".into()),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    let first = node(&store, "n1", "10.0.0.1:7000")?;
    let second = node(&store, "n2", "10.0.0.2:7000")?;

    first.start();
    wait_running(&first).await;
    second.start();
    wait_running(&second).await;
    tracing::info!(cluster = ?first.cluster_id(), members = ?store.keys("/demo/"), "both running");

    if let Some(cluster) = first.cluster_id() {
        let key = first.config().announce_key(&cluster);
        store.delete(&key, Guard::None).await?;
        tracing::info!(%key, "deleted first node's announcement");
    }
    tokio::time::sleep(Duration::from_secs(1)).await;
    wait_running(&first).await;
    tracing::info!(members = ?store.keys("/demo/"), "first node re-announced");

    first.shutdown().await?;
    second.shutdown().await?;
    tracing::info!(members = ?store.keys("/demo/"), "all withdrawn");
    Ok(())
}
