//! # NodeBuilder: assembles a [`Node`] from configuration and collaborators.
//!
//! Fills in defaults (in-process store, stored cluster identifier), wires the
//! notice bus to the subscriber set and hands a [`DiscoveryFactory`] to the
//! membership context.

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::{
    cluster::{ClusterIdRef, StoredClusterId},
    coordination::{CoordinatorRef, MemoryStore},
    core::{Config, Context, Node},
    discovery::DiscoveryFactory,
    error::RuntimeError,
    events::Bus,
    machine::State,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Node`].
///
/// Without a coordinator the node uses an in-process [`MemoryStore`]. Without a
/// supported cluster-identifier source it stores the identifier under
/// [`Config::cluster_id_key`], proposing a random one if none exists yet.
pub struct NodeBuilder {
    cfg: Config,
    coordinator: Option<CoordinatorRef>,
    cluster: Option<ClusterIdRef>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    executor: Option<Handle>,
}

impl NodeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            coordinator: None,
            cluster: None,
            subscribers: Vec::new(),
            executor: None,
        }
    }

    /// Sets the coordination service client.
    pub fn with_coordinator(mut self, coordinator: CoordinatorRef) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Sets the cluster-identifier source.
    ///
    /// A source whose [`is_supported`](crate::ClusterIdSource::is_supported)
    /// is false is replaced by the stored default at build time.
    pub fn with_cluster_id(mut self, cluster: ClusterIdRef) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Sets notice subscribers for observability.
    ///
    /// Subscribers receive machine and runner notices through dedicated
    /// workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Runs phase runners on `executor` instead of the current runtime.
    pub fn with_executor(mut self, executor: Handle) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Builds the node.
    ///
    /// Fails if the retry configuration is invalid, or if no executor was set
    /// and the builder is not called from within a tokio runtime.
    pub fn build(self) -> Result<Node, RuntimeError> {
        let executor = match self.executor {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| RuntimeError::NoExecutor)?,
        };
        let _entered = executor.enter();

        let coordinator = self
            .coordinator
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as CoordinatorRef);
        let cluster = match self.cluster {
            Some(source) if source.is_supported() => source,
            configured => {
                if configured.is_some() {
                    tracing::warn!("cluster id source unsupported; storing the id in the coordinator");
                }
                Arc::new(StoredClusterId::new(
                    Arc::clone(&coordinator),
                    self.cfg.cluster_id_key(),
                    random_cluster_id(),
                )) as ClusterIdRef
            }
        };
        let factory = DiscoveryFactory::new(self.cfg.clone(), coordinator, cluster)?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        subscriber_listener(&executor, &bus, &subs);

        let context = Context::with_bus(
            State::Stop,
            Arc::new(factory.clone()),
            executor.clone(),
            bus.clone(),
        );
        Ok(Node::new_internal(self.cfg, bus, subs, context, factory))
    }
}

/// Forwards bus notices to the subscriber set (fire-and-forget).
fn subscriber_listener(executor: &Handle, bus: &Bus, subs: &Arc<SubscriberSet>) {
    if subs.is_empty() {
        return;
    }
    let mut rx = bus.subscribe();
    let set = Arc::clone(subs);
    executor.spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notice) => set.emit(&notice),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber listener lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn random_cluster_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}
