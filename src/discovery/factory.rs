//! # Runner factory for the membership phases.
//!
//! [`DiscoveryFactory`] maps the context's current [`State`] to the runner that
//! does that phase's work. All runners share one [`Shared`] block holding the
//! configuration, the coordination client, the cluster-identifier source and
//! what the node has learned so far (cluster id, announced node).
//!
//! | Phase           | Runner                 |
//! |-----------------|------------------------|
//! | `GetCluster`    | [`GetClusterRunner`]   |
//! | `CreateCluster` | [`CreateClusterRunner`]|
//! | `Announce`      | [`AnnounceRunner`] (announce, then hold the lease) |
//! | `Running`       | [`AnnounceRunner`] (hold the lease only)           |
//! | `Stop`          | [`StopRunner`]         |

use std::sync::Arc;

use parking_lot::RwLock;

use crate::cluster::ClusterIdRef;
use crate::coordination::{CoordinatorRef, Node};
use crate::core::{Config, Context, RunnerFactory, RunnerRef};
use crate::discovery::announce::AnnounceRunner;
use crate::discovery::create_cluster::CreateClusterRunner;
use crate::discovery::get_cluster::GetClusterRunner;
use crate::discovery::pacing::Pacer;
use crate::discovery::stop::StopRunner;
use crate::error::BackoffError;
use crate::machine::State;
use crate::policies::SquareBackoff;

/// What the node has learned about its membership.
#[derive(Debug, Clone, Default)]
struct Membership {
    cluster_id: Option<String>,
    announced: Option<Node>,
}

/// State shared by every phase runner of one node.
pub(crate) struct Shared {
    pub(crate) cfg: Config,
    pub(crate) coordinator: CoordinatorRef,
    pub(crate) cluster: ClusterIdRef,
    retry: SquareBackoff,
    membership: RwLock<Membership>,
}

impl Shared {
    /// Fresh retry pacer built from the configured backoff and jitter.
    pub(crate) fn pacer(&self) -> Pacer {
        Pacer::new(self.retry, self.cfg.jitter)
    }

    pub(crate) fn cluster_id(&self) -> Option<String> {
        self.membership.read().cluster_id.clone()
    }

    pub(crate) fn set_cluster_id(&self, id: &str) {
        self.membership.write().cluster_id = Some(id.to_string());
    }

    pub(crate) fn announced(&self) -> Option<Node> {
        self.membership.read().announced.clone()
    }

    pub(crate) fn set_announced(&self, node: Node) {
        self.membership.write().announced = Some(node);
    }

    pub(crate) fn clear_announced(&self) {
        self.membership.write().announced = None;
    }
}

/// Builds the runner for each membership phase.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use discovisor::{Config, DiscoveryFactory, MemoryStore, StaticClusterId};
///
/// let factory = DiscoveryFactory::new(
///     Config::for_node("n1", "10.0.0.1:7000"),
///     Arc::new(MemoryStore::new()),
///     Arc::new(StaticClusterId::new("c1")),
/// )
/// .unwrap();
/// assert_eq!(factory.cluster_id(), None);
/// ```
#[derive(Clone)]
pub struct DiscoveryFactory {
    shared: Arc<Shared>,
}

impl DiscoveryFactory {
    /// Creates a factory; fails if the configured retry bounds are invalid.
    pub fn new(
        cfg: Config,
        coordinator: CoordinatorRef,
        cluster: ClusterIdRef,
    ) -> Result<Self, BackoffError> {
        let retry = cfg.retry_backoff()?;
        Ok(Self {
            shared: Arc::new(Shared {
                cfg,
                coordinator,
                cluster,
                retry,
                membership: RwLock::new(Membership::default()),
            }),
        })
    }

    /// Cluster identifier learned or established so far.
    pub fn cluster_id(&self) -> Option<String> {
        self.shared.cluster_id()
    }

    /// Announcement node last written or refreshed by this node.
    pub fn announced(&self) -> Option<Node> {
        self.shared.announced()
    }

    /// Configuration the runners use.
    pub fn config(&self) -> &Config {
        &self.shared.cfg
    }
}

impl RunnerFactory for DiscoveryFactory {
    fn build(&self, context: &Context) -> RunnerRef {
        let shared = Arc::clone(&self.shared);
        match context.state() {
            State::GetCluster => Arc::new(GetClusterRunner::new(shared)),
            State::CreateCluster => Arc::new(CreateClusterRunner::new(shared)),
            State::Announce => Arc::new(AnnounceRunner::announce(shared)),
            State::Running => Arc::new(AnnounceRunner::hold(shared)),
            State::Stop => Arc::new(StopRunner::new(shared)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::StaticClusterId;
    use crate::coordination::MemoryStore;
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn factory(cfg: Config) -> Result<DiscoveryFactory, BackoffError> {
        DiscoveryFactory::new(
            cfg,
            Arc::new(MemoryStore::new()),
            Arc::new(StaticClusterId::new("c1")),
        )
    }

    #[test]
    fn test_rejects_inverted_retry_bounds() {
        let mut cfg = Config::for_node("n1", "a:1");
        cfg.retry_min = Duration::from_secs(5);
        cfg.retry_max = Duration::from_secs(1);
        assert!(factory(cfg).is_err());
    }

    #[tokio::test]
    async fn test_runner_per_phase() {
        let f = factory(Config::for_node("n1", "a:1")).unwrap();
        let ctx = Context::new(State::Stop, Arc::new(f.clone()), Handle::current());

        for (state, name) in [
            (State::GetCluster, "get_cluster"),
            (State::CreateCluster, "create_cluster"),
            (State::Announce, "announce"),
            (State::Running, "refresh"),
            (State::Stop, "stop"),
        ] {
            ctx.init(state);
            assert_eq!(f.build(&ctx).name(), name);
        }
        ctx.init(State::Stop);
    }
}
