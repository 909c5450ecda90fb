//! # Node: drives one member through its membership lifecycle.
//!
//! The [`Node`] owns the notice [`Bus`], a [`SubscriberSet`], and the membership
//! [`Context`] wired to a [`DiscoveryFactory`]. It starts discovery, forwards
//! notices to subscribers, and performs graceful shutdown.
//!
//! ## Architecture
//! ```text
//! NodeBuilder::build()
//!   ├─ Bus::new(cfg.bus_capacity)
//!   ├─ SubscriberSet::new(subscribers)     ◄── listener: Bus.subscribe() ─► emit(&Notice)
//!   └─ Context::with_bus(Stop, DiscoveryFactory, executor, bus)
//!
//! start():     ctx.init(GetCluster)
//!
//! shutdown():  Bus.publish(ShutdownRequested)
//!              ctx.next(Stopped)            Announce → Stop (fresh stop runner)
//!              ctx.init(Stop) otherwise     any other phase, or a repeated shutdown
//!              wait ≤ cfg.grace for the stop runner to exit:
//!                 ├─ exited   → Bus.publish(AllStoppedWithin)
//!                 └─ timeout  → Bus.publish(GraceExceeded), Err(GraceExceeded)
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use discovisor::{Config, MemoryStore, Node, StaticClusterId};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let node = Node::builder(Config::for_node("n1", "10.0.0.1:7000"))
//!         .with_coordinator(Arc::new(MemoryStore::new()))
//!         .with_cluster_id(Arc::new(StaticClusterId::new("c1")))
//!         .build()?;
//!
//!     node.start();
//!     node.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::core::builder::NodeBuilder;
use crate::core::{shutdown, Config, Context};
use crate::discovery::DiscoveryFactory;
use crate::error::RuntimeError;
use crate::events::{Bus, Notice, NoticeKind};
use crate::machine::{Event, State};
use crate::subscribers::SubscriberSet;

/// Drives one discovering member: discovery, announcement and withdrawal.
pub struct Node {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    context: Arc<Context>,
    factory: DiscoveryFactory,
}

impl Node {
    /// Returns a builder for a node configured with `cfg`.
    pub fn builder(cfg: Config) -> NodeBuilder {
        NodeBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        context: Arc<Context>,
        factory: DiscoveryFactory,
    ) -> Self {
        Self {
            cfg,
            bus,
            subs,
            context,
            factory,
        }
    }

    /// Starts discovery by entering `GetCluster`.
    pub fn start(&self) {
        tracing::info!(node_id = %self.cfg.node_id, "starting discovery");
        self.context.init(State::GetCluster);
    }

    /// Current membership phase.
    pub fn state(&self) -> State {
        self.context.state()
    }

    /// Cluster identifier learned or established so far.
    pub fn cluster_id(&self) -> Option<String> {
        self.factory.cluster_id()
    }

    /// Configuration of this node.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Membership context (for inspection or driving events directly).
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Bus carrying this node's notices.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Number of subscribers notices are fanned out to.
    pub fn subscribers(&self) -> usize {
        self.subs.len()
    }

    /// Starts discovery and runs until an OS termination signal, then shuts down.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        self.start();
        let signal = shutdown::wait_for_shutdown_signal().await?;
        tracing::info!(signal, node_id = %self.cfg.node_id, "termination signal received");
        self.shutdown().await
    }

    /// Withdraws the announcement and waits up to [`Config::grace`] for it.
    ///
    /// Publishes [`NoticeKind::AllStoppedWithin`] on success, or
    /// [`NoticeKind::GraceExceeded`] on timeout and returns
    /// [`RuntimeError::GraceExceeded`] naming the runner still active.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let mut rx = self.bus.subscribe();
        self.bus.publish(Notice::new(NoticeKind::ShutdownRequested));

        let spawned = self.context.runners_spawned();
        let to = self.context.next(Event::Stopped);
        if to != State::Stop || self.context.runners_spawned() == spawned {
            self.context.init(State::Stop);
        }
        let Some(generation) = self.context.active_generation() else {
            return Ok(());
        };
        let grace = self.cfg.grace;
        if grace.is_zero() {
            return Ok(());
        }

        let exited = async {
            loop {
                match rx.recv().await {
                    Ok(n) if n.kind == NoticeKind::RunnerExited && n.generation == Some(generation) => {
                        return;
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => return,
                }
            }
        };

        match tokio::time::timeout(grace, exited).await {
            Ok(()) => {
                self.bus.publish(Notice::new(NoticeKind::AllStoppedWithin));
                tracing::info!(node_id = %self.cfg.node_id, "announcement withdrawn");
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Notice::new(NoticeKind::GraceExceeded));
                let stuck = self.context.active_runner();
                tracing::warn!(?grace, ?stuck, "shutdown grace exceeded");
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}
