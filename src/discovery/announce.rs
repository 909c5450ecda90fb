//! # Announce / Running phases: publish this node and hold its lease.
//!
//! The announcement is the key `<prefix>/<cluster>/nodes/<node_id>` holding the
//! node's address with a TTL. One runner covers both phases:
//!
//! - built for `Announce`, it writes the key, reports `Announced` and then keeps
//!   refreshing the lease (the context keeps it alive through `Running`);
//! - built for `Running` (after a forced entry), it only holds the lease.
//!
//! ## Lease loop
//! ```text
//! ┌──► wait refresh_interval ─┬─ key deleted/expired ──► refresh now
//! │    (watching the key)     ├─ key overwritten ──────► report AnnounceRefreshFailedWithNoKey
//! │                           └─ stopped ──────────────► return
//! │
//! └─── refresh(key, ttl) ─────┬─ ok ─────────► loop
//!                             ├─ KeyNotFound ► report AnnounceRefreshFailedWithNoKey
//!                             └─ other ──────► paced retry (no interval wait)
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::coordination::{Guard, Node, Watch};
use crate::core::{RunScope, Runner};
use crate::discovery::factory::Shared;
use crate::discovery::pacing::{abandon, Pacer};
use crate::error::CoordinationError;
use crate::machine::Event;
use crate::policies::Backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Announce,
    Hold,
}

/// Outcome of waiting for the next refresh.
enum LeaseWait {
    Due,
    Lost,
    Stopped,
}

pub(crate) struct AnnounceRunner {
    shared: Arc<Shared>,
    mode: Mode,
}

impl AnnounceRunner {
    /// Writes the announcement, then holds the lease.
    pub(crate) fn announce(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            mode: Mode::Announce,
        }
    }

    /// Holds an announcement written earlier.
    pub(crate) fn hold(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            mode: Mode::Hold,
        }
    }

    /// Cluster id learned by an earlier phase, or read from the source.
    async fn resolve_cluster(&self, scope: &RunScope, pacer: &mut Pacer) -> Option<String> {
        if let Some(id) = self.shared.cluster_id() {
            return Some(id);
        }
        loop {
            let res = scope.until_stopped(self.shared.cluster.cluster_id()).await?;
            let reason = match res {
                Ok(Some(id)) => {
                    self.shared.set_cluster_id(&id);
                    return Some(id);
                }
                Ok(None) => "cluster id not defined".to_string(),
                Err(e) if e.is_retryable() => e.as_message(),
                Err(e) => {
                    abandon(scope, &e.as_message());
                    return None;
                }
            };
            if !pacer.retry(scope, &reason).await {
                return None;
            }
        }
    }

    /// Creates the announcement key; takes over a still-live key holding our address.
    async fn write(&self, scope: &RunScope, key: &str, pacer: &mut Pacer) -> Option<Node> {
        let cfg = &self.shared.cfg;
        let coordinator = &self.shared.coordinator;
        loop {
            let created = scope
                .until_stopped(coordinator.put(
                    key,
                    &cfg.address,
                    Guard::MustNotExist,
                    Some(cfg.announce_ttl),
                ))
                .await?;
            let res = match created {
                Err(CoordinationError::NodeExists { .. }) => {
                    scope
                        .until_stopped(coordinator.put(
                            key,
                            &cfg.address,
                            Guard::Equals(cfg.address.clone()),
                            Some(cfg.announce_ttl),
                        ))
                        .await?
                }
                other => other,
            };
            match res {
                Ok(node) => return Some(node),
                Err(e) => {
                    if !pacer.retry(scope, &e.as_message()).await {
                        return None;
                    }
                }
            }
        }
    }

    /// Sleeps up to `interval` while watching the announcement key.
    async fn wait(&self, scope: &RunScope, key: &str, index: u64, interval: Duration) -> LeaseWait {
        let sleep = tokio::time::sleep(interval);
        tokio::pin!(sleep);
        let watch = self.shared.coordinator.get(key, Watch::After(index));
        tokio::pin!(watch);
        let mut watching = true;

        loop {
            tokio::select! {
                _ = scope.stopped() => return LeaseWait::Stopped,
                _ = &mut sleep => return LeaseWait::Due,
                res = &mut watch, if watching => match res {
                    Err(e) if e.is_key_not_found() => return LeaseWait::Due,
                    Ok(node) if node.value != self.shared.cfg.address => return LeaseWait::Lost,
                    _ => watching = false,
                },
            }
        }
    }

    /// Refreshes the lease every interval; `due` forces an immediate first refresh.
    async fn hold_lease(
        &self,
        scope: &RunScope,
        key: &str,
        mut index: u64,
        mut due: bool,
        pacer: &mut Pacer,
    ) {
        let cfg = &self.shared.cfg;
        let mut interval = cfg.refresh_backoff();

        loop {
            if !due {
                match self.wait(scope, key, index, interval.increment()).await {
                    LeaseWait::Due => {}
                    LeaseWait::Stopped => return,
                    LeaseWait::Lost => {
                        tracing::debug!(key, "announcement overwritten");
                        self.shared.clear_announced();
                        scope.report(Event::AnnounceRefreshFailedWithNoKey);
                        return;
                    }
                }
            }

            let Some(res) = scope
                .until_stopped(self.shared.coordinator.refresh(key, cfg.announce_ttl))
                .await
            else {
                return;
            };
            match res {
                Ok(node) => {
                    pacer.reset();
                    due = false;
                    index = node.modified_index;
                    self.shared.set_announced(node);
                }
                Err(e) if e.is_key_not_found() => {
                    self.shared.clear_announced();
                    scope.report(Event::AnnounceRefreshFailedWithNoKey);
                    return;
                }
                Err(e) => {
                    due = true;
                    if !pacer.retry(scope, &e.as_message()).await {
                        return;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Runner for AnnounceRunner {
    fn name(&self) -> &str {
        match self.mode {
            Mode::Announce => "announce",
            Mode::Hold => "refresh",
        }
    }

    async fn run(&self, scope: RunScope) {
        let mut pacer = self.shared.pacer();
        let Some(cluster) = self.resolve_cluster(&scope, &mut pacer).await else {
            return;
        };
        let key = self.shared.cfg.announce_key(&cluster);

        let (index, due) = match self.mode {
            Mode::Announce => {
                let Some(node) = self.write(&scope, &key, &mut pacer).await else {
                    return;
                };
                pacer.reset();
                let index = node.modified_index;
                self.shared.set_announced(node);
                scope.report(Event::Announced);
                (index, false)
            }
            // Entered without announcing: confirm the lease right away.
            Mode::Hold => (0, true),
        };

        self.hold_lease(&scope, &key, index, due, &mut pacer).await;
    }
}
