//! # CreateCluster phase: establish the cluster identifier.
//!
//! Calls `set_cluster_id` until it succeeds, reports `ClusterCreated`, then asks
//! the context to re-enter `GetCluster` so the identifier is read back the same
//! way every other node reads it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{RunScope, Runner};
use crate::discovery::factory::Shared;
use crate::discovery::pacing::abandon;
use crate::machine::{Event, State};

pub(crate) struct CreateClusterRunner {
    shared: Arc<Shared>,
}

impl CreateClusterRunner {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Runner for CreateClusterRunner {
    fn name(&self) -> &str {
        "create_cluster"
    }

    async fn run(&self, scope: RunScope) {
        let mut pacer = self.shared.pacer();
        loop {
            let Some(res) = scope
                .until_stopped(self.shared.cluster.set_cluster_id())
                .await
            else {
                return;
            };
            match res {
                Ok(id) => {
                    tracing::debug!(cluster_id = %id, "cluster established");
                    self.shared.set_cluster_id(&id);
                    scope.report(Event::ClusterCreated);
                    scope.reenter(State::GetCluster);
                    return;
                }
                Err(e) if e.is_retryable() => {
                    if !pacer.retry(&scope, &e.as_message()).await {
                        return;
                    }
                }
                Err(e) => {
                    abandon(&scope, &e.as_message());
                    return;
                }
            }
        }
    }
}
