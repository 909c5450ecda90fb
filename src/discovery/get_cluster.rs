//! # GetCluster phase: learn the cluster identifier.
//!
//! Asks the [`ClusterIdSource`](crate::ClusterIdSource) for the identifier and
//! reports `ClusterDefined` or `ClusterUndefined`. Coordination failures are
//! retried with the node's retry pacing until the runner is stopped.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{RunScope, Runner};
use crate::discovery::factory::Shared;
use crate::discovery::pacing::abandon;
use crate::machine::Event;

pub(crate) struct GetClusterRunner {
    shared: Arc<Shared>,
}

impl GetClusterRunner {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Runner for GetClusterRunner {
    fn name(&self) -> &str {
        "get_cluster"
    }

    async fn run(&self, scope: RunScope) {
        let mut pacer = self.shared.pacer();
        loop {
            let Some(res) = scope.until_stopped(self.shared.cluster.cluster_id()).await else {
                return;
            };
            match res {
                Ok(Some(id)) => {
                    self.shared.set_cluster_id(&id);
                    scope.report(Event::ClusterDefined);
                    return;
                }
                Ok(None) => {
                    scope.report(Event::ClusterUndefined);
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
