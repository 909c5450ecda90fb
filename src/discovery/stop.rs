//! # Stop phase: withdraw the announcement.
//!
//! Deletes the announcement key only while it still holds this node's address,
//! then reports `AnnounceCleared`. A key that is already gone, or that another
//! node has taken over, counts as cleared.

use std::sync::Arc;

use async_trait::async_trait;

use crate::coordination::Guard;
use crate::core::{RunScope, Runner};
use crate::discovery::factory::Shared;
use crate::error::CoordinationError;
use crate::machine::Event;

pub(crate) struct StopRunner {
    shared: Arc<Shared>,
}

impl StopRunner {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Runner for StopRunner {
    fn name(&self) -> &str {
        "stop"
    }

    async fn run(&self, scope: RunScope) {
        let Some(cluster) = self.shared.cluster_id() else {
            scope.report(Event::AnnounceCleared);
            return;
        };
        let cfg = &self.shared.cfg;
        let key = cfg.announce_key(&cluster);
        let mut pacer = self.shared.pacer();

        loop {
            let Some(res) = scope
                .until_stopped(
                    self.shared
                        .coordinator
                        .delete(&key, Guard::Equals(cfg.address.clone())),
                )
                .await
            else {
                return;
            };
            match res {
                Ok(_)
                | Err(CoordinationError::KeyNotFound { .. })
                | Err(CoordinationError::CompareFailed { .. }) => {
                    self.shared.clear_announced();
                    scope.report(Event::AnnounceCleared);
                    return;
                }
                Err(e) => {
                    if !pacer.retry(&scope, &e.as_message()).await {
                        return;
                    }
                }
            }
        }
    }
}
