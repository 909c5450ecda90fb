//! # Cluster identifier kept in the coordination service.
//!
//! [`StoredClusterId`] reads the identifier from a single key and establishes
//! it with a `MustNotExist` guarded write. When two nodes race to create the
//! cluster, the loser adopts the winner's value, so `set_cluster_id` is
//! idempotent across the whole cluster.
//!
//! The candidate value is supplied by the caller; a legacy key, if configured
//! and present, takes precedence over it so an older deployment's identifier
//! survives the move.

use async_trait::async_trait;

use crate::cluster::source::ClusterIdSource;
use crate::coordination::{CoordinatorRef, Guard, Watch};
use crate::error::{ClusterIdError, CoordinationError};

/// Cluster identifier stored under a coordination-service key.
pub struct StoredClusterId {
    coordinator: CoordinatorRef,
    key: String,
    candidate: String,
    legacy_key: Option<String>,
}

impl StoredClusterId {
    /// Reads/establishes the identifier at `key`, proposing `candidate` if none exists.
    pub fn new(
        coordinator: CoordinatorRef,
        key: impl Into<String>,
        candidate: impl Into<String>,
    ) -> Self {
        Self {
            coordinator,
            key: key.into(),
            candidate: candidate.into(),
            legacy_key: None,
        }
    }

    /// Migrates the identifier found at `legacy_key` when establishing one.
    pub fn with_legacy_key(mut self, legacy_key: impl Into<String>) -> Self {
        self.legacy_key = Some(legacy_key.into());
        self
    }

    async fn read(&self, key: &str) -> Result<Option<String>, CoordinationError> {
        match self.coordinator.get(key, Watch::No).await {
            Ok(node) => Ok(Some(node.value)),
            Err(e) if e.is_key_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn proposal(&self) -> Result<String, CoordinationError> {
        if let Some(legacy) = &self.legacy_key {
            if let Some(id) = self.read(legacy).await? {
                return Ok(id);
            }
        }
        Ok(self.candidate.clone())
    }
}

#[async_trait]
impl ClusterIdSource for StoredClusterId {
    fn is_supported(&self) -> bool {
        true
    }

    async fn cluster_id(&self) -> Result<Option<String>, ClusterIdError> {
        Ok(self.read(&self.key).await?)
    }

    async fn set_cluster_id(&self) -> Result<String, ClusterIdError> {
        let proposal = self.proposal().await?;
        match self
            .coordinator
            .put(&self.key, &proposal, Guard::MustNotExist, None)
            .await
        {
            Ok(node) => Ok(node.value),
            Err(CoordinationError::NodeExists { .. }) => {
                self.read(&self.key)
                    .await?
                    .ok_or_else(|| ClusterIdError::Coordination(CoordinationError::KeyNotFound {
                        key: self.key.clone(),
                    }))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::{Coordinator, MemoryStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_establish_then_read() {
        let store = Arc::new(MemoryStore::new());
        let src = StoredClusterId::new(store.clone(), "/d/cluster_id", "alpha");

        assert_eq!(src.cluster_id().await.unwrap(), None);
        assert_eq!(src.set_cluster_id().await.unwrap(), "alpha");
        assert_eq!(src.cluster_id().await.unwrap().as_deref(), Some("alpha"));
        assert_eq!(src.set_cluster_id().await.unwrap(), "alpha");
    }

    #[tokio::test]
    async fn test_race_loser_adopts_winner() {
        let store = Arc::new(MemoryStore::new());
        let a = StoredClusterId::new(store.clone(), "/d/cluster_id", "alpha");
        let b = StoredClusterId::new(store.clone(), "/d/cluster_id", "beta");

        assert_eq!(a.set_cluster_id().await.unwrap(), "alpha");
        assert_eq!(b.set_cluster_id().await.unwrap(), "alpha");
    }

    #[tokio::test]
    async fn test_legacy_identifier_is_migrated() {
        let store = Arc::new(MemoryStore::new());
        store
            .put("/old/uuid", "legacy-7", Guard::None, None)
            .await
            .unwrap();
        let src = StoredClusterId::new(store.clone(), "/d/cluster_id", "fresh")
            .with_legacy_key("/old/uuid");

        assert_eq!(src.set_cluster_id().await.unwrap(), "legacy-7");
        assert_eq!(src.cluster_id().await.unwrap().as_deref(), Some("legacy-7"));
    }

    #[tokio::test]
    async fn test_offline_store_surfaces_coordination_error() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let src = StoredClusterId::new(store.clone(), "/d/cluster_id", "alpha");

        match src.cluster_id().await {
            Err(ClusterIdError::Coordination(e)) => assert!(e.is_retryable()),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
