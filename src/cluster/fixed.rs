//! # Statically configured cluster identifier.

use async_trait::async_trait;

use crate::cluster::source::ClusterIdSource;
use crate::error::ClusterIdError;

/// Cluster identifier taken from configuration.
///
/// With no identifier configured the source is unsupported: lookups report an
/// undefined cluster and `set_cluster_id` fails.
#[derive(Debug, Clone, Default)]
pub struct StaticClusterId {
    id: Option<String>,
}

impl StaticClusterId {
    /// Source that always yields `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }

    /// Source with nothing configured.
    pub fn unset() -> Self {
        Self { id: None }
    }
}

#[async_trait]
impl ClusterIdSource for StaticClusterId {
    fn is_supported(&self) -> bool {
        self.id.is_some()
    }

    async fn cluster_id(&self) -> Result<Option<String>, ClusterIdError> {
        Ok(self.id.clone())
    }

    async fn set_cluster_id(&self) -> Result<String, ClusterIdError> {
        self.id.clone().ok_or_else(|| ClusterIdError::Unsupported {
            reason: "no cluster id configured".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configured_id() {
        let src = StaticClusterId::new("c1");
        assert!(src.is_supported());
        assert_eq!(src.cluster_id().await.unwrap().as_deref(), Some("c1"));
        assert_eq!(src.set_cluster_id().await.unwrap(), "c1");
    }

    #[tokio::test]
    async fn test_unset_is_unsupported() {
        let src = StaticClusterId::unset();
        assert!(!src.is_supported());
        assert_eq!(src.cluster_id().await.unwrap(), None);
        assert_eq!(
            src.set_cluster_id().await.unwrap_err().as_label(),
            "cluster_id_unsupported"
        );
    }
}
