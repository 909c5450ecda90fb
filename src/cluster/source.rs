//! # Cluster-identifier capability.
//!
//! A [`ClusterIdSource`] answers "which cluster does this node belong to?" and,
//! when no cluster exists, establishes one. Exactly one source is active per
//! node; the membership machine does not care which.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClusterIdError;

/// Provides and establishes the cluster identifier.
#[async_trait]
pub trait ClusterIdSource: Send + Sync + 'static {
    /// True if this source can provide an identifier at all.
    fn is_supported(&self) -> bool;

    /// The existing identifier, or `None` if no cluster is defined yet.
    async fn cluster_id(&self) -> Result<Option<String>, ClusterIdError>;

    /// Establishes an identifier (idempotent) and returns it.
    async fn set_cluster_id(&self) -> Result<String, ClusterIdError>;
}

/// Shared handle to a cluster-identifier source.
pub type ClusterIdRef = Arc<dyn ClusterIdSource>;
