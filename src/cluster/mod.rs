//! Cluster-identifier capability.
//!
//! ## Contents
//! - [`ClusterIdSource`] is_supported / cluster_id / set_cluster_id
//! - [`StaticClusterId`] identifier from configuration
//! - [`StoredClusterId`] identifier kept under a coordination-service key

mod fixed;
mod source;
mod stored;

pub use fixed::StaticClusterId;
pub use source::{ClusterIdRef, ClusterIdSource};
pub use stored::StoredClusterId;
