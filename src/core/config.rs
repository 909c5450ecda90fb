//! # Node configuration.
//!
//! Provides [`Config`] centralized settings for a discovering node: where in the
//! coordination service it lives, how it announces itself, and how it paces
//! retries.
//!
//! ## Key layout
//! ```text
//! <prefix>/cluster_id                        cluster identifier
//! <prefix>/<cluster_id>/nodes/<node_id>      announcement (value = address, TTL lease)
//! ```
//!
//! ## Sentinel values
//! - `retry_steps = 0` → no ramp, every retry waits `retry_max`
//! - `grace = 0s` → shutdown does not wait for the stop phase

use std::time::Duration;

use crate::error::BackoffError;
use crate::policies::{ConstantBackoff, JitterPolicy, SquareBackoff};

/// Configuration for a discovering node.
///
/// ## Field semantics
/// - `prefix`: root key under which everything is stored
/// - `node_id` / `address`: who this node is and what it announces
/// - `announce_ttl`: lease length of the announcement
/// - `refresh_interval`: delay between lease refreshes (should be well below `announce_ttl`)
/// - `retry_min` / `retry_max` / `retry_steps`: square backoff between failed attempts
/// - `jitter`: randomization applied to retry delays
/// - `bus_capacity`: notice bus ring buffer size (min 1)
/// - `grace`: how long shutdown waits for the stop phase to clear the announcement
#[derive(Clone, Debug)]
pub struct Config {
    /// Root key prefix (no trailing slash).
    pub prefix: String,
    /// Stable identifier of this node.
    pub node_id: String,
    /// Address announced for this node.
    pub address: String,
    /// Lease length of the announcement key.
    pub announce_ttl: Duration,
    /// Delay between lease refreshes.
    pub refresh_interval: Duration,
    /// First retry delay.
    pub retry_min: Duration,
    /// Retry delay ceiling.
    pub retry_max: Duration,
    /// Attempts until `retry_max` is reached.
    pub retry_steps: u32,
    /// Randomization of retry delays.
    pub jitter: JitterPolicy,
    /// Capacity of the notice bus.
    pub bus_capacity: usize,
    /// Maximum time shutdown waits for the stop phase.
    pub grace: Duration,
}

impl Config {
    /// Creates a config for `node_id` announcing `address`, other fields default.
    pub fn for_node(node_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            address: address.into(),
            ..Self::default()
        }
    }

    /// Key holding the cluster identifier.
    pub fn cluster_id_key(&self) -> String {
        format!("{}/cluster_id", self.prefix.trim_end_matches('/'))
    }

    /// Key holding this node's announcement under `cluster_id`.
    ///
    /// # Example
    /// ```
    /// use discovisor::Config;
    ///
    /// let cfg = Config::for_node("n1", "10.0.0.1:9300");
    /// assert_eq!(cfg.announce_key("c0"), "/discovisor/c0/nodes/n1");
    /// ```
    pub fn announce_key(&self, cluster_id: &str) -> String {
        format!(
            "{}/{}/nodes/{}",
            self.prefix.trim_end_matches('/'),
            cluster_id,
            self.node_id
        )
    }

    /// Builds the retry policy.
    ///
    /// Fails with [`BackoffError::InvalidConfiguration`] when `retry_max < retry_min`.
    pub fn retry_backoff(&self) -> Result<SquareBackoff, BackoffError> {
        SquareBackoff::new(self.retry_min, self.retry_max, self.retry_steps)
    }

    /// Builds the lease refresh policy.
    pub fn refresh_backoff(&self) -> ConstantBackoff {
        ConstantBackoff::new(self.refresh_interval)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `prefix = "/discovisor"`, `node_id = "node"`, `address = ""`
    /// - `announce_ttl = 30s`, `refresh_interval = 10s`
    /// - retries ramp `100ms → 30s` over `10` steps, no jitter
    /// - `bus_capacity = 1024`, `grace = 10s`
    fn default() -> Self {
        Self {
            prefix: "/discovisor".to_string(),
            node_id: "node".to_string(),
            address: String::new(),
            announce_ttl: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(10),
            retry_min: Duration::from_millis(100),
            retry_max: Duration::from_secs(30),
            retry_steps: 10,
            jitter: JitterPolicy::None,
            bus_capacity: 1024,
            grace: Duration::from_secs(10),
        }
    }
}
