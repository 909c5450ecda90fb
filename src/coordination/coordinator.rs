//! # Coordination-service capability.
//!
//! [`Coordinator`] is the only view phase runners have of the shared
//! hierarchical key-value store: guarded writes, TTL leases, and watch reads.
//! Wire protocols live outside this crate; anything that can express these
//! four operations can back a node.
//!
//! ## Guards
//! ```text
//! Guard::None          unconditional
//! Guard::MustExist     fails KeyNotFound   if absent
//! Guard::MustNotExist  fails NodeExists    if present
//! Guard::AtIndex(n)    fails CompareFailed if modified_index != n (KeyNotFound if absent)
//! Guard::Equals(v)     fails CompareFailed if value != v          (KeyNotFound if absent)
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CoordinationError;

/// One key as stored by the coordination service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Full key.
    pub key: String,
    /// Stored value.
    pub value: String,
    /// Index at which the key was created.
    pub created_index: u64,
    /// Index of the last modification.
    pub modified_index: u64,
    /// Remaining lease, if the key has one.
    pub ttl: Option<Duration>,
}

/// Precondition attached to a write or delete.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Guard {
    /// No precondition.
    #[default]
    None,
    /// The key must exist.
    MustExist,
    /// The key must not exist.
    MustNotExist,
    /// The key must currently be at this modification index.
    AtIndex(u64),
    /// The key must currently hold this value.
    Equals(String),
}

/// Read mode for [`Coordinator::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Watch {
    /// Return the current node immediately.
    #[default]
    No,
    /// Block until the key changes after this index (write, delete or expiry),
    /// then return its new state.
    After(u64),
}

/// Operations a phase runner may perform against the coordination service.
#[async_trait]
pub trait Coordinator: Send + Sync + 'static {
    /// Reads `key`, optionally waiting for its next change.
    ///
    /// Fails with [`CoordinationError::KeyNotFound`] if the key is absent
    /// (for a watch: absent once the change happened).
    async fn get(&self, key: &str, watch: Watch) -> Result<Node, CoordinationError>;

    /// Creates or replaces `key` if `guard` holds; `ttl` attaches a lease.
    async fn put(
        &self,
        key: &str,
        value: &str,
        guard: Guard,
        ttl: Option<Duration>,
    ) -> Result<Node, CoordinationError>;

    /// Deletes `key` if `guard` holds; returns the node as it was.
    async fn delete(&self, key: &str, guard: Guard) -> Result<Node, CoordinationError>;

    /// Extends the lease of an existing key without changing its value.
    ///
    /// Fails with [`CoordinationError::KeyNotFound`] if the key already expired.
    async fn refresh(&self, key: &str, ttl: Duration) -> Result<Node, CoordinationError>;
}

/// Shared handle to a coordinator.
pub type CoordinatorRef = Arc<dyn Coordinator>;
