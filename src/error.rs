//! Error types used by discovisor.
//!
//! This module defines the error enums surfaced by the crate:
//!
//! - [`BackoffError`] — invalid pacing parameters or queries.
//! - [`CoordinationError`] — failures reported by a coordination service.
//! - [`ClusterIdError`] — failures resolving or establishing a cluster identifier.
//! - [`RuntimeError`] — errors raised while building, running or stopping a node.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! The membership [`Context`](crate::Context) itself never fails: runners translate
//! errors into machine events or retry them.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by backoff policies.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackoffError {
    /// Construction parameters violate `min >= 0`, `max >= min` or `steps >= 0`.
    #[error("invalid backoff configuration: {reason}")]
    InvalidConfiguration {
        /// Which constraint was violated.
        reason: String,
    },

    /// A query was made with a negative attempt index.
    #[error("invalid backoff argument: index {index} is negative")]
    InvalidArgument {
        /// The rejected index.
        index: i64,
    },
}

impl BackoffError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use discovisor::BackoffError;
    ///
    /// let err = BackoffError::InvalidArgument { index: -1 };
    /// assert_eq!(err.as_label(), "backoff_invalid_argument");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BackoffError::InvalidConfiguration { .. } => "backoff_invalid_configuration",
            BackoffError::InvalidArgument { .. } => "backoff_invalid_argument",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BackoffError::InvalidConfiguration { reason } => format!("configuration: {reason}"),
            BackoffError::InvalidArgument { index } => format!("negative index: {index}"),
        }
    }
}

/// # Errors reported by a coordination service.
///
/// These are the coordination-specific error codes a phase runner maps to
/// machine events. Only [`CoordinationError::Unavailable`] is worth retrying
/// as-is; the others describe the state of the store.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// The key does not exist (never created, deleted, or its lease expired).
    #[error("key not found: {key}")]
    KeyNotFound {
        /// The missing key.
        key: String,
    },

    /// A compare-and-set guard (index or value) did not match.
    #[error("compare failed on {key}: {reason}")]
    CompareFailed {
        /// The guarded key.
        key: String,
        /// What was compared.
        reason: String,
    },

    /// A `must not exist` guard hit an existing key.
    #[error("node already exists: {key}")]
    NodeExists {
        /// The existing key.
        key: String,
    },

    /// The service could not be reached or did not answer.
    #[error("coordination service unavailable: {reason}")]
    Unavailable {
        /// Transport-level detail.
        reason: String,
    },
}

impl CoordinationError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            CoordinationError::KeyNotFound { .. } => "coordination_key_not_found",
            CoordinationError::CompareFailed { .. } => "coordination_compare_failed",
            CoordinationError::NodeExists { .. } => "coordination_node_exists",
            CoordinationError::Unavailable { .. } => "coordination_unavailable",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CoordinationError::KeyNotFound { key } => format!("not found: {key}"),
            CoordinationError::CompareFailed { key, reason } => {
                format!("compare failed: {key} ({reason})")
            }
            CoordinationError::NodeExists { key } => format!("exists: {key}"),
            CoordinationError::Unavailable { reason } => format!("unavailable: {reason}"),
        }
    }

    /// Indicates whether repeating the same request may succeed.
    ///
    /// # Example
    /// ```
    /// use discovisor::CoordinationError;
    ///
    /// let down = CoordinationError::Unavailable { reason: "refused".into() };
    /// assert!(down.is_retryable());
    ///
    /// let gone = CoordinationError::KeyNotFound { key: "/a".into() };
    /// assert!(!gone.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoordinationError::Unavailable { .. })
    }

    /// True for [`CoordinationError::KeyNotFound`].
    #[inline]
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, CoordinationError::KeyNotFound { .. })
    }
}

/// # Errors produced by a cluster-identifier source.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterIdError {
    /// The source cannot provide or establish an identifier.
    #[error("cluster id source unsupported: {reason}")]
    Unsupported {
        /// Why the source is unusable.
        reason: String,
    },

    /// The backing coordination service failed.
    #[error("cluster id lookup failed: {0}")]
    Coordination(#[from] CoordinationError),
}

impl ClusterIdError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ClusterIdError::Unsupported { .. } => "cluster_id_unsupported",
            ClusterIdError::Coordination(e) => e.as_label(),
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ClusterIdError::Unsupported { reason } => format!("unsupported: {reason}"),
            ClusterIdError::Coordination(e) => e.as_message(),
        }
    }

    /// True if asking the source again may succeed.
    ///
    /// Coordination failures are retried; an unsupported source never recovers.
    ///
    /// # Example
    /// ```
    /// use discovisor::{ClusterIdError, CoordinationError};
    ///
    /// let down = ClusterIdError::from(CoordinationError::Unavailable { reason: "refused".into() });
    /// assert!(down.is_retryable());
    ///
    /// let unset = ClusterIdError::Unsupported { reason: "no id".into() };
    /// assert!(!unset.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClusterIdError::Coordination(_))
    }
}

/// # Errors produced by the node runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The stop phase did not finish within the grace period.
    #[error("shutdown timeout {grace:?} exceeded; stuck runner: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Name of the runner that was still active.
        stuck: Option<String>,
    },

    /// The node configuration was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] BackoffError),

    /// No tokio runtime was available to run the node on.
    #[error("no tokio runtime available")]
    NoExecutor,

    /// Installing the OS signal handlers failed.
    #[error("signal registration failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use discovisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: None };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::InvalidConfig(_) => "runtime_invalid_config",
            RuntimeError::NoExecutor => "runtime_no_executor",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck runner={stuck:?}")
            }
            RuntimeError::InvalidConfig(e) => e.as_message(),
            RuntimeError::NoExecutor => "no tokio runtime available".to_string(),
            RuntimeError::Signal(e) => format!("signal registration: {e}"),
        }
    }
}
