//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom notice handlers into
//! a node. Each subscriber is driven by a dedicated worker loop fed by a bounded
//! queue owned by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching); they do **not** block the
//!   context, its runners, or other subscribers.
//! - Each subscriber declares its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. On overflow, notices for that subscriber are
//!   **dropped**.
//!
//! ## Example
//! ```rust
//! use discovisor::{Notice, NoticeKind, Subscribe};
//!
//! struct Flaps;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for Flaps {
//!     async fn on_notice(&self, notice: &Notice) {
//!         if notice.kind == NoticeKind::Transitioned {
//!             // count ANNOUNCE/RUNNING oscillation...
//!         }
//!     }
//!     fn name(&self) -> &'static str { "flaps" }
//! }
//! ```

use crate::events::Notice;
use async_trait::async_trait;

/// Contract for notice subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single notice.
    async fn on_notice(&self, notice: &Notice);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
