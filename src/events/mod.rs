//! Notices: types and broadcast bus.
//!
//! This module groups the observability **data model** and the **bus** used to
//! publish/subscribe to notices emitted by the context, runners and node.
//!
//! ## Contents
//! - [`NoticeKind`], [`Notice`] classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Context` (transitions, runner swaps, stale reports),
//!   `RunScope` (attempt failures, backoff), `Node` (shutdown), `SubscriberSet`.
//! - **Consumers**: the node listener (fans out to `SubscriberSet`) and anyone
//!   holding a receiver from [`Bus::subscribe`].

mod bus;
mod notice;

pub use bus::Bus;
pub use notice::{Notice, NoticeKind};
