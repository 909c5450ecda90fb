//! Coordination-service capability and an in-memory implementation.
//!
//! ## Contents
//! - [`Coordinator`] guarded get/put/delete/refresh with watch reads
//! - [`Node`], [`Guard`], [`Watch`] request and response types
//! - [`MemoryStore`] in-process store with TTL leases and watches

mod coordinator;
mod memory;

pub use coordinator::{Coordinator, CoordinatorRef, Guard, Node, Watch};
pub use memory::MemoryStore;
