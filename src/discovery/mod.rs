//! Phase runners that drive membership against the coordination service.
//!
//! ## Contents
//! - [`DiscoveryFactory`] maps each phase to its runner
//! - `get_cluster` learns the cluster id
//! - `create_cluster` establishes it
//! - `announce` publishes the node and holds its lease
//! - `stop` withdraws the announcement

mod announce;
mod create_cluster;
mod factory;
mod get_cluster;
mod pacing;
mod stop;

pub use factory::DiscoveryFactory;
