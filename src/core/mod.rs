//! Runtime core: the membership context and the node driver.
//!
//! Public pieces:
//! - [`Context`]: current phase, transition application, runner lifecycle;
//! - [`Runner`] / [`RunnerFactory`] / [`RunScope`]: the per-phase worker contract;
//! - [`RunnerFn`]: closure-backed runner;
//! - [`Node`] / [`NodeBuilder`]: wires the context to discovery and subscribers;
//! - [`Config`]: node settings.
//!
//! Internal modules:
//! - [`shutdown`]: cross-platform termination signal handling.

mod builder;
mod config;
mod context;
mod node;
pub(crate) mod runner;
mod runner_fn;
mod shutdown;

pub use builder::NodeBuilder;
pub use config::Config;
pub use context::Context;
pub use node::Node;
pub use runner::{RunScope, Runner, RunnerFactory, RunnerRef};
pub use runner_fn::RunnerFn;
pub use shutdown::wait_for_shutdown_signal;
