//! # discovisor
//!
//! **Discovisor** drives a node through cluster discovery and membership
//! against a coordination service (a hierarchical key/value store with TTL
//! leases, guarded writes and watches).
//!
//! A node learns (or establishes) the cluster identifier, announces itself
//! under a leased key, keeps that lease alive, re-announces when it is lost and
//! withdraws the announcement on shutdown. The lifecycle is a small table-driven
//! state machine; each phase's I/O runs in a background runner that reports
//! outcomes back as machine events.
//!
//! ## Architecture
//! ### Overview
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Node (driver)                                                   │
//! │  - Bus (broadcast notices)                                       │
//! │  - SubscriberSet (fans out to user subscribers)                  │
//! │  - Context (current phase + at most one active runner)           │
//! └───────┬────────────────────────────────────────────────┬─────────┘
//!         │ factory.build(&ctx)                            │ publish
//!         ▼                                                ▼
//!   ┌──────────────┐  report(Event)  ┌───────────┐   ┌───────────┐
//!   │ phase runner │ ──────────────► │  Context  │   │    Bus    │──► subscribers
//!   │ (one active) │                 │ listener  │   └───────────┘
//!   └──────┬───────┘                 └───────────┘
//!          │ get / put / delete / refresh (guarded, TTL, watch)
//!          ▼
//!   ┌──────────────────────┐
//!   │ Coordinator          │  MemoryStore or a real service client
//!   └──────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//!                ClusterUndefined            (re-enter GetCluster)
//!  GetCluster ─────────────────────► CreateCluster ─────────┐
//!     ▲  │ ClusterDefined                                   │
//!     │  ▼                                                  │
//!     └──────────────────────────────────────────────────────┘
//!        Announce ──Announced──► Running
//!           ▲                       │ AnnounceRefreshFailedWithNoKey
//!           └───────────────────────┘
//!        Announce ──Stopped──► Stop ◄── Node::shutdown (forced from any phase)
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                       |
//! |-------------------|----------------------------------------------------------|------------------------------------------|
//! | **Machine**       | Phases, events, the transition table.                    | [`State`], [`Event`], [`transition`]     |
//! | **Supervision**   | Apply events, swap runners, drop stale reports.          | [`Context`], [`Runner`], [`RunScope`]    |
//! | **Driver**        | Start discovery, graceful withdrawal on shutdown.        | [`Node`], [`NodeBuilder`]                |
//! | **Pacing**        | Square/constant backoff with optional jitter.            | [`Backoff`], [`SquareBackoff`]           |
//! | **Coordination**  | Store contract plus an in-process implementation.        | [`Coordinator`], [`MemoryStore`]         |
//! | **Cluster id**    | Where the cluster identifier comes from.                 | [`ClusterIdSource`], [`StoredClusterId`] |
//! | **Subscriber API**| Hook into notices (logging, metrics, custom).            | [`Subscribe`], [`Notice`]                |
//! | **Configuration** | Keys, lease timing, retry pacing, grace.                 | [`Config`]                               |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] that renders notices through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use discovisor::{Config, MemoryStore, Node, StaticClusterId};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::for_node("node-1", "10.0.0.1:7000");
//!     cfg.prefix = "/demo".to_string();
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn discovisor::Subscribe>> = vec![Arc::new(discovisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn discovisor::Subscribe>> = Vec::new();
//!
//!     let node = Node::builder(cfg)
//!         .with_coordinator(Arc::new(MemoryStore::new()))
//!         .with_cluster_id(Arc::new(StaticClusterId::new("c1")))
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     node.start();
//!     // ... serve traffic; `node.run_until_signal()` does start + wait + shutdown.
//!     node.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod cluster;
pub mod coordination;
mod core;
mod discovery;
mod error;
mod events;
mod machine;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use cluster::{ClusterIdRef, ClusterIdSource, StaticClusterId, StoredClusterId};
pub use coordination::{Coordinator, CoordinatorRef, Guard, MemoryStore, Watch};
pub use core::{
    wait_for_shutdown_signal, Config, Context, Node, NodeBuilder, RunScope, Runner,
    RunnerFactory, RunnerFn, RunnerRef,
};
pub use discovery::DiscoveryFactory;
pub use error::{BackoffError, ClusterIdError, CoordinationError, RuntimeError};
pub use events::{Bus, Notice, NoticeKind};
pub use machine::{next, transition, Event, State, Transition, WorkerPolicy};
pub use policies::{Backoff, ConstantBackoff, JitterPolicy, SquareBackoff};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
