//! Membership state machine: phases, events and the transition table.
//!
//! ## Contents
//! - [`State`], [`Event`] closed enums
//! - [`transition`] / [`next`] pure, total lookup
//! - [`Transition`], [`WorkerPolicy`] per-entry result, including whether the
//!   active runner is replaced

mod state;
mod transition;

pub use state::{Event, State};
pub use transition::{next, transition, Transition, WorkerPolicy};
