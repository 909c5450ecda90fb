//! Retry pacing policies.
//!
//! This module groups the knobs that control **how long** a phase runner waits
//! between attempts against the coordination service.
//!
//! ## Contents
//! - [`Backoff`] the pacing capability (value / increment / reset / max)
//! - [`ConstantBackoff`] fixed interval, used for lease renewal
//! - [`SquareBackoff`] quadratic ramp `min → max` over `steps`, used for retries
//! - [`JitterPolicy`] randomization applied on top of a backoff value
//!
//! ## Quick wiring
//! ```text
//! Config { retry_min, retry_max, retry_steps, refresh_interval, jitter }
//!      └─► discovery runners use:
//!           - Config::retry_backoff()   between failed attempts
//!           - Config::refresh_backoff() between lease refreshes
//!           - jitter.apply(delay).min(backoff.max()) as the actual sleep
//! ```

mod backoff;
mod jitter;

pub use backoff::{Backoff, ConstantBackoff, SquareBackoff};
pub use jitter::JitterPolicy;
