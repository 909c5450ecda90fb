//! # Notices emitted by the membership context and its runners.
//!
//! The [`NoticeKind`] enum classifies what happened across four categories:
//! - **Machine**: phase entered by `init`, event applied, stale report dropped
//! - **Runner**: runner started, asked to stop, exited
//! - **Retry**: attempt failed, backoff scheduled, attempt abandoned
//! - **Shutdown / subscriber**: node shutdown progress, subscriber trouble
//!
//! The [`Notice`] struct carries the metadata for each kind.
//!
//! ## Ordering guarantees
//! Each notice has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use discovisor::{Notice, NoticeKind, State};
//!
//! let n = Notice::new(NoticeKind::BackoffScheduled)
//!     .with_runner("announce")
//!     .with_state(State::Announce)
//!     .with_attempt(3)
//!     .with_delay(Duration::from_millis(250));
//!
//! assert_eq!(n.kind, NoticeKind::BackoffScheduled);
//! assert_eq!(n.runner.as_deref(), Some("announce"));
//! assert_eq!(n.delay_ms, Some(250));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::machine::{Event, State};

/// Global sequence counter for notice ordering.
static NOTICE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    // === Machine ===
    /// Phase forced by `Context::init`.
    ///
    /// Sets: `from` (previous phase), `state` (entered phase).
    StateEntered,

    /// An event was applied by `Context::next` (including self-transitions).
    ///
    /// Sets: `from`, `event`, `state` (destination).
    Transitioned,

    /// A report from a superseded runner was discarded.
    ///
    /// Sets: `generation` (of the reporter), `event` (if any), `state` (current phase).
    StaleReportDropped,

    // === Runner ===
    /// A runner was built and submitted to the executor.
    ///
    /// Sets: `runner`, `generation`, `state`.
    RunnerStarted,

    /// The active runner was told to stop.
    ///
    /// Sets: `runner`, `generation`.
    RunnerStopRequested,

    /// A runner's `run` returned (or panicked; then `reason` is set).
    ///
    /// Sets: `runner`, `generation`, `state` (phase it was built for).
    RunnerExited,

    // === Retry ===
    /// One attempt against the coordination service failed.
    ///
    /// Sets: `runner`, `state`, `attempt`, `reason`.
    AttemptFailed,

    /// Next attempt scheduled after a failure.
    ///
    /// Sets: `runner`, `state`, `attempt`, `delay_ms`, `reason`.
    BackoffScheduled,

    /// A non-retryable failure ended the runner; its phase makes no further progress.
    ///
    /// Sets: `runner`, `state`, `reason`.
    AttemptAbandoned,

    // === Shutdown ===
    /// Node shutdown requested.
    ShutdownRequested,

    /// The stop phase finished within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded before the stop phase finished.
    GraceExceeded,

    // === Subscribers ===
    /// Subscriber panicked during notice processing.
    ///
    /// Sets: `runner` (subscriber name), `reason`.
    SubscriberPanicked,

    /// Subscriber dropped a notice (queue full or worker closed).
    ///
    /// Sets: `runner` (subscriber name), `reason`.
    SubscriberOverflow,
}

/// Observability record with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`NoticeKind`]
#[derive(Clone, Debug)]
pub struct Notice {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Notice classification.
    pub kind: NoticeKind,

    /// Current or destination phase.
    pub state: Option<State>,
    /// Previous phase.
    pub from: Option<State>,
    /// Machine event involved.
    pub event: Option<Event>,
    /// Runner (or subscriber) name.
    pub runner: Option<Arc<str>>,
    /// Runner generation.
    pub generation: Option<u64>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Backoff delay before next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Notice {
    /// Creates a new notice of the given kind with current timestamp and next sequence number.
    pub fn new(kind: NoticeKind) -> Self {
        Self {
            seq: NOTICE_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            state: None,
            from: None,
            event: None,
            runner: None,
            generation: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches the current/destination phase.
    #[inline]
    pub fn with_state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches the previous phase.
    #[inline]
    pub fn with_from(mut self, from: State) -> Self {
        self.from = Some(from);
        self
    }

    /// Attaches a machine event.
    #[inline]
    pub fn with_event(mut self, event: Event) -> Self {
        self.event = Some(event);
        self
    }

    /// Attaches a runner name.
    #[inline]
    pub fn with_runner(mut self, runner: impl Into<Arc<str>>) -> Self {
        self.runner = Some(runner.into());
        self
    }

    /// Attaches a runner generation.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow notice.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Notice::new(NoticeKind::SubscriberOverflow)
            .with_runner(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic notice.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Notice::new(NoticeKind::SubscriberPanicked)
            .with_runner(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, NoticeKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, NoticeKind::SubscriberPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Notice::new(NoticeKind::RunnerStarted);
        let b = Notice::new(NoticeKind::RunnerStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates_to_u32() {
        let n = Notice::new(NoticeKind::BackoffScheduled).with_delay(Duration::MAX);
        assert_eq!(n.delay_ms, Some(u32::MAX));
    }
}
