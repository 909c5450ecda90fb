//! # LogWriter — notices rendered through `tracing`
//!
//! A minimal subscriber that turns incoming [`Notice`]s into `tracing` records.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output
//! ```text
//! INFO  discovisor: entered state=get_cluster from=get_cluster
//! INFO  discovisor: transition from=get_cluster event=cluster_defined to=announce
//! INFO  discovisor: runner started runner="announce" generation=2 state=announce
//! WARN  discovisor: attempt failed runner="announce" attempt=1 err="unavailable: refused"
//! INFO  discovisor: backoff runner="announce" delay_ms=100 attempt=1
//! DEBUG discovisor: stale report dropped generation=1 event=announced
//! ```

use crate::events::{Notice, NoticeKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Notice writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_notice(&self, n: &Notice) {
        let state = n.state.map(|s| s.as_label()).unwrap_or("-");
        let from = n.from.map(|s| s.as_label()).unwrap_or("-");
        let event = n.event.map(|e| e.as_label()).unwrap_or("-");
        let runner = n.runner.as_deref().unwrap_or("-");
        let reason = n.reason.as_deref().unwrap_or("-");

        match n.kind {
            NoticeKind::StateEntered => {
                tracing::info!(state, from, "entered");
            }
            NoticeKind::Transitioned => {
                tracing::info!(from, event, to = state, "transition");
            }
            NoticeKind::StaleReportDropped => {
                tracing::debug!(generation = ?n.generation, event, state, "stale report dropped");
            }
            NoticeKind::RunnerStarted => {
                tracing::info!(runner, generation = ?n.generation, state, "runner started");
            }
            NoticeKind::RunnerStopRequested => {
                tracing::info!(runner, generation = ?n.generation, "runner stop requested");
            }
            NoticeKind::RunnerExited => {
                tracing::info!(runner, generation = ?n.generation, state, reason, "runner exited");
            }
            NoticeKind::AttemptFailed => {
                tracing::warn!(runner, state, attempt = ?n.attempt, err = reason, "attempt failed");
            }
            NoticeKind::BackoffScheduled => {
                tracing::info!(runner, delay_ms = ?n.delay_ms, attempt = ?n.attempt, "backoff");
            }
            NoticeKind::AttemptAbandoned => {
                tracing::error!(runner, state, err = reason, "attempt abandoned");
            }
            NoticeKind::ShutdownRequested => {
                tracing::info!("shutdown requested");
            }
            NoticeKind::AllStoppedWithin => {
                tracing::info!("stopped within grace");
            }
            NoticeKind::GraceExceeded => {
                tracing::warn!("grace exceeded");
            }
            NoticeKind::SubscriberOverflow => {
                tracing::warn!(subscriber = runner, reason, "subscriber overflow");
            }
            NoticeKind::SubscriberPanicked => {
                tracing::warn!(subscriber = runner, info = reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
