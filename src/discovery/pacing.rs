//! # Retry pacing shared by the phase runners.
//!
//! [`Pacer`] couples a [`Backoff`] with a [`JitterPolicy`] and the runner's
//! [`RunScope`]: every failed attempt is published, the next delay is taken from
//! the backoff cursor, jittered, capped at [`Backoff::max`], and slept in a way
//! that a stop request interrupts.
//!
//! ```text
//! attempt fails ──► AttemptFailed ──► delay = min(jitter(backoff.increment()), backoff.max())
//!                                   └► BackoffScheduled ──► scope.sleep(delay) ──► retry / stopped
//! ```

use crate::core::RunScope;
use crate::events::{Notice, NoticeKind};
use crate::policies::{Backoff, JitterPolicy};

/// Paces retries of one runner.
pub(crate) struct Pacer {
    backoff: Box<dyn Backoff>,
    jitter: JitterPolicy,
    attempt: u32,
}

impl Pacer {
    pub(crate) fn new(backoff: impl Backoff + 'static, jitter: JitterPolicy) -> Self {
        Self {
            backoff: Box::new(backoff),
            jitter,
            attempt: 0,
        }
    }

    /// Records a failed attempt and sleeps the paced delay.
    ///
    /// Returns `false` if the runner was stopped while waiting.
    pub(crate) async fn retry(&mut self, scope: &RunScope, reason: &str) -> bool {
        self.attempt = self.attempt.saturating_add(1);
        scope.publish(
            Notice::new(NoticeKind::AttemptFailed)
                .with_attempt(self.attempt)
                .with_reason(reason),
        );

        let delay = self
            .jitter
            .apply(self.backoff.increment())
            .min(self.backoff.max());
        scope.publish(
            Notice::new(NoticeKind::BackoffScheduled)
                .with_attempt(self.attempt)
                .with_delay(delay)
                .with_reason(reason),
        );
        scope.sleep(delay).await
    }

    /// Forgets past failures after a success.
    pub(crate) fn reset(&mut self) {
        self.backoff.reset();
        self.attempt = 0;
    }

    #[cfg(test)]
    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Publishes a failure that retrying cannot fix.
pub(crate) fn abandon(scope: &RunScope, reason: &str) {
    tracing::error!(runner = scope.runner(), state = scope.state().as_label(), reason, "giving up");
    scope.publish(Notice::new(NoticeKind::AttemptAbandoned).with_reason(reason));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runner::Envelope;
    use crate::events::Bus;
    use crate::machine::State;
    use crate::policies::SquareBackoff;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn scope(bus: &Bus, token: CancellationToken) -> (RunScope, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scope = RunScope::new(1, State::Announce, Arc::from("test"), token, tx, bus.clone());
        (scope, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_follow_backoff() {
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let (scope, _reports) = scope(&bus, CancellationToken::new());
        let mut pacer = Pacer::new(
            SquareBackoff::from_millis(10, 60, 5).unwrap(),
            JitterPolicy::None,
        );

        let mut delays = Vec::new();
        for _ in 0..7 {
            assert!(pacer.retry(&scope, "down").await);
        }
        while let Ok(n) = rx.try_recv() {
            if n.kind == NoticeKind::BackoffScheduled {
                delays.push(n.delay_ms.unwrap());
                assert_eq!(n.runner.as_deref(), Some("test"));
            }
        }
        assert_eq!(delays, vec![10, 12, 18, 28, 42, 60, 60]);
        assert_eq!(pacer.attempt(), 7);

        pacer.reset();
        assert_eq!(pacer.attempt(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_never_exceeds_max() {
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let (scope, _reports) = scope(&bus, CancellationToken::new());
        let mut pacer = Pacer::new(
            SquareBackoff::from_millis(100, 400, 2).unwrap(),
            JitterPolicy::Full,
        );
        for _ in 0..20 {
            pacer.retry(&scope, "down").await;
        }
        while let Ok(n) = rx.try_recv() {
            if let Some(ms) = n.delay_ms {
                assert!(ms <= 400);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_sleep() {
        let bus = Bus::default();
        let token = CancellationToken::new();
        let (scope, _reports) = scope(&bus, token.clone());
        let mut pacer = Pacer::new(
            SquareBackoff::new(Duration::from_secs(3600), Duration::from_secs(3600), 1).unwrap(),
            JitterPolicy::None,
        );

        token.cancel();
        assert!(!pacer.retry(&scope, "down").await);
    }

    #[tokio::test]
    async fn test_abandon_publishes_terminal_notice() {
        let bus = Bus::default();
        let mut rx = bus.subscribe();
        let (scope, _reports) = scope(&bus, CancellationToken::new());

        abandon(&scope, "unsupported: no id");
        let n = rx.try_recv().unwrap();
        assert_eq!(n.kind, NoticeKind::AttemptAbandoned);
        assert_eq!(n.runner.as_deref(), Some("test"));
        assert_eq!(n.reason.as_deref(), Some("unsupported: no id"));
        assert!(rx.try_recv().is_err());
    }
}
