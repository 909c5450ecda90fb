//! # Runner contract: one unit of background work per phase.
//!
//! A [`Runner`] executes the work of one lifecycle phase (discover the cluster,
//! create it, announce, clear the announcement) against the coordination
//! service. It is built by a [`RunnerFactory`] when the [`Context`] decides the
//! phase needs a fresh worker, and is handed a [`RunScope`] that binds it to
//! that decision:
//!
//! - [`RunScope::report`] delivers an [`Event`] back to the context;
//! - [`RunScope::token`] / [`RunScope::is_stopped`] observe the stop request;
//! - [`RunScope::sleep`] / [`RunScope::until_stopped`] make waits cancellable.
//!
//! ## Flow
//! ```text
//! Context::next(event) ──► factory.build(&ctx) ──► executor.spawn(runner.run(scope))
//!                                                            │
//!        ┌───────────────────────────────────────────────────┘
//!        ▼
//!   scope.report(Event) ──► report channel ──► Context listener
//!                                                 ├─ generation == active → apply
//!                                                 └─ otherwise            → drop (stale)
//! ```
//!
//! ## Rules
//! - `stop` is cooperative: the context cancels the scope's token and never
//!   waits for `run` to return.
//! - Runners should check cancellation at every coordination round trip.
//! - Reports from a runner that is no longer the active one are discarded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::context::Context;
use crate::events::{Bus, Notice};
use crate::machine::{Event, State};

/// What a runner asks of the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Report {
    /// Apply an event through the transition table.
    Event(Event),
    /// Force-enter a phase (same effect as `Context::init`).
    Reenter(State),
}

/// A report tagged with the generation of the runner that sent it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Envelope {
    pub(crate) generation: u64,
    pub(crate) report: Report,
}

/// # Background work for one lifecycle phase.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use discovisor::{Event, RunScope, Runner};
///
/// struct AlwaysDefined;
///
/// #[async_trait]
/// impl Runner for AlwaysDefined {
///     fn name(&self) -> &str { "always-defined" }
///
///     async fn run(&self, scope: RunScope) {
///         if scope.is_stopped() {
///             return;
///         }
///         scope.report(Event::ClusterDefined);
///     }
/// }
/// ```
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Returns a stable, human-readable runner name.
    fn name(&self) -> &str;

    /// Performs the phase's work until it completes, fails terminally or is stopped.
    ///
    /// Outcomes are delivered through [`RunScope::report`]; there is no error channel.
    async fn run(&self, scope: RunScope);
}

/// Shared handle to a runner.
pub type RunnerRef = Arc<dyn Runner>;

/// Builds the runner for the context's current phase.
///
/// Called while the context holds its transition lock: implementations may read
/// [`Context::state`] / [`Context::is`], but must not call `init` or `next`.
///
/// Any `Fn(&Context) -> RunnerRef` closure is a factory.
pub trait RunnerFactory: Send + Sync + 'static {
    /// Builds a runner bound to `context`'s current phase.
    fn build(&self, context: &Context) -> RunnerRef;
}

impl<F> RunnerFactory for F
where
    F: Fn(&Context) -> RunnerRef + Send + Sync + 'static,
{
    fn build(&self, context: &Context) -> RunnerRef {
        self(context)
    }
}

/// Binding between one running [`Runner`] and the context that started it.
#[derive(Clone)]
pub struct RunScope {
    generation: u64,
    state: State,
    runner: Arc<str>,
    token: CancellationToken,
    reports: mpsc::UnboundedSender<Envelope>,
    bus: Bus,
}

impl RunScope {
    pub(crate) fn new(
        generation: u64,
        state: State,
        runner: Arc<str>,
        token: CancellationToken,
        reports: mpsc::UnboundedSender<Envelope>,
        bus: Bus,
    ) -> Self {
        Self {
            generation,
            state,
            runner,
            token,
            reports,
            bus,
        }
    }

    /// Generation of this runner (monotonic per context).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Phase this runner was built for.
    pub fn state(&self) -> State {
        self.state
    }

    /// Name of this runner.
    pub fn runner(&self) -> &str {
        &self.runner
    }

    /// Cancellation token cancelled when the context stops this runner.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once the context asked this runner to stop.
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the context asks this runner to stop.
    pub async fn stopped(&self) {
        self.token.cancelled().await
    }

    /// Delivers `event` to the context.
    ///
    /// Returns `false` if the context is gone. Delivery does not mean the event
    /// is applied: the context drops it if this runner has been superseded.
    pub fn report(&self, event: Event) -> bool {
        self.send(Report::Event(event))
    }

    /// Asks the context to force-enter `state`, as `Context::init` does.
    ///
    /// Guarded like [`RunScope::report`].
    pub fn reenter(&self, state: State) -> bool {
        self.send(Report::Reenter(state))
    }

    /// Sleeps for `delay`; returns `false` if stopped first.
    pub async fn sleep(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.token.cancelled() => false,
        }
    }

    /// Runs `fut` unless stopped first; returns `None` if stopped.
    pub async fn until_stopped<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            out = fut => Some(out),
            _ = self.token.cancelled() => None,
        }
    }

    /// Publishes `notice` tagged with this runner's name, generation and phase.
    pub fn publish(&self, notice: Notice) {
        self.bus.publish(
            notice
                .with_runner(Arc::clone(&self.runner))
                .with_generation(self.generation)
                .with_state(self.state),
        );
    }

    /// Bus the context publishes to.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    fn send(&self, report: Report) -> bool {
        self.reports
            .send(Envelope {
                generation: self.generation,
                report,
            })
            .is_ok()
    }
}
