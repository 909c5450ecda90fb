//! # Context: the membership supervisor.
//!
//! [`Context`] owns the current [`State`] and at most one active [`Runner`]. It
//! applies events through the [transition table](crate::transition) and decides,
//! per table entry, whether the active runner is kept or replaced.
//!
//! ## Architecture
//! ```text
//!                 driver / watchdog                 active runner
//!                        │                                │
//!                 next(event) / init(state)       scope.report(event)
//!                        │                                │
//!                        │                       report channel (mpsc)
//!                        │                                │
//!                        │                          listener task
//!                        │                    generation == active ?
//!                        │                       │yes            │no
//!                        ▼                       ▼               ▼
//!                ┌─────────────────────────────────────┐  StaleReportDropped
//!                │ critical section (one Mutex)        │
//!                │  state  ← transition(state, event)  │
//!                │  Fresh? old.stop(); build; spawn    │
//!                └─────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - `init` and `next` are serialized; at most one runner is active.
//! - The state is stored **before** the factory builds the new runner, so the
//!   factory and the runner observe the new phase.
//! - Replacing a runner cancels its token and does not wait for it.
//! - Reports carry the reporter's generation; only the active generation is applied.
//! - The context performs no I/O and never fails.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::runner::{Envelope, Report, RunScope, RunnerFactory};
use crate::events::{Bus, Notice, NoticeKind};
use crate::machine::{transition, Event, State};

/// Context-side handle to the active runner.
struct ActiveRunner {
    name: Arc<str>,
    generation: u64,
    token: CancellationToken,
}

impl ActiveRunner {
    /// Requests cooperative cancellation; never blocks.
    fn stop(&self) {
        self.token.cancel();
    }
}

/// Supervisor of the membership state machine.
pub struct Context {
    state: AtomicU8,
    generation: AtomicU64,
    active: Mutex<Option<ActiveRunner>>,
    factory: Arc<dyn RunnerFactory>,
    executor: Handle,
    reports: mpsc::UnboundedSender<Envelope>,
    bus: Bus,
}

impl Context {
    /// Creates a context in `initial` with no active runner.
    ///
    /// Runners are spawned on `executor`. Notices go to a private bus; use
    /// [`Context::with_bus`] to share one.
    pub fn new(initial: State, factory: Arc<dyn RunnerFactory>, executor: Handle) -> Arc<Self> {
        Self::with_bus(initial, factory, executor, Bus::default())
    }

    /// Creates a context publishing notices to `bus`.
    pub fn with_bus(
        initial: State,
        factory: Arc<dyn RunnerFactory>,
        executor: Handle,
        bus: Bus,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = Arc::new(Self {
            state: AtomicU8::new(initial.as_u8()),
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
            factory,
            executor,
            reports: tx,
            bus,
        });
        Self::spawn_listener(Arc::downgrade(&ctx), &ctx.executor, rx);
        ctx
    }

    /// Current phase.
    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True if the current phase is `state`.
    pub fn is(&self, state: State) -> bool {
        self.state() == state
    }

    /// True if the current phase is one of `states` (false for an empty slice).
    pub fn is_any(&self, states: &[State]) -> bool {
        let current = self.state();
        states.iter().any(|s| *s == current)
    }

    /// Force-enters `state`, bypassing the transition table.
    ///
    /// Stops any active runner and starts exactly one new runner for `state`.
    pub fn init(&self, state: State) {
        let mut active = self.active.lock();
        self.enter(&mut active, state);
    }

    /// Applies `event` and returns the resulting phase.
    ///
    /// The active runner is replaced only when the table entry asks for a
    /// fresh worker; every other event leaves it untouched.
    pub fn next(&self, event: Event) -> State {
        let mut active = self.active.lock();
        self.apply(&mut active, event)
    }

    /// Name of the active runner, if any.
    pub fn active_runner(&self) -> Option<String> {
        self.active.lock().as_ref().map(|r| r.name.to_string())
    }

    /// Generation of the active runner, if any.
    pub fn active_generation(&self) -> Option<u64> {
        self.active.lock().as_ref().map(|r| r.generation)
    }

    /// Total number of runners this context has started.
    pub fn runners_spawned(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Bus this context publishes to.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    fn enter(&self, active: &mut Option<ActiveRunner>, state: State) {
        let from = State::from_u8(self.state.swap(state.as_u8(), Ordering::AcqRel));
        self.bus.publish(
            Notice::new(NoticeKind::StateEntered)
                .with_from(from)
                .with_state(state),
        );
        self.replace_runner(active, state);
    }

    fn apply(&self, active: &mut Option<ActiveRunner>, event: Event) -> State {
        let t = transition(self.state(), event);
        self.state.store(t.to.as_u8(), Ordering::Release);
        self.bus.publish(
            Notice::new(NoticeKind::Transitioned)
                .with_from(t.from)
                .with_event(event)
                .with_state(t.to),
        );
        if t.needs_fresh_worker() {
            self.replace_runner(active, t.to);
        }
        t.to
    }

    fn replace_runner(&self, active: &mut Option<ActiveRunner>, state: State) {
        if let Some(old) = active.take() {
            old.stop();
            self.bus.publish(
                Notice::new(NoticeKind::RunnerStopRequested)
                    .with_runner(Arc::clone(&old.name))
                    .with_generation(old.generation),
            );
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let runner = self.factory.build(self);
        let name: Arc<str> = Arc::from(runner.name());
        let token = CancellationToken::new();
        let scope = RunScope::new(
            generation,
            state,
            Arc::clone(&name),
            token.clone(),
            self.reports.clone(),
            self.bus.clone(),
        );

        self.bus.publish(
            Notice::new(NoticeKind::RunnerStarted)
                .with_runner(Arc::clone(&name))
                .with_generation(generation)
                .with_state(state),
        );

        let bus = self.bus.clone();
        let exit_name = Arc::clone(&name);
        self.executor.spawn(async move {
            let outcome = AssertUnwindSafe(runner.run(scope)).catch_unwind().await;
            let mut notice = Notice::new(NoticeKind::RunnerExited)
                .with_runner(exit_name)
                .with_generation(generation)
                .with_state(state);
            if outcome.is_err() {
                tracing::warn!(generation, state = state.as_label(), "runner panicked");
                notice = notice.with_reason("runner_panic");
            }
            bus.publish(notice);
        });

        *active = Some(ActiveRunner {
            name,
            generation,
            token,
        });
    }

    /// Applies a runner report if it comes from the active generation.
    fn deliver(&self, envelope: Envelope) {
        let mut active = self.active.lock();
        let current = active.as_ref().map(|r| r.generation);
        if current != Some(envelope.generation) {
            let mut notice = Notice::new(NoticeKind::StaleReportDropped)
                .with_generation(envelope.generation)
                .with_state(self.state());
            if let Report::Event(event) = envelope.report {
                notice = notice.with_event(event);
            }
            self.bus.publish(notice);
            return;
        }

        match envelope.report {
            Report::Event(event) => {
                self.apply(&mut active, event);
            }
            Report::Reenter(state) => self.enter(&mut active, state),
        }
    }

    fn spawn_listener(
        ctx: Weak<Context>,
        executor: &Handle,
        mut rx: mpsc::UnboundedReceiver<Envelope>,
    ) {
        executor.spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let Some(ctx) = ctx.upgrade() else { break };
                ctx.deliver(envelope);
            }
        });
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.stop();
        }
    }
}
