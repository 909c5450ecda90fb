//! # Transition table.
//!
//! [`transition`] is a pure, total function over every `(State, Event)` pair.
//! Each explicit entry names its destination **and** its [`WorkerPolicy`];
//! every other pair is a self-transition that keeps the active runner.
//!
//! ```text
//! GetCluster ──ClusterDefined──────────────────► Announce        (fresh)
//! GetCluster ──ClusterUndefined────────────────► CreateCluster   (fresh)
//! Announce   ──Announced───────────────────────► Running         (keep)
//! Announce   ──Stopped─────────────────────────► Stop            (fresh)
//! Running    ──AnnounceRefreshFailedWithNoKey──► Announce        (fresh)
//! Stop       ──Reset───────────────────────────► Stop            (keep)
//! *          ──*───────────────────────────────► *               (keep)
//! ```
//!
//! Running keeps Announce's runner: the worker that wrote the announcement is
//! the one refreshing its lease.

use super::state::{Event, State};

/// Whether applying a transition replaces the active runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPolicy {
    /// Stop the active runner and start a new one for the destination phase.
    Fresh,
    /// Leave the active runner in place.
    Keep,
}

/// Result of looking up one `(State, Event)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Phase the machine was in.
    pub from: State,
    /// Event applied.
    pub event: Event,
    /// Phase the machine ends up in.
    pub to: State,
    /// What happens to the active runner.
    pub worker: WorkerPolicy,
}

impl Transition {
    /// True if `to != from`.
    #[inline]
    pub fn changes_state(&self) -> bool {
        self.from != self.to
    }

    /// True if the active runner must be replaced.
    #[inline]
    pub fn needs_fresh_worker(&self) -> bool {
        self.worker == WorkerPolicy::Fresh
    }
}

/// Looks up the transition for `(state, event)`.
pub fn transition(state: State, event: Event) -> Transition {
    use Event as E;
    use State as S;
    use WorkerPolicy::{Fresh, Keep};

    let (to, worker) = match (state, event) {
        (S::GetCluster, E::ClusterDefined) => (S::Announce, Fresh),
        (S::GetCluster, E::ClusterUndefined) => (S::CreateCluster, Fresh),
        (S::Announce, E::Announced) => (S::Running, Keep),
        (S::Announce, E::Stopped) => (S::Stop, Fresh),
        (S::Running, E::AnnounceRefreshFailedWithNoKey) => (S::Announce, Fresh),
        (S::Stop, E::Reset) => (S::Stop, Keep),
        (same, _) => (same, Keep),
    };

    Transition {
        from: state,
        event,
        to,
        worker,
    }
}

/// Destination phase for `(state, event)`.
///
/// # Example
/// ```
/// use discovisor::{next, Event, State};
///
/// assert_eq!(next(State::GetCluster, Event::ClusterDefined), State::Announce);
/// assert_eq!(next(State::GetCluster, Event::Announced), State::GetCluster);
/// ```
#[inline]
pub fn next(state: State, event: Event) -> State {
    transition(state, event).to
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPLICIT: [(State, Event, State); 6] = [
        (State::GetCluster, Event::ClusterDefined, State::Announce),
        (State::GetCluster, Event::ClusterUndefined, State::CreateCluster),
        (State::Announce, Event::Announced, State::Running),
        (State::Announce, Event::Stopped, State::Stop),
        (State::Running, Event::AnnounceRefreshFailedWithNoKey, State::Announce),
        (State::Stop, Event::Reset, State::Stop),
    ];

    #[test]
    fn test_explicit_entries() {
        for (from, event, to) in EXPLICIT {
            assert_eq!(next(from, event), to, "{from} + {event}");
        }
    }

    #[test]
    fn test_everything_else_is_a_self_transition() {
        for state in State::ALL {
            for event in Event::ALL {
                if EXPLICIT.iter().any(|(f, e, _)| *f == state && *e == event) {
                    continue;
                }
                let t = transition(state, event);
                assert_eq!(t.to, state, "{state} + {event}");
                assert_eq!(t.worker, WorkerPolicy::Keep, "{state} + {event}");
            }
        }
    }

    #[test]
    fn test_stop_is_absorbing() {
        for event in Event::ALL {
            assert_eq!(next(State::Stop, event), State::Stop);
        }
    }

    #[test]
    fn test_worker_policy_per_entry() {
        assert!(transition(State::GetCluster, Event::ClusterDefined).needs_fresh_worker());
        assert!(transition(State::GetCluster, Event::ClusterUndefined).needs_fresh_worker());
        assert!(transition(State::Announce, Event::Stopped).needs_fresh_worker());
        assert!(
            transition(State::Running, Event::AnnounceRefreshFailedWithNoKey).needs_fresh_worker()
        );

        let running = transition(State::Announce, Event::Announced);
        assert!(running.changes_state());
        assert!(!running.needs_fresh_worker());

        let reset = transition(State::Stop, Event::Reset);
        assert!(!reset.changes_state());
        assert!(!reset.needs_fresh_worker());
    }

    #[test]
    fn test_callable_from_many_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..1000)
                        .map(|_| next(State::GetCluster, Event::ClusterDefined))
                        .all(|s| s == State::Announce)
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
    }
}
