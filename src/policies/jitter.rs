//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that nodes losing the
//! coordination service at the same moment do not hammer it in lockstep when it
//! comes back.
//!
//! - [`JitterPolicy::None`] — no randomization, predictable delays
//! - [`JitterPolicy::Full`] — random delay in [0, backoff_delay]
//! - [`JitterPolicy::Equal`] — delay = backoff_delay/2 + random[0, backoff_delay/2]
//!
//! Jitter only ever shortens a delay, so a jittered value stays below the
//! policy's [`Backoff::max`](crate::Backoff::max).

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of retry delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use the exact backoff delay.
    #[default]
    None,

    /// Full jitter: random delay in [0, backoff_delay].
    Full,

    /// Equal jitter: delay = backoff_delay/2 + random[0, backoff_delay/2].
    ///
    /// Preserves ~75% of the original delay on average.
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => full_jitter(delay),
            JitterPolicy::Equal => equal_jitter(delay),
        }
    }
}

/// Delay in nanoseconds, saturating at `u64::MAX` (about 584 years).
fn nanos(delay: Duration) -> u64 {
    u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX)
}

/// Full jitter: random[0, delay]
fn full_jitter(delay: Duration) -> Duration {
    let ns = nanos(delay);
    if ns == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::rng().random_range(0..=ns))
}

/// Equal jitter: delay/2 + random[0, delay/2]
fn equal_jitter(delay: Duration) -> Duration {
    let ns = nanos(delay);
    let half = ns / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::rng().random_range(0..=half)
    };
    Duration::from_nanos(half + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_identity() {
        let d = Duration::from_millis(1234);
        assert_eq!(JitterPolicy::None.apply(d), d);
    }

    #[test]
    fn test_full_jitter_bounds() {
        let d = Duration::from_millis(1000);
        for _ in 0..200 {
            assert!(JitterPolicy::Full.apply(d) <= d);
        }
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_equal_jitter_bounds() {
        let d = Duration::from_millis(1000);
        for _ in 0..200 {
            let v = JitterPolicy::Equal.apply(d);
            assert!(v >= Duration::from_millis(500));
            assert!(v <= d);
        }
    }

    #[test]
    fn test_sub_millisecond_delays_survive_jitter() {
        let d = Duration::from_micros(800);
        for _ in 0..200 {
            let v = JitterPolicy::Equal.apply(d);
            assert!(v >= Duration::from_micros(400));
            assert!(v <= d);
        }
        let mut nonzero = false;
        for _ in 0..200 {
            nonzero |= JitterPolicy::Full.apply(d) > Duration::ZERO;
        }
        assert!(nonzero);
    }

    #[test]
    fn test_huge_delay_does_not_wrap() {
        let v = JitterPolicy::Equal.apply(Duration::MAX);
        assert!(v >= Duration::from_nanos(u64::MAX / 2));
    }
}
