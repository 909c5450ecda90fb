//! # Backoff policies for pacing coordination-service retries.
//!
//! [`Backoff`] is the capability every phase runner consults between failed
//! attempts: a stateless query [`Backoff::value_at`] plus a step cursor driven by
//! [`Backoff::increment`] / [`Backoff::reset`]. Callers hold a `Box<dyn Backoff>`
//! and never match on the concrete variant.
//!
//! Two policies are provided:
//! - [`ConstantBackoff`] a fixed interval (lease renewal, periodic polling);
//! - [`SquareBackoff`] quadratic growth from `min` to `max` over `steps` attempts.
//!
//! The delay for attempt `n` of a square policy is
//! `min + ((n / steps) × sqrt(max − min))²`, which simplifies to
//! `min + (max − min) × n² / steps²` and is evaluated in integer nanoseconds,
//! then clamped to `[min, max]`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use discovisor::{Backoff, SquareBackoff};
//!
//! let mut backoff = SquareBackoff::new(
//!     Duration::from_millis(10),
//!     Duration::from_millis(60),
//!     5,
//! ).unwrap();
//!
//! assert_eq!(backoff.value_at(0).unwrap(), Duration::from_millis(10));
//! assert_eq!(backoff.value_at(3).unwrap(), Duration::from_millis(28));
//! assert_eq!(backoff.value_at(9).unwrap(), Duration::from_millis(60));
//!
//! // increment returns the value *before* advancing
//! assert_eq!(backoff.increment(), Duration::from_millis(10));
//! assert_eq!(backoff.value(), Duration::from_millis(12));
//! ```

use std::time::Duration;

use crate::error::BackoffError;

/// Retry pacing capability shared by all policies.
///
/// The cursor (`step`) is bounded to `[0, steps]`; policies without a ramp keep it at 0.
pub trait Backoff: Send + Sync {
    /// Delay for the given zero-based attempt index.
    ///
    /// Fails with [`BackoffError::InvalidArgument`] when `index < 0`.
    fn value_at(&self, index: i64) -> Result<Duration, BackoffError>;

    /// Delay at the current cursor position.
    fn value(&self) -> Duration;

    /// Returns the current delay, then advances the cursor by one (capped).
    fn increment(&mut self) -> Duration;

    /// Returns the current delay, then rewinds the cursor to 0.
    fn reset(&mut self) -> Duration;

    /// The ceiling no delay of this policy ever exceeds.
    fn max(&self) -> Duration;
}

/// Fixed-interval policy.
///
/// Every query returns the same delay; `increment` and `reset` only return it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstantBackoff {
    value: Duration,
}

impl ConstantBackoff {
    /// Creates a policy that always yields `value`.
    pub fn new(value: Duration) -> Self {
        Self { value }
    }
}

impl Backoff for ConstantBackoff {
    fn value_at(&self, index: i64) -> Result<Duration, BackoffError> {
        if index < 0 {
            return Err(BackoffError::InvalidArgument { index });
        }
        Ok(self.value)
    }

    fn value(&self) -> Duration {
        self.value
    }

    fn increment(&mut self) -> Duration {
        self.value
    }

    fn reset(&mut self) -> Duration {
        self.value
    }

    fn max(&self) -> Duration {
        self.value
    }
}

/// Quadratic ramp from `min` to `max` reached after `steps` attempts.
///
/// With `steps = 0` there is no ramp and every index yields `max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SquareBackoff {
    min: Duration,
    max: Duration,
    steps: u32,
    step: u32,
}

impl SquareBackoff {
    /// Creates a square policy.
    ///
    /// Fails with [`BackoffError::InvalidConfiguration`] when `max < min`.
    pub fn new(min: Duration, max: Duration, steps: u32) -> Result<Self, BackoffError> {
        if max < min {
            return Err(BackoffError::InvalidConfiguration {
                reason: format!("max {max:?} is below min {min:?}"),
            });
        }
        Ok(Self {
            min,
            max,
            steps,
            step: 0,
        })
    }

    /// Creates a square policy from signed millisecond values.
    ///
    /// Fails with [`BackoffError::InvalidConfiguration`] when `min < 0`,
    /// `max < min` or `steps < 0`.
    ///
    /// # Example
    /// ```
    /// use discovisor::{BackoffError, SquareBackoff};
    ///
    /// assert!(SquareBackoff::from_millis(10, 60, 5).is_ok());
    /// assert!(matches!(
    ///     SquareBackoff::from_millis(-1, 60, 5),
    ///     Err(BackoffError::InvalidConfiguration { .. })
    /// ));
    /// ```
    pub fn from_millis(min: i64, max: i64, steps: i64) -> Result<Self, BackoffError> {
        if min < 0 {
            return Err(BackoffError::InvalidConfiguration {
                reason: format!("min {min}ms is negative"),
            });
        }
        if max < min {
            return Err(BackoffError::InvalidConfiguration {
                reason: format!("max {max}ms is below min {min}ms"),
            });
        }
        let steps = u32::try_from(steps).map_err(|_| BackoffError::InvalidConfiguration {
            reason: format!("steps {steps} out of range"),
        })?;
        Self::new(
            Duration::from_millis(min.unsigned_abs()),
            Duration::from_millis(max.unsigned_abs()),
            steps,
        )
    }

    /// Lower bound (value at index 0).
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Number of attempts until `max` is reached.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Current cursor position in `[0, steps]`.
    pub fn step(&self) -> u32 {
        self.step
    }

    fn at(&self, index: u64) -> Duration {
        let steps = u64::from(self.steps);
        if index >= steps {
            return self.max;
        }

        let span = (self.max - self.min).as_nanos();
        let num = u128::from(index) * u128::from(index);
        let den = u128::from(steps) * u128::from(steps);
        let extra = match span.checked_mul(num) {
            Some(n) => n / den,
            None => {
                let ratio = index as f64 / steps as f64;
                (span as f64 * ratio * ratio) as u128
            }
        };

        let extra = Duration::from_nanos(u64::try_from(extra).unwrap_or(u64::MAX));
        self.min.saturating_add(extra).clamp(self.min, self.max)
    }
}

impl Backoff for SquareBackoff {
    fn value_at(&self, index: i64) -> Result<Duration, BackoffError> {
        if index < 0 {
            return Err(BackoffError::InvalidArgument { index });
        }
        Ok(self.at(index.unsigned_abs()))
    }

    fn value(&self) -> Duration {
        self.at(u64::from(self.step))
    }

    fn increment(&mut self) -> Duration {
        let prev = self.value();
        if self.step < self.steps {
            self.step += 1;
        }
        prev
    }

    fn reset(&mut self) -> Duration {
        let prev = self.value();
        self.step = 0;
        prev
    }

    fn max(&self) -> Duration {
        self.max
    }
}
