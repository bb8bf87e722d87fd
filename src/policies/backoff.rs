//! # Backoff between supervision retries.
//!
//! [`BackoffPolicy`] computes how long a supervisor running under
//! [`SupervisionPolicy::Retry`](crate::SupervisionPolicy::Retry) waits before
//! re-handling the message that faulted.
//!
//! The delay for retry `n` (0-indexed) is `first × factor^n`, clamped to `max`,
//! then jittered. The base is derived from `n` alone, so jitter never compounds.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use taskwarden::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(50),
//!     max: Duration::from_secs(2),
//!     factor: 3.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(50));
//! assert_eq!(backoff.next(2), Duration::from_millis(450));
//! assert_eq!(backoff.next(8), Duration::from_secs(2));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry delay policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to the clamped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 100ms`, `factor = 2.0`, `max = 10s`, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(10),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Constant delay, no growth, no jitter.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay for the given retry number (0-indexed).
    pub fn next(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(first_ms: u64, max_ms: u64, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn grows_geometrically_until_capped() {
        let p = policy(100, 1_000, 2.0);
        let delays: Vec<_> = (0..6).map(|n| p.next(n).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
    }

    #[test]
    fn first_above_max_is_clamped() {
        assert_eq!(policy(5_000, 1_000, 1.0).next(0), Duration::from_secs(1));
    }

    #[test]
    fn overflow_clamps_to_max() {
        assert_eq!(policy(100, 60_000, 10.0).next(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn constant_never_changes() {
        let p = BackoffPolicy::constant(Duration::from_millis(30));
        assert!((0..20).all(|n| p.next(n) == Duration::from_millis(30)));
    }

    #[test]
    fn jitter_never_exceeds_the_clamped_base() {
        let p = BackoffPolicy {
            jitter: JitterPolicy::Full,
            ..policy(100, 1_000, 2.0)
        };
        for n in 0..12 {
            assert!(p.next(n) <= Duration::from_secs(1));
        }
    }
}
