//! # Jitter for supervision retry delays.
//!
//! [`JitterPolicy`] randomizes the delay a supervisor waits before re-handling a
//! failed message, so supervisors that crashed on the same shared dependency do
//! not all retry at the same instant.
//!
//! - [`JitterPolicy::None`] exact delay
//! - [`JitterPolicy::Full`] random delay in `[0, delay]`
//! - [`JitterPolicy::Equal`] `delay/2 + random[0, delay/2]`

use rand::Rng;
use std::time::Duration;

/// Randomization applied on top of a [`BackoffPolicy`](crate::BackoffPolicy) delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use the exact backoff delay (default).
    #[default]
    None,

    /// Full jitter: random delay in `[0, delay]`.
    Full,

    /// Equal jitter: keeps at least half of the delay.
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => Duration::from_millis(rand::rng().random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                let extra = if half == 0 {
                    0
                } else {
                    rand::rng().random_range(0..=half)
                };
                Duration::from_millis(half + extra)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_identity() {
        let d = Duration::from_millis(1234);
        assert_eq!(JitterPolicy::None.apply(d), d);
    }

    #[test]
    fn randomized_delays_stay_in_range() {
        let d = Duration::from_millis(400);
        for _ in 0..64 {
            assert!(JitterPolicy::Full.apply(d) <= d);
            let equal = JitterPolicy::Equal.apply(d);
            assert!(equal >= Duration::from_millis(200) && equal <= d);
        }
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
