//! Reconnect delay policy.
//!
//! `delay = min(max, base * 2^attempt) + U[0, jitter]`. The exponent is
//! clamped so growth saturates at `max` instead of overflowing. Randomness is
//! injected by the caller, so a seeded RNG reproduces the exact sequence.

use std::time::Duration;

use rand::Rng;

/// Exponent cap. `2^32` already dwarfs any sensible `max / base` ratio.
const MAX_EXPONENT: u32 = 32;

/// Exponential backoff with additive uniform jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
    jitter: Duration,
}

impl BackoffPolicy {
    /// Create a policy. `max` is raised to `base` if configured lower.
    #[must_use]
    pub fn new(base: Duration, max: Duration, jitter: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            jitter,
        }
    }

    #[must_use]
    pub const fn base(&self) -> Duration {
        self.base
    }

    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    #[must_use]
    pub const fn jitter(&self) -> Duration {
        self.jitter
    }

    /// Delay before retry number `attempt` (zero-based), without jitter.
    #[must_use]
    pub fn capped_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(MAX_EXPONENT);
        let scaled = self.base.as_secs_f64() * 2f64.powi(exponent as i32);
        Duration::try_from_secs_f64(scaled).map_or(self.max, |delay| delay.min(self.max))
    }

    /// Delay before retry number `attempt` (zero-based), jitter included.
    pub fn next<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        self.capped_delay(attempt)
            .saturating_add(sample_jitter(self.jitter, rng))
    }

    /// Largest delay this policy can ever return.
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.max.saturating_add(self.jitter)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(2),
            Duration::from_secs(60),
            Duration::from_millis(800),
        )
    }
}

/// Uniform sample from `[0, span]`.
pub fn sample_jitter<R: Rng + ?Sized>(span: Duration, rng: &mut R) -> Duration {
    if span.is_zero() {
        return Duration::ZERO;
    }
    let sample = rng.gen_range(0.0..=span.as_secs_f64());
    Duration::try_from_secs_f64(sample).map_or(span, |jitter| jitter.min(span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn doubles_until_cap_without_jitter() {
        let policy = BackoffPolicy::new(secs(2), secs(60), Duration::ZERO);
        let delays: Vec<_> = (0..8).map(|a| policy.capped_delay(a)).collect();

        assert_eq!(
            delays,
            vec![secs(2), secs(4), secs(8), secs(16), secs(32), secs(60), secs(60), secs(60)]
        );
    }

    #[test]
    fn huge_attempt_saturates() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.capped_delay(u32::MAX), secs(60));
    }

    #[test]
    fn same_seed_same_sequence() {
        let policy = BackoffPolicy::default();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);

        let first: Vec<_> = (0..10).map(|i| policy.next(i, &mut a)).collect();
        let second: Vec<_> = (0..10).map(|i| policy.next(i, &mut b)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn always_within_bounds() {
        let policy = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);

        for attempt in 0..200 {
            let delay = policy.next(attempt % 40, &mut rng);
            assert!(delay >= policy.base(), "{delay:?} below base");
            assert!(delay <= policy.ceiling(), "{delay:?} above ceiling");
        }
    }

    #[test]
    fn non_decreasing_before_jitter() {
        let policy = BackoffPolicy::new(Duration::from_millis(250), secs(30), Duration::ZERO);
        let mut previous = Duration::ZERO;
        for attempt in 0..64 {
            let delay = policy.capped_delay(attempt);
            assert!(delay >= previous);
            previous = delay;
        }
        assert_eq!(previous, secs(30));
    }

    #[test]
    fn max_below_base_is_raised() {
        let policy = BackoffPolicy::new(secs(5), secs(1), Duration::ZERO);
        assert_eq!(policy.max(), secs(5));
        assert_eq!(policy.capped_delay(3), secs(5));
    }

    #[test]
    fn extreme_bounds_saturate() {
        let policy = BackoffPolicy::new(secs(2), Duration::MAX, Duration::MAX);
        let mut rng = StdRng::seed_from_u64(3);

        assert_eq!(policy.ceiling(), Duration::MAX);
        for attempt in [0, 10, 64, u32::MAX] {
            let delay = policy.next(attempt, &mut rng);
            assert!(delay >= policy.capped_delay(attempt));
        }
        assert!(sample_jitter(Duration::MAX, &mut rng) <= Duration::MAX);

        let huge_base = BackoffPolicy::new(Duration::MAX, Duration::MAX, Duration::ZERO);
        assert_eq!(huge_base.capped_delay(u32::MAX), Duration::MAX);
    }

    #[test]
    fn zero_jitter_samples_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sample_jitter(Duration::ZERO, &mut rng), Duration::ZERO);
    }
}
