//! Randomized pre-request pause.
//!
//! Spreads out the requests of one group so they do not hit the site in
//! the same instant.

use rand::Rng;
use std::time::Duration;

/// A uniformly random pause in `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    min: Duration,
    max: Duration,
}

impl Jitter {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max { Self { min, max } } else { Self { min: max, max: min } }
    }

    /// No pause at all.
    pub fn none() -> Self {
        Self { min: Duration::ZERO, max: Duration::ZERO }
    }

    /// Pick a pause length.
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    /// Sleep for a sampled pause.
    pub async fn pause(&self) {
        let wait = self.sample();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(1500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_within_bounds() {
        let jitter = Jitter::default();
        for _ in 0..200 {
            let d = jitter.sample();
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn test_swapped_bounds() {
        let jitter = Jitter::new(Duration::from_millis(20), Duration::from_millis(10));
        let d = jitter.sample();
        assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_none_does_not_sleep() {
        let start = tokio::time::Instant::now();
        Jitter::none().pause().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
