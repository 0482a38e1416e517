use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::wait::{Pause, Waited};
use super::ActionError;

/// Source of human-like random pre-action delays.
///
/// The process shares one generator ([`Jitter::global`]), seeded once from OS
/// entropy. Seeded instances give reproducible delays.
#[derive(Debug)]
pub struct Jitter {
    rng: Mutex<StdRng>,
}

impl Jitter {
    pub fn global() -> &'static Jitter {
        static GLOBAL: OnceLock<Jitter> = OnceLock::new();
        GLOBAL.get_or_init(|| Jitter {
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Pick a duration in `[min_ms, max_ms)`.
    ///
    /// Negative bounds count as zero. Equal bounds give exactly that many
    /// milliseconds. A minimum above the maximum is rejected.
    pub fn sample(&self, min_ms: i64, max_ms: i64) -> Result<Duration, ActionError> {
        let (min, max) = (min_ms.max(0) as u64, max_ms.max(0) as u64);
        if min > max {
            return Err(ActionError::InvalidRange { min, max });
        }
        if min == max {
            return Ok(Duration::from_millis(min));
        }
        let ms = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gen_range(min..max);
        Ok(Duration::from_millis(ms))
    }

    /// Sample a delay and sit it out through `pause`.
    pub async fn delay<P: Pause>(&self, pause: &P, min_ms: i64, max_ms: i64) -> Result<Waited, ActionError> {
        let duration = self.sample(min_ms, max_ms)?;
        tracing::debug!("Pre-action delay of {}ms", duration.as_millis());
        Ok(pause.pause(duration).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_bounds_are_exact() {
        let jitter = Jitter::seeded(1);
        assert_eq!(jitter.sample(250, 250).unwrap(), Duration::from_millis(250));
        assert_eq!(jitter.sample(0, 0).unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_negative_bounds_clamp_to_zero() {
        let jitter = Jitter::seeded(1);
        assert_eq!(jitter.sample(-10, -1).unwrap(), Duration::ZERO);
        let d = jitter.sample(-10, 5).unwrap();
        assert!(d < Duration::from_millis(5));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let jitter = Jitter::seeded(1);
        assert_eq!(
            jitter.sample(500, 100).unwrap_err(),
            ActionError::InvalidRange { min: 500, max: 100 }
        );
        // max clamps to 0 first, leaving min above it
        assert!(matches!(jitter.sample(10, -3), Err(ActionError::InvalidRange { min: 10, max: 0 })));
    }

    #[test]
    fn test_samples_stay_in_half_open_range() {
        let jitter = Jitter::seeded(42);
        for _ in 0..500 {
            let d = jitter.sample(100, 110).unwrap();
            assert!(d >= Duration::from_millis(100) && d < Duration::from_millis(110));
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = Jitter::seeded(7);
        let b = Jitter::seeded(7);
        for _ in 0..20 {
            assert_eq!(a.sample(0, 1000).unwrap(), b.sample(0, 1000).unwrap());
        }
    }
}
