use rand::Rng;
use std::time::Duration;

/// Jittered rotation interval: `max(minimum, base + uniform(-jitter, +jitter))`.
///
/// The floor keeps a jitter at or above the base interval from producing near-zero sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterSchedule {
    base: Duration,
    jitter: Duration,
    minimum: Duration,
}

impl JitterSchedule {
    pub fn new(base: Duration, jitter: Duration, minimum: Duration) -> Self {
        Self {
            base,
            jitter,
            minimum,
        }
    }

    pub fn from_secs(base: u64, jitter: u64, minimum: u64) -> Self {
        Self::new(
            Duration::from_secs(base),
            Duration::from_secs(jitter),
            Duration::from_secs(minimum),
        )
    }

    pub fn next_wait<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let base = millis(self.base);
        let jitter = millis(self.jitter);
        let offset = if jitter == 0 {
            0
        } else {
            rng.gen_range(-jitter..=jitter)
        };
        let wait = base.saturating_add(offset).max(millis(self.minimum)).max(0);
        Duration::from_millis(wait.unsigned_abs())
    }
}

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_wait_stays_within_jitter_bounds() {
        let schedule = JitterSchedule::from_secs(300, 60, 10);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let wait = schedule.next_wait(&mut rng);
            assert!(wait >= Duration::from_secs(240), "{:?}", wait);
            assert!(wait <= Duration::from_secs(360), "{:?}", wait);
        }
    }

    #[test]
    fn test_no_jitter_is_exact() {
        let schedule = JitterSchedule::from_secs(120, 0, 10);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(schedule.next_wait(&mut rng), Duration::from_secs(120));
    }

    #[test]
    fn test_minimum_wait_floor_applies() {
        let schedule = JitterSchedule::from_secs(5, 30, 10);
        let mut rng = StdRng::seed_from_u64(99);
        let waits: Vec<Duration> = (0..1000).map(|_| schedule.next_wait(&mut rng)).collect();
        assert!(waits.iter().all(|w| *w >= Duration::from_secs(10)));
        assert!(waits.iter().any(|w| *w == Duration::from_secs(10)));
        assert!(waits.iter().all(|w| *w <= Duration::from_secs(35)));
    }
}
