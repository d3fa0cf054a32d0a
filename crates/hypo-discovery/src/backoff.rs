use std::time::Duration;

/// Exponential backoff schedule shared by discovery registration (§4.4: 1 s
/// → max 5 min, cap 8 attempts) and reused by the transports with their own
/// bounds. ±20% jitter avoids every instance on a LAN retrying in lockstep.
#[derive(Debug, Clone, Copy)]
pub struct BackoffSchedule {
    base: Duration,
    max: Duration,
    max_attempts: u32,
}

impl BackoffSchedule {
    pub fn new(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self { base, max, max_attempts }
    }

    /// The registration schedule from §4.4.
    pub fn registration() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(5 * 60), 8)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `attempt` (0-indexed), with ±20% jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base.as_millis().saturating_mul(1u128 << attempt.min(32));
        let capped = exp.min(self.max.as_millis());
        let jitter_range = (capped as f64 * 0.2) as i64;
        let jitter = rand::random::<i64>() % (jitter_range.max(1) * 2) - jitter_range.max(1);
        let jittered = (capped as i64 + jitter).max(0) as u64;
        Duration::from_millis(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_then_caps() {
        let schedule = BackoffSchedule::registration();
        let d0 = schedule.delay_for(0).as_millis();
        let d5 = schedule.delay_for(5).as_millis();
        assert!(d5 > d0);
        let d_far = schedule.delay_for(20).as_millis();
        assert!(d_far <= schedule.max.as_millis() + (schedule.max.as_millis() / 5) + 1);
    }

    #[test]
    fn registration_schedule_allows_eight_attempts() {
        assert_eq!(BackoffSchedule::registration().max_attempts(), 8);
    }
}
