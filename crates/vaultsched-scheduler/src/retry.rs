//! Retry policy: exponential backoff with a cap, bounded by max attempts.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::Job;

/// What to do with a job after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Retry once backoff has elapsed.
    RetryAt(DateTime<Utc>),
    /// The cycle is spent; the job waits for its next regular trigger.
    GiveUp,
}

/// Exponential backoff: `delay = min(base * 2^(attempt-1), cap)`.
///
/// The policy is process-wide (configured once); per-job variation comes from
/// each job's own `max_attempts`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    base: Duration,
    cap: Duration,
}

impl RetryPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Backoff delay after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        let delay = self.base.checked_mul(1u32 << shift).unwrap_or(self.cap);
        delay.min(self.cap)
    }

    /// Decide the disposition after `attempt` (1-based) failed at `now`.
    ///
    /// On success callers reset their attempt counter instead of asking; this
    /// is only ever consulted for failures and timeouts, which are treated
    /// identically.
    pub fn next_attempt(&self, job: &Job, attempt: u32, now: DateTime<Utc>) -> Disposition {
        if attempt >= job.max_attempts {
            return Disposition::GiveUp;
        }
        let delay = self.delay_for(attempt);
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
        Disposition::RetryAt(now + delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::interval_job;
    use proptest::prelude::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(30), Duration::from_secs(300))
    }

    #[test]
    fn delay_doubles_until_cap() {
        let policy = policy();
        assert_eq!(policy.delay_for(1), Duration::from_secs(30));
        assert_eq!(policy.delay_for(2), Duration::from_secs(60));
        assert_eq!(policy.delay_for(3), Duration::from_secs(120));
        assert_eq!(policy.delay_for(4), Duration::from_secs(240));
        assert_eq!(policy.delay_for(5), Duration::from_secs(300)); // capped
        assert_eq!(policy.delay_for(6), Duration::from_secs(300));
    }

    #[test]
    fn retries_until_max_attempts_then_gives_up() {
        let policy = policy();
        let mut job = interval_job("backup-export", 3_600);
        job.max_attempts = 3;
        let now = Utc::now();

        let first = policy.next_attempt(&job, 1, now);
        assert_eq!(
            first,
            Disposition::RetryAt(now + chrono::Duration::seconds(30))
        );

        let second = policy.next_attempt(&job, 2, now);
        assert_eq!(
            second,
            Disposition::RetryAt(now + chrono::Duration::seconds(60))
        );

        assert_eq!(policy.next_attempt(&job, 3, now), Disposition::GiveUp);
        // Past the bound stays give-up.
        assert_eq!(policy.next_attempt(&job, 7, now), Disposition::GiveUp);
    }

    #[test]
    fn single_attempt_job_never_retries() {
        let policy = policy();
        let mut job = interval_job("fragile", 60);
        job.max_attempts = 1;
        assert_eq!(policy.next_attempt(&job, 1, Utc::now()), Disposition::GiveUp);
    }

    proptest! {
        // Delay is always within [base, cap].
        #[test]
        fn delay_is_bounded(attempt in 1u32..1_000) {
            let policy = policy();
            let delay = policy.delay_for(attempt);
            prop_assert!(delay >= Duration::from_secs(30));
            prop_assert!(delay <= Duration::from_secs(300));
        }

        // Delay is monotonically non-decreasing in the attempt number.
        #[test]
        fn delay_non_decreasing(a in 1u32..100, b in 1u32..100) {
            let policy = policy();
            if a <= b {
                prop_assert!(policy.delay_for(a) <= policy.delay_for(b));
            }
        }

        // Huge attempt numbers never overflow into a tiny delay.
        #[test]
        fn extreme_attempts_stay_capped(attempt in 100u32..u32::MAX) {
            let policy = policy();
            prop_assert_eq!(policy.delay_for(attempt), Duration::from_secs(300));
        }
    }

    // Metamorphic: each delay is double the previous until the cap kicks in.
    #[test]
    fn metamorphic_delay_doubles() {
        let policy = policy();
        let delays: Vec<Duration> = (1..=6).map(|n| policy.delay_for(n)).collect();

        for window in delays.windows(2) {
            if window[0] < Duration::from_secs(300) {
                assert_eq!(window[1], (window[0] * 2).min(Duration::from_secs(300)));
            } else {
                assert_eq!(window[1], Duration::from_secs(300));
            }
        }
    }
}
