use std::time::Duration;

use snapdrop_protocol::Classify;
use snapdrop_protocol::constants::DEFAULT_MAX_ATTEMPTS;

/// Base delay between attempts of the same file.
const PER_FILE_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Base delay before a whole batch is resumed.
const WHOLE_BATCH_BASE_DELAY: Duration = Duration::from_millis(2000);

/// Linear-backoff retry policy.
///
/// `attempt` is the 1-based number of the attempt that just failed, which
/// is also the ordinal of the retry being considered. A retry is allowed
/// while `attempt <= max_attempts` and the error is transient; the wait
/// before it is `base_delay * attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::per_file()
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Policy for retrying a single file (1 s steps).
    pub fn per_file() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, PER_FILE_BASE_DELAY)
    }

    /// Policy for resuming a whole batch (2 s steps).
    pub fn whole_batch() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, WHOLE_BATCH_BASE_DELAY)
    }

    /// Policy that never retries.
    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Returns `true` if `error`, raised by attempt number `attempt`,
    /// deserves another try.
    pub fn should_retry<E: Classify + ?Sized>(&self, error: &E, attempt: u32) -> bool {
        attempt >= 1 && attempt <= self.max_attempts && error.kind().is_transient()
    }

    /// Delay to wait after attempt number `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapdrop_protocol::ErrorKind;

    #[test]
    fn defaults() {
        let p = RetryPolicy::per_file();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.base_delay, Duration::from_millis(1000));
        assert_eq!(RetryPolicy::default(), p);

        let b = RetryPolicy::whole_batch();
        assert_eq!(b.max_attempts, 3);
        assert_eq!(b.base_delay, Duration::from_millis(2000));
    }

    #[test]
    fn transient_errors_retry_within_budget() {
        let p = RetryPolicy::per_file();
        for attempt in 1..=3 {
            assert!(p.should_retry(&ErrorKind::Transient, attempt));
        }
    }

    #[test]
    fn never_retries_past_budget() {
        let p = RetryPolicy::per_file();
        for attempt in 4..20 {
            for kind in [
                ErrorKind::Transient,
                ErrorKind::Permission,
                ErrorKind::Cancelled,
                ErrorKind::Invalid,
                ErrorKind::Fatal,
            ] {
                assert!(!p.should_retry(&kind, attempt), "{kind:?} at {attempt}");
            }
        }
    }

    #[test]
    fn permission_denial_never_retries() {
        let p = RetryPolicy::per_file();
        assert!(!p.should_retry(&ErrorKind::Permission, 1));
        assert!(!p.should_retry(&ErrorKind::Cancelled, 1));
        assert!(!p.should_retry(&ErrorKind::Invalid, 1));
        assert!(!p.should_retry(&ErrorKind::Fatal, 1));
    }

    #[test]
    fn attempt_zero_is_not_an_attempt() {
        assert!(!RetryPolicy::per_file().should_retry(&ErrorKind::Transient, 0));
    }

    #[test]
    fn disabled_policy() {
        assert!(!RetryPolicy::disabled().should_retry(&ErrorKind::Transient, 1));
    }

    #[test]
    fn linear_backoff() {
        let p = RetryPolicy::per_file();
        assert_eq!(p.delay_for(1), Duration::from_millis(1000));
        assert_eq!(p.delay_for(2), Duration::from_millis(2000));
        assert_eq!(p.delay_for(3), Duration::from_millis(3000));

        let b = RetryPolicy::whole_batch();
        assert_eq!(b.delay_for(1), Duration::from_millis(2000));
        assert_eq!(b.delay_for(3), Duration::from_millis(6000));
    }

    #[test]
    fn delay_for_zero_uses_one_step() {
        assert_eq!(
            RetryPolicy::per_file().delay_for(0),
            Duration::from_millis(1000)
        );
    }
}
