use std::time::Duration;

/// Timing rules for sign-in attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignInPolicy {
    /// Minimum delay between two attempts.
    pub min_interval: Duration,
    /// Attempts allowed before the lockout starts.
    pub max_attempts: u32,
    /// Lockout duration after which the counter resets.
    pub lockout: Duration,
}

impl SignInPolicy {
    /// Creates a sign-in policy.
    #[must_use]
    pub fn new(min_interval: Duration, max_attempts: u32, lockout: Duration) -> Self {
        Self {
            min_interval,
            max_attempts: max_attempts.max(1),
            lockout,
        }
    }
}

impl Default for SignInPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(800), 5, Duration::from_secs(30))
    }
}
