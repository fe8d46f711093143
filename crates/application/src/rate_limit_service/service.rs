use std::sync::{Mutex, PoisonError};

use tokio::time::Instant;
use tracing::debug;

use fleetops_core::{AppError, AppResult};

use super::config::SignInPolicy;

#[derive(Debug, Default)]
struct ThrottleState {
    attempts: u32,
    last_attempt_at: Option<Instant>,
    locked_at: Option<Instant>,
}

/// In-process sign-in attempt limiter.
#[derive(Debug)]
pub struct SignInThrottle {
    policy: SignInPolicy,
    state: Mutex<ThrottleState>,
}

impl SignInThrottle {
    /// Creates a throttle for the given policy.
    #[must_use]
    pub fn new(policy: SignInPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(ThrottleState::default()),
        }
    }

    /// Records an attempt if the policy allows one now.
    ///
    /// Returns `AppError::RateLimited` without recording anything when the
    /// attempt is too soon after the previous one or the lockout is active.
    pub fn try_acquire(&self) -> AppResult<()> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(locked_at) = state.locked_at {
            let elapsed = now.saturating_duration_since(locked_at);
            if elapsed < self.policy.lockout {
                let remaining = self.policy.lockout.saturating_sub(elapsed);
                return Err(AppError::RateLimited(format!(
                    "too many sign-in attempts, try again in {} seconds",
                    remaining.as_secs().max(1)
                )));
            }

            debug!("sign-in lockout expired, resetting attempt counter");
            *state = ThrottleState::default();
        }

        if let Some(last_attempt_at) = state.last_attempt_at
            && now.saturating_duration_since(last_attempt_at) < self.policy.min_interval
        {
            return Err(AppError::RateLimited(
                "sign-in attempts are too fast, please wait a moment".to_owned(),
            ));
        }

        state.attempts = state.attempts.saturating_add(1);
        state.last_attempt_at = Some(now);
        if state.attempts >= self.policy.max_attempts {
            state.locked_at = Some(now);
        }

        Ok(())
    }

    /// Clears the attempt counter after a successful sign-in.
    pub fn reset(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = ThrottleState::default();
    }

    /// Returns the number of attempts in the current window.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .attempts
    }
}

impl Default for SignInThrottle {
    fn default() -> Self {
        Self::new(SignInPolicy::default())
    }
}
