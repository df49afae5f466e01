//! Per-account login lockout state machine.
//!
//! The state lives on the member row (`login_attempts`, `locked_until`);
//! this module only defines the transitions. Applying a transition to the
//! stored row atomically is the identity store's job.

use chrono::{DateTime, Duration, Utc};

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_LOCK_MINUTES: i64 = 30;

/// Operator-configured lockout thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_attempts: u32,
    lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lock_duration: Duration::minutes(DEFAULT_LOCK_MINUTES),
        }
    }
}

impl LockoutPolicy {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_lock_minutes(mut self, minutes: i64) -> Self {
        self.lock_duration = Duration::minutes(minutes);
        self
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn lock_duration(&self) -> Duration {
        self.lock_duration
    }
}

/// Lockout counters for one account.
///
/// A populated `locked_until` in the past reads as unlocked but is left in
/// place; only [`unlock`](Self::unlock) clears the field. Reads never mutate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockoutState {
    pub login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutState {
    /// Counts one failed login; locks once the policy budget is exhausted.
    pub fn record_failure(&mut self, policy: &LockoutPolicy, now: DateTime<Utc>) {
        self.login_attempts = self.login_attempts.saturating_add(1);
        if self.login_attempts >= policy.max_attempts() {
            self.locked_until = Some(now + policy.lock_duration());
        }
    }

    /// Administrative lock for an explicit window, independent of attempts.
    pub fn lock(&mut self, duration: Duration, now: DateTime<Utc>) {
        self.locked_until = Some(now + duration);
    }

    /// Clears the lock window and resets the attempt counter.
    pub fn unlock(&mut self) {
        self.login_attempts = 0;
        self.locked_until = None;
    }

    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Seconds until the lock expires, if one is active.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.locked_until.and_then(|until| {
            let remaining = until.signed_duration_since(now).num_seconds();
            (remaining > 0).then_some(remaining)
        })
    }
}
