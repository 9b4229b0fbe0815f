// CLASSIFICATION: COMMUNITY
// Filename: timing.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Wrapping timestamp arithmetic and the per-entry retry schedule.

use super::AckError;

/// Forward distance from `left` to `right` across at most one wrap.
#[must_use]
pub fn displacement(left: u8, right: u8) -> u8 {
    right.wrapping_sub(left)
}

/// What a sweep does with one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDecision {
    /// The timeout window has passed; drop the entry.
    Expired,
    /// A retry slot has opened; resend and bump the retry count.
    Retry,
    /// Nothing to do yet.
    Wait,
}

/// Timeout window split into evenly spaced retry slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    timeout: u8,
    retries: u8,
}

impl RetryPolicy {
    /// `timeout` is in ticks and must be non-zero; `retries` in `1..=timeout`.
    pub fn new(timeout: u8, retries: u8) -> Result<Self, AckError> {
        if timeout == 0 || retries == 0 || retries > timeout {
            return Err(AckError::InvalidPolicy { timeout, retries });
        }
        Ok(Self { timeout, retries })
    }

    pub fn timeout(&self) -> u8 {
        self.timeout
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }

    /// Ticks between two retry slots.
    pub fn interval(&self) -> u8 {
        self.timeout / self.retries
    }

    /// Decide the fate of an entry stamped `start` that has been retried
    /// `retried` times.
    ///
    /// Retry slots count ticks elapsed since `start`. Measuring from `now` to
    /// the window's end instead would resend an entry the moment it is made.
    pub fn decide(&self, start: u8, retried: u8, now: u8) -> AckDecision {
        let end = start.wrapping_add(self.timeout);
        if displacement(now, end) > self.timeout {
            return AckDecision::Expired;
        }
        let elapsed = u16::from(displacement(start, now));
        let due = u16::from(self.interval()) * (u16::from(retried) + 1);
        if elapsed > due {
            AckDecision::Retry
        } else {
            AckDecision::Wait
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displacement_examples() {
        assert_eq!(displacement(10, 30), 20);
        assert_eq!(displacement(130, 30), 156);
        assert_eq!(displacement(255, 0), 1);
        assert_eq!(displacement(7, 7), 0);
    }

    #[test]
    fn displacement_recovers_every_offset() {
        for left in 0..=255u8 {
            for k in 0..=255u8 {
                assert_eq!(displacement(left, left.wrapping_add(k)), k);
            }
        }
    }

    #[test]
    fn schedule_across_one_window() {
        let policy = RetryPolicy::new(100, 4).expect("valid policy");
        assert_eq!(policy.interval(), 25);
        assert_eq!(policy.decide(200, 0, 200), AckDecision::Wait);
        assert_eq!(policy.decide(200, 0, 225), AckDecision::Wait);
        assert_eq!(policy.decide(200, 0, 226), AckDecision::Retry);
        assert_eq!(policy.decide(200, 1, 226), AckDecision::Wait);
        assert_eq!(policy.decide(200, 1, 252), AckDecision::Retry);
        assert_eq!(policy.decide(200, 3, 44), AckDecision::Wait);
        assert_eq!(policy.decide(200, 3, 45), AckDecision::Expired);
    }

    #[test]
    fn rejects_degenerate_policies() {
        assert!(RetryPolicy::new(0, 1).is_err());
        assert!(RetryPolicy::new(10, 0).is_err());
        assert!(RetryPolicy::new(3, 4).is_err());
    }
}
