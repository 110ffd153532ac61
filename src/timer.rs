use crate::state::Assessment;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownStatus {
    pub remaining_seconds: u32,
    pub expired: bool,
}

/// Remaining time for a started assessment, derived from `startedAt`
/// and the time limit. Advisory only: expiry never ends the assessment
/// by itself, that stays an explicit teacher command.
pub fn countdown_status(assessment: &Assessment, now: DateTime<Utc>) -> Option<CountdownStatus> {
    let started_at = assessment.started_at?;
    let elapsed = (now - started_at).num_seconds().max(0) as u64;
    let limit = u64::from(assessment.time_limit_seconds);
    Some(CountdownStatus {
        remaining_seconds: limit.saturating_sub(elapsed) as u32,
        expired: elapsed >= limit,
    })
}

/// Poll-driven countdown for embedding callers. Reports expiry exactly
/// once; cancelling (view unmount, active assessment change) suppresses
/// the completion signal permanently.
#[derive(Debug)]
#[allow(dead_code)]
pub struct Countdown {
    deadline: Instant,
    fired: bool,
    cancelled: bool,
}

#[allow(dead_code)]
impl Countdown {
    pub fn start(now: Instant, duration: Duration) -> Self {
        Countdown {
            deadline: now + duration,
            fired: false,
            cancelled: false,
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// True exactly once, at or after the deadline, unless cancelled.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.cancelled || self.fired || now < self.deadline {
            return false;
        }
        self.fired = true;
        true
    }
}
