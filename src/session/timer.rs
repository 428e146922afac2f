//! Cancellable debounce timers.
//!
//! A [`DebounceTimer`] holds at most one pending job. Scheduling a new job
//! replaces the pending one, so only the last edit in a burst ever fires.
//! Time is passed in by the caller; the timer never reads a clock.

use std::time::{Duration, Instant};

/// Handle to a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

#[derive(Debug)]
struct Pending<T> {
    token: TimerToken,
    deadline: Instant,
    payload: T,
}

/// Last-schedule-wins timer carrying a payload.
#[derive(Debug)]
pub struct DebounceTimer<T> {
    delay: Duration,
    next_token: u64,
    pending: Option<Pending<T>>,
}

impl<T> DebounceTimer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_token: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `payload` to fire `delay` after `now`, discarding any
    /// pending job.
    pub fn schedule(&mut self, now: Instant, payload: T) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        self.pending = Some(Pending {
            token,
            deadline: now + self.delay,
            payload,
        });
        token
    }

    /// Cancel the job for `token`. Returns false if it already fired, was
    /// replaced, or was cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        if self.is_pending(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Drop whatever is pending.
    pub fn cancel_all(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.pending.as_ref().is_some_and(|p| p.token == token)
    }

    /// Deadline of the pending job, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Fire the pending job if its deadline has passed.
    pub fn fire_due(&mut self, now: Instant) -> Option<(TimerToken, T)> {
        match &self.pending {
            Some(p) if p.deadline <= now => {}
            _ => return None,
        }
        self.pending.take().map(|p| (p.token, p.payload))
    }

    /// Claim the job for `token` if it is still pending.
    ///
    /// For hosts that wait out the delay themselves (e.g. a sleeping task)
    /// and only need to know they are still the latest schedule.
    pub fn take(&mut self, token: TimerToken) -> Option<T> {
        if self.is_pending(token) {
            self.pending.take().map(|p| p.payload)
        } else {
            None
        }
    }
}
