//! Countdown timer for the reading phase.
//!
//! Remaining time is derived from a monotonic segment start rather than
//! accumulated per tick, so late or skipped ticks never drift the countdown.

use std::time::{Duration, Instant};

use crate::model::TimerState;

const MS_PER_SECOND: u64 = 1_000;

/// What a single `tick` observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// New remaining time (whole seconds, in ms), present only when it changed.
    pub remaining_ms: Option<u64>,
    /// Set on the one tick that finished the countdown.
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct Timer {
    duration_ms: u64,
    state: TimerState,
    /// Time left at the start of the current segment.
    budget_ms: u64,
    segment_start: Option<Instant>,
    reported_ms: u64,
}

impl Timer {
    #[must_use]
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            state: TimerState::Idle,
            budget_ms: duration_ms,
            segment_start: None,
            reported_ms: quantize(duration_ms),
        }
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Remaining time at `now`, rounded up to whole seconds.
    #[must_use]
    pub fn remaining_ms(&self, now: Instant) -> u64 {
        quantize(self.raw_remaining(now))
    }

    /// Milliseconds actually spent counting down so far.
    #[must_use]
    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        self.duration_ms.saturating_sub(self.raw_remaining(now))
    }

    /// Idle or Paused to Running. Returns `false` for any other state.
    pub fn start(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Idle | TimerState::Paused => {
                self.state = TimerState::Running;
                self.segment_start = Some(now);
                true
            }
            TimerState::Running | TimerState::Finished => false,
        }
    }

    /// Running to Paused, freezing the remaining time.
    pub fn pause(&mut self, now: Instant) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.budget_ms = self.raw_remaining(now);
        self.segment_start = None;
        self.state = TimerState::Paused;
        true
    }

    /// Back to Idle with the full configured duration.
    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.budget_ms = self.duration_ms;
        self.segment_start = None;
        self.reported_ms = quantize(self.duration_ms);
    }

    /// Reconfigures the duration and resets.
    pub fn set_duration(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
        self.reset();
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.state != TimerState::Running {
            return TickOutcome::default();
        }

        let remaining = self.remaining_ms(now);
        let changed = (remaining != self.reported_ms).then_some(remaining);
        self.reported_ms = remaining;

        if remaining == 0 {
            self.budget_ms = 0;
            self.segment_start = None;
            self.state = TimerState::Finished;
            return TickOutcome {
                remaining_ms: changed,
                completed: true,
            };
        }

        TickOutcome {
            remaining_ms: changed,
            completed: false,
        }
    }

    fn raw_remaining(&self, now: Instant) -> u64 {
        match self.segment_start {
            Some(start) => {
                let elapsed = now.saturating_duration_since(start);
                self.budget_ms.saturating_sub(duration_ms(elapsed))
            }
            None => self.budget_ms,
        }
    }
}

fn quantize(ms: u64) -> u64 {
    ms.div_ceil(MS_PER_SECOND).saturating_mul(MS_PER_SECOND)
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
