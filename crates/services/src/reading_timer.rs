use std::time::Duration;

use study_core::model::TimerState;
use study_core::reducer::Action;
use study_core::timer::Timer;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::store::SessionStore;

/// Commands sent to a running reading countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingControl {
    Run,
    Pause,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingOutcome {
    /// Time actually spent reading.
    pub actual_ms: u64,
    /// The reader stopped before the countdown ran out.
    pub early_stop: bool,
}

/// Drives a [`Timer`] once per tick and mirrors it into the session store.
#[derive(Clone)]
pub struct ReadingTimer {
    store: SessionStore,
    tick: Duration,
}

impl ReadingTimer {
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            tick: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Count down `duration_ms` until it runs out or `control` says `Stop`.
    ///
    /// Dropping the control sender counts as a stop.
    pub async fn run(
        &self,
        duration_ms: u64,
        mut control: watch::Receiver<ReadingControl>,
    ) -> ReadingOutcome {
        let mut timer = Timer::new(duration_ms);
        self.store.dispatch(Action::SetTimerState(TimerState::Idle)).await;
        self.store
            .dispatch(Action::SetTimeRemaining(timer.remaining_ms(now())))
            .await;

        if *control.borrow_and_update() == ReadingControl::Run {
            self.resume(&mut timer).await;
        }

        let mut interval = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let outcome = timer.tick(now());
                    if let Some(remaining) = outcome.remaining_ms {
                        self.store.dispatch(Action::SetTimeRemaining(remaining)).await;
                    }
                    if outcome.completed {
                        self.store.dispatch(Action::SetTimerState(TimerState::Finished)).await;
                        debug!(duration_ms, "reading countdown finished");
                        return ReadingOutcome {
                            actual_ms: duration_ms,
                            early_stop: false,
                        };
                    }
                }
                changed = control.changed() => {
                    let command = if changed.is_ok() {
                        *control.borrow_and_update()
                    } else {
                        ReadingControl::Stop
                    };
                    match command {
                        ReadingControl::Run => self.resume(&mut timer).await,
                        ReadingControl::Pause => {
                            if timer.pause(now()) {
                                self.store.dispatch(Action::SetTimerState(TimerState::Paused)).await;
                            }
                        }
                        ReadingControl::Stop => {
                            let actual_ms = timer.elapsed_ms(now());
                            self.store.dispatch(Action::SetTimerState(TimerState::Finished)).await;
                            debug!(actual_ms, "reading stopped early");
                            return ReadingOutcome {
                                actual_ms,
                                early_stop: true,
                            };
                        }
                    }
                }
            }
        }
    }

    async fn resume(&self, timer: &mut Timer) {
        if timer.start(now()) {
            self.store
                .dispatch(Action::SetTimerState(TimerState::Running))
                .await;
        }
    }
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}
