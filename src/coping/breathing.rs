//! Guided 4-4-6 breathing: inhale 4s, hold 4s, exhale 6s, repeating.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::scheduler::{ScheduleHandle, Scheduler};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathPhase {
    Inhale,
    Hold,
    Exhale,
}

impl BreathPhase {
    pub fn duration_secs(self) -> u32 {
        match self {
            BreathPhase::Inhale => 4,
            BreathPhase::Hold => 4,
            BreathPhase::Exhale => 6,
        }
    }

    pub fn next(self) -> Self {
        match self {
            BreathPhase::Inhale => BreathPhase::Hold,
            BreathPhase::Hold => BreathPhase::Exhale,
            BreathPhase::Exhale => BreathPhase::Inhale,
        }
    }

    pub fn cue(self) -> &'static str {
        match self {
            BreathPhase::Inhale => "Breathe In",
            BreathPhase::Hold => "Hold",
            BreathPhase::Exhale => "Breathe Out",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreathingState {
    pub phase: BreathPhase,
    pub seconds_remaining: u32,
}

impl BreathingState {
    pub fn initial() -> Self {
        Self {
            phase: BreathPhase::Inhale,
            seconds_remaining: BreathPhase::Inhale.duration_secs(),
        }
    }

    /// One second elapsed. `seconds_remaining` never reaches zero: the tick
    /// that would hit zero moves to the next phase instead.
    pub fn tick(self) -> Self {
        if self.seconds_remaining > 1 {
            Self {
                seconds_remaining: self.seconds_remaining - 1,
                ..self
            }
        } else {
            let phase = self.phase.next();
            Self {
                phase,
                seconds_remaining: phase.duration_secs(),
            }
        }
    }
}

impl Default for BreathingState {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running(BreathingState),
}

/// What presentation consumers see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreathingStatus {
    pub active: bool,
    pub phase: BreathPhase,
    pub seconds_remaining: u32,
    pub cycles_completed: u32,
    pub cue: &'static str,
}

pub type BreathingObserver = Arc<dyn Fn(BreathingStatus) + Send + Sync + 'static>;

struct TimerInner {
    state: TimerState,
    cycles_completed: u32,
    // Bumped on every start/stop; ticks from an older source are ignored.
    generation: u64,
    handle: Option<ScheduleHandle>,
}

impl TimerInner {
    fn status(&self) -> BreathingStatus {
        let (active, current) = match self.state {
            TimerState::Idle => (false, BreathingState::initial()),
            TimerState::Running(s) => (true, s),
        };
        BreathingStatus {
            active,
            phase: current.phase,
            seconds_remaining: current.seconds_remaining,
            cycles_completed: self.cycles_completed,
            cue: if active { current.phase.cue() } else { "Ready?" },
        }
    }
}

/// Breathing countdown owning at most one tick source at a time.
pub struct BreathingTimer {
    scheduler: Arc<dyn Scheduler>,
    inner: Arc<Mutex<TimerInner>>,
    observer: Option<BreathingObserver>,
}

impl BreathingTimer {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            inner: Arc::new(Mutex::new(TimerInner {
                state: TimerState::Idle,
                cycles_completed: 0,
                generation: 0,
                handle: None,
            })),
            observer: None,
        }
    }

    /// Called with the new status after every start, stop and tick.
    pub fn with_observer(mut self, observer: BreathingObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> TimerState {
        self.lock().state
    }

    pub fn status(&self) -> BreathingStatus {
        self.lock().status()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), TimerState::Running(_))
    }

    /// idle → running(inhale, 4). No-op when already running.
    pub fn start(&self) -> BreathingStatus {
        let status = {
            let mut inner = self.lock();
            if matches!(inner.state, TimerState::Running(_)) {
                return inner.status();
            }

            if let Some(stale) = inner.handle.take() {
                stale.cancel();
            }

            inner.generation += 1;
            inner.state = TimerState::Running(BreathingState::initial());
            inner.cycles_completed = 0;

            let generation = inner.generation;
            let weak = Arc::downgrade(&self.inner);
            let observer = self.observer.clone();
            inner.handle = Some(self.scheduler.schedule_repeating(
                TICK_INTERVAL,
                Box::new(move || on_tick(&weak, generation, observer.as_ref())),
            ));
            inner.status()
        };

        tracing::debug!("Breathing exercise started");
        self.notify(status);
        status
    }

    /// running → idle, back at inhale/4, tick source cancelled.
    pub fn stop(&self) -> BreathingStatus {
        let (status, was_running) = {
            let mut inner = self.lock();
            let was_running = matches!(inner.state, TimerState::Running(_));
            inner.generation += 1;
            inner.state = TimerState::Idle;
            if let Some(handle) = inner.handle.take() {
                handle.cancel();
            }
            (inner.status(), was_running)
        };

        if was_running {
            tracing::debug!("Breathing exercise stopped");
            self.notify(status);
        }
        status
    }

    fn notify(&self, status: BreathingStatus) {
        if let Some(observer) = &self.observer {
            observer(status);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TimerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for BreathingTimer {
    fn drop(&mut self) {
        let mut inner = self.lock();
        inner.state = TimerState::Idle;
        if let Some(handle) = inner.handle.take() {
            handle.cancel();
        }
    }
}

fn on_tick(inner: &Weak<Mutex<TimerInner>>, generation: u64, observer: Option<&BreathingObserver>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };

    let status = {
        let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.generation != generation {
            return;
        }
        let TimerState::Running(current) = inner.state else {
            return;
        };
        let next = current.tick();
        if current.phase == BreathPhase::Exhale && next.phase == BreathPhase::Inhale {
            inner.cycles_completed += 1;
        }
        inner.state = TimerState::Running(next);
        inner.status()
    };

    if let Some(observer) = observer {
        observer(status);
    }
}
