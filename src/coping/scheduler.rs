//! Repeating-tick sources for the guided exercises.
//!
//! A [`Scheduler`] turns a callback into a repeating tick and hands back a
//! [`ScheduleHandle`]. The tick stops when the handle is cancelled or dropped,
//! so a tick source can never outlive whoever owns its handle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

pub type TickFn = Box<dyn FnMut() + Send + 'static>;

pub trait Scheduler: Send + Sync + 'static {
    /// Invoke `callback` every `every`, first call one period from now.
    fn schedule_repeating(&self, every: Duration, callback: TickFn) -> ScheduleHandle;
}

/// Cancellation handle for a repeating tick. Cancels on drop.
pub struct ScheduleHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl ScheduleHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for ScheduleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Ticks on the tokio runtime; each schedule is one spawned task.
#[derive(Clone)]
pub struct TokioScheduler {
    runtime: tokio::runtime::Handle,
}

impl TokioScheduler {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }

    /// Scheduler bound to the runtime of the calling task.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, every: Duration, mut callback: TickFn) -> ScheduleHandle {
        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                callback();
            }
        });
        ScheduleHandle::new(move || task.abort())
    }
}

struct ManualTask {
    id: u64,
    every: Duration,
    elapsed: Duration,
    active: Arc<AtomicBool>,
    callback: Arc<Mutex<TickFn>>,
}

/// Scheduler driven by explicit [`ManualScheduler::advance`] calls instead of
/// wall-clock time.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    tasks: Arc<Mutex<Vec<ManualTask>>>,
    next_id: Arc<AtomicU64>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live tick sources.
    pub fn active_count(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Move time forward, firing every due callback once per elapsed period.
    pub fn advance(&self, by: Duration) {
        let due: Vec<(Arc<AtomicBool>, Arc<Mutex<TickFn>>, u32)> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            tasks
                .iter_mut()
                .filter_map(|task| {
                    task.elapsed += by;
                    let mut fires = 0;
                    while task.elapsed >= task.every {
                        task.elapsed -= task.every;
                        fires += 1;
                    }
                    (fires > 0).then(|| (task.active.clone(), task.callback.clone(), fires))
                })
                .collect()
        };

        // Callbacks run without the task list locked so they may cancel.
        for (active, callback, fires) in due {
            for _ in 0..fires {
                if !active.load(Ordering::SeqCst) {
                    break;
                }
                let mut callback = callback.lock().unwrap_or_else(PoisonError::into_inner);
                (*callback)();
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, every: Duration, callback: TickFn) -> ScheduleHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let active = Arc::new(AtomicBool::new(true));

        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ManualTask {
                id,
                every: every.max(Duration::from_millis(1)),
                elapsed: Duration::ZERO,
                active: active.clone(),
                callback: Arc::new(Mutex::new(callback)),
            });

        let tasks = Arc::downgrade(&self.tasks);
        ScheduleHandle::new(move || {
            active.store(false, Ordering::SeqCst);
            if let Some(tasks) = tasks.upgrade() {
                tasks
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|t| t.id != id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, TickFn) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (
            count,
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_manual_fires_per_period() {
        let scheduler = ManualScheduler::new();
        let (count, cb) = counter();
        let _handle = scheduler.schedule_repeating(Duration::from_secs(1), cb);

        scheduler.advance(Duration::from_millis(500));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        scheduler.advance(Duration::from_millis(500));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        scheduler.advance(Duration::from_secs(3));
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_manual_cancel_and_drop_remove_task() {
        let scheduler = ManualScheduler::new();
        let (count, cb) = counter();
        let handle = scheduler.schedule_repeating(Duration::from_secs(1), cb);
        assert_eq!(scheduler.active_count(), 1);

        handle.cancel();
        assert_eq!(scheduler.active_count(), 0);
        scheduler.advance(Duration::from_secs(5));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let (_, cb) = counter();
        drop(scheduler.schedule_repeating(Duration::from_secs(1), cb));
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_ticks_and_aborts() {
        let scheduler = TokioScheduler::current();
        let (count, cb) = counter();
        let handle = scheduler.schedule_repeating(Duration::from_secs(1), cb);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
