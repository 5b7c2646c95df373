//! # Exploration Scheduler
//!
//! One background thread drives every world at a fixed period.
//!
//! ## Tick
//!
//! ```text
//!  timer thread                       world threads
//!  ────────────                       ─────────────
//!  tick ──▶ for each world:
//!             accepting? ──no──▶ skip (debug log)
//!                 │ yes
//!                 └─ execute(task) ──▶ service.update_world(world)
//! ```
//!
//! Per-player work always runs on the owning world's thread, so two ticks
//! never update the same player at once.
//!
//! ## Deferred Tasks
//!
//! [`ExplorationScheduler::schedule_once`] runs a task on the timer thread
//! after a short delay, for commands that must wait for a world to catch up.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::config::MapConfig;
use crate::error::FogmapError;
use crate::host::{WorldDirectory, WorldHost};
use crate::service::ExplorationService;

/// Task run once on the scheduler thread.
pub type DeferredTask = Box<dyn FnOnce() + Send + 'static>;

/// Scheduler timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerTiming {
    /// Delay before the first tick.
    pub initial_delay: Duration,
    /// Time between ticks.
    pub period: Duration,
    /// Delay applied to deferred tasks.
    pub deferred_delay: Duration,
}

impl Default for SchedulerTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1_000),
            period: Duration::from_millis(100),
            deferred_delay: Duration::from_millis(50),
        }
    }
}

impl SchedulerTiming {
    /// Default timing with the period taken from `update_rate_ms`.
    #[must_use]
    pub fn from_config(config: &MapConfig) -> Self {
        Self {
            period: Duration::from_millis(config.update_rate_ms.max(1)),
            ..Self::default()
        }
    }
}

/// Scheduler counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Ticks fired.
    pub ticks: u64,
    /// World updates handed to world threads.
    pub worlds_dispatched: u64,
    /// Worlds skipped because they refused work.
    pub worlds_skipped: u64,
    /// Deferred tasks run.
    pub deferred_run: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    worlds_dispatched: AtomicU64,
    worlds_skipped: AtomicU64,
    deferred_run: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            worlds_dispatched: self.worlds_dispatched.load(Ordering::Relaxed),
            worlds_skipped: self.worlds_skipped.load(Ordering::Relaxed),
            deferred_run: self.deferred_run.load(Ordering::Relaxed),
        }
    }
}

enum Control {
    Deferred(DeferredTask),
    Shutdown,
}

struct Worker {
    control: Sender<Control>,
    handle: JoinHandle<()>,
}

/// Periodic driver of the exploration service.
pub struct ExplorationScheduler {
    service: Arc<ExplorationService>,
    worlds: Arc<dyn WorldDirectory>,
    timing: SchedulerTiming,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    worker: Mutex<Option<Worker>>,
}

impl ExplorationScheduler {
    /// Creates a stopped scheduler.
    #[must_use]
    pub fn new(
        service: Arc<ExplorationService>,
        worlds: Arc<dyn WorldDirectory>,
        timing: SchedulerTiming,
    ) -> Self {
        Self {
            service,
            worlds,
            timing,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            worker: Mutex::new(None),
        }
    }

    /// Timing in use.
    #[must_use]
    pub fn timing(&self) -> SchedulerTiming {
        self.timing
    }

    /// Whether the timer thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.counters.snapshot()
    }

    /// Starts the timer thread. Does nothing if already running.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }

        let (control, inbox) = unbounded();
        self.running.store(true, Ordering::Release);

        let service = Arc::clone(&self.service);
        let worlds = Arc::clone(&self.worlds);
        let counters = Arc::clone(&self.counters);
        let running = Arc::clone(&self.running);
        let timing = self.timing;

        let handle = thread::spawn(move || {
            let mut next_tick = Instant::now() + timing.initial_delay;
            let mut pending: Vec<(Instant, DeferredTask)> = Vec::new();

            loop {
                let deadline = pending
                    .iter()
                    .map(|(due, _)| *due)
                    .fold(next_tick, Instant::min);

                match inbox.recv_deadline(deadline) {
                    Ok(Control::Deferred(task)) => {
                        pending.push((Instant::now() + timing.deferred_delay, task));
                        continue;
                    }
                    Ok(Control::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }

                let now = Instant::now();
                let (due, later): (Vec<_>, Vec<_>) =
                    pending.drain(..).partition(|(at, _)| *at <= now);
                pending = later;
                for (_, task) in due {
                    task();
                    counters.deferred_run.fetch_add(1, Ordering::Relaxed);
                }

                if now >= next_tick && running.load(Ordering::Acquire) {
                    tick(&service, worlds.as_ref(), &counters);
                    next_tick += timing.period;
                    if next_tick < now {
                        next_tick = now + timing.period;
                    }
                }
            }
        });

        *worker = Some(Worker { control, handle });
        tracing::info!(
            period_ms = u64::try_from(timing.period.as_millis()).unwrap_or(u64::MAX),
            "exploration scheduler started"
        );
    }

    /// Queues `task` to run after the deferred delay. Returns `false` (and
    /// drops the task) when the scheduler is not running.
    pub fn schedule_once(&self, task: impl FnOnce() + Send + 'static) -> bool {
        if !self.is_running() {
            return false;
        }
        match self.worker.lock().as_ref() {
            Some(worker) => worker.control.send(Control::Deferred(Box::new(task))).is_ok(),
            None => false,
        }
    }

    /// Stops the timer thread and waits for it. Pending deferred tasks are
    /// dropped.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        let _ = worker.control.send(Control::Shutdown);
        if worker.handle.join().is_err() {
            tracing::error!("exploration scheduler thread panicked");
        }
        tracing::info!("exploration scheduler stopped");
    }

    /// Runs one tick on the calling thread.
    pub fn tick_now(&self) {
        tick(&self.service, self.worlds.as_ref(), &self.counters);
    }
}

impl Drop for ExplorationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ExplorationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorationScheduler")
            .field("timing", &self.timing)
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn tick(service: &Arc<ExplorationService>, worlds: &dyn WorldDirectory, counters: &Counters) {
    counters.ticks.fetch_add(1, Ordering::Relaxed);

    for world in worlds.worlds() {
        if !world.is_accepting_tasks() {
            counters.worlds_skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(world = world.name(), "skipping world update; world not accepting tasks");
            continue;
        }

        let task_service = Arc::clone(service);
        let task_world: Arc<dyn WorldHost> = Arc::clone(&world);
        let result = world.execute(Box::new(move || {
            task_service.update_world(task_world.as_ref());
        }));

        match result {
            Ok(()) => {
                counters.worlds_dispatched.fetch_add(1, Ordering::Relaxed);
            }
            Err(FogmapError::WorldUnavailable(name)) => {
                counters.worlds_skipped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(world = %name, "skipping world update; world not accepting tasks");
            }
            Err(e) => {
                counters.worlds_skipped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(world = world.name(), error = %e, "world update dispatch failed");
            }
        }
    }
}
