//! Clock-synchronized scheduler
//!
//! Fires callbacks either when media time reaches a target
//! ([`TaskKind::MediaTime`]) or after a wall-clock delay
//! ([`TaskKind::Relative`]), and stays consistent across seeks, pauses and
//! duration changes.
//!
//! **State machine:** `Idle → Running ⇄ Paused`, `stop()` back to `Idle`,
//! `dispose()` to the terminal `Disposed`.
//!
//! **Event reactions:**
//! - `seeking`: media-time tasks are held until the seek completes
//! - `seeked`: media-time tasks now strictly behind the playhead are dropped
//! - `pause`/`ended`: pause; `play`: resume
//! - `duration_change`: media-time tasks past the new end are dropped
//! - `time_update`: run due tasks, batch-limited
//!
//! Relative tasks keep running while paused: they are wall-clock timers
//! (auto-resume fires while the media is paused).
//!
//! A batch stops after `max_tasks_per_tick` tasks or `max_batch_ms` of wall
//! time. Anything still due is deferred to the next tick or
//! [`pump`](Scheduler::pump); nothing is dropped.

pub mod queue;

pub use queue::{ScheduledTask, TaskQueue};

use crate::clock::{ClockEvent, WallClock};
use crate::error::{Error, Result};
use crate::guard::guarded;
use lingo_common::config::SchedulerConfig;
use lingo_common::time;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Task callback; errors and panics are isolated per task
pub type TaskCallback = Box<dyn FnOnce() -> Result<()> + Send>;

/// Cancellable task handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Which clock a task is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    MediaTime,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
    Paused,
    Disposed,
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub scheduled: u64,
    pub fired: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Removed by seek or duration change
    pub dropped: u64,
    /// Batches that hit the limit with work left
    pub deferred_batches: u64,
}

/// Outcome of one evaluation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickStats {
    pub fired: u32,
    pub failed: u32,
    /// Due work was left for the next pass
    pub deferred: bool,
}

pub struct Scheduler {
    state: SchedulerState,
    seeking: bool,
    media: TaskQueue,
    relative: TaskQueue,
    config: SchedulerConfig,
    wall: Arc<dyn WallClock>,
    media_time: f64,
    next_id: u64,
    next_seq: u64,
    deferred: bool,
    stats: SchedulerStats,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, wall: Arc<dyn WallClock>) -> Self {
        Self {
            state: SchedulerState::Idle,
            seeking: false,
            media: TaskQueue::new(),
            relative: TaskQueue::new(),
            config,
            wall,
            media_time: 0.0,
            next_id: 1,
            next_seq: 0,
            deferred: false,
            stats: SchedulerStats::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    /// Due work was deferred by the batch limit
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Media position last reported by a clock event
    pub fn media_time(&self) -> f64 {
        self.media_time
    }

    pub fn pending(&self, kind: TaskKind) -> usize {
        self.queue(kind).len()
    }

    pub fn len(&self) -> usize {
        self.media.len() + self.relative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.media.contains(id) || self.relative.contains(id)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn start(&mut self) {
        match self.state {
            SchedulerState::Idle => {
                info!("Scheduler started");
                self.state = SchedulerState::Running;
            }
            SchedulerState::Disposed => warn!("Scheduler start ignored: disposed"),
            _ => {}
        }
    }

    pub fn pause(&mut self) {
        if self.state == SchedulerState::Running {
            debug!("Scheduler paused at {:.3}s", self.media_time);
            self.state = SchedulerState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == SchedulerState::Paused {
            debug!("Scheduler resumed at {:.3}s", self.media_time);
            self.state = SchedulerState::Running;
        }
    }

    /// Cancel everything and return to `Idle`
    pub fn stop(&mut self) {
        if self.state == SchedulerState::Disposed {
            return;
        }
        let cancelled = self.cancel_all();
        info!("Scheduler stopped ({} tasks cancelled)", cancelled);
        self.state = SchedulerState::Idle;
        self.seeking = false;
        self.deferred = false;
    }

    /// Cancel everything; further scheduling fails
    pub fn dispose(&mut self) {
        if self.state == SchedulerState::Disposed {
            return;
        }
        let cancelled = self.cancel_all();
        info!("Scheduler disposed ({} tasks cancelled)", cancelled);
        self.state = SchedulerState::Disposed;
        self.deferred = false;
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Fire `callback` once media time reaches `media_time`
    pub fn schedule_at(&mut self, media_time: f64, callback: TaskCallback) -> Result<TaskId> {
        if !media_time.is_finite() {
            return Err(Error::Scheduler(format!(
                "invalid media time {}",
                media_time
            )));
        }
        self.enqueue(TaskKind::MediaTime, media_time, self.config.epsilon, callback)
    }

    /// Fire `callback` once `delay_ms` of wall time has passed
    pub fn schedule_after(&mut self, delay_ms: u64, callback: TaskCallback) -> Result<TaskId> {
        let target = self.wall.now_ms() + delay_ms as f64;
        self.enqueue(TaskKind::Relative, target, 0.0, callback)
    }

    fn enqueue(
        &mut self,
        kind: TaskKind,
        target: f64,
        epsilon: f64,
        callback: TaskCallback,
    ) -> Result<TaskId> {
        if self.state == SchedulerState::Disposed {
            return Err(Error::Scheduler(
                "cannot schedule on a disposed scheduler".to_string(),
            ));
        }

        let id = TaskId(self.next_id);
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        let created_at_ms = self.wall.now_ms();

        self.queue_mut(kind).push(ScheduledTask {
            id,
            kind,
            target,
            created_at_ms,
            seq,
            epsilon,
            callback,
        });
        self.stats.scheduled += 1;
        debug!("Scheduled {} ({:?}) at {:.3}", id, kind, target);
        Ok(id)
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let removed = self.media.remove(id) || self.relative.remove(id);
        if removed {
            self.stats.cancelled += 1;
            debug!("Cancelled {}", id);
        }
        removed
    }

    pub fn cancel_all(&mut self) -> usize {
        let removed = self.media.clear() + self.relative.clear();
        self.stats.cancelled += removed as u64;
        removed
    }

    pub fn cancel_by_kind(&mut self, kind: TaskKind) -> usize {
        let removed = self.queue_mut(kind).clear();
        self.stats.cancelled += removed as u64;
        if removed > 0 {
            debug!("Cancelled {} {:?} tasks", removed, kind);
        }
        removed
    }

    // ========================================================================
    // Clock integration
    // ========================================================================

    /// React to a clock event; runs due tasks where the event allows it
    pub fn on_clock_event(&mut self, event: &ClockEvent) -> TickStats {
        if self.state == SchedulerState::Disposed {
            return TickStats::default();
        }

        match *event {
            ClockEvent::TimeUpdate { time } => {
                self.media_time = time;
            }
            ClockEvent::Seeking { time } => {
                self.seeking = true;
                self.media_time = time;
                return TickStats::default();
            }
            ClockEvent::Seeked { time } => {
                self.seeking = false;
                self.media_time = time;
                let eps = self.config.epsilon;
                let dropped = self
                    .media
                    .retain(|task| !time::before(task.target, time, eps));
                self.record_dropped(dropped, "behind the seek position");
            }
            ClockEvent::Play => self.resume(),
            ClockEvent::Pause | ClockEvent::Ended => self.pause(),
            ClockEvent::DurationChange { duration } => {
                if duration.is_finite() {
                    let eps = self.config.epsilon;
                    let dropped = self
                        .media
                        .retain(|task| !time::before(duration, task.target, eps));
                    self.record_dropped(dropped, "past the new duration");
                }
            }
        }

        self.run_due()
    }

    /// Evaluate deferred work and wall-clock tasks between clock events
    pub fn pump(&mut self) -> TickStats {
        self.run_due()
    }

    fn record_dropped(&mut self, dropped: usize, why: &str) {
        if dropped > 0 {
            debug!("Dropped {} media-time tasks {}", dropped, why);
            self.stats.dropped += dropped as u64;
        }
    }

    fn media_runnable(&self) -> bool {
        self.state == SchedulerState::Running && !self.seeking
    }

    fn relative_runnable(&self) -> bool {
        matches!(
            self.state,
            SchedulerState::Running | SchedulerState::Paused
        )
    }

    fn next_due(&mut self, now_ms: f64) -> Option<ScheduledTask> {
        if self.media_runnable() {
            if let Some(task) = self.media.pop_due(self.media_time) {
                return Some(task);
            }
        }
        if self.relative_runnable() {
            return self.relative.pop_due(now_ms);
        }
        None
    }

    fn has_due(&self, now_ms: f64) -> bool {
        (self.media_runnable() && self.media.has_due(self.media_time))
            || (self.relative_runnable() && self.relative.has_due(now_ms))
    }

    fn run_due(&mut self) -> TickStats {
        let mut stats = TickStats::default();
        let started_ms = self.wall.now_ms();

        loop {
            let now_ms = self.wall.now_ms();
            let over_count =
                (stats.fired + stats.failed) as usize >= self.config.max_tasks_per_tick;
            let over_time = now_ms - started_ms >= self.config.max_batch_ms;
            if over_count || over_time {
                stats.deferred = self.has_due(now_ms);
                break;
            }

            let Some(task) = self.next_due(now_ms) else {
                break;
            };

            let id = task.id;
            trace!("Firing {} ({:?}) target {:.3}", id, task.kind, task.target);
            match guarded(task.callback) {
                Ok(()) => {
                    stats.fired += 1;
                    self.stats.fired += 1;
                }
                Err(e) => {
                    let fault = Error::Task {
                        id: id.0,
                        message: e.to_string(),
                    };
                    warn!("{}", fault);
                    stats.failed += 1;
                    self.stats.failed += 1;
                }
            }
        }

        if stats.deferred {
            debug!(
                "Batch limit hit after {} tasks; deferring remaining work",
                stats.fired + stats.failed
            );
            self.stats.deferred_batches += 1;
        }
        self.deferred = stats.deferred;
        stats
    }

    fn queue(&self, kind: TaskKind) -> &TaskQueue {
        match kind {
            TaskKind::MediaTime => &self.media,
            TaskKind::Relative => &self.relative,
        }
    }

    fn queue_mut(&mut self, kind: TaskKind) -> &mut TaskQueue {
        match kind {
            TaskKind::MediaTime => &mut self.media,
            TaskKind::Relative => &mut self.relative,
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state)
            .field("seeking", &self.seeking)
            .field("media_tasks", &self.media.len())
            .field("relative_tasks", &self.relative.len())
            .field("media_time", &self.media_time)
            .field("stats", &self.stats)
            .finish()
    }
}
