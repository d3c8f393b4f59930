//! Clock sources
//!
//! Two clocks drive the engine:
//!
//! - **Media clock**: playback position, duration and paused state. The host's
//!   media element reports changes as [`ClockEvent`]s; each one is one tick.
//!   [`MediaClock`] is an in-process simulation of such an element used by the
//!   simulator and tests.
//! - **Wall clock**: monotonic milliseconds, used for relative scheduler tasks
//!   and batch time boxing. Abstracted behind [`WallClock`] so tests can step
//!   time manually.

use crate::effects::MediaTransport;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// Notification from the media clock
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClockEvent {
    /// Periodic position report while playing
    TimeUpdate { time: f64 },
    /// A seek started toward `time`
    Seeking { time: f64 },
    /// A seek completed; playback is now at `time`
    Seeked { time: f64 },
    Play,
    Pause,
    DurationChange { duration: f64 },
    Ended,
}

impl ClockEvent {
    /// Short event name for logs and traces
    pub fn name(&self) -> &'static str {
        match self {
            ClockEvent::TimeUpdate { .. } => "time_update",
            ClockEvent::Seeking { .. } => "seeking",
            ClockEvent::Seeked { .. } => "seeked",
            ClockEvent::Play => "play",
            ClockEvent::Pause => "pause",
            ClockEvent::DurationChange { .. } => "duration_change",
            ClockEvent::Ended => "ended",
        }
    }

    /// Media position carried by the event, if any
    pub fn time(&self) -> Option<f64> {
        match self {
            ClockEvent::TimeUpdate { time }
            | ClockEvent::Seeking { time }
            | ClockEvent::Seeked { time } => Some(*time),
            _ => None,
        }
    }

    /// Position discontinuity (seek in progress or just finished)
    pub fn is_seek(&self) -> bool {
        matches!(self, ClockEvent::Seeking { .. } | ClockEvent::Seeked { .. })
    }
}

/// Monotonic wall-clock source in milliseconds
pub trait WallClock: Send + Sync {
    fn now_ms(&self) -> f64;
}

/// Wall clock backed by `std::time::Instant`
#[derive(Debug, Clone)]
pub struct SystemWallClock {
    origin: Instant,
}

impl SystemWallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemWallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for SystemWallClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually stepped wall clock
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualWallClock {
    bits: Arc<AtomicU64>,
}

impl ManualWallClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start_ms.to_bits())),
        }
    }

    pub fn set(&self, ms: f64) {
        self.bits.store(ms.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, ms: f64) {
        self.set(self.now_ms() + ms);
    }
}

impl WallClock for ManualWallClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// Simulated media element
///
/// Holds position, duration and paused state, accepts transport commands and
/// queues the [`ClockEvent`]s a real element would emit. Callers drain the
/// queue with [`MediaClock::drain_events`] and feed each event to the engine.
#[derive(Debug, Clone)]
pub struct MediaClock {
    time: f64,
    duration: f64,
    paused: bool,
    rate: f64,
    pending: VecDeque<ClockEvent>,
}

impl MediaClock {
    /// Create a paused clock at position 0
    pub fn new(duration: f64) -> Self {
        let mut clock = Self {
            time: 0.0,
            duration: 0.0,
            paused: true,
            rate: 1.0,
            pending: VecDeque::new(),
        };
        clock.set_duration(duration);
        clock
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate > 0.0 {
            self.rate = rate;
        }
    }

    /// Change the media duration (e.g. metadata loaded)
    pub fn set_duration(&mut self, duration: f64) {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        self.duration = duration;
        if self.time > duration {
            self.time = duration;
        }
        self.pending.push_back(ClockEvent::DurationChange { duration });
    }

    /// Advance playback by `wall_secs` of real time
    ///
    /// No-op while paused. Reaching the duration emits the final time update,
    /// then `Pause` and `Ended`.
    pub fn advance(&mut self, wall_secs: f64) {
        if self.paused {
            return;
        }

        let next = self.time + wall_secs * self.rate;
        if next >= self.duration {
            self.time = self.duration;
            self.paused = true;
            self.pending.push_back(ClockEvent::TimeUpdate { time: self.time });
            self.pending.push_back(ClockEvent::Pause);
            self.pending.push_back(ClockEvent::Ended);
        } else {
            self.time = next;
            self.pending.push_back(ClockEvent::TimeUpdate { time: self.time });
        }
    }

    /// Take all queued events in emission order
    pub fn drain_events(&mut self) -> Vec<ClockEvent> {
        self.pending.drain(..).collect()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }
}

impl MediaTransport for MediaClock {
    fn play(&mut self) -> Result<()> {
        if self.paused {
            if self.time >= self.duration {
                // Restart from the top like a media element after `ended`
                self.seek_to(0.0)?;
            }
            self.paused = false;
            self.pending.push_back(ClockEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if !self.paused {
            self.paused = true;
            self.pending.push_back(ClockEvent::Pause);
        }
        Ok(())
    }

    fn seek_to(&mut self, time: f64) -> Result<()> {
        let target = time.clamp(0.0, self.duration);
        trace!("MediaClock seek {} -> {}", self.time, target);
        self.pending.push_back(ClockEvent::Seeking { time: target });
        self.time = target;
        self.pending.push_back(ClockEvent::Seeked { time: target });
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.time
    }
}
