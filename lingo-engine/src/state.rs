//! Carried-over player state
//!
//! Everything that persists between ticks apart from the lock FSM and the
//! scheduler queue. Clock events update it first thing in a tick; committed
//! reducer decisions update it last.

use crate::clock::ClockEvent;
use crate::context::{AutoPauseSettings, LoopSettings, PlaybackContext};
use crate::reducer::LoopDecision;
use lingo_common::SubtitleItem;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    pub current_time: f64,
    pub duration: f64,
    pub paused: bool,
    pub playback_rate: f64,
    pub volume: f64,
    pub active_cue_index: Option<usize>,
    #[serde(skip)]
    pub subtitles: Arc<[SubtitleItem]>,
    /// Bumped on every track load
    pub track_generation: u64,
    pub loop_settings: LoopSettings,
    pub auto_pause: AutoPauseSettings,
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            current_time: 0.0,
            duration: 0.0,
            paused: true,
            playback_rate: 1.0,
            volume: 1.0,
            active_cue_index: None,
            subtitles: Arc::from(Vec::new()),
            track_generation: 0,
            loop_settings: LoopSettings::default(),
            auto_pause: AutoPauseSettings::default(),
        }
    }

    /// Fold a clock event into the state
    pub fn apply_event(&mut self, event: &ClockEvent) {
        match *event {
            ClockEvent::TimeUpdate { time }
            | ClockEvent::Seeking { time }
            | ClockEvent::Seeked { time } => self.current_time = time,
            ClockEvent::Play => self.paused = false,
            ClockEvent::Pause | ClockEvent::Ended => self.paused = true,
            ClockEvent::DurationChange { duration } => self.duration = duration,
        }
    }

    /// Read-only snapshot for one tick
    pub fn snapshot(&self, tick: u64, event: ClockEvent) -> PlaybackContext {
        PlaybackContext {
            tick,
            event,
            current_time: self.current_time,
            duration: self.duration,
            paused: self.paused,
            playback_rate: self.playback_rate,
            volume: self.volume,
            active_cue_index: self.active_cue_index,
            subtitles: Arc::clone(&self.subtitles),
            track_generation: self.track_generation,
            loop_settings: self.loop_settings,
            auto_pause: self.auto_pause,
        }
    }

    pub fn commit_loop(&mut self, decision: &LoopDecision) {
        self.loop_settings.remaining = decision.remaining;
        if let Some(mode) = decision.mode {
            self.loop_settings.mode = mode;
        }
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}
