//! Per-tick playback snapshot
//!
//! A [`PlaybackContext`] is rebuilt from engine state for every tick and
//! handed to strategies and reducers by shared reference. It holds no hidden
//! state; the subtitle list is shared through an `Arc` so rebuilding is cheap.

use crate::clock::ClockEvent;
use lingo_common::config::AutoResumePolicy;
use lingo_common::SubtitleItem;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Remaining-count value meaning "loop forever"
pub const INFINITE_LOOPS: i32 = -1;

/// Loop mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Repeat the current subtitle
    #[default]
    Single,
    /// Repeat between two marks (not driven by any strategy yet)
    AB,
}

impl std::fmt::Display for LoopMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopMode::Single => write!(f, "single"),
            LoopMode::AB => write!(f, "ab"),
        }
    }
}

/// Loop configuration plus the carried-over remaining count
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopSettings {
    pub enabled: bool,
    pub mode: LoopMode,
    /// Repetitions per subtitle (`-1` = infinite)
    pub count: i32,
    /// Repetitions left for the current subtitle (`-1` = infinite)
    pub remaining: i32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: LoopMode::Single,
            count: 1,
            remaining: 0,
        }
    }
}

/// Auto-pause configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoPauseSettings {
    /// Pause when a subtitle ends
    pub enabled: bool,
    /// Offer to resume automatically after `resume_delay_ms`
    pub auto_resume: bool,
    pub resume_delay_ms: u64,
    pub resume_policy: AutoResumePolicy,
}

impl Default for AutoPauseSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_resume: false,
            resume_delay_ms: 3000,
            resume_policy: AutoResumePolicy::default(),
        }
    }
}

/// Read-only snapshot of playback state for one tick
#[derive(Debug, Clone)]
pub struct PlaybackContext {
    /// Sequence number of the tick
    pub tick: u64,
    /// Clock event that triggered the tick
    pub event: ClockEvent,
    pub current_time: f64,
    pub duration: f64,
    pub paused: bool,
    pub playback_rate: f64,
    pub volume: f64,
    /// Currently committed subtitle (`None` = no active subtitle)
    pub active_cue_index: Option<usize>,
    pub subtitles: Arc<[SubtitleItem]>,
    /// Identifies the loaded track; changes whenever a track is (re)loaded
    pub track_generation: u64,
    pub loop_settings: LoopSettings,
    pub auto_pause: AutoPauseSettings,
}

impl PlaybackContext {
    /// Subtitle at `index`, if it exists in the current list
    pub fn subtitle(&self, index: usize) -> Option<&SubtitleItem> {
        self.subtitles.get(index)
    }

    /// The committed subtitle, if any
    pub fn active_subtitle(&self) -> Option<&SubtitleItem> {
        self.active_cue_index.and_then(|i| self.subtitle(i))
    }

    pub fn has_subtitles(&self) -> bool {
        !self.subtitles.is_empty()
    }
}
