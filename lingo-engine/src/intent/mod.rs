//! Behavioral intents
//!
//! An [`Intent`] is a non-binding proposal emitted by a strategy for exactly
//! one [`Domain`]. Intents live for a single tick: the collector gathers them,
//! the reducers turn them into a [`Resolution`](crate::reducer::Resolution),
//! and they are dropped.
//!
//! Priority is optional on construction; the collector fills in the emitting
//! strategy's priority when a strategy leaves it unset.

pub mod collector;

pub use collector::{Collection, IntentCollector};

use crate::context::LoopMode;
use serde::{Deserialize, Serialize};

/// Behavioral domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Transport,
    Seek,
    Subtitle,
    Loop,
    Schedule,
    Ui,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::Transport,
        Domain::Seek,
        Domain::Subtitle,
        Domain::Loop,
        Domain::Schedule,
        Domain::Ui,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Transport => "transport",
            Domain::Seek => "seek",
            Domain::Subtitle => "subtitle",
            Domain::Loop => "loop",
            Domain::Schedule => "schedule",
            Domain::Ui => "ui",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Play/pause operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportOp {
    Play,
    Pause,
}

/// Delayed action carried by a schedule intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledAction {
    /// Resume playback (auto-resume after auto-pause)
    ResumePlayback,
    Pause,
    /// Close the auto-resume countdown panel
    HideResumeCountdown,
}

/// Auto-resume countdown panel update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CountdownUpdate {
    Open { duration_ms: u64 },
    Close,
}

/// Requested UI state changes; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_countdown: Option<CountdownUpdate>,

    /// Short status line (e.g. "Loop 2/3")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl UiPatch {
    /// Overlay `other` on top of `self` (last write wins per field)
    pub fn merge(&mut self, other: &UiPatch) {
        if other.resume_countdown.is_some() {
            self.resume_countdown = other.resume_countdown;
        }
        if other.status.is_some() {
            self.status = other.status.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resume_countdown.is_none() && self.status.is_none()
    }
}

/// Subtitle domain payload
///
/// Carries either an index suggestion, a lock request, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubtitleIntent {
    /// Proposed active cue; `Some(None)` proposes "no active subtitle"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggest_index: Option<Option<usize>>,

    /// `Some(true)` = lock, `Some(false)` = unlock
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock: Option<bool>,

    /// Lock owner; defaults to the emitting strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Index to hold when locking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_index: Option<usize>,
}

/// Loop domain payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopIntent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_remaining: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_remaining: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_mode: Option<LoopMode>,
}

/// Domain-specific payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "domain", rename_all = "lowercase")]
pub enum IntentPayload {
    Transport {
        op: TransportOp,
    },
    Seek {
        to: f64,
        follow_up_play: bool,
    },
    Subtitle(SubtitleIntent),
    Loop(LoopIntent),
    Schedule {
        action: ScheduledAction,
        delay_ms: u64,
    },
    Ui(UiPatch),
}

/// A proposed action for one domain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intent {
    #[serde(flatten)]
    pub payload: IntentPayload,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Name of the emitting strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Intent {
    pub fn new(payload: IntentPayload) -> Self {
        Self {
            payload,
            priority: None,
            reason: None,
            source: None,
        }
    }

    pub fn transport(op: TransportOp) -> Self {
        Self::new(IntentPayload::Transport { op })
    }

    pub fn seek(to: f64, follow_up_play: bool) -> Self {
        Self::new(IntentPayload::Seek { to, follow_up_play })
    }

    pub fn suggest_subtitle(index: Option<usize>) -> Self {
        Self::new(IntentPayload::Subtitle(SubtitleIntent {
            suggest_index: Some(index),
            ..Default::default()
        }))
    }

    pub fn lock_subtitle(owner: &str, index: Option<usize>) -> Self {
        Self::new(IntentPayload::Subtitle(SubtitleIntent {
            lock: Some(true),
            owner: Some(owner.to_string()),
            lock_index: index,
            ..Default::default()
        }))
    }

    pub fn unlock_subtitle(owner: &str) -> Self {
        Self::new(IntentPayload::Subtitle(SubtitleIntent {
            lock: Some(false),
            owner: Some(owner.to_string()),
            ..Default::default()
        }))
    }

    pub fn set_loop_remaining(remaining: i32) -> Self {
        Self::new(IntentPayload::Loop(LoopIntent {
            set_remaining: Some(remaining),
            ..Default::default()
        }))
    }

    pub fn delta_loop_remaining(delta: i32) -> Self {
        Self::new(IntentPayload::Loop(LoopIntent {
            delta_remaining: Some(delta),
            ..Default::default()
        }))
    }

    pub fn set_loop_mode(mode: LoopMode) -> Self {
        Self::new(IntentPayload::Loop(LoopIntent {
            set_mode: Some(mode),
            ..Default::default()
        }))
    }

    pub fn schedule(action: ScheduledAction, delay_ms: u64) -> Self {
        Self::new(IntentPayload::Schedule { action, delay_ms })
    }

    pub fn ui(patch: UiPatch) -> Self {
        Self::new(IntentPayload::Ui(patch))
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn domain(&self) -> Domain {
        match self.payload {
            IntentPayload::Transport { .. } => Domain::Transport,
            IntentPayload::Seek { .. } => Domain::Seek,
            IntentPayload::Subtitle(_) => Domain::Subtitle,
            IntentPayload::Loop(_) => Domain::Loop,
            IntentPayload::Schedule { .. } => Domain::Schedule,
            IntentPayload::Ui(_) => Domain::Ui,
        }
    }

    /// Priority used for arbitration (unset counts as 0)
    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(0)
    }

    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or("unknown")
    }
}

/// Pick the highest-priority item; on ties the later item wins
///
/// Emission order, not magnitude, breaks ties.
pub fn select_highest<'a, T>(
    items: impl IntoIterator<Item = (&'a Intent, T)>,
) -> Option<(&'a Intent, T)> {
    let mut best: Option<(&'a Intent, T)> = None;
    for (intent, value) in items {
        let replace = match &best {
            Some((current, _)) => intent.effective_priority() >= current.effective_priority(),
            None => true,
        };
        if replace {
            best = Some((intent, value));
        }
    }
    best
}
