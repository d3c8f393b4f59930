//! Effect planning and execution
//!
//! A [`Resolution`] is turned into an ordered [`EffectPlan`] and executed
//! against the media transport and presentation layer only after reduction
//! has finished, so effects never interleave with collection or reduction.
//!
//! **Plan order:** seek, transport op, follow-up play, subtitle change, UI
//! patch, scheduled actions.

use crate::context::PlaybackContext;
use crate::error::Result;
use crate::intent::{ScheduledAction, TransportOp, UiPatch};
use crate::reducer::Resolution;
use lingo_common::SubtitleItem;
use serde::Serialize;
use tracing::{debug, trace};

/// Media element commands
pub trait MediaTransport {
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn seek_to(&mut self, time: f64) -> Result<()>;
    fn current_time(&self) -> f64;
}

/// UI layer: renders the committed subtitle and applies UI patches
pub trait PresentationSink {
    fn show_subtitle(&mut self, index: Option<usize>, item: Option<&SubtitleItem>);
    fn apply_ui(&mut self, patch: &UiPatch);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn show_subtitle(&mut self, _index: Option<usize>, _item: Option<&SubtitleItem>) {}
    fn apply_ui(&mut self, _patch: &UiPatch) {}
}

/// One side effect
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Seek { to: f64 },
    Play,
    Pause,
    ShowSubtitle { index: Option<usize> },
    Ui(UiPatch),
    Schedule { action: ScheduledAction, delay_ms: u64 },
}

impl Effect {
    fn from_op(op: TransportOp) -> Self {
        match op {
            TransportOp::Play => Effect::Play,
            TransportOp::Pause => Effect::Pause,
        }
    }
}

/// Ordered effects for one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EffectPlan {
    effects: Vec<Effect>,
}

impl EffectPlan {
    pub fn from_resolution(resolution: &Resolution, ctx: &PlaybackContext) -> Self {
        let mut effects = Vec::new();

        if let Some(seek) = &resolution.seek {
            effects.push(Effect::Seek { to: seek.to });
        }
        if let Some(transport) = &resolution.transport {
            effects.push(Effect::from_op(transport.op));
        }
        // A pause decided in the same tick beats the seek's follow-up play
        if resolution
            .seek
            .as_ref()
            .is_some_and(|seek| seek.follow_up_play)
            && resolution.transport.is_none()
        {
            effects.push(Effect::Play);
        }
        if let Some(index) = resolution.subtitle.as_ref().and_then(|s| s.index) {
            if index != ctx.active_cue_index {
                effects.push(Effect::ShowSubtitle { index });
            }
        }
        if let Some(patch) = resolution.ui.as_ref().filter(|p| !p.is_empty()) {
            effects.push(Effect::Ui(patch.clone()));
        }
        if let Some(schedule) = &resolution.schedule {
            effects.extend(schedule.entries.iter().map(|entry| Effect::Schedule {
                action: entry.action,
                delay_ms: entry.delay_ms,
            }));
        }

        Self { effects }
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn into_effects(self) -> Vec<Effect> {
        self.effects
    }
}

/// Applies effects to the transport and presentation layer
///
/// `Schedule` effects belong to the engine's scheduler and are skipped here.
pub struct EffectExecutor<'a> {
    transport: &'a mut dyn MediaTransport,
    sink: &'a mut dyn PresentationSink,
}

impl<'a> EffectExecutor<'a> {
    pub fn new(transport: &'a mut dyn MediaTransport, sink: &'a mut dyn PresentationSink) -> Self {
        Self { transport, sink }
    }

    pub fn execute(&mut self, effect: &Effect, subtitles: &[SubtitleItem]) -> Result<()> {
        trace!("Executing {:?}", effect);
        match effect {
            Effect::Seek { to } => {
                debug!(
                    "Seek {:.3}s -> {:.3}s",
                    self.transport.current_time(),
                    to
                );
                self.transport.seek_to(*to)
            }
            Effect::Play => self.transport.play(),
            Effect::Pause => self.transport.pause(),
            Effect::ShowSubtitle { index } => {
                let item = index.and_then(|i| subtitles.get(i));
                self.sink.show_subtitle(*index, item);
                Ok(())
            }
            Effect::Ui(patch) => {
                self.sink.apply_ui(patch);
                Ok(())
            }
            Effect::Schedule { .. } => Ok(()),
        }
    }
}
