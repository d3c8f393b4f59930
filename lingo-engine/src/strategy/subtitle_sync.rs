//! Baseline subtitle tracking
//!
//! Keeps the active subtitle in step with the playback position. Emits a
//! suggestion only when the computed cue differs from the committed one; the
//! lock state machine decides whether the suggestion is applied.

use super::{Strategy, SUBTITLE_SYNC_PRIORITY};
use crate::context::PlaybackContext;
use crate::error::Result;
use crate::intent::Intent;
use crate::timeline::{LookupParams, SubtitleTimeline};
use tracing::trace;

pub const NAME: &str = "subtitle_sync";

#[derive(Debug)]
pub struct SubtitleSyncStrategy {
    timeline: SubtitleTimeline,
}

impl SubtitleSyncStrategy {
    pub fn new(params: LookupParams) -> Self {
        Self {
            timeline: SubtitleTimeline::new(Vec::new().into(), params),
        }
    }
}

impl Default for SubtitleSyncStrategy {
    fn default() -> Self {
        Self::new(LookupParams::default())
    }
}

impl Strategy for SubtitleSyncStrategy {
    fn name(&self) -> &str {
        NAME
    }

    fn priority(&self) -> i32 {
        SUBTITLE_SYNC_PRIORITY
    }

    fn should_activate(&self, ctx: &PlaybackContext) -> bool {
        ctx.has_subtitles()
    }

    fn on_event(&mut self, ctx: &PlaybackContext) -> Result<Vec<Intent>> {
        if self.timeline.sync_track(&ctx.subtitles) {
            trace!("subtitle_sync adopted track of {} cues", self.timeline.len());
        }

        let index = self.timeline.locate(ctx.current_time, ctx.active_cue_index);
        if index == ctx.active_cue_index {
            return Ok(Vec::new());
        }

        let reason = match index {
            Some(i) => format!("position {:.3}s maps to cue {}", ctx.current_time, i),
            None => format!("no cue near {:.3}s", ctx.current_time),
        };
        Ok(vec![Intent::suggest_subtitle(index).with_reason(reason)])
    }

    fn dispose(&mut self) {
        self.timeline = SubtitleTimeline::new(Vec::new().into(), LookupParams::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::context_at;
    use crate::intent::IntentPayload;

    fn suggested(intents: &[Intent]) -> Option<Option<usize>> {
        intents.iter().find_map(|i| match &i.payload {
            IntentPayload::Subtitle(s) => s.suggest_index,
            _ => None,
        })
    }

    #[test]
    fn test_suggests_cue_when_entering_window() {
        let mut strategy = SubtitleSyncStrategy::default();
        let intents = strategy.on_event(&context_at(12.0)).unwrap();
        assert_eq!(suggested(&intents), Some(Some(0)));
    }

    #[test]
    fn test_silent_when_already_active() {
        let mut strategy = SubtitleSyncStrategy::default();
        let mut ctx = context_at(12.0);
        ctx.active_cue_index = Some(0);
        assert!(strategy.on_event(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_suggests_none_in_gap() {
        let mut strategy = SubtitleSyncStrategy::default();
        let mut ctx = context_at(17.5);
        ctx.active_cue_index = Some(0);
        let intents = strategy.on_event(&ctx).unwrap();
        assert_eq!(suggested(&intents), Some(None));
    }

    #[test]
    fn test_inactive_without_subtitles() {
        let strategy = SubtitleSyncStrategy::default();
        let mut ctx = context_at(1.0);
        assert!(strategy.should_activate(&ctx));
        ctx.subtitles = Vec::new().into();
        assert!(!strategy.should_activate(&ctx));
    }
}
