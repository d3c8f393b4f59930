//! Single-subtitle looping
//!
//! On entering a subtitle window the strategy takes the subtitle lock (so the
//! active cue cannot drift away while looping) and resets the remaining count
//! to the configured loop count. Each time playback crosses the cue's end it
//! either seeks back to the cue start, consuming one repetition, or, once the
//! count is exhausted, releases the lock so playback continues normally.
//!
//! Crossings are detected from two consecutive samples. Seek ticks only
//! re-anchor the previous sample, so a jump across the end is never mistaken
//! for playback reaching it.

use super::{Strategy, LOOP_PRIORITY};
use crate::context::{LoopMode, PlaybackContext};
use crate::error::Result;
use crate::intent::Intent;
use crate::timeline::crossed_right_boundary;
use lingo_common::time::DEFAULT_EPSILON;
use lingo_common::SubtitleItem;
use tracing::debug;

/// Strategy name, also the lock owner
pub const NAME: &str = "loop";

/// Cue currently being looped
#[derive(Debug, Clone, Copy, PartialEq)]
struct LoopTarget {
    index: usize,
    id: u64,
    start: f64,
    end: f64,
    /// Track the cue was taken from
    generation: u64,
    /// Repetitions used up; playback continues past the end
    exhausted: bool,
}

impl LoopTarget {
    fn new(index: usize, item: &SubtitleItem, generation: u64) -> Self {
        Self {
            index,
            id: item.id,
            start: item.start_time,
            end: item.end_time,
            generation,
            exhausted: false,
        }
    }

    /// Target still refers to the same cue of the same track load
    ///
    /// A reload resets the lock and remaining count, so even an identical
    /// track invalidates the target.
    fn matches(&self, ctx: &PlaybackContext) -> bool {
        self.generation == ctx.track_generation
            && ctx.subtitle(self.index).is_some_and(|item| {
                item.id == self.id && item.start_time == self.start && item.end_time == self.end
            })
    }
}

#[derive(Debug)]
pub struct LoopStrategy {
    target: Option<LoopTarget>,
    last_time: Option<f64>,
    holds_lock: bool,
    epsilon: f64,
}

impl LoopStrategy {
    pub fn new(epsilon: f64) -> Self {
        Self {
            target: None,
            last_time: None,
            holds_lock: false,
            epsilon,
        }
    }

    fn reset(&mut self) {
        self.target = None;
        self.last_time = None;
        self.holds_lock = false;
    }

    /// Cue under the playhead, preferring the committed one
    fn cue_under_playhead(&self, ctx: &PlaybackContext) -> Option<usize> {
        let t = ctx.current_time;
        if let Some(i) = ctx.active_cue_index {
            if ctx.subtitle(i).is_some_and(|item| item.contains(t, self.epsilon)) {
                return Some(i);
            }
        }
        ctx.subtitles
            .iter()
            .position(|item| item.contains(t, self.epsilon))
    }

    fn enter(&mut self, index: usize, ctx: &PlaybackContext, intents: &mut Vec<Intent>) {
        let Some(item) = ctx.subtitle(index) else {
            return;
        };
        debug!(
            "Loop entering cue {} [{:.3}, {:.3}) x{}",
            index, item.start_time, item.end_time, ctx.loop_settings.count
        );
        self.target = Some(LoopTarget::new(index, item, ctx.track_generation));
        self.holds_lock = true;
        intents.push(
            Intent::lock_subtitle(NAME, Some(index)).with_reason(format!("looping cue {}", index)),
        );
        intents.push(
            Intent::set_loop_remaining(ctx.loop_settings.count)
                .with_reason(format!("new loop target {}", index)),
        );
    }

    fn release(&mut self, reason: String, intents: &mut Vec<Intent>) {
        if self.holds_lock {
            self.holds_lock = false;
            intents.push(Intent::unlock_subtitle(NAME).with_reason(reason));
        }
    }
}

impl Default for LoopStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl Strategy for LoopStrategy {
    fn name(&self) -> &str {
        NAME
    }

    fn priority(&self) -> i32 {
        LOOP_PRIORITY
    }

    fn should_activate(&self, ctx: &PlaybackContext) -> bool {
        ctx.loop_settings.enabled
            && ctx.loop_settings.mode == LoopMode::Single
            && ctx.has_subtitles()
    }

    fn on_activate(&mut self, _ctx: &PlaybackContext) -> Result<Vec<Intent>> {
        self.reset();
        Ok(Vec::new())
    }

    fn on_event(&mut self, ctx: &PlaybackContext) -> Result<Vec<Intent>> {
        let mut intents = Vec::new();
        let now = ctx.current_time;
        let prev = self.last_time.replace(now);

        if self.target.is_some_and(|t| !t.matches(ctx)) {
            debug!("Loop target no longer in track, dropping it");
            self.target = None;
            self.holds_lock = false;
        }

        let under = self.cue_under_playhead(ctx);

        let Some(target) = self.target else {
            if let Some(index) = under {
                self.enter(index, ctx, &mut intents);
            }
            return Ok(intents);
        };

        // The end of the current target wins over the cue after it, so a cue
        // that starts exactly where the target ends does not steal the loop
        let crossed = !ctx.event.is_seek()
            && !target.exhausted
            && prev.is_some_and(|p| crossed_right_boundary(p, now, target.end, self.epsilon));

        if crossed {
            let remaining = ctx.loop_settings.remaining;
            if remaining != 0 {
                debug!(
                    "Loop cue {} ended, seeking back to {:.3} (remaining {})",
                    target.index, target.start, remaining
                );
                intents.push(
                    Intent::seek(target.start, true)
                        .with_reason(format!("repeat cue {}", target.index)),
                );
                if remaining > 0 {
                    intents.push(
                        Intent::delta_loop_remaining(-1)
                            .with_reason(format!("repetition of cue {}", target.index)),
                    );
                }
            } else {
                debug!("Loop cue {} exhausted, releasing lock", target.index);
                if let Some(t) = self.target.as_mut() {
                    t.exhausted = true;
                }
                self.release(format!("loops of cue {} exhausted", target.index), &mut intents);
            }
        } else if let Some(index) = under {
            if index != target.index {
                // Playback (or a seek) moved into a different cue
                self.enter(index, ctx, &mut intents);
            } else if target.exhausted && ctx.event.is_seek() {
                debug!("Seek back into exhausted cue {}, re-arming loop", index);
                self.enter(index, ctx, &mut intents);
            }
        }

        Ok(intents)
    }

    fn on_deactivate(&mut self, _ctx: &PlaybackContext) -> Result<Vec<Intent>> {
        self.reset();
        Ok(vec![
            Intent::unlock_subtitle(NAME).with_reason("looping disabled")
        ])
    }

    fn dispose(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockEvent;
    use crate::context::fixtures::context_at;
    use crate::intent::{IntentPayload, LoopIntent, SubtitleIntent};
    use std::sync::Arc;

    fn looping_context(time: f64, remaining: i32) -> PlaybackContext {
        let mut ctx = context_at(time);
        ctx.loop_settings.enabled = true;
        ctx.loop_settings.count = 2;
        ctx.loop_settings.remaining = remaining;
        ctx.active_cue_index = Some(0);
        ctx
    }

    fn has_lock(intents: &[Intent], lock: bool) -> bool {
        intents.iter().any(|i| {
            matches!(&i.payload, IntentPayload::Subtitle(SubtitleIntent { lock: Some(l), owner: Some(o), .. }) if *l == lock && o == NAME)
        })
    }

    #[test]
    fn test_first_tick_in_window_locks_and_resets() {
        let mut strategy = LoopStrategy::default();
        let ctx = looping_context(10.0, 0);
        assert!(strategy.should_activate(&ctx));

        let intents = strategy.on_event(&ctx).unwrap();
        assert!(has_lock(&intents, true));
        assert!(intents.iter().any(|i| i.payload
            == IntentPayload::Loop(LoopIntent {
                set_remaining: Some(2),
                ..Default::default()
            })));
    }

    #[test]
    fn test_crossing_seeks_back_and_decrements() {
        let mut strategy = LoopStrategy::default();
        strategy.on_event(&looping_context(10.0, 0)).unwrap();
        assert!(strategy.on_event(&looping_context(14.9, 2)).unwrap().is_empty());

        let intents = strategy.on_event(&looping_context(15.1, 2)).unwrap();
        assert_eq!(intents.len(), 2);
        assert_eq!(
            intents[0].payload,
            IntentPayload::Seek {
                to: 10.0,
                follow_up_play: true
            }
        );
        assert_eq!(
            intents[1].payload,
            IntentPayload::Loop(LoopIntent {
                delta_remaining: Some(-1),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_infinite_loop_does_not_decrement() {
        let mut strategy = LoopStrategy::default();
        strategy.on_event(&looping_context(14.9, -1)).unwrap();
        let intents = strategy.on_event(&looping_context(15.05, -1)).unwrap();
        assert_eq!(intents.len(), 1);
        assert!(matches!(intents[0].payload, IntentPayload::Seek { .. }));
    }

    #[test]
    fn test_exhausted_count_releases_lock_once() {
        let mut strategy = LoopStrategy::default();
        strategy.on_event(&looping_context(14.9, 0)).unwrap();

        let intents = strategy.on_event(&looping_context(15.1, 0)).unwrap();
        assert!(has_lock(&intents, false));

        // Playing on past the end does nothing further
        assert!(strategy.on_event(&looping_context(15.3, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_seek_across_end_is_not_a_crossing() {
        let mut strategy = LoopStrategy::default();
        strategy.on_event(&looping_context(12.0, 2)).unwrap();

        let mut seek = looping_context(17.0, 2);
        seek.event = ClockEvent::Seeked { time: 17.0 };
        assert!(strategy.on_event(&seek).unwrap().is_empty());
        assert!(strategy.on_event(&looping_context(17.2, 2)).unwrap().is_empty());
    }

    #[test]
    fn test_moving_into_next_cue_retargets() {
        let mut strategy = LoopStrategy::default();
        strategy.on_event(&looping_context(12.0, 2)).unwrap();

        let mut ctx = looping_context(21.0, 0);
        ctx.active_cue_index = Some(1);
        let intents = strategy.on_event(&ctx).unwrap();
        assert!(intents.iter().any(|i| matches!(
            &i.payload,
            IntentPayload::Subtitle(SubtitleIntent { lock: Some(true), lock_index: Some(1), .. })
        )));
    }

    #[test]
    fn test_adjacent_cue_does_not_steal_the_crossing() {
        let adjacent: Arc<[SubtitleItem]> = vec![
            SubtitleItem::new(1, 10.0, 15.0, "uno"),
            SubtitleItem::new(2, 15.0, 20.0, "dos"),
        ]
        .into();
        let at = |time: f64| {
            let mut ctx = looping_context(time, 2);
            ctx.subtitles = Arc::clone(&adjacent);
            ctx
        };

        let mut strategy = LoopStrategy::default();
        strategy.on_event(&at(14.9)).unwrap();
        let intents = strategy.on_event(&at(15.05)).unwrap();

        assert!(matches!(
            intents[0].payload,
            IntentPayload::Seek { to, follow_up_play: true } if to == 10.0
        ));
        assert!(!has_lock(&intents, true));
    }

    #[test]
    fn test_track_reload_relocks_same_cue() {
        let mut strategy = LoopStrategy::default();
        assert!(has_lock(&strategy.on_event(&looping_context(12.0, 2)).unwrap(), true));

        let mut reloaded = looping_context(13.0, 0);
        reloaded.track_generation = 1;
        reloaded.active_cue_index = None;
        let intents = strategy.on_event(&reloaded).unwrap();
        assert!(has_lock(&intents, true));
        assert!(intents.iter().any(|i| i.payload
            == IntentPayload::Loop(LoopIntent {
                set_remaining: Some(2),
                ..Default::default()
            })));
    }

    #[test]
    fn test_seek_back_into_exhausted_cue_rearms() {
        let mut strategy = LoopStrategy::default();
        strategy.on_event(&looping_context(14.9, 0)).unwrap();
        assert!(has_lock(&strategy.on_event(&looping_context(15.1, 0)).unwrap(), false));

        let mut seek = looping_context(11.0, 0);
        seek.event = ClockEvent::Seeking { time: 11.0 };
        let intents = strategy.on_event(&seek).unwrap();
        assert!(has_lock(&intents, true));

        // Re-armed: the next crossing repeats again
        strategy.on_event(&looping_context(14.9, 2)).unwrap();
        let intents = strategy.on_event(&looping_context(15.1, 2)).unwrap();
        assert!(matches!(intents[0].payload, IntentPayload::Seek { .. }));
    }

    #[test]
    fn test_deactivate_always_unlocks() {
        let mut strategy = LoopStrategy::default();
        let intents = strategy.on_deactivate(&looping_context(3.0, 0)).unwrap();
        assert!(has_lock(&intents, false));
    }

    #[test]
    fn test_inactive_for_ab_mode_or_disabled() {
        let strategy = LoopStrategy::default();
        let mut ctx = looping_context(10.0, 0);
        ctx.loop_settings.mode = LoopMode::AB;
        assert!(!strategy.should_activate(&ctx));

        let mut ctx = looping_context(10.0, 0);
        ctx.loop_settings.enabled = false;
        assert!(!strategy.should_activate(&ctx));
    }
}
