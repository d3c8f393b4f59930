//! Pause at subtitle end
//!
//! When playback crosses the end of a subtitle, request a pause so the
//! learner can process the line. With auto-resume enabled the configured
//! [`AutoResumePolicy`] decides how playback comes back:
//!
//! - `Countdown`: open the countdown panel; the UI resumes when it runs out
//! - `Scheduled`: open the panel and also schedule a resume after the delay
//! - `Disabled`: no automatic resume

use super::{Strategy, AUTO_PAUSE_PRIORITY};
use crate::clock::ClockEvent;
use crate::context::PlaybackContext;
use crate::error::Result;
use crate::intent::{CountdownUpdate, Intent, ScheduledAction, TransportOp, UiPatch};
use crate::timeline::crossed_right_boundary;
use lingo_common::config::AutoResumePolicy;
use lingo_common::time::DEFAULT_EPSILON;
use tracing::debug;

pub const NAME: &str = "auto_pause";

#[derive(Debug)]
pub struct AutoPauseStrategy {
    last_time: Option<f64>,
    countdown_open: bool,
    epsilon: f64,
}

impl AutoPauseStrategy {
    pub fn new(epsilon: f64) -> Self {
        Self {
            last_time: None,
            countdown_open: false,
            epsilon,
        }
    }

    /// Cue whose end lies between the two samples, preferring the active cue
    fn crossed_cue(&self, prev: f64, ctx: &PlaybackContext) -> Option<usize> {
        let now = ctx.current_time;
        let crossed = |end: f64| crossed_right_boundary(prev, now, end, self.epsilon);

        if let Some(i) = ctx.active_cue_index {
            if ctx.subtitle(i).is_some_and(|item| crossed(item.end_time)) {
                return Some(i);
            }
        }
        ctx.subtitles.iter().position(|item| crossed(item.end_time))
    }

    fn close_countdown(&mut self, reason: &str) -> Vec<Intent> {
        if !self.countdown_open {
            return Vec::new();
        }
        self.countdown_open = false;
        vec![Intent::ui(UiPatch {
            resume_countdown: Some(CountdownUpdate::Close),
            ..Default::default()
        })
        .with_reason(reason)]
    }
}

impl Default for AutoPauseStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl Strategy for AutoPauseStrategy {
    fn name(&self) -> &str {
        NAME
    }

    fn priority(&self) -> i32 {
        AUTO_PAUSE_PRIORITY
    }

    fn should_activate(&self, ctx: &PlaybackContext) -> bool {
        ctx.auto_pause.enabled && ctx.has_subtitles()
    }

    fn on_activate(&mut self, _ctx: &PlaybackContext) -> Result<Vec<Intent>> {
        self.last_time = None;
        self.countdown_open = false;
        Ok(Vec::new())
    }

    fn on_event(&mut self, ctx: &PlaybackContext) -> Result<Vec<Intent>> {
        let prev = self.last_time.replace(ctx.current_time);

        match ctx.event {
            ClockEvent::Play => return Ok(self.close_countdown("playback resumed")),
            ClockEvent::TimeUpdate { .. } => {}
            _ => return Ok(Vec::new()),
        }

        if ctx.paused {
            return Ok(Vec::new());
        }
        let Some(index) = prev.and_then(|p| self.crossed_cue(p, ctx)) else {
            return Ok(Vec::new());
        };

        debug!(
            "Auto-pause at end of cue {} ({:.3}s)",
            index, ctx.current_time
        );
        let mut intents = vec![Intent::transport(TransportOp::Pause)
            .with_reason(format!("cue {} ended", index))];

        let settings = &ctx.auto_pause;
        if settings.auto_resume && settings.resume_policy != AutoResumePolicy::Disabled {
            self.countdown_open = true;
            intents.push(
                Intent::ui(UiPatch {
                    resume_countdown: Some(CountdownUpdate::Open {
                        duration_ms: settings.resume_delay_ms,
                    }),
                    ..Default::default()
                })
                .with_reason("auto-resume countdown"),
            );

            if settings.resume_policy == AutoResumePolicy::Scheduled {
                intents.push(
                    Intent::schedule(ScheduledAction::ResumePlayback, settings.resume_delay_ms)
                        .with_reason("scheduled auto-resume"),
                );
            }
        }

        Ok(intents)
    }

    fn on_deactivate(&mut self, _ctx: &PlaybackContext) -> Result<Vec<Intent>> {
        self.last_time = None;
        Ok(self.close_countdown("auto-pause disabled"))
    }

    fn dispose(&mut self) {
        self.last_time = None;
        self.countdown_open = false;
    }
}
