//! Seek reducer: one target per tick, clamped to the media

use super::reducer_error;
use crate::context::PlaybackContext;
use crate::error::Result;
use crate::intent::{select_highest, Domain, Intent, IntentPayload};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeekDecision {
    /// Target position in seconds, within `[0, duration]`
    pub to: f64,
    /// Resume playback once the seek is issued
    pub follow_up_play: bool,
    pub source: String,
}

pub fn reduce(intents: &[Intent], ctx: &PlaybackContext) -> Result<Option<SeekDecision>> {
    let winner = select_highest(intents.iter().filter_map(|intent| match intent.payload {
        IntentPayload::Seek { to, follow_up_play } => Some((intent, (to, follow_up_play))),
        _ => None,
    }));

    let Some((intent, (to, follow_up_play))) = winner else {
        return Ok(None);
    };
    if !to.is_finite() {
        return Err(reducer_error(
            Domain::Seek,
            format!("non-finite seek target {} from '{}'", to, intent.source_name()),
        ));
    }

    Ok(Some(SeekDecision {
        to: clamp_to_media(to, ctx.duration),
        follow_up_play,
        source: intent.source_name().to_string(),
    }))
}

/// Clamp into `[0, duration]`; an unknown duration only bounds below
fn clamp_to_media(to: f64, duration: f64) -> f64 {
    let to = to.max(0.0);
    if duration.is_finite() && duration > 0.0 {
        to.min(duration)
    } else {
        to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::context_at;

    #[test]
    fn test_clamps_into_duration() {
        let ctx = context_at(0.0);
        let late = reduce(&[Intent::seek(90.0, false)], &ctx).unwrap().unwrap();
        assert_eq!(late.to, 60.0);

        let early = reduce(&[Intent::seek(-4.0, true)], &ctx).unwrap().unwrap();
        assert_eq!(early.to, 0.0);
        assert!(early.follow_up_play);
    }

    #[test]
    fn test_unknown_duration_only_clamps_below() {
        let mut ctx = context_at(0.0);
        ctx.duration = f64::NAN;
        let decision = reduce(&[Intent::seek(90.0, false)], &ctx).unwrap().unwrap();
        assert_eq!(decision.to, 90.0);
    }

    #[test]
    fn test_highest_priority_target() {
        let intents = vec![
            Intent::seek(10.0, true).with_priority(50),
            Intent::seek(30.0, false).with_priority(10),
        ];
        let decision = reduce(&intents, &context_at(0.0)).unwrap().unwrap();
        assert_eq!(decision.to, 10.0);
    }

    #[test]
    fn test_non_finite_target_is_error() {
        assert!(reduce(&[Intent::seek(f64::INFINITY, false)], &context_at(0.0)).is_err());
    }
}
