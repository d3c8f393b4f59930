//! Loop reducer
//!
//! The highest-priority explicit `set_remaining` (or the carried-over count)
//! is the base; every `delta_remaining` is then applied in emission order and
//! the result is clamped to `>= -1`.

use super::reducer_error;
use crate::context::{LoopMode, PlaybackContext, INFINITE_LOOPS};
use crate::error::Result;
use crate::intent::{select_highest, Domain, Intent, IntentPayload, LoopIntent};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoopDecision {
    /// Resolved remaining count (`-1` = infinite)
    pub remaining: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<LoopMode>,
}

pub fn reduce(intents: &[Intent], ctx: &PlaybackContext) -> Result<Option<LoopDecision>> {
    let loop_intents: Vec<(&Intent, &LoopIntent)> = intents
        .iter()
        .filter_map(|intent| match &intent.payload {
            IntentPayload::Loop(payload) => Some((intent, payload)),
            _ => None,
        })
        .collect();
    if loop_intents.is_empty() {
        return Ok(None);
    }

    let base = select_highest(
        loop_intents
            .iter()
            .filter_map(|(intent, payload)| payload.set_remaining.map(|r| (*intent, r))),
    )
    .map(|(_, r)| r)
    .unwrap_or(ctx.loop_settings.remaining);

    let mut remaining = base;
    for (intent, delta) in loop_intents
        .iter()
        .filter_map(|(intent, payload)| payload.delta_remaining.map(|d| (*intent, d)))
    {
        remaining = remaining.checked_add(delta).ok_or_else(|| {
            reducer_error(
                Domain::Loop,
                format!(
                    "remaining count overflow applying {} from '{}'",
                    delta,
                    intent.source_name()
                ),
            )
        })?;
    }

    let mode = select_highest(
        loop_intents
            .iter()
            .filter_map(|(intent, payload)| payload.set_mode.map(|m| (*intent, m))),
    )
    .map(|(_, m)| m);

    Ok(Some(LoopDecision {
        remaining: remaining.max(INFINITE_LOOPS),
        mode,
    }))
}
