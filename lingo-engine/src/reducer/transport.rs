//! Transport reducer: play/pause is mutually exclusive

use crate::context::PlaybackContext;
use crate::error::Result;
use crate::intent::{select_highest, Intent, IntentPayload, TransportOp};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportDecision {
    pub op: TransportOp,
    pub source: String,
    pub priority: i32,
}

/// Highest priority wins; on ties the later intent wins
pub fn reduce(intents: &[Intent], _ctx: &PlaybackContext) -> Result<Option<TransportDecision>> {
    let winner = select_highest(intents.iter().filter_map(|intent| match intent.payload {
        IntentPayload::Transport { op } => Some((intent, op)),
        _ => None,
    }));

    Ok(winner.map(|(intent, op)| TransportDecision {
        op,
        source: intent.source_name().to_string(),
        priority: intent.effective_priority(),
    }))
}
