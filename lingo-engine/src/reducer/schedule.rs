//! Schedule reducer: dedupe delayed actions and order them by delay

use crate::context::PlaybackContext;
use crate::error::Result;
use crate::intent::{Intent, IntentPayload, ScheduledAction};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledEntry {
    pub action: ScheduledAction,
    pub delay_ms: u64,
    pub priority: i32,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleDecision {
    /// Sorted by `delay_ms` ascending
    pub entries: Vec<ScheduledEntry>,
}

/// Keep the highest-priority instance of each `(action, delay_ms)` pair
pub fn reduce(intents: &[Intent], _ctx: &PlaybackContext) -> Result<Option<ScheduleDecision>> {
    let mut entries: Vec<ScheduledEntry> = Vec::new();
    let mut by_key: HashMap<(ScheduledAction, u64), usize> = HashMap::new();

    for intent in intents {
        let IntentPayload::Schedule { action, delay_ms } = intent.payload else {
            continue;
        };
        let entry = ScheduledEntry {
            action,
            delay_ms,
            priority: intent.effective_priority(),
            source: intent.source_name().to_string(),
        };
        match by_key.get(&(action, delay_ms)) {
            Some(&slot) => {
                if entry.priority >= entries[slot].priority {
                    entries[slot] = entry;
                }
            }
            None => {
                by_key.insert((action, delay_ms), entries.len());
                entries.push(entry);
            }
        }
    }

    if entries.is_empty() {
        return Ok(None);
    }
    entries.sort_by_key(|entry| entry.delay_ms);
    Ok(Some(ScheduleDecision { entries }))
}
