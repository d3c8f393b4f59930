//! UI reducer: last write wins per field

use crate::context::PlaybackContext;
use crate::error::Result;
use crate::intent::{Intent, IntentPayload, UiPatch};

pub fn reduce(intents: &[Intent], _ctx: &PlaybackContext) -> Result<Option<UiPatch>> {
    let mut merged: Option<UiPatch> = None;
    for intent in intents {
        if let IntentPayload::Ui(patch) = &intent.payload {
            merged.get_or_insert_with(UiPatch::default).merge(patch);
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::context_at;
    use crate::intent::CountdownUpdate;

    #[test]
    fn test_merges_in_emission_order() {
        let intents = vec![
            Intent::ui(UiPatch {
                resume_countdown: Some(CountdownUpdate::Open { duration_ms: 3000 }),
                status: Some("paused".to_string()),
            }),
            Intent::ui(UiPatch {
                resume_countdown: Some(CountdownUpdate::Close),
                status: None,
            }),
        ];
        let patch = reduce(&intents, &context_at(0.0)).unwrap().unwrap();
        assert_eq!(patch.resume_countdown, Some(CountdownUpdate::Close));
        assert_eq!(patch.status.as_deref(), Some("paused"));
    }
}
