//! Subtitle track data model
//!
//! A track is an ordered, immutable list of [`SubtitleItem`]s produced by an
//! external parser. The engine never edits a track; loading a new one replaces
//! the old list wholesale.
//!
//! The JSON form handled by [`parse_track`] exists for fixtures and the
//! simulator. It is an array of objects:
//!
//! ```json
//! [{ "id": 1, "startTime": 10.0, "endTime": 15.0, "text": "Hola", "translatedText": "Hello" }]
//! ```

use crate::time;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// One subtitle cue
///
/// The active window is the half-open interval `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleItem {
    /// Identifier assigned by the parser
    pub id: u64,

    /// Start time (seconds, inclusive)
    pub start_time: f64,

    /// End time (seconds, exclusive)
    pub end_time: f64,

    /// Original-language text
    #[serde(default)]
    pub text: String,

    /// Translation, when the track carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
}

impl SubtitleItem {
    /// Create a cue without translation
    pub fn new(id: u64, start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            id,
            start_time,
            end_time,
            text: text.into(),
            translated_text: None,
        }
    }

    /// Attach a translation
    pub fn with_translation(mut self, translated: impl Into<String>) -> Self {
        self.translated_text = Some(translated.into());
        self
    }

    /// Window length in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// `t` lies inside `[start_time, end_time)`
    pub fn contains(&self, t: f64, epsilon: f64) -> bool {
        time::in_window(t, self.start_time, self.end_time, epsilon)
    }

    /// Distance from `t` to the closest edge of the window (0 inside it)
    pub fn distance_to(&self, t: f64) -> f64 {
        if t < self.start_time {
            self.start_time - t
        } else if t >= self.end_time {
            t - self.end_time
        } else {
            0.0
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(Error::InvalidInput(format!(
                "subtitle {} has non-finite timing",
                self.id
            )));
        }
        if self.end_time < self.start_time {
            return Err(Error::InvalidInput(format!(
                "subtitle {} ends ({}) before it starts ({})",
                self.id, self.end_time, self.start_time
            )));
        }
        Ok(())
    }
}

/// Validate and order a track by start time
///
/// Cues with equal start keep their input order.
pub fn normalize_track(mut items: Vec<SubtitleItem>) -> Result<Vec<SubtitleItem>> {
    for item in &items {
        item.validate()?;
    }
    items.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    Ok(items)
}

/// Parse a JSON track
pub fn parse_track(json: &str) -> Result<Vec<SubtitleItem>> {
    let items: Vec<SubtitleItem> = serde_json::from_str(json)?;
    normalize_track(items)
}

/// Load a JSON track from disk
pub fn load_track(path: &Path) -> Result<Vec<SubtitleItem>> {
    let content = std::fs::read_to_string(path)?;
    let items = parse_track(&content)?;
    debug!("Loaded {} subtitles from {}", items.len(), path.display());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_track_sorts_by_start() {
        let json = r#"[
            {"id": 2, "startTime": 20.0, "endTime": 25.0, "text": "segundo"},
            {"id": 1, "startTime": 10.0, "endTime": 15.0, "text": "primero", "translatedText": "first"}
        ]"#;

        let items = parse_track(json).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, 1);
        assert_eq!(items[0].translated_text.as_deref(), Some("first"));
        assert_eq!(items[1].id, 2);
    }

    #[test]
    fn test_parse_track_rejects_inverted_cue() {
        let json = r#"[{"id": 1, "startTime": 15.0, "endTime": 10.0}]"#;
        match parse_track(json) {
            Err(Error::InvalidInput(msg)) => assert!(msg.contains("subtitle 1")),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_track_malformed_json() {
        assert!(matches!(parse_track("not json"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_contains_is_half_open() {
        let item = SubtitleItem::new(1, 10.0, 15.0, "hola");
        assert!(item.contains(10.0, time::DEFAULT_EPSILON));
        assert!(item.contains(14.9, time::DEFAULT_EPSILON));
        assert!(!item.contains(15.0, time::DEFAULT_EPSILON));
    }

    #[test]
    fn test_distance_to() {
        let item = SubtitleItem::new(1, 10.0, 15.0, "hola");
        assert_eq!(item.distance_to(12.0), 0.0);
        assert_eq!(item.distance_to(9.5), 0.5);
        assert_eq!(item.distance_to(15.25), 0.25);
        assert_eq!(item.duration(), 5.0);
    }
}
