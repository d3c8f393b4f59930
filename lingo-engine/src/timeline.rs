//! Subtitle timeline lookup and boundary detection
//!
//! Resolves which subtitle the playback position falls into and detects when
//! playback crosses a subtitle's end.
//!
//! **Lookup order** (first rule that yields a cue wins):
//! 1. The currently active cue, if the position is inside its window
//! 2. The first cue whose window `[start, end)` contains the position
//! 3. The currently active cue, if the position is within `hysteresis` of it
//! 4. The nearest cue within `max_nearest_distance`
//! 5. No active cue

use lingo_common::config::SubtitleSyncConfig;
use lingo_common::time;
use lingo_common::SubtitleItem;
use std::sync::Arc;

/// Detect a crossing of `end` between two consecutive time samples
///
/// True only when `prev` is before `end` and `now` has reached it. Discrete
/// ticks rarely land exactly on a boundary, so a single-sample equality check
/// would miss crossings; comparing two samples does not, and repeated calls
/// with the same samples past the boundary never re-trigger.
///
/// # Examples
///
/// ```
/// use lingo_engine::timeline::crossed_right_boundary;
///
/// assert!(crossed_right_boundary(14.9, 15.1, 15.0, 0.001));
/// assert!(crossed_right_boundary(14.9, 15.0, 15.0, 0.001));
/// assert!(!crossed_right_boundary(14.8, 14.9, 15.0, 0.001));
/// assert!(!crossed_right_boundary(15.1, 15.2, 15.0, 0.001));
/// ```
pub fn crossed_right_boundary(prev: f64, now: f64, end: f64, epsilon: f64) -> bool {
    time::before(prev, end, epsilon) && time::at_or_after(now, end, epsilon)
}

/// Lookup tolerances
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookupParams {
    pub hysteresis: f64,
    pub max_nearest_distance: f64,
    pub epsilon: f64,
}

impl LookupParams {
    pub fn from_config(sync: &SubtitleSyncConfig, epsilon: f64) -> Self {
        Self {
            hysteresis: sync.hysteresis,
            max_nearest_distance: sync.max_nearest_distance,
            epsilon,
        }
    }
}

impl Default for LookupParams {
    fn default() -> Self {
        Self::from_config(&SubtitleSyncConfig::default(), time::DEFAULT_EPSILON)
    }
}

/// Subtitle timeline with a cached lookup position
///
/// The cached index gives O(1) lookups while playback advances linearly;
/// a miss falls back to a scan of the track.
#[derive(Debug, Clone)]
pub struct SubtitleTimeline {
    entries: Arc<[SubtitleItem]>,
    params: LookupParams,
    /// Index returned by the last window match
    cached_index: Option<usize>,
}

impl SubtitleTimeline {
    pub fn new(entries: Arc<[SubtitleItem]>, params: LookupParams) -> Self {
        Self {
            entries,
            params,
            cached_index: None,
        }
    }

    /// Adopt a new track if `entries` is not the list already held
    ///
    /// Returns true when the track changed.
    pub fn sync_track(&mut self, entries: &Arc<[SubtitleItem]>) -> bool {
        if Arc::ptr_eq(&self.entries, entries) {
            return false;
        }
        self.entries = Arc::clone(entries);
        self.cached_index = None;
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the cue for position `t` given the currently active cue
    pub fn locate(&mut self, t: f64, active: Option<usize>) -> Option<usize> {
        let eps = self.params.epsilon;
        let entries = Arc::clone(&self.entries);
        let active_item = active.and_then(|i| entries.get(i).map(|item| (i, item)));

        if let Some((i, item)) = active_item {
            if item.contains(t, eps) {
                self.cached_index = Some(i);
                return Some(i);
            }
        }

        if let Some(i) = self.window_match(t) {
            return Some(i);
        }

        if let Some((i, item)) = active_item {
            let h = self.params.hysteresis;
            if time::in_window(t, item.start_time - h, item.end_time + h, eps) {
                return Some(i);
            }
        }

        self.nearest_within(t, self.params.max_nearest_distance)
    }

    /// First cue whose window contains `t` (read-only, no hysteresis)
    pub fn cue_at(&self, t: f64) -> Option<usize> {
        let eps = self.params.epsilon;
        self.entries.iter().position(|item| item.contains(t, eps))
    }

    fn window_match(&mut self, t: f64) -> Option<usize> {
        let eps = self.params.epsilon;

        // Hot path: cached entry still contains t, and no earlier cue does
        if let Some(i) = self.cached_index {
            if let Some(item) = self.entries.get(i) {
                if item.contains(t, eps) && !self.entries[..i].iter().any(|e| e.contains(t, eps)) {
                    return Some(i);
                }
            }
        }

        // Cold path: scan
        let found = self.cue_at(t);
        if found.is_some() {
            self.cached_index = found;
        }
        found
    }

    fn nearest_within(&self, t: f64, radius: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, item) in self.entries.iter().enumerate() {
            let distance = item.distance_to(t);
            if distance > radius {
                continue;
            }
            match best {
                Some((_, d)) if d <= distance => {}
                _ => best = Some((i, distance)),
            }
        }
        best.map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline() -> SubtitleTimeline {
        let entries: Arc<[SubtitleItem]> = vec![
            SubtitleItem::new(1, 10.0, 15.0, "uno"),
            SubtitleItem::new(2, 20.0, 25.0, "dos"),
            SubtitleItem::new(3, 25.0, 30.0, "tres"),
        ]
        .into();
        SubtitleTimeline::new(entries, LookupParams::default())
    }

    #[test]
    fn test_crossing_requires_two_samples() {
        let eps = time::DEFAULT_EPSILON;
        // t0 < end <= t1
        for (t0, t1) in [(14.0, 15.0), (14.99, 15.01), (10.0, 40.0)] {
            assert!(crossed_right_boundary(t0, t1, 15.0, eps), "{} -> {}", t0, t1);
        }
        // t1 < end
        for (t0, t1) in [(14.0, 14.5), (10.0, 14.9)] {
            assert!(!crossed_right_boundary(t0, t1, 15.0, eps), "{} -> {}", t0, t1);
        }
        // repeated samples past the end never re-trigger
        assert!(!crossed_right_boundary(15.0, 15.0, 15.0, eps));
        assert!(!crossed_right_boundary(15.2, 15.2, 15.0, eps));
        // backwards motion is not a right-boundary crossing
        assert!(!crossed_right_boundary(16.0, 12.0, 15.0, eps));
    }

    #[test]
    fn test_window_match() {
        let mut tl = timeline();
        assert_eq!(tl.locate(12.0, None), Some(0));
        assert_eq!(tl.locate(22.0, None), Some(1));
        // Adjacent cues: end is exclusive
        assert_eq!(tl.locate(25.0, None), Some(2));
    }

    #[test]
    fn test_no_match_outside_radius() {
        let mut tl = timeline();
        assert_eq!(tl.locate(5.0, None), None);
        assert_eq!(tl.locate(17.5, None), None);
        assert_eq!(tl.locate(40.0, None), None);
    }

    #[test]
    fn test_nearest_within_radius() {
        let mut tl = timeline();
        assert_eq!(tl.locate(9.7, None), Some(0));
        assert_eq!(tl.locate(15.4, None), Some(0));
        assert_eq!(tl.locate(19.6, None), Some(1));
    }

    #[test]
    fn test_hysteresis_keeps_active_cue() {
        let entries: Arc<[SubtitleItem]> = vec![
            SubtitleItem::new(1, 10.0, 15.0, "uno"),
            SubtitleItem::new(2, 15.3, 20.0, "dos"),
        ]
        .into();
        let mut tl = SubtitleTimeline::new(entries, LookupParams::default());

        // Just past the end of the active cue, the nearer cue 1 would win the
        // nearest-distance rule; hysteresis keeps cue 0.
        assert_eq!(tl.locate(15.05, Some(0)), Some(0));
        // Without an active cue the nearest rule decides.
        assert_eq!(tl.locate(15.2, None), Some(1));
    }

    #[test]
    fn test_active_cue_preferred_on_overlap() {
        let entries: Arc<[SubtitleItem]> = vec![
            SubtitleItem::new(1, 10.0, 16.0, "uno"),
            SubtitleItem::new(2, 14.0, 20.0, "dos"),
        ]
        .into();
        let mut tl = SubtitleTimeline::new(entries, LookupParams::default());

        assert_eq!(tl.locate(15.0, None), Some(0));
        assert_eq!(tl.locate(15.0, Some(1)), Some(1));
    }

    #[test]
    fn test_sync_track_detects_replacement() {
        let mut tl = timeline();
        let same = Arc::clone(&tl.entries);
        assert!(!tl.sync_track(&same));

        let replacement: Arc<[SubtitleItem]> = vec![SubtitleItem::new(9, 0.0, 1.0, "x")].into();
        assert!(tl.sync_track(&replacement));
        assert_eq!(tl.len(), 1);
        assert_eq!(tl.locate(0.5, None), Some(0));
    }

    #[test]
    fn test_empty_timeline() {
        let mut tl = SubtitleTimeline::new(Vec::new().into(), LookupParams::default());
        assert!(tl.is_empty());
        assert_eq!(tl.locate(3.0, None), None);
    }
}
