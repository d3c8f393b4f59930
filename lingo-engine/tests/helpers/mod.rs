//! Test helpers for lingo-engine integration tests
//!
//! Provides reusable test infrastructure:
//! - Harness: engine driven by a simulated media clock and a manual wall clock
//! - RecordingTransport: transport that only records commands
//! - RecordingSink: captures subtitle changes and UI patches
//! - fixture_track: two-cue track used across scenarios

#![allow(dead_code)]

use lingo_common::config::EngineConfig;
use lingo_common::SubtitleItem;
use lingo_engine::clock::{ClockEvent, ManualWallClock, MediaClock};
use lingo_engine::effects::{Effect, MediaTransport, PresentationSink};
use lingo_engine::engine::PumpReport;
use lingo_engine::intent::{CountdownUpdate, UiPatch};
use lingo_engine::trace::TickReport;
use lingo_engine::{PlaybackEngine, Result};
use std::sync::Arc;

/// `[{1, 10–15, "uno"}, {2, 20–25, "dos"}]`
pub fn fixture_track() -> Vec<SubtitleItem> {
    vec![
        SubtitleItem::new(1, 10.0, 15.0, "uno").with_translation("one"),
        SubtitleItem::new(2, 20.0, 25.0, "dos").with_translation("two"),
    ]
}

pub fn engine_with(config: EngineConfig, wall: &ManualWallClock) -> PlaybackEngine {
    let mut engine = PlaybackEngine::with_wall_clock(config, Arc::new(wall.clone())).unwrap();
    engine.load_subtitles(fixture_track()).unwrap();
    engine
}

/// Transport that records commands and tracks position without events
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub time: f64,
    pub paused: bool,
    pub commands: Vec<String>,
}

impl MediaTransport for RecordingTransport {
    fn play(&mut self) -> Result<()> {
        self.paused = false;
        self.commands.push("play".to_string());
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.paused = true;
        self.commands.push("pause".to_string());
        Ok(())
    }

    fn seek_to(&mut self, time: f64) -> Result<()> {
        self.time = time;
        self.commands.push(format!("seek {}", time));
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.time
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub shown: Vec<Option<usize>>,
    pub ui: Vec<UiPatch>,
}

impl RecordingSink {
    pub fn countdown_open(&self) -> bool {
        let last = self.ui.iter().rev().find_map(|patch| patch.resume_countdown);
        matches!(last, Some(CountdownUpdate::Open { .. }))
    }
}

impl PresentationSink for RecordingSink {
    fn show_subtitle(&mut self, index: Option<usize>, _item: Option<&SubtitleItem>) {
        self.shown.push(index);
    }

    fn apply_ui(&mut self, patch: &UiPatch) {
        self.ui.push(patch.clone());
    }
}

/// Engine plus simulated media element
pub struct Harness {
    pub engine: PlaybackEngine,
    pub clock: MediaClock,
    pub sink: RecordingSink,
    pub wall: ManualWallClock,
    pub reports: Vec<TickReport>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let wall = ManualWallClock::new(0.0);
        let mut harness = Self {
            engine: engine_with(config, &wall),
            clock: MediaClock::new(60.0),
            sink: RecordingSink::default(),
            wall,
            reports: Vec::new(),
        };
        harness.dispatch();
        harness
    }

    /// Feed every queued clock event to the engine
    pub fn dispatch(&mut self) {
        while self.clock.has_pending_events() {
            for event in self.clock.drain_events() {
                let report = self
                    .engine
                    .handle_event(event, &mut self.clock, &mut self.sink);
                self.reports.push(report);
            }
        }
    }

    pub fn play(&mut self) {
        self.clock.play().unwrap();
        self.dispatch();
    }

    pub fn seek(&mut self, time: f64) {
        self.clock.seek_to(time).unwrap();
        self.dispatch();
    }

    /// Advance media and wall clock together by one step
    pub fn step(&mut self, secs: f64) {
        self.wall.advance(secs * 1000.0);
        self.clock.advance(secs);
        self.dispatch();
    }

    /// Step in 100ms increments until `time` is reached or playback stops
    pub fn run_until(&mut self, time: f64) {
        for _ in 0..10_000 {
            if self.clock.time() >= time || self.clock.is_paused() {
                return;
            }
            self.step(0.1);
        }
    }

    /// Advance only the wall clock, then pump the engine
    pub fn wait_ms(&mut self, ms: f64) -> PumpReport {
        self.wall.advance(ms);
        let report = self.engine.pump(&mut self.clock, &mut self.sink);
        self.dispatch();
        report
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.reports
            .iter()
            .flat_map(|report| report.effects.clone())
            .collect()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.effects()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::Seek { to } => Some(to),
                _ => None,
            })
            .collect()
    }

    pub fn events_seen(&self) -> Vec<ClockEvent> {
        self.reports.iter().map(|report| report.event).collect()
    }
}
