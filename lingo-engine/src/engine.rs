//! Playback engine aggregate
//!
//! Owns everything that carries state between ticks: player state, strategy
//! registry, subtitle lock, scheduler and trace. One call to
//! [`PlaybackEngine::handle_event`] is one tick.
//!
//! **Tick order:**
//! 1. Fold the clock event into [`PlayerState`]
//! 2. Let the scheduler react and run due tasks
//! 3. Execute effects sent by fired tasks
//! 4. Snapshot a [`PlaybackContext`]
//! 5. Collect intents from every strategy
//! 6. Reduce per domain
//! 7. Commit lock and loop decisions
//! 8. Plan and execute effects
//! 9. Record the tick in the trace
//!
//! Scheduled tasks never touch the engine directly: their callbacks send
//! [`Effect`]s over an unbounded channel that the engine drains in step 3
//! and in [`pump`](PlaybackEngine::pump).

use crate::clock::{ClockEvent, SystemWallClock, WallClock};
use crate::context::{LoopMode, PlaybackContext, INFINITE_LOOPS};
use crate::effects::{Effect, EffectExecutor, EffectPlan, MediaTransport, NullSink, PresentationSink};
use crate::error::{Error, Result};
use crate::intent::{CountdownUpdate, IntentCollector, ScheduledAction, UiPatch};
use crate::lock::SubtitleLock;
use crate::reducer::{apply_lock_directive, reduce_all, Resolution};
use crate::scheduler::{Scheduler, TaskId, TaskKind, TickStats};
use crate::state::PlayerState;
use crate::strategy::{AutoPauseStrategy, LoopStrategy, Strategy, SubtitleSyncStrategy};
use crate::timeline::LookupParams;
use crate::trace::{TickReport, TraceLog};
use lingo_common::config::{AutoResumePolicy, EngineConfig};
use lingo_common::subtitle::normalize_track;
use lingo_common::time::format_media_time;
use lingo_common::SubtitleItem;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Outcome of a [`pump`](PlaybackEngine::pump) between clock events
#[derive(Debug, Clone, Default, Serialize)]
pub struct PumpReport {
    pub scheduler: TickStats,
    pub effects: Vec<Effect>,
    pub faults: Vec<String>,
}

pub struct PlaybackEngine {
    config: EngineConfig,
    state: PlayerState,
    collector: IntentCollector,
    lock: SubtitleLock,
    scheduler: Scheduler,

    /// Effects sent by fired scheduler tasks
    effect_tx: mpsc::UnboundedSender<Effect>,
    effect_rx: mpsc::UnboundedReceiver<Effect>,

    /// Outstanding scheduled action per kind; rescheduling replaces it
    pending_actions: HashMap<ScheduledAction, TaskId>,

    trace: TraceLog,
    tick: u64,
    disposed: bool,
}

impl PlaybackEngine {
    /// Create an engine driven by the system wall clock
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_wall_clock(config, Arc::new(SystemWallClock::new()))
    }

    /// Create an engine with an explicit wall clock (tests, simulation)
    pub fn with_wall_clock(config: EngineConfig, wall: Arc<dyn WallClock>) -> Result<Self> {
        config.validate()?;

        let epsilon = config.scheduler.epsilon;
        let mut collector = IntentCollector::new();
        collector.register(Box::new(SubtitleSyncStrategy::new(LookupParams::from_config(
            &config.subtitle_sync,
            epsilon,
        ))));
        collector.register(Box::new(LoopStrategy::new(epsilon)));
        collector.register(Box::new(AutoPauseStrategy::new(epsilon)));

        let mut scheduler = Scheduler::new(config.scheduler.clone(), wall);
        scheduler.start();

        let mut state = PlayerState::new();
        state.auto_pause.resume_policy = config.auto_pause.resume_policy;

        let (effect_tx, effect_rx) = mpsc::unbounded_channel();

        info!(
            "Playback engine ready: strategies {:?}, resume policy {}",
            collector.strategy_names(),
            config.auto_pause.resume_policy
        );

        Ok(Self {
            trace: TraceLog::new(config.trace.capacity),
            config,
            state,
            collector,
            lock: SubtitleLock::new(),
            scheduler,
            effect_tx,
            effect_rx,
            pending_actions: HashMap::new(),
            tick: 0,
            disposed: false,
        })
    }

    /// Append a strategy after the built-in ones
    pub fn register_strategy(&mut self, strategy: Box<dyn Strategy>) {
        self.collector.register(strategy);
    }

    // ========================================================================
    // Tick processing
    // ========================================================================

    /// Process one clock event
    pub fn handle_event(
        &mut self,
        event: ClockEvent,
        transport: &mut dyn MediaTransport,
        sink: &mut dyn PresentationSink,
    ) -> TickReport {
        if self.disposed {
            warn!("Clock event {} ignored: engine disposed", event.name());
            return self.empty_report(event);
        }

        self.tick += 1;
        let tick = self.tick;
        let mut effects = Vec::new();
        let mut faults = Vec::new();

        self.state.apply_event(&event);
        if event == ClockEvent::Play {
            // Manual resume supersedes a scheduled one
            self.cancel_action(ScheduledAction::ResumePlayback);
        }

        let scheduler_stats = self.scheduler.on_clock_event(&event);
        self.drain_scheduled(transport, sink, &mut effects, &mut faults);

        let ctx = self.state.snapshot(tick, event);
        let collection = self.collector.collect(&ctx);
        faults.extend(collection.faults.iter().map(Error::to_string));

        let reduction = reduce_all(&collection.intents, &ctx, &self.lock);
        faults.extend(reduction.faults.iter().map(Error::to_string));

        self.commit(&reduction.resolution);

        let plan = EffectPlan::from_resolution(&reduction.resolution, &ctx);
        self.run_effects(plan.into_effects(), transport, sink, &mut effects, &mut faults);

        trace!(
            "Tick {} {} at {}: {} intents, {} effects, {} faults",
            tick,
            event.name(),
            format_media_time(ctx.current_time),
            collection.intents.len(),
            effects.len(),
            faults.len()
        );

        let report = TickReport {
            tick,
            event,
            media_time: ctx.current_time,
            intents: collection.intents,
            resolution: reduction.resolution,
            effects,
            faults,
            scheduler: scheduler_stats,
        };
        self.trace.record(report.clone());
        report
    }

    /// Run deferred and wall-clock scheduler work between clock events
    pub fn pump(
        &mut self,
        transport: &mut dyn MediaTransport,
        sink: &mut dyn PresentationSink,
    ) -> PumpReport {
        let mut report = PumpReport::default();
        if self.disposed {
            return report;
        }
        report.scheduler = self.scheduler.pump();
        self.drain_scheduled(transport, sink, &mut report.effects, &mut report.faults);
        report
    }

    /// Commit carried-over state from the resolution
    fn commit(&mut self, resolution: &Resolution) {
        if let Some(subtitle) = &resolution.subtitle {
            apply_lock_directive(&mut self.lock, &subtitle.lock);
            if let Some(candidate) = subtitle.suggested {
                self.lock.suggest_index(candidate);
            }
            if let Some(index) = subtitle.index {
                if index != self.state.active_cue_index {
                    debug!(
                        "Active subtitle {:?} -> {:?}",
                        self.state.active_cue_index, index
                    );
                }
                self.state.active_cue_index = index;
            }
        }
        if let Some(decision) = &resolution.looping {
            self.state.commit_loop(decision);
        }
    }

    fn run_effects(
        &mut self,
        planned: Vec<Effect>,
        transport: &mut dyn MediaTransport,
        sink: &mut dyn PresentationSink,
        executed: &mut Vec<Effect>,
        faults: &mut Vec<String>,
    ) {
        for effect in planned {
            let result = match effect {
                Effect::Schedule { action, delay_ms } => {
                    self.schedule_action(action, delay_ms).map(|_| ())
                }
                ref other => {
                    EffectExecutor::new(&mut *transport, &mut *sink)
                        .execute(other, &self.state.subtitles)
                }
            };
            match result {
                Ok(()) => executed.push(effect),
                Err(e) => {
                    warn!("Effect {:?} failed: {}", effect, e);
                    faults.push(e.to_string());
                }
            }
        }
    }

    fn drain_scheduled(
        &mut self,
        transport: &mut dyn MediaTransport,
        sink: &mut dyn PresentationSink,
        executed: &mut Vec<Effect>,
        faults: &mut Vec<String>,
    ) {
        let mut fired = Vec::new();
        while let Ok(effect) = self.effect_rx.try_recv() {
            fired.push(effect);
        }
        if !fired.is_empty() {
            debug!("Executing {} scheduled effects", fired.len());
            self.run_effects(fired, transport, sink, executed, faults);
        }
    }

    // ========================================================================
    // Scheduled actions
    // ========================================================================

    fn schedule_action(&mut self, action: ScheduledAction, delay_ms: u64) -> Result<TaskId> {
        self.cancel_action(action);

        let effects = scheduled_effects(action);
        let tx = self.effect_tx.clone();
        let id = self.scheduler.schedule_after(
            delay_ms,
            Box::new(move || {
                for effect in effects {
                    tx.send(effect)
                        .map_err(|e| Error::Scheduler(format!("effect channel: {}", e)))?;
                }
                Ok(())
            }),
        )?;

        debug!("Scheduled {:?} in {}ms as {}", action, delay_ms, id);
        self.pending_actions.insert(action, id);
        Ok(id)
    }

    fn cancel_action(&mut self, action: ScheduledAction) {
        if let Some(id) = self.pending_actions.remove(&action) {
            if self.scheduler.cancel(id) {
                debug!("Cancelled pending {:?} ({})", action, id);
            }
        }
    }

    // ========================================================================
    // Track and settings
    // ========================================================================

    /// Replace the subtitle track wholesale
    ///
    /// Indices into the previous track become meaningless, so the lock is
    /// reset, the active index cleared and media-time tasks cancelled.
    pub fn load_subtitles(&mut self, items: Vec<SubtitleItem>) -> Result<()> {
        let items = normalize_track(items)?;
        info!("Loaded subtitle track with {} cues", items.len());

        self.state.subtitles = Arc::from(items);
        self.state.track_generation += 1;
        self.state.active_cue_index = None;
        self.state.loop_settings.remaining = 0;
        self.lock.reset();
        self.scheduler.cancel_by_kind(TaskKind::MediaTime);
        Ok(())
    }

    /// Configure single-subtitle looping (`count = -1` loops forever)
    pub fn set_loop(&mut self, enabled: bool, count: i32) {
        let count = count.max(INFINITE_LOOPS);
        let settings = &mut self.state.loop_settings;
        settings.enabled = enabled;
        settings.count = count;
        settings.remaining = if enabled { count } else { 0 };
        info!("Loop {} (count {})", if enabled { "on" } else { "off" }, count);
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.state.loop_settings.mode = mode;
    }

    pub fn set_auto_pause(&mut self, enabled: bool, auto_resume: bool, resume_delay_ms: u64) {
        let settings = &mut self.state.auto_pause;
        settings.enabled = enabled;
        settings.auto_resume = auto_resume;
        settings.resume_delay_ms = resume_delay_ms;
        if !enabled {
            self.cancel_action(ScheduledAction::ResumePlayback);
        }
        info!(
            "Auto-pause {} (auto-resume {}, {}ms)",
            if enabled { "on" } else { "off" },
            auto_resume,
            resume_delay_ms
        );
    }

    pub fn set_resume_policy(&mut self, policy: AutoResumePolicy) {
        self.state.auto_pause.resume_policy = policy;
    }

    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(lingo_common::Error::InvalidInput(format!(
                "playback rate must be positive, got {}",
                rate
            ))
            .into());
        }
        self.state.playback_rate = rate;
        Ok(())
    }

    /// Set volume, clamped to `[0, 1]`
    pub fn set_volume(&mut self, volume: f64) {
        self.state.volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
    }

    /// Seek to the start of the subtitle at `index`
    ///
    /// Returns the seek target. The resulting clock events flow through
    /// [`handle_event`](Self::handle_event) like any other seek.
    pub fn jump_to_subtitle(
        &mut self,
        index: usize,
        transport: &mut dyn MediaTransport,
    ) -> Result<f64> {
        let to = self
            .state
            .subtitles
            .get(index)
            .map(|item| item.start_time)
            .ok_or_else(|| {
                lingo_common::Error::InvalidInput(format!(
                    "no subtitle at index {} ({} loaded)",
                    index,
                    self.state.subtitles.len()
                ))
            })?;

        debug!("Jump to subtitle {} at {}", index, format_media_time(to));
        let mut sink = NullSink;
        EffectExecutor::new(transport, &mut sink).execute(&Effect::Seek { to }, &self.state.subtitles)?;
        Ok(to)
    }

    /// Tear down strategies and the scheduler; later events are ignored
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.collector.dispose();
        self.scheduler.dispose();
        self.lock.reset();
        self.pending_actions.clear();
        self.disposed = true;
        info!("Playback engine disposed after {} ticks", self.tick);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn lock(&self) -> &SubtitleLock {
        &self.lock
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn active_cue_index(&self) -> Option<usize> {
        self.state.active_cue_index
    }

    pub fn strategy_names(&self) -> Vec<String> {
        self.collector.strategy_names()
    }

    pub fn is_strategy_active(&self, name: &str) -> bool {
        self.collector.is_active(name)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Snapshot as strategies would see it for `event`
    pub fn context(&self, event: ClockEvent) -> PlaybackContext {
        self.state.snapshot(self.tick, event)
    }

    fn empty_report(&self, event: ClockEvent) -> TickReport {
        TickReport {
            tick: self.tick,
            event,
            media_time: self.state.current_time,
            intents: Vec::new(),
            resolution: Resolution::default(),
            effects: Vec::new(),
            faults: Vec::new(),
            scheduler: TickStats::default(),
        }
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("tick", &self.tick)
            .field("state", &self.state)
            .field("lock", &self.lock)
            .field("scheduler", &self.scheduler)
            .field("collector", &self.collector)
            .field("disposed", &self.disposed)
            .finish()
    }
}

/// Effects a scheduled action sends when it fires
fn scheduled_effects(action: ScheduledAction) -> Vec<Effect> {
    let close_countdown = Effect::Ui(UiPatch {
        resume_countdown: Some(CountdownUpdate::Close),
        ..Default::default()
    });
    match action {
        ScheduledAction::ResumePlayback => vec![close_countdown, Effect::Play],
        ScheduledAction::Pause => vec![Effect::Pause],
        ScheduledAction::HideResumeCountdown => vec![close_countdown],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualWallClock;
    use crate::context::fixtures::two_cue_track;

    fn engine() -> PlaybackEngine {
        let mut engine =
            PlaybackEngine::with_wall_clock(EngineConfig::default(), Arc::new(ManualWallClock::new(0.0)))
                .unwrap();
        engine.load_subtitles(two_cue_track().to_vec()).unwrap();
        engine
    }

    /// Transport that only records commands
    #[derive(Default)]
    struct Recorder {
        time: f64,
        commands: Vec<String>,
    }

    impl MediaTransport for Recorder {
        fn play(&mut self) -> Result<()> {
            self.commands.push("play".to_string());
            Ok(())
        }
        fn pause(&mut self) -> Result<()> {
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

    #[test]
    fn test_registration_order() {
        assert_eq!(
            engine().strategy_names(),
            vec!["subtitle_sync", "loop", "auto_pause"]
        );
    }

    #[test]
    fn test_sync_commits_active_cue() {
        let mut engine = engine();
        let mut transport = Recorder::default();
        let report = engine.handle_event(
            ClockEvent::TimeUpdate { time: 12.0 },
            &mut transport,
            &mut NullSink,
        );
        assert_eq!(engine.active_cue_index(), Some(0));
        assert_eq!(report.effects, vec![Effect::ShowSubtitle { index: Some(0) }]);
        assert_eq!(engine.trace().len(), 1);
    }

    #[test]
    fn test_load_subtitles_resets_lock() {
        let mut engine = engine();
        engine.set_loop(true, 2);
        engine.handle_event(
            ClockEvent::TimeUpdate { time: 12.0 },
            &mut Recorder::default(),
            &mut NullSink,
        );
        assert_eq!(engine.lock().owner(), Some("loop"));

        engine.load_subtitles(two_cue_track().to_vec()).unwrap();
        assert!(!engine.lock().is_locked());
        assert_eq!(engine.active_cue_index(), None);
    }

    #[test]
    fn test_jump_to_subtitle() {
        let mut engine = engine();
        let mut transport = Recorder::default();
        assert_eq!(engine.jump_to_subtitle(1, &mut transport).unwrap(), 20.0);
        assert_eq!(transport.commands, vec!["seek 20"]);
        assert!(engine.jump_to_subtitle(5, &mut transport).is_err());
    }

    #[test]
    fn test_settings_validation() {
        let mut engine = engine();
        assert!(engine.set_playback_rate(0.0).is_err());
        assert!(engine.set_playback_rate(1.5).is_ok());
        engine.set_volume(3.0);
        assert_eq!(engine.state().volume, 1.0);
        engine.set_loop(true, -9);
        assert_eq!(engine.state().loop_settings.count, INFINITE_LOOPS);
    }

    #[test]
    fn test_disposed_engine_ignores_events() {
        let mut engine = engine();
        engine.dispose();
        let report = engine.handle_event(
            ClockEvent::TimeUpdate { time: 12.0 },
            &mut Recorder::default(),
            &mut NullSink,
        );
        assert!(report.resolution.is_empty());
        assert_eq!(engine.tick(), 0);
        assert!(engine.strategy_names().is_empty());
    }
}
