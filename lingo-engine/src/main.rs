//! Lingo simulator (lingo-sim) - Main entry point
//!
//! Replays a subtitle track against a simulated media clock, drives the
//! playback engine one clock event at a time and prints the diagnostic trace
//! as JSON lines. The simulated UI honors the auto-resume countdown the way
//! the real player's countdown panel does.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lingo_common::config::{AutoResumePolicy, EngineConfig};
use lingo_common::subtitle::load_track;
use lingo_common::time::format_media_time;
use lingo_common::SubtitleItem;
use lingo_engine::clock::{ClockEvent, ManualWallClock, MediaClock, SystemWallClock, WallClock};
use lingo_engine::effects::{MediaTransport, PresentationSink};
use lingo_engine::intent::{CountdownUpdate, UiPatch};
use lingo_engine::PlaybackEngine;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for lingo-sim
#[derive(Parser, Debug)]
#[command(name = "lingo-sim")]
#[command(about = "Replay a subtitle track through the playback intent engine")]
#[command(version)]
struct Args {
    /// Subtitle track (JSON array of cues)
    #[arg(short, long, env = "LINGO_SUBTITLES")]
    subtitles: PathBuf,

    /// Config file (takes precedence over LINGO_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Media duration in seconds (default: last cue end + 2s)
    #[arg(long)]
    duration: Option<f64>,

    /// Clock tick interval in milliseconds
    #[arg(long, default_value = "250")]
    tick_ms: u64,

    /// Playback rate
    #[arg(long, default_value = "1.0")]
    rate: f64,

    /// Loop each subtitle this many times (-1 = forever)
    #[arg(long, allow_negative_numbers = true)]
    loop_count: Option<i32>,

    /// Pause at the end of each subtitle
    #[arg(long)]
    auto_pause: bool,

    /// Resume automatically after an auto-pause
    #[arg(long)]
    auto_resume: bool,

    /// Delay before auto-resume (milliseconds)
    #[arg(long, default_value = "3000")]
    resume_delay_ms: u64,

    /// Auto-resume policy: countdown, scheduled or disabled (default from config)
    #[arg(long)]
    resume_policy: Option<AutoResumePolicy>,

    /// Pace ticks in real time instead of running as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Stop after this many ticks
    #[arg(long, default_value = "100000")]
    max_ticks: u64,

    /// Write the trace to this file instead of stdout
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config =
        EngineConfig::load_resolved(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("lingo_engine={0},lingo_sim={0},lingo_common={0}", level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting lingo-sim with {}", args.subtitles.display());

    let track = load_track(&args.subtitles)
        .with_context(|| format!("Failed to load subtitles from {}", args.subtitles.display()))?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);
    tokio::spawn(async move {
        shutdown_signal().await;
        stop_flag.store(true, Ordering::SeqCst);
    });

    let mut sim = Simulation::new(&args, config, track).context("Failed to set up simulation")?;
    let outcome = sim.run(&args, &stop).await?;
    info!("Simulation finished: {:?} after {} ticks", outcome, sim.ticks);
    sim.engine.dispose();

    let dump = sim
        .engine
        .trace()
        .to_json_lines()
        .context("Failed to serialize trace")?;
    match &args.trace_out {
        Some(path) => {
            std::fs::write(path, dump)
                .with_context(|| format!("Failed to write trace to {}", path.display()))?;
            info!("Trace written to {}", path.display());
        }
        None => print!("{}", dump),
    }

    Ok(())
}

/// Why the simulation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Ended,
    /// Paused with nothing left to resume playback
    Stalled,
    TickLimit,
    Interrupted,
}

/// Presentation layer stand-in: logs subtitles and runs the countdown panel
struct SimSink {
    wall: Arc<dyn WallClock>,
    /// Wall-clock ms at which the open countdown resumes playback
    countdown_deadline: Option<f64>,
    shown: u64,
}

impl SimSink {
    fn countdown_elapsed(&self) -> bool {
        self.countdown_deadline
            .is_some_and(|deadline| self.wall.now_ms() >= deadline)
    }
}

impl PresentationSink for SimSink {
    fn show_subtitle(&mut self, index: Option<usize>, item: Option<&SubtitleItem>) {
        match (index, item) {
            (Some(i), Some(item)) => {
                self.shown += 1;
                info!(
                    "[{} #{}] {}",
                    format_media_time(item.start_time),
                    i,
                    item.text
                );
            }
            _ => debug!("Subtitle cleared"),
        }
    }

    fn apply_ui(&mut self, patch: &UiPatch) {
        match patch.resume_countdown {
            Some(CountdownUpdate::Open { duration_ms }) => {
                info!("Resume countdown: {}ms", duration_ms);
                self.countdown_deadline = Some(self.wall.now_ms() + duration_ms as f64);
            }
            Some(CountdownUpdate::Close) => {
                debug!("Resume countdown closed");
                self.countdown_deadline = None;
            }
            None => {}
        }
        if let Some(status) = &patch.status {
            info!("Status: {}", status);
        }
    }
}

struct Simulation {
    engine: PlaybackEngine,
    clock: MediaClock,
    sink: SimSink,
    /// Simulated wall clock when not running in real time
    manual: Option<ManualWallClock>,
    tick_ms: u64,
    ticks: u64,
}

impl Simulation {
    fn new(args: &Args, config: EngineConfig, track: Vec<SubtitleItem>) -> Result<Self> {
        let duration = args.duration.unwrap_or_else(|| {
            track
                .iter()
                .map(|item| item.end_time)
                .fold(0.0, f64::max)
                + 2.0
        });

        let manual = (!args.realtime).then(|| ManualWallClock::new(0.0));
        let wall: Arc<dyn WallClock> = match &manual {
            Some(manual) => Arc::new(manual.clone()),
            None => Arc::new(SystemWallClock::new()),
        };

        let mut engine = PlaybackEngine::with_wall_clock(config, Arc::clone(&wall))?;
        engine.load_subtitles(track)?;
        engine.set_playback_rate(args.rate)?;
        if let Some(count) = args.loop_count {
            engine.set_loop(true, count);
        }
        if args.auto_pause {
            engine.set_auto_pause(true, args.auto_resume, args.resume_delay_ms);
        }
        if let Some(policy) = args.resume_policy {
            engine.set_resume_policy(policy);
        }

        let mut clock = MediaClock::new(duration);
        clock.set_rate(args.rate);

        let mut sim = Self {
            engine,
            clock,
            sink: SimSink {
                wall,
                countdown_deadline: None,
                shown: 0,
            },
            manual,
            tick_ms: args.tick_ms.max(1),
            ticks: 0,
        };

        info!(
            "Media duration {}, tick {}ms, rate {}",
            format_media_time(duration),
            sim.tick_ms,
            args.rate
        );
        sim.clock.play()?;
        sim.dispatch();
        Ok(sim)
    }

    async fn run(&mut self, args: &Args, stop: &AtomicBool) -> Result<Outcome> {
        let mut interval = tokio::time::interval(Duration::from_millis(self.tick_ms));

        loop {
            if stop.load(Ordering::SeqCst) {
                return Ok(Outcome::Interrupted);
            }
            if self.ticks >= args.max_ticks {
                warn!("Tick limit {} reached", args.max_ticks);
                return Ok(Outcome::TickLimit);
            }

            if let Some(outcome) = self.step()? {
                return Ok(outcome);
            }

            if args.realtime {
                interval.tick().await;
            } else {
                tokio::task::yield_now().await;
            }
        }
    }

    /// Advance one tick; `Some` when the simulation is over
    fn step(&mut self) -> Result<Option<Outcome>> {
        self.ticks += 1;
        if let Some(manual) = &self.manual {
            manual.advance(self.tick_ms as f64);
        }

        self.clock.advance(self.tick_ms as f64 / 1000.0);
        let mut ended = self.dispatch();

        let pump = self.engine.pump(&mut self.clock, &mut self.sink);
        for fault in &pump.faults {
            warn!("Scheduled effect failed: {}", fault);
        }
        ended |= self.dispatch();

        if self.sink.countdown_elapsed() {
            info!("Countdown finished, resuming playback");
            self.sink.countdown_deadline = None;
            self.clock.play()?;
            ended |= self.dispatch();
        }

        if ended {
            return Ok(Some(Outcome::Ended));
        }
        if self.is_stalled() {
            info!(
                "Paused at {} with nothing to resume playback",
                format_media_time(self.clock.time())
            );
            return Ok(Some(Outcome::Stalled));
        }
        Ok(None)
    }

    /// Feed queued clock events to the engine; true once `Ended` was seen
    fn dispatch(&mut self) -> bool {
        let mut ended = false;
        while self.clock.has_pending_events() {
            for event in self.clock.drain_events() {
                ended |= event == ClockEvent::Ended;
                let report = self.engine.handle_event(event, &mut self.clock, &mut self.sink);
                for fault in &report.faults {
                    warn!("Tick {} fault: {}", report.tick, fault);
                }
            }
        }
        ended
    }

    fn is_stalled(&self) -> bool {
        self.clock.is_paused()
            && self.sink.countdown_deadline.is_none()
            && self.engine.scheduler().is_empty()
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping simulation");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping simulation");
        },
    }
}
