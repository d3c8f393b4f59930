//! Behavioral strategies
//!
//! A strategy looks at the per-tick [`PlaybackContext`] and proposes
//! [`Intent`]s. Strategies never act directly; they only propose.
//!
//! Lifecycle per tick (driven by the [`IntentCollector`](crate::intent::IntentCollector)):
//! - `should_activate` is evaluated every tick
//! - inactive → active edge: `on_activate`, then `on_event`
//! - active → inactive edge: `on_deactivate` only
//! - active, no edge: `on_event`
//!
//! Strategies run in registration order, and their [`priority`](Strategy::priority)
//! becomes the priority of any intent they emit without one.

pub mod auto_pause;
pub mod looping;
pub mod subtitle_sync;

pub use auto_pause::AutoPauseStrategy;
pub use looping::LoopStrategy;
pub use subtitle_sync::SubtitleSyncStrategy;

use crate::context::PlaybackContext;
use crate::error::Result;
use crate::intent::Intent;

/// Baseline subtitle tracking
pub const SUBTITLE_SYNC_PRIORITY: i32 = 10;
/// Subtitle looping
pub const LOOP_PRIORITY: i32 = 50;
/// Pause at subtitle end
pub const AUTO_PAUSE_PRIORITY: i32 = 100;

/// Strategy capability set
pub trait Strategy: Send {
    /// Stable name; used as intent source and lock owner
    fn name(&self) -> &str;

    /// Default priority for emitted intents
    fn priority(&self) -> i32;

    fn should_activate(&self, ctx: &PlaybackContext) -> bool;

    fn on_activate(&mut self, _ctx: &PlaybackContext) -> Result<Vec<Intent>> {
        Ok(Vec::new())
    }

    fn on_event(&mut self, ctx: &PlaybackContext) -> Result<Vec<Intent>>;

    fn on_deactivate(&mut self, _ctx: &PlaybackContext) -> Result<Vec<Intent>> {
        Ok(Vec::new())
    }

    /// Release resources; the strategy is not called again afterwards
    fn dispose(&mut self) {}
}
