//! # Lingo Playback Engine (lingo-engine)
//!
//! Playback intent reduction for a language-learning video player.
//!
//! **Purpose:** Decide, on every playback tick, what the player actually does
//! (play/pause, seek, active subtitle, loop count, auto-pause countdown) when
//! several independent strategies want different things at the same instant.
//!
//! **Architecture:** clock event → strategies emit [`intent::Intent`]s →
//! per-domain reducers produce a [`reducer::Resolution`] → effects are planned
//! and executed. A clock-synchronized [`scheduler::Scheduler`] fires delayed
//! work against media time or wall-clock time.

pub mod clock;
pub mod context;
pub mod effects;
pub mod engine;
pub mod error;
mod guard;
pub mod intent;
pub mod lock;
pub mod reducer;
pub mod scheduler;
pub mod state;
pub mod strategy;
pub mod timeline;
pub mod trace;

pub use engine::PlaybackEngine;
pub use error::{Error, Result};
