//! Subtitle lock state machine
//!
//! Arbitrates whether the active subtitle index may change. While a strategy
//! holds the lock, outside suggestions are remembered as pending but the
//! locked index stays committed.
//!
//! ```text
//!              lock(owner, index?)
//!   Unlocked ───────────────────────▶ Locked { owner, locked_index, pending_index }
//!      ▲                                  │  suggest_index(i)    → pending = i, returns locked_index
//!      │        unlock(owner) [owner ok]  │  force_update_index  → locked_index = i
//!      └──────────────────────────────────┘  unlock(other)       → rejected, stays locked
//!                  reset()  (from any state)
//! ```
//!
//! Wrong-owner unlocks are expected races between competing requests, not
//! programmer errors: they are rejected and logged, never returned as `Err`.

use serde::Serialize;
use tracing::{debug, warn};

/// Lock state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LockState {
    Unlocked,
    Locked {
        owner: String,
        locked_index: Option<usize>,
        /// Last rejected suggestion (`Some(None)` = "no active cue" was suggested)
        pending_index: Option<Option<usize>>,
    },
}

/// Subtitle lock FSM
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleLock {
    state: LockState,
}

impl SubtitleLock {
    pub fn new() -> Self {
        Self {
            state: LockState::Unlocked,
        }
    }

    pub fn state(&self) -> &LockState {
        &self.state
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, LockState::Locked { .. })
    }

    pub fn owner(&self) -> Option<&str> {
        match &self.state {
            LockState::Locked { owner, .. } => Some(owner),
            LockState::Unlocked => None,
        }
    }

    pub fn locked_index(&self) -> Option<usize> {
        match &self.state {
            LockState::Locked { locked_index, .. } => *locked_index,
            LockState::Unlocked => None,
        }
    }

    pub fn pending_index(&self) -> Option<Option<usize>> {
        match &self.state {
            LockState::Locked { pending_index, .. } => *pending_index,
            LockState::Unlocked => None,
        }
    }

    /// Acquire (or take over) the lock
    ///
    /// With `index = None` the previously locked index is kept; a warning is
    /// logged if there is none.
    pub fn lock(&mut self, owner: &str, index: Option<usize>) {
        let previous = self.locked_index();
        let locked_index = index.or(previous);
        if locked_index.is_none() {
            warn!("Subtitle lock by '{}' without an index to hold", owner);
        }

        if let Some(current) = self.owner() {
            if current != owner {
                debug!("Subtitle lock taken over: '{}' -> '{}'", current, owner);
            }
        }

        debug!("Subtitle lock acquired by '{}' at {:?}", owner, locked_index);
        self.state = LockState::Locked {
            owner: owner.to_string(),
            locked_index,
            pending_index: None,
        };
    }

    /// Release the lock; only the current owner may do so
    ///
    /// Returns whether the lock was released.
    pub fn unlock(&mut self, owner: &str) -> bool {
        match &self.state {
            LockState::Locked { owner: current, .. } if current == owner => {
                debug!("Subtitle lock released by '{}'", owner);
                self.state = LockState::Unlocked;
                true
            }
            LockState::Locked { owner: current, .. } => {
                warn!(
                    "Rejected unlock by '{}': lock is owned by '{}'",
                    owner, current
                );
                false
            }
            LockState::Unlocked => {
                debug!("Unlock by '{}' ignored: not locked", owner);
                false
            }
        }
    }

    /// Propose a new active index
    ///
    /// Unlocked: accepted and returned unchanged. Locked: remembered as
    /// pending and the locked index is returned instead.
    pub fn suggest_index(&mut self, index: Option<usize>) -> Option<usize> {
        match &mut self.state {
            LockState::Unlocked => index,
            LockState::Locked {
                locked_index,
                pending_index,
                ..
            } => {
                if *locked_index != index {
                    debug!(
                        "Suggestion {:?} held back by lock at {:?}",
                        index, locked_index
                    );
                }
                *pending_index = Some(index);
                *locked_index
            }
        }
    }

    /// Overwrite the locked index while keeping the lock
    ///
    /// Returns false (and does nothing) when unlocked.
    pub fn force_update_index(&mut self, index: Option<usize>) -> bool {
        match &mut self.state {
            LockState::Locked { locked_index, .. } => {
                debug!("Locked index moved {:?} -> {:?}", locked_index, index);
                *locked_index = index;
                true
            }
            LockState::Unlocked => {
                warn!("force_update_index({:?}) ignored: not locked", index);
                false
            }
        }
    }

    /// Return to `Unlocked` unconditionally
    pub fn reset(&mut self) {
        self.state = LockState::Unlocked;
    }
}

impl Default for SubtitleLock {
    fn default() -> Self {
        Self::new()
    }
}
