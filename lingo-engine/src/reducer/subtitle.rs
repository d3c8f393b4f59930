//! Subtitle reducer
//!
//! Two-part resolution:
//! 1. Lock arbitration: the highest-priority intent carrying an explicit
//!    `lock` flag decides lock/unlock; with none the lock is kept as is.
//! 2. Index suggestion: the highest-priority `suggest_index` is the
//!    candidate, passed through the lock FSM after the lock directive has
//!    been applied. A foreign lock substitutes its locked index.
//!
//! Both steps run against a clone of the FSM so reduction stays free of side
//! effects; [`apply_lock_directive`] is the same transition the engine uses
//! when committing.

use crate::context::PlaybackContext;
use crate::error::Result;
use crate::intent::{select_highest, Intent, IntentPayload, SubtitleIntent};
use crate::lock::SubtitleLock;
use serde::Serialize;

/// Lock outcome for this tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LockDirective {
    /// Leave the FSM as it is
    #[default]
    Keep,
    Lock {
        owner: String,
        index: Option<usize>,
    },
    Unlock {
        owner: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleDecision {
    /// Index to commit; `None` = leave the active index alone,
    /// `Some(None)` = no active subtitle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<Option<usize>>,

    /// Winning suggestion before lock arbitration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<Option<usize>>,

    pub lock: LockDirective,

    /// Lock owner once the directive is applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// The suggestion was replaced by a locked index
    pub held_back: bool,
}

pub fn reduce(
    intents: &[Intent],
    ctx: &PlaybackContext,
    lock: &SubtitleLock,
) -> Result<Option<SubtitleDecision>> {
    let subtitle_intents: Vec<(&Intent, &SubtitleIntent)> = intents
        .iter()
        .filter_map(|intent| match &intent.payload {
            IntentPayload::Subtitle(payload) => Some((intent, payload)),
            _ => None,
        })
        .collect();
    if subtitle_intents.is_empty() {
        return Ok(None);
    }

    let directive = select_highest(
        subtitle_intents
            .iter()
            .filter_map(|(intent, payload)| payload.lock.map(|flag| (*intent, (flag, *payload)))),
    )
    .map(|(intent, (flag, payload))| {
        let owner = payload
            .owner
            .clone()
            .unwrap_or_else(|| intent.source_name().to_string());
        if flag {
            LockDirective::Lock {
                owner,
                index: payload.lock_index,
            }
        } else {
            LockDirective::Unlock { owner }
        }
    })
    .unwrap_or_default();

    let mut preview = lock.clone();
    apply_lock_directive(&mut preview, &directive);

    let suggested = select_highest(
        subtitle_intents
            .iter()
            .filter_map(|(intent, payload)| payload.suggest_index.map(|i| (*intent, i))),
    )
    .map(|(_, index)| index);

    let (index, held_back) = match suggested {
        Some(candidate) => {
            let resolved = preview.suggest_index(candidate);
            (Some(resolved), resolved != candidate)
        }
        // A fresh lock pulls the active index onto the locked cue
        None if matches!(directive, LockDirective::Lock { .. })
            && preview.locked_index().is_some()
            && preview.locked_index() != ctx.active_cue_index =>
        {
            (Some(preview.locked_index()), false)
        }
        None => (None, false),
    };

    Ok(Some(SubtitleDecision {
        index,
        suggested,
        lock: directive,
        owner: preview.owner().map(str::to_string),
        held_back,
    }))
}

/// Apply a lock directive to the FSM
///
/// The current owner re-locking with an index moves its locked position
/// rather than re-acquiring, so a pending suggestion survives.
pub fn apply_lock_directive(lock: &mut SubtitleLock, directive: &LockDirective) {
    match directive {
        LockDirective::Keep => {}
        LockDirective::Lock { owner, index } => {
            if index.is_some() && lock.owner() == Some(owner.as_str()) {
                lock.force_update_index(*index);
            } else {
                lock.lock(owner, *index);
            }
        }
        LockDirective::Unlock { owner } => {
            lock.unlock(owner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::context_at;

    #[test]
    fn test_no_subtitle_intents_is_empty() {
        let mut ctx = context_at(12.0);
        ctx.active_cue_index = Some(0);
        let mut lock = SubtitleLock::new();
        lock.lock("loop", Some(0));
        assert!(reduce(&[], &ctx, &lock).unwrap().is_none());
        assert!(reduce(&[Intent::seek(1.0, false)], &ctx, &lock)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unlocked_suggestion_accepted() {
        let ctx = context_at(21.0);
        let intents = vec![Intent::suggest_subtitle(Some(1)).with_priority(10)];
        let decision = reduce(&intents, &ctx, &SubtitleLock::new())
            .unwrap()
            .unwrap();
        assert_eq!(decision.index, Some(Some(1)));
        assert_eq!(decision.lock, LockDirective::Keep);
        assert!(!decision.held_back);
    }

    #[test]
    fn test_foreign_lock_holds_back_suggestion() {
        let mut ctx = context_at(15.2);
        ctx.active_cue_index = Some(0);
        let mut lock = SubtitleLock::new();
        lock.lock("loop", Some(0));

        let intents = vec![Intent::suggest_subtitle(None).with_source("subtitle_sync")];
        let decision = reduce(&intents, &ctx, &lock).unwrap().unwrap();
        assert_eq!(decision.index, Some(Some(0)));
        assert_eq!(decision.suggested, Some(None));
        assert!(decision.held_back);
        assert_eq!(decision.owner.as_deref(), Some("loop"));

        // The real FSM is untouched
        assert_eq!(lock.pending_index(), None);
    }

    #[test]
    fn test_unlock_in_same_tick_frees_suggestion() {
        let mut ctx = context_at(15.2);
        ctx.active_cue_index = Some(0);
        let mut lock = SubtitleLock::new();
        lock.lock("loop", Some(0));

        let intents = vec![
            Intent::suggest_subtitle(None).with_priority(10),
            Intent::unlock_subtitle("loop").with_priority(50),
        ];
        let decision = reduce(&intents, &ctx, &lock).unwrap().unwrap();
        assert_eq!(
            decision.lock,
            LockDirective::Unlock {
                owner: "loop".to_string()
            }
        );
        assert_eq!(decision.index, Some(None));
        assert!(decision.owner.is_none());
    }

    #[test]
    fn test_highest_priority_lock_flag_wins() {
        let ctx = context_at(12.0);
        let intents = vec![
            Intent::lock_subtitle("loop", Some(0)).with_priority(50),
            Intent::unlock_subtitle("other").with_priority(10),
        ];
        let decision = reduce(&intents, &ctx, &SubtitleLock::new())
            .unwrap()
            .unwrap();
        assert_eq!(
            decision.lock,
            LockDirective::Lock {
                owner: "loop".to_string(),
                index: Some(0)
            }
        );
        // Fresh lock moves the active index onto the locked cue
        assert_eq!(decision.index, Some(Some(0)));
    }

    #[test]
    fn test_owner_defaults_to_source() {
        let ctx = context_at(12.0);
        let mut intent = Intent::lock_subtitle("ignored", Some(0)).with_source("loop");
        if let IntentPayload::Subtitle(payload) = &mut intent.payload {
            payload.owner = None;
        }
        let decision = reduce(&[intent], &ctx, &SubtitleLock::new())
            .unwrap()
            .unwrap();
        assert_eq!(decision.owner.as_deref(), Some("loop"));
    }

    #[test]
    fn test_owner_relock_moves_index() {
        let mut lock = SubtitleLock::new();
        lock.lock("loop", Some(0));
        lock.suggest_index(Some(1));
        apply_lock_directive(
            &mut lock,
            &LockDirective::Lock {
                owner: "loop".to_string(),
                index: Some(1),
            },
        );
        assert_eq!(lock.locked_index(), Some(1));
        assert_eq!(lock.pending_index(), Some(Some(1)));
    }
}
