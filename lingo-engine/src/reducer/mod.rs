//! Domain reducers
//!
//! One reducer per [`Domain`]. Each looks only at the intents of its own
//! domain and resolves them into a single decision for this tick. A domain
//! with no intents gets no decision, and a reducer that fails (error or
//! panic) is logged and omitted without affecting the others.
//!
//! All reducers are pure with respect to engine state: the subtitle reducer
//! previews lock transitions on a clone of the FSM, and the engine commits
//! the resulting directive afterwards.

pub mod looping;
pub mod schedule;
pub mod seek;
pub mod subtitle;
pub mod transport;
pub mod ui;

pub use looping::LoopDecision;
pub use schedule::{ScheduleDecision, ScheduledEntry};
pub use seek::SeekDecision;
pub use subtitle::{apply_lock_directive, LockDirective, SubtitleDecision};
pub use transport::TransportDecision;

use crate::context::PlaybackContext;
use crate::error::{Error, Result};
use crate::guard::guarded;
use crate::intent::{Domain, Intent, UiPatch};
use crate::lock::SubtitleLock;
use serde::Serialize;
use tracing::{trace, warn};

/// Binding per-domain decisions for one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportDecision>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seek: Option<SeekDecision>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<SubtitleDecision>,

    #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
    pub looping: Option<LoopDecision>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleDecision>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiPatch>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.domains().is_empty()
    }

    /// Domains that received a decision
    pub fn domains(&self) -> Vec<Domain> {
        let present = [
            self.transport.is_some(),
            self.seek.is_some(),
            self.subtitle.is_some(),
            self.looping.is_some(),
            self.schedule.is_some(),
            self.ui.is_some(),
        ];
        Domain::ALL
            .iter()
            .zip(present)
            .filter_map(|(domain, present)| present.then_some(*domain))
            .collect()
    }
}

/// Resolution plus the reducer faults isolated while producing it
#[derive(Debug, Default)]
pub struct Reduction {
    pub resolution: Resolution,
    pub faults: Vec<Error>,
}

/// Run every reducer over this tick's intents
pub fn reduce_all(intents: &[Intent], ctx: &PlaybackContext, lock: &SubtitleLock) -> Reduction {
    let mut faults = Vec::new();

    let resolution = Resolution {
        transport: isolate(Domain::Transport, &mut faults, || {
            transport::reduce(intents, ctx)
        }),
        seek: isolate(Domain::Seek, &mut faults, || seek::reduce(intents, ctx)),
        subtitle: isolate(Domain::Subtitle, &mut faults, || {
            subtitle::reduce(intents, ctx, lock)
        }),
        looping: isolate(Domain::Loop, &mut faults, || looping::reduce(intents, ctx)),
        schedule: isolate(Domain::Schedule, &mut faults, || {
            schedule::reduce(intents, ctx)
        }),
        ui: isolate(Domain::Ui, &mut faults, || ui::reduce(intents, ctx)),
    };

    trace!(
        "Reduced {} intents into {:?} ({} faults)",
        intents.len(),
        resolution.domains(),
        faults.len()
    );
    Reduction { resolution, faults }
}

fn isolate<T>(
    domain: Domain,
    faults: &mut Vec<Error>,
    reducer: impl FnOnce() -> Result<Option<T>>,
) -> Option<T> {
    match guarded(reducer) {
        Ok(decision) => decision,
        Err(e) => {
            warn!("Reducer for '{}' failed, domain omitted: {}", domain, e);
            let fault = match e {
                e @ Error::Reducer { .. } => e,
                other => reducer_error(domain, other.to_string()),
            };
            faults.push(fault);
            None
        }
    }
}

pub(crate) fn reducer_error(domain: Domain, message: impl Into<String>) -> Error {
    Error::Reducer {
        domain: domain.to_string(),
        message: message.into(),
    }
}
