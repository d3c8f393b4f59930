//! Intent collection
//!
//! Drives strategy lifecycle and gathers every intent produced in a tick.
//! Strategies are held in an ordered list so registration order is emission
//! order; reducers rely on that order to break priority ties.

use crate::context::PlaybackContext;
use crate::error::{Error, Result};
use crate::guard::guarded;
use crate::intent::Intent;
use crate::strategy::Strategy;
use tracing::{debug, trace, warn};

/// Lifecycle hook being invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    ShouldActivate,
    Activate,
    Event,
    Deactivate,
}

impl Hook {
    fn as_str(&self) -> &'static str {
        match self {
            Hook::ShouldActivate => "should_activate",
            Hook::Activate => "activate",
            Hook::Event => "event",
            Hook::Deactivate => "deactivate",
        }
    }
}

struct RegisteredStrategy {
    strategy: Box<dyn Strategy>,
    /// Activation state as of the previous tick
    active: bool,
}

/// Result of one collection pass
#[derive(Debug, Default)]
pub struct Collection {
    /// All intents in emission order, each tagged with source, reason and priority
    pub intents: Vec<Intent>,
    /// Isolated strategy faults
    pub faults: Vec<Error>,
}

/// Strategy registry and per-tick intent gathering
pub struct IntentCollector {
    strategies: Vec<RegisteredStrategy>,
}

impl IntentCollector {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Append a strategy; it runs after every strategy registered before it
    pub fn register(&mut self, strategy: Box<dyn Strategy>) {
        debug!(
            "Registered strategy '{}' (priority {})",
            strategy.name(),
            strategy.priority()
        );
        self.strategies.push(RegisteredStrategy {
            strategy,
            active: false,
        });
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Names in registration order
    pub fn strategy_names(&self) -> Vec<String> {
        self.strategies
            .iter()
            .map(|s| s.strategy.name().to_string())
            .collect()
    }

    /// Whether the named strategy was active after the last tick
    pub fn is_active(&self, name: &str) -> bool {
        self.strategies
            .iter()
            .any(|s| s.active && s.strategy.name() == name)
    }

    /// Run one tick of strategy lifecycle and collect intents
    pub fn collect(&mut self, ctx: &PlaybackContext) -> Collection {
        let mut collection = Collection::default();

        for entry in &mut self.strategies {
            let name = entry.strategy.name().to_string();
            let priority = entry.strategy.priority();

            let should = {
                let strategy = &entry.strategy;
                guarded(|| Ok(strategy.should_activate(ctx)))
            };
            let should = match should {
                Ok(should) => should,
                Err(e) => {
                    record_fault(&mut collection, &name, Hook::ShouldActivate, e);
                    continue;
                }
            };

            match (entry.active, should) {
                (false, true) => {
                    debug!("Strategy '{}' activated at tick {}", name, ctx.tick);
                    entry.active = true;
                    let strategy = &mut entry.strategy;
                    let result = guarded(|| strategy.on_activate(ctx));
                    absorb(&mut collection, &name, priority, Hook::Activate, result);

                    let strategy = &mut entry.strategy;
                    let result = guarded(|| strategy.on_event(ctx));
                    absorb(&mut collection, &name, priority, Hook::Event, result);
                }
                (true, false) => {
                    debug!("Strategy '{}' deactivated at tick {}", name, ctx.tick);
                    entry.active = false;
                    let strategy = &mut entry.strategy;
                    let result = guarded(|| strategy.on_deactivate(ctx));
                    absorb(&mut collection, &name, priority, Hook::Deactivate, result);
                }
                (true, true) => {
                    let strategy = &mut entry.strategy;
                    let result = guarded(|| strategy.on_event(ctx));
                    absorb(&mut collection, &name, priority, Hook::Event, result);
                }
                (false, false) => {}
            }
        }

        trace!(
            "Tick {}: collected {} intents ({} faults)",
            ctx.tick,
            collection.intents.len(),
            collection.faults.len()
        );
        collection
    }

    /// Dispose every strategy and empty the registry
    pub fn dispose(&mut self) {
        for entry in &mut self.strategies {
            entry.strategy.dispose();
        }
        self.strategies.clear();
    }
}

impl Default for IntentCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IntentCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentCollector")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

fn absorb(
    collection: &mut Collection,
    name: &str,
    priority: i32,
    hook: Hook,
    result: Result<Vec<Intent>>,
) {
    match result {
        Ok(intents) => {
            for mut intent in intents {
                if intent.source.is_none() {
                    intent.source = Some(name.to_string());
                }
                if intent.reason.is_none() {
                    intent.reason = Some(format!("{}:{}", name, hook.as_str()));
                }
                if intent.priority.is_none() {
                    intent.priority = Some(priority);
                }
                collection.intents.push(intent);
            }
        }
        Err(e) => record_fault(collection, name, hook, e),
    }
}

fn record_fault(collection: &mut Collection, name: &str, hook: Hook, error: Error) {
    warn!("Strategy '{}' failed in {}: {}", name, hook.as_str(), error);
    collection.faults.push(Error::Strategy {
        name: name.to_string(),
        message: format!("{}: {}", hook.as_str(), error),
    });
}
