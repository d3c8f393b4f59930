//! Diagnostic tick trace
//!
//! Keeps the last `capacity` ticks: the triggering event, every intent,
//! the resolution, the executed effects and any isolated faults. Dumped as
//! JSON lines by the simulator.

use crate::clock::ClockEvent;
use crate::effects::Effect;
use crate::error::Result;
use crate::intent::Intent;
use crate::reducer::Resolution;
use crate::scheduler::TickStats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// What happened in one tick
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub event: ClockEvent,
    pub media_time: f64,
    pub intents: Vec<Intent>,
    pub resolution: Resolution,
    /// Effects in execution order (scheduled ones first)
    pub effects: Vec<Effect>,
    pub faults: Vec<String>,
    pub scheduler: TickStats,
}

impl TickReport {
    pub fn has_faults(&self) -> bool {
        !self.faults.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub report: TickReport,
}

/// Bounded ring of trace entries
#[derive(Debug)]
pub struct TraceLog {
    entries: VecDeque<TraceEntry>,
    capacity: usize,
    total: u64,
}

impl TraceLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            total: 0,
        }
    }

    pub fn record(&mut self, report: TickReport) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(TraceEntry {
            at: Utc::now(),
            report,
        });
        self.total += 1;
    }

    pub fn entries(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&TraceEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ticks recorded since creation, including evicted ones
    pub fn total_recorded(&self) -> u64 {
        self.total
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// One JSON object per line, oldest first
    pub fn to_json_lines(&self) -> Result<String> {
        let mut out = String::new();
        for entry in &self.entries {
            let line = serde_json::to_string(entry).map_err(lingo_common::Error::from)?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }
}
