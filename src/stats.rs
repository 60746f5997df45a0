//! Rolling allowed/denied counters with a short per-second history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::limiter::Decision;

/// Number of per-second history entries kept.
pub const HISTORY_LEN: usize = 20;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// `floor(ms / 1000)` of the second this entry covers.
    pub timestamp_sec: u64,
    pub allowed: u64,
    pub denied: u64,
}

/// Copy of the aggregator, as served by `GET /api/stats`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub allowed: u64,
    pub denied: u64,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Default)]
pub struct StatsAggregator {
    allowed: u64,
    denied: u64,
    history: VecDeque<HistoryEntry>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one decision made at `now_ms`.
    pub fn record(&mut self, decision: Decision, now_ms: u64) {
        let sec = now_ms / 1000;

        let needs_entry = match self.history.back() {
            Some(last) => last.timestamp_sec != sec,
            None => true,
        };
        if needs_entry {
            self.history.push_back(HistoryEntry {
                timestamp_sec: sec,
                ..Default::default()
            });
            while self.history.len() > HISTORY_LEN {
                self.history.pop_front();
            }
        }

        let (total, current) = match decision {
            Decision::Allow => (&mut self.allowed, self.history.back_mut().map(|e| &mut e.allowed)),
            Decision::Deny => (&mut self.denied, self.history.back_mut().map(|e| &mut e.denied)),
        };
        *total += 1;
        if let Some(current) = current {
            *current += 1;
        }
    }

    pub fn reset(&mut self) {
        self.allowed = 0;
        self.denied = 0;
        self.history.clear();
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            allowed: self.allowed,
            denied: self.denied,
            history: self.history.iter().copied().collect(),
        }
    }
}
