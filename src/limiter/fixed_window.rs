//! Fixed window counter.

use super::{
    Algorithm, AlgorithmConfig, AlgorithmKind, Decision, FixedWindowState, LimiterError,
    LimiterState,
};

/// Counts admissions in consecutive windows of `window_size_ms`.
///
/// A request arriving exactly when the window expires opens a fresh window
/// and is counted in it, so the new window starts at count 1.
#[derive(Debug, Clone)]
pub struct FixedWindow {
    config: AlgorithmConfig,
    state: FixedWindowState,
    created_at: u64,
}

impl FixedWindow {
    pub fn new(config: AlgorithmConfig, now: u64) -> Result<Self, LimiterError> {
        config.validate()?;
        Ok(Self::build(config, now))
    }

    pub(crate) fn build(config: AlgorithmConfig, now: u64) -> Self {
        Self {
            config,
            state: FixedWindowState {
                window_start_ms: now,
                count: 0,
            },
            created_at: now,
        }
    }

    fn roll(&mut self, now: u64) {
        if now.saturating_sub(self.state.window_start_ms) >= self.config.window_size_ms {
            self.state.window_start_ms = now;
            self.state.count = 0;
        }
    }
}

impl Algorithm for FixedWindow {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::FixedWindow
    }

    fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn admit(&mut self, now: u64) -> Decision {
        self.roll(now);
        if self.state.count < self.config.limit {
            self.state.count += 1;
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    fn tick(&mut self, now: u64) {
        self.roll(now);
    }

    fn reset(&mut self) {
        self.state = FixedWindowState {
            window_start_ms: self.created_at,
            count: 0,
        };
    }

    fn snapshot(&self) -> LimiterState {
        LimiterState::FixedWindow(self.state.clone())
    }
}
