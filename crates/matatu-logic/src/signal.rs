//! Traffic signal at the crossing: GREEN → YELLOW → RED → GREEN, one phase
//! per period. Driven by elapsed simulated time rather than a wall-clock timer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignalState {
    #[default]
    Green,
    Yellow,
    Red,
}

impl SignalState {
    pub fn next(self) -> Self {
        match self {
            SignalState::Green => SignalState::Yellow,
            SignalState::Yellow => SignalState::Red,
            SignalState::Red => SignalState::Green,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SignalState::Green => "GREEN",
            SignalState::Yellow => "YELLOW",
            SignalState::Red => "RED",
        }
    }
}

/// Elapsed-time accumulator for the light cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalCycle {
    state: SignalState,
    period_secs: f32,
    elapsed: f32,
}

impl SignalCycle {
    pub fn new(period_ms: u32) -> Self {
        Self {
            state: SignalState::Green,
            period_secs: period_ms as f32 / 1000.0,
            elapsed: 0.0,
        }
    }

    pub fn state(&self) -> SignalState {
        self.state
    }

    /// Advance by `dt` seconds. Returns the new state if a phase change
    /// happened. A long `dt` can step through several phases; only the final
    /// state is reported.
    pub fn advance(&mut self, dt: f32) -> Option<SignalState> {
        if self.period_secs <= 0.0 || dt <= 0.0 {
            return None;
        }
        self.elapsed += dt;
        let mut changed = false;
        while self.elapsed >= self.period_secs {
            self.elapsed -= self.period_secs;
            self.state = self.state.next();
            changed = true;
        }
        changed.then_some(self.state)
    }

    /// Back to GREEN at the start of a period.
    pub fn reset(&mut self) {
        self.state = SignalState::Green;
        self.elapsed = 0.0;
    }
}
