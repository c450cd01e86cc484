//! Real-time loop state definitions

use serde::{Deserialize, Serialize};

/// The three states of the analysis loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopState {
    /// Capture source held, cycles running
    Running,
    /// Current cycle's model inference failed; lasts one cycle
    DegradedCycle,
    /// Terminal, capture source released
    Stopped,
}

impl LoopState {
    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            LoopState::Running => "\x1b[32m",       // Green
            LoopState::DegradedCycle => "\x1b[33m", // Yellow
            LoopState::Stopped => "\x1b[90m",       // Gray
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    pub fn is_terminal(&self) -> bool {
        *self == LoopState::Stopped
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoopState::Running => "RUNNING",
            LoopState::DegradedCycle => "DEGRADED_CYCLE",
            LoopState::Stopped => "STOPPED",
        };
        write!(f, "{}", name)
    }
}
