use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine-wide tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nominal tick length in milliseconds.
    pub tick_ms: u64,
    /// How long a swing is ignored after an interact input.
    pub swing_ignore_ms: u64,
    /// Upper bound on live instances per world. Activations beyond it fail.
    pub max_instances: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            swing_ignore_ms: 100,
            max_instances: 4_096,
        }
    }
}

impl EngineConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn swing_ignore(&self) -> Duration {
        Duration::from_millis(self.swing_ignore_ms)
    }
}
