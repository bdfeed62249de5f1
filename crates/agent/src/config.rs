//! Agent configuration.
use std::time::Duration;

pub const MAX_HUNGER: u32 = 20;

/// Tunables shared by the agent facade and its actions.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub username: String,
    pub max_hunger: u32,
    /// Servers with heavy join-time anti-cheat emit two spawn events before
    /// the avatar is really in the world; this raises the spawn count needed
    /// to reach the active phase and makes the agent pause pathfinding while
    /// eating.
    pub high_latency_server: bool,
    /// Upper bound on waiting for an eat command to visibly raise hunger.
    pub eat_max_wait: Duration,
    /// Interval of the background position-logging loop.
    pub position_log_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            username: "wayfarer".to_string(),
            max_hunger: MAX_HUNGER,
            high_latency_server: false,
            eat_max_wait: Duration::from_secs(5),
            position_log_interval: Duration::from_secs(60),
        }
    }
}

impl AgentConfig {
    /// Spawn events required before tick-bound actions may run.
    pub fn spawns_required(&self) -> u32 {
        if self.high_latency_server { 2 } else { 1 }
    }
}
