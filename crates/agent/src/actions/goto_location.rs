//! Walks the agent to a fixed coordinate and reports progress.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::info;

use crate::agent::Agent;
use crate::error::Result;
use crate::events::{EventHandler, EventKind, WorldEvent};
use crate::world::Position;
use crate::world::geom::{format_duration, walk_time};

use super::action::Action;

/// Tick phase this action runs on (once per second at 20 ticks/s).
const RUN_INTERVAL: u8 = 19;

/// Arrival tolerance per axis.
const ARRIVAL_TOLERANCE: f64 = 1.0;

#[derive(Default)]
struct GotoState {
    /// Whether the pathfinding command has been issued.
    running: bool,
    last_log_position: Option<Position>,
    last_log_time: Option<Instant>,
}

/// Moves the agent to a specific location in the world.
///
/// State machine: idle until the first throttled tick, then pathfinding until
/// the position is within [`ARRIVAL_TOLERANCE`] of the target on all three
/// axes. While pathfinding, a progress log with a re-estimated ETA is emitted
/// every `log_interval` units traveled.
pub struct GotoLocation {
    agent: Arc<Agent>,
    target: Position,
    /// Distance traveled between progress logs, in units.
    log_interval: f64,
    exit_on_arrival: bool,
    state: Mutex<GotoState>,
}

impl GotoLocation {
    pub fn new(
        agent: Arc<Agent>,
        target: Position,
        log_interval: f64,
        exit_on_arrival: bool,
    ) -> Self {
        // Publish the goal immediately so stuck recovery can reference it
        // even before the first pathfinding command is issued.
        agent.set_walk_goal(Some(target));
        Self {
            agent,
            target,
            log_interval,
            exit_on_arrival,
            state: Mutex::new(GotoState::default()),
        }
    }

    pub fn target(&self) -> Position {
        self.target
    }

    fn arrived(&self, position: &Position) -> bool {
        position.within_tolerance(&self.target, ARRIVAL_TOLERANCE)
    }

    async fn begin_pathfinding(&self) -> Result<()> {
        if let Some(current) = self.agent.position() {
            let estimate = walk_time(&current, &self.target, true);
            info!(
                target = %self.target,
                from = %current,
                hunger = ?self.agent.hunger(),
                health = ?self.agent.health(),
                eta = %format_duration(estimate),
                "pathfinding to target"
            );
        }
        self.agent.walk_to(self.target).await
    }

    fn log_progress(&self, current: Position) {
        let mut state = self.state.lock().expect("goto state poisoned");
        let (last_position, last_time) = match (state.last_log_position, state.last_log_time) {
            (Some(position), Some(time)) => (position, time),
            _ => {
                state.last_log_position = Some(current);
                state.last_log_time = Some(Instant::now());
                return;
            }
        };

        let traveled = last_position.distance(&current);
        if traveled < self.log_interval {
            return;
        }

        let elapsed = last_time.elapsed().as_secs_f64();
        let remaining = current.distance(&self.target);
        // Re-estimate from the observed rate rather than the sprint constant.
        let eta = if elapsed > 0.0 && traveled > 0.0 {
            remaining / (traveled / elapsed)
        } else {
            walk_time(&current, &self.target, true)
        };
        info!(
            position = %current,
            hunger = ?self.agent.hunger(),
            health = ?self.agent.health(),
            eta = %format_duration(eta),
            "walk progress"
        );
        state.last_log_position = Some(current);
        state.last_log_time = Some(Instant::now());
    }
}

#[async_trait]
impl EventHandler for GotoLocation {
    async fn handle(&self, event: &WorldEvent) -> Result<()> {
        let Some(count) = event.tick_count() else {
            return Ok(());
        };
        if count != RUN_INTERVAL {
            return Ok(());
        }

        let starting = {
            let mut state = self.state.lock().expect("goto state poisoned");
            if state.running {
                false
            } else {
                state.running = true;
                true
            }
        };
        if starting {
            return self.begin_pathfinding().await;
        }

        let Some(current) = self.agent.position() else {
            return Ok(());
        };

        if self.arrived(&current) {
            info!(target = %self.target, "reached destination");
            self.agent.stop_pathfinding().await;
            self.state.lock().expect("goto state poisoned").running = false;
            if self.exit_on_arrival {
                self.agent.disconnect(true).await;
            }
            return Ok(());
        }

        self.log_progress(current);
        Ok(())
    }
}

#[async_trait]
impl Action for GotoLocation {
    fn name(&self) -> &'static str {
        "Goto Location"
    }

    fn description(&self) -> &'static str {
        "Moves the agent to a specific location in the world."
    }

    fn bound_event(&self) -> Option<EventKind> {
        Some(EventKind::Tick)
    }

    /// Halts the underlying pathfinding and resets transient logging state,
    /// independent of bus unsubscription.
    async fn on_stop(&self) {
        self.agent.stop_pathfinding().await;
        let mut state = self.state.lock().expect("goto state poisoned");
        state.running = false;
        state.last_log_position = None;
        state.last_log_time = None;
    }
}
