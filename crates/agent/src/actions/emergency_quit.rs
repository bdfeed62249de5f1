//! The supervisory safety monitor.
//!
//! Runs on every tick and evaluates checks in a fixed order, short-circuiting
//! on the first triggered condition: health, then hostile players, then food
//! availability, then stuck detection. Health is the most time-critical
//! threat; hostile players the second; food and stuck are slower-onset risks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::agent::Agent;
use crate::error::Result;
use crate::events::{EventHandler, EventKind, WorldEvent};
use crate::strategy::RestartRequest;
use crate::world::{EntityKind, Position};

use super::action::Action;
use super::efficient_eat::valid_food_value;

const HEALTH_THRESHOLD: u32 = 10;
const STUCK_THRESHOLD: Duration = Duration::from_secs(60);
const STUCK_RECONNECT_WAIT: Duration = Duration::from_secs(10);
/// Horizontal movement below this tolerance counts as standing still.
const STUCK_TOLERANCE: f64 = 1.0;

/// Which checks run, and what happens when a hostile player appears.
#[derive(Clone)]
pub struct EmergencyQuitConfig {
    /// When set, a hostile player triggers a strategy restart after this
    /// wait instead of a shutdown disconnect. Requires a restart channel.
    pub reconnect_wait: Option<Duration>,
    pub check_players: bool,
    pub check_food: bool,
    pub check_stuck: bool,
}

impl Default for EmergencyQuitConfig {
    fn default() -> Self {
        Self {
            reconnect_wait: None,
            check_players: true,
            check_food: true,
            check_stuck: true,
        }
    }
}

struct StuckTracker {
    position: Position,
    since: Instant,
}

/// Monitors health, hostile players, food supply, and movement, and pulls
/// the plug before the agent dies or is ambushed.
pub struct EmergencyQuit {
    agent: Arc<Agent>,
    config: EmergencyQuitConfig,
    restart_tx: Option<mpsc::Sender<RestartRequest>>,
    tracker: Mutex<Option<StuckTracker>>,
}

impl EmergencyQuit {
    pub fn new(agent: Arc<Agent>, config: EmergencyQuitConfig) -> Self {
        Self {
            agent,
            config,
            restart_tx: None,
            tracker: Mutex::new(None),
        }
    }

    /// Wires the strategy's restart channel, enabling the reconnect-and-
    /// restart response to hostile players.
    pub fn with_restart_channel(mut self, tx: mpsc::Sender<RestartRequest>) -> Self {
        self.restart_tx = Some(tx);
        self
    }

    /// Health at or below the threshold ends the session immediately.
    async fn check_health(&self) -> bool {
        let Some(health) = self.agent.health() else {
            return false;
        };
        if health <= HEALTH_THRESHOLD {
            error!(health, "emergency quit: health too low");
            self.agent.disconnect(true).await;
            return true;
        }
        false
    }

    async fn check_players(&self) -> Result<bool> {
        for entity in self.agent.nearby_entities() {
            if entity.kind != EntityKind::Player {
                continue;
            }
            let Some(name) = &entity.sub_name else {
                continue;
            };
            if self.agent.is_whitelisted(name) {
                continue;
            }

            error!(
                player = %name,
                position = %entity.position,
                "emergency quit: non-whitelisted player detected"
            );
            match (self.config.reconnect_wait, &self.restart_tx) {
                (Some(wait), Some(tx)) => {
                    info!(wait_secs = wait.as_secs(), "requesting strategy restart");
                    if tx.send(RestartRequest { wait }).await.is_err() {
                        warn!("restart channel closed, disconnecting instead");
                        self.agent.disconnect(true).await;
                    }
                }
                _ => self.agent.disconnect(true).await,
            }
            return Ok(true);
        }
        Ok(false)
    }

    async fn check_food(&self) -> bool {
        let Some(inventory) = self.agent.inventory() else {
            warn!("failed to read inventory, skipping food check");
            return false;
        };
        // An empty read is indistinguishable from a failed one; skip rather
        // than quit over it.
        if inventory.is_empty() {
            warn!("inventory empty or unreadable, skipping food check");
            return false;
        }
        let has_food = inventory
            .values()
            .any(|item| valid_food_value(&self.agent, item).is_some());
        if !has_food {
            error!("emergency quit: no valid food items in inventory");
            self.agent.disconnect(true).await;
            return true;
        }
        false
    }

    /// Reconnects and reissues the walk goal when the avatar has not moved
    /// horizontally beyond tolerance for the stuck threshold.
    ///
    /// The first observation only seeds the tracker; any movement resets it,
    /// so the timer restarts fresh after each trigger or displacement.
    async fn check_stuck(&self) -> Result<bool> {
        let Some(current) = self.agent.position() else {
            warn!("failed to read position, skipping stuck check");
            return Ok(false);
        };
        let now = Instant::now();

        let stuck_for = {
            let mut tracker = self.tracker.lock().expect("stuck tracker poisoned");
            match tracker.as_mut() {
                None => {
                    *tracker = Some(StuckTracker {
                        position: current,
                        since: now,
                    });
                    return Ok(false);
                }
                Some(state) => {
                    let dx = (current.x - state.position.x).abs();
                    let dz = (current.z - state.position.z).abs();
                    if dx < STUCK_TOLERANCE && dz < STUCK_TOLERANCE {
                        let elapsed = now.duration_since(state.since);
                        if elapsed < STUCK_THRESHOLD {
                            return Ok(false);
                        }
                        *tracker = None;
                        elapsed
                    } else {
                        state.position = current;
                        state.since = now;
                        return Ok(false);
                    }
                }
            }
        };

        error!(
            position = %current,
            stuck_secs = stuck_for.as_secs(),
            "emergency quit: agent is stuck, reconnecting"
        );
        self.agent.reconnect(STUCK_RECONNECT_WAIT).await?;
        if let Some(goal) = self.agent.walk_goal() {
            info!(%goal, "reissuing walk goal after stuck recovery");
            self.agent.walk_to(goal).await?;
        }
        Ok(true)
    }
}

#[async_trait]
impl EventHandler for EmergencyQuit {
    async fn handle(&self, event: &WorldEvent) -> Result<()> {
        if event.tick_count().is_none() {
            return Ok(());
        }

        if self.check_health().await {
            return Ok(());
        }
        if self.config.check_players && self.check_players().await? {
            return Ok(());
        }
        if self.config.check_food && self.check_food().await {
            return Ok(());
        }
        if self.config.check_stuck {
            self.check_stuck().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Action for EmergencyQuit {
    fn name(&self) -> &'static str {
        "Emergency Quit"
    }

    fn description(&self) -> &'static str {
        "Monitors health, hostile players, food supply, and movement, and \
         disconnects or restarts before the situation becomes fatal."
    }

    fn bound_event(&self) -> Option<EventKind> {
        Some(EventKind::Tick)
    }
}
