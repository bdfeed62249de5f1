//! Keeps a shield raised whenever one is available.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::agent::Agent;
use crate::error::Result;
use crate::events::{EventHandler, EventKind, WorldEvent};

use super::action::Action;

const RUN_INTERVAL: u8 = 19;

/// Equips a shield to the offhand and keeps it active.
///
/// Activation goes through the agent's active-item lock, serializing with
/// [`super::EfficientEat`]'s eat sequence; both toggle the held-item state
/// and must never interleave.
///
/// Aim retargeting toward the nearest hostile is deliberately absent; it
/// glitched while sprinting and stays disabled.
pub struct AlwaysShield {
    agent: Arc<Agent>,
}

impl AlwaysShield {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl EventHandler for AlwaysShield {
    async fn handle(&self, event: &WorldEvent) -> Result<()> {
        let Some(count) = event.tick_count() else {
            return Ok(());
        };
        if count != RUN_INTERVAL {
            return Ok(());
        }

        if !self.agent.equip_shield().await? {
            debug!("no shield in inventory, not activating");
            return Ok(());
        }
        self.agent.activate_shield().await
    }
}

#[async_trait]
impl Action for AlwaysShield {
    fn name(&self) -> &'static str {
        "Always Shield"
    }

    fn description(&self) -> &'static str {
        "Always uses a shield when available."
    }

    fn bound_event(&self) -> Option<EventKind> {
        Some(EventKind::Tick)
    }
}
