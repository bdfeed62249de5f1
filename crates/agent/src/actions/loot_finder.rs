//! Logs valuable item drops seen along the route.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::agent::Agent;
use crate::error::Result;
use crate::events::{EventHandler, EventKind, WorldEvent};
use crate::world::EntityKind;

use super::action::Action;

/// Substrings marking an item entity as worth logging.
const VALUABLE_MARKERS: [&str; 3] = ["netherite", "shulker", "elytra"];

/// Purely observational: watches nearby item entities and logs each valuable
/// sighting once. The seen set is session-scoped and append-only; it is never
/// persisted and never pruned.
pub struct LootFinder {
    agent: Arc<Agent>,
    seen: Mutex<HashSet<(i64, i64, i64, String)>>,
}

impl LootFinder {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self {
            agent,
            seen: Mutex::new(HashSet::new()),
        }
    }

    pub fn sightings(&self) -> usize {
        self.seen.lock().expect("loot set poisoned").len()
    }
}

#[async_trait]
impl EventHandler for LootFinder {
    async fn handle(&self, event: &WorldEvent) -> Result<()> {
        if event.tick_count().is_none() {
            return Ok(());
        }

        for entity in self.agent.nearby_entities() {
            if entity.kind != EntityKind::Item {
                continue;
            }
            let Some(name) = &entity.sub_name else {
                continue;
            };
            if !VALUABLE_MARKERS.iter().any(|marker| name.contains(marker)) {
                continue;
            }

            let (x, y, z) = entity.position.floored();
            let key = (x, y, z, name.clone());
            let mut seen = self.seen.lock().expect("loot set poisoned");
            if seen.insert(key) {
                info!(item = %name, x, y, z, "found loot item");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Action for LootFinder {
    fn name(&self) -> &'static str {
        "Loot Finder"
    }

    fn description(&self) -> &'static str {
        "Monitors for valuable items in the environment."
    }

    fn bound_event(&self) -> Option<EventKind> {
        Some(EventKind::Tick)
    }
}
