//! Hunger management that never wastes food.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::error::Result;
use crate::events::{EventHandler, EventKind, WorldEvent};
use crate::world::{Hand, ItemStack};

use super::action::Action;

/// Foods that are harmful or too valuable to burn as rations.
pub const FOOD_BLACKLIST: [&str; 6] = [
    "enchanted_golden_apple",
    "rotten_flesh",
    "pufferfish",
    "poisonous_potato",
    "spider_eye",
    "suspicious_stew",
];

/// Below this hunger the overshoot rule is suspended and the agent eats
/// whatever it has.
const PANIC_THRESHOLD: u32 = 6;

const PANIC_MAX_ATTEMPTS: u32 = 5;

/// Tick phase this action runs on; offset from the other throttled actions
/// so inventory scans do not pile onto the same tick.
const RUN_INTERVAL: u8 = 18;

/// Food points of `item`, or `None` when it is inedible or blacklisted.
pub fn valid_food_value(agent: &Agent, item: &ItemStack) -> Option<u32> {
    let value = agent.food_value(item)?;
    if FOOD_BLACKLIST.contains(&item.name.as_str()) {
        return None;
    }
    Some(value)
}

/// Eats only enough food to refill the hunger bar, and only when that can be
/// done without overshooting.
///
/// Selection picks the highest-value eligible item that fits the current
/// hunger deficit; ties resolve to the lowest slot. When nothing fits, the
/// agent deliberately goes hungry rather than waste food. Eating is
/// conservative, not emergency response, except below the panic threshold.
pub struct EfficientEat {
    agent: Arc<Agent>,
}

impl EfficientEat {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    /// The best eligible food no more filling than `max_value`: highest food
    /// value first, lowest slot on ties.
    fn find_best_food(&self, max_value: u32) -> Option<(u16, u32)> {
        let inventory = self.agent.inventory()?;
        let mut slots: Vec<&ItemStack> = inventory.values().collect();
        slots.sort_by_key(|item| item.slot);

        let mut best: Option<(u16, u32)> = None;
        for item in slots {
            if let Some(value) = valid_food_value(&self.agent, item)
                && value <= max_value
                && best.is_none_or(|(_, best_value)| value > best_value)
            {
                best = Some((item.slot, value));
            }
        }
        best
    }

    /// Eats whatever is available until hunger is full, re-scanning the
    /// inventory each round since the previous item may be gone.
    async fn panic_eat(&self) -> Result<()> {
        warn!("hunger critically low, eating without the overshoot check");
        let max_hunger = self.agent.config().max_hunger;
        let mut attempts = 0;
        while matches!(self.agent.hunger(), Some(hunger) if hunger < max_hunger)
            && attempts < PANIC_MAX_ATTEMPTS
        {
            let Some((slot, _)) = self.find_best_food(u32::MAX) else {
                warn!("ran out of eligible food while panic eating");
                return Ok(());
            };
            self.agent.equip_slot(slot, Hand::Main).await?;
            self.agent.eat_held_item().await?;
            attempts += 1;
        }
        if attempts >= PANIC_MAX_ATTEMPTS {
            warn!(attempts, "giving up on panic eating");
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for EfficientEat {
    async fn handle(&self, event: &WorldEvent) -> Result<()> {
        let Some(count) = event.tick_count() else {
            return Ok(());
        };
        if count != RUN_INTERVAL {
            return Ok(());
        }

        let Some(hunger) = self.agent.hunger() else {
            return Ok(());
        };
        let max_hunger = self.agent.config().max_hunger;
        if hunger >= max_hunger {
            debug!("hunger is full, not eating");
            return Ok(());
        }

        if hunger <= PANIC_THRESHOLD {
            // Any eligible food will do; overshooting beats starving.
            return self.panic_eat().await;
        }

        let deficit = max_hunger - hunger;
        let Some((slot, value)) = self.find_best_food(deficit) else {
            debug!(deficit, "no food fits the hunger deficit, not eating");
            return Ok(());
        };

        self.agent.equip_slot(slot, Hand::Main).await?;
        if self.agent.eat_held_item().await? {
            info!(slot, food_points = value, "ate food");
        }
        Ok(())
    }
}

#[async_trait]
impl Action for EfficientEat {
    fn name(&self) -> &'static str {
        "Efficient Eat"
    }

    fn description(&self) -> &'static str {
        "Eats only enough food to keep the hunger bar full and only eats when that can be done."
    }

    fn bound_event(&self) -> Option<EventKind> {
        Some(EventKind::Tick)
    }
}
